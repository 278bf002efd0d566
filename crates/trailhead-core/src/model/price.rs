use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::Error;

/// A non-negative monetary amount held as whole cents.
///
/// Serializes as a plain decimal number (`129.99`) so the wire shape stays
/// compatible with clients that treat price as a JSON number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Price {
    cents: i64,
}

impl Price {
    pub const ZERO: Self = Self { cents: 0 };

    /// Build a price from whole cents.
    ///
    /// # Errors
    /// Returns [`Error::InvalidData`] for negative amounts.
    pub fn from_cents(cents: i64) -> Result<Self, Error> {
        if cents < 0 {
            return Err(Error::InvalidData(format!("negative price: {cents} cents")));
        }
        Ok(Self { cents })
    }

    /// Build a price from a decimal amount, rounding to the nearest cent.
    ///
    /// # Errors
    /// Returns [`Error::InvalidData`] for negative or non-finite amounts.
    pub fn from_decimal(amount: f64) -> Result<Self, Error> {
        if !amount.is_finite() || amount < 0.0 {
            return Err(Error::InvalidData(format!("invalid price: {amount}")));
        }
        Self::from_cents((amount * 100.0).round() as i64)
    }

    #[must_use]
    pub const fn cents(self) -> i64 {
        self.cents
    }

    #[must_use]
    pub fn as_decimal(self) -> f64 {
        self.cents as f64 / 100.0
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.cents / 100, self.cents % 100)
    }
}

impl TryFrom<f64> for Price {
    type Error = Error;

    fn try_from(amount: f64) -> Result<Self, Self::Error> {
        Self::from_decimal(amount)
    }
}

impl From<Price> for f64 {
    fn from(price: Price) -> Self {
        price.as_decimal()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_price_display() {
        assert_eq!(Price::from_cents(12999).unwrap().to_string(), "129.99");
        assert_eq!(Price::from_cents(500).unwrap().to_string(), "5.00");
        assert_eq!(Price::from_cents(7).unwrap().to_string(), "0.07");
        assert_eq!(Price::ZERO.to_string(), "0.00");
    }

    #[test]
    fn test_price_from_decimal_rounds_to_cents() {
        assert_eq!(Price::from_decimal(129.99).unwrap().cents(), 12999);
        assert_eq!(Price::from_decimal(0.005).unwrap().cents(), 1);
    }

    #[test]
    fn test_price_rejects_invalid_amounts() {
        assert!(Price::from_decimal(-1.0).is_err());
        assert!(Price::from_decimal(f64::NAN).is_err());
        assert!(Price::from_cents(-5).is_err());
    }

    #[test]
    fn test_price_json_shape() {
        let price = Price::from_cents(12999).unwrap();
        assert_eq!(serde_json::to_string(&price).unwrap(), "129.99");

        let parsed: Price = serde_json::from_str("24.5").unwrap();
        assert_eq!(parsed.cents(), 2450);

        assert!(serde_json::from_str::<Price>("-3").is_err());
    }
}
