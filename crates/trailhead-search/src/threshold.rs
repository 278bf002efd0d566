use std::fmt;

use serde::{Deserialize, Serialize};
use trailhead_core::error::ConfigurationError;

/// Minimum similarity a hit must exceed to count as a match.
///
/// The comparison is strict: a score exactly equal to the threshold is
/// treated as no match. Suitable values depend on the embedding model, so
/// the threshold always comes from configuration.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct ScoreThreshold(f64);

impl ScoreThreshold {
    /// Validate a threshold strictly inside `(0, 1)`.
    pub fn new(value: f64) -> Result<Self, ConfigurationError> {
        if value.is_finite() && value > 0.0 && value < 1.0 {
            Ok(Self(value))
        } else {
            Err(ConfigurationError::InvalidThreshold(value))
        }
    }

    #[must_use]
    pub const fn value(self) -> f64 {
        self.0
    }

    /// Whether `score` clears the threshold.
    #[must_use]
    pub fn accepts(self, score: f64) -> bool {
        score > self.0
    }
}

impl TryFrom<f64> for ScoreThreshold {
    type Error = ConfigurationError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ScoreThreshold> for f64 {
    fn from(threshold: ScoreThreshold) -> Self {
        threshold.0
    }
}

impl fmt::Display for ScoreThreshold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}
