use serde::{Deserialize, Serialize};

use crate::model::ids::ItemId;
use crate::model::price::Price;

/// A product in the catalog.
///
/// Owned by the catalog store; the search pipeline only ever reads it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogItem {
    pub id: ItemId,

    pub name: String,

    pub description: String,

    pub price: Price,

    /// Image reference (relative path or URI).
    #[serde(alias = "imageUrl")]
    pub image_ref: String,
}

impl CatalogItem {
    /// The zero-valued item returned in the single response slot when a
    /// query matches nothing.
    #[must_use]
    pub fn placeholder() -> Self {
        Self {
            id: ItemId::PLACEHOLDER,
            name: String::new(),
            description: String::new(),
            price: Price::ZERO,
            image_ref: String::new(),
        }
    }

    #[must_use]
    pub fn is_placeholder(&self) -> bool {
        self.id.is_placeholder()
    }

    /// Text describing what this item is, in the form that gets embedded.
    ///
    /// The same template is used for every item so that stored vectors are
    /// comparable with each other and with query embeddings.
    #[must_use]
    pub fn embedding_text(&self) -> String {
        format!(
            "{} is a product that costs {} and is described as: {}",
            self.name, self.price, self.description
        )
    }
}

/// An item about to be inserted into the catalog store (no id yet).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewCatalogItem {
    pub name: String,
    pub description: String,
    pub price: Price,
    pub image_ref: String,
}

impl NewCatalogItem {
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        price: Price,
        image_ref: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            price,
            image_ref: image_ref.into(),
        }
    }

    /// Attach the id assigned by the store.
    #[must_use]
    pub fn with_id(self, id: ItemId) -> CatalogItem {
        CatalogItem {
            id,
            name: self.name,
            description: self.description,
            price: self.price,
            image_ref: self.image_ref,
        }
    }
}
