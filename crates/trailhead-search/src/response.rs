//! Query outcomes and the flat response shape callers receive.

use std::fmt;

use serde::{Deserialize, Serialize};
use trailhead_core::model::CatalogItem;

/// Pipeline stage a query was in when it failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Embedding,
    Searching,
    Generating,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Embedding => "embedding",
            Self::Searching => "searching",
            Self::Generating => "generating",
        };
        f.write_str(name)
    }
}

/// The outcome of resolving one query.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// A hit cleared the threshold and the model produced a reply about it.
    Matched {
        item: CatalogItem,
        score: f64,
        response: String,
    },

    /// No hit cleared the threshold.
    Unmatched { response: String },

    /// A port call failed or timed out.
    Failed { stage: Stage, reason: String },
}

impl Resolution {
    #[must_use]
    pub const fn is_matched(&self) -> bool {
        matches!(self, Self::Matched { .. })
    }

    #[must_use]
    pub const fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }

    /// Flatten into the single response shape.
    ///
    /// Unmatched queries still get exactly one item slot holding the
    /// zero-valued placeholder; failed queries get no items.
    #[must_use]
    pub fn into_response(self) -> SearchResponse {
        match self {
            Self::Matched { item, response, .. } => SearchResponse {
                items: vec![item],
                response,
            },
            Self::Unmatched { response } => SearchResponse {
                items: vec![CatalogItem::placeholder()],
                response,
            },
            Self::Failed { stage, reason } => {
                log::debug!("Query failed while {stage}: {reason}");
                SearchResponse {
                    items: Vec::new(),
                    response: format!(
                        "Sorry, something went wrong while looking for a product. An error occurred: {reason}"
                    ),
                }
            }
        }
    }
}

impl From<Resolution> for SearchResponse {
    fn from(resolution: Resolution) -> Self {
        resolution.into_response()
    }
}

/// What a caller gets back for a query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
    /// Empty, the matched item, or the placeholder.
    #[serde(alias = "products")]
    pub items: Vec<CatalogItem>,

    pub response: String,
}

impl SearchResponse {
    /// The matched item, ignoring the placeholder slot.
    #[must_use]
    pub fn matched_item(&self) -> Option<&CatalogItem> {
        self.items.first().filter(|item| !item.is_placeholder())
    }
}
