//! Port traits for the collaborators the search pipeline depends on.
//!
//! The embedding model, the generative model, the vector index, and the
//! catalog store are all reached through these traits so they can be
//! swapped per deployment profile and faked in tests. Every port must be
//! safe to share across concurrent queries.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{EmbeddingError, GenerationError, IndexError, Result};
use crate::model::{CatalogItem, ItemId};

/// Maps free text to a fixed-dimension vector.
#[async_trait]
pub trait EmbeddingPort: Send + Sync {
    async fn embed(&self, text: &str) -> std::result::Result<Vec<f32>, EmbeddingError>;

    /// Length of every vector this port returns.
    fn dimension(&self) -> usize;

    /// Provider name for diagnostics.
    fn name(&self) -> &str;
}

/// Produces text from a role-tagged message sequence.
#[async_trait]
pub trait GenerationPort: Send + Sync {
    async fn generate(&self, messages: &[ChatMessage])
        -> std::result::Result<String, GenerationError>;

    fn name(&self) -> &str;
}

/// A keyed vector collection with nearest-neighbour search.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Create the collection if it does not exist yet. Never clears data.
    async fn ensure_collection(&self) -> std::result::Result<(), IndexError>;

    /// Insert or overwrite the vector stored under `record.item.id`.
    async fn upsert(&self, record: IndexedVector) -> std::result::Result<ItemId, IndexError>;

    /// Up to `top_k` hits ordered by descending score.
    async fn search(
        &self,
        query: &[f32],
        top_k: usize,
    ) -> std::result::Result<Vec<SearchHit>, IndexError>;

    async fn len(&self) -> usize;

    async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    fn dimension(&self) -> usize;
}

/// Read-only access to the system of record for catalog items.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    /// A snapshot of every live item.
    async fn list_all_items(&self) -> Result<Vec<CatalogItem>>;
}

/// Speaker of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One role-tagged message sent to a generation port.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// The index-side projection of a catalog item.
///
/// The full item travels with the vector so a hit can be returned without
/// a round trip to the catalog store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexedVector {
    pub item: CatalogItem,
    pub embedding: Vec<f32>,
}

impl IndexedVector {
    #[must_use]
    pub fn new(item: CatalogItem, embedding: Vec<f32>) -> Self {
        Self { item, embedding }
    }

    #[must_use]
    pub fn id(&self) -> ItemId {
        self.item.id
    }
}

/// A search result with its similarity score in `[0, 1]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub item: CatalogItem,
    pub score: f64,
}
