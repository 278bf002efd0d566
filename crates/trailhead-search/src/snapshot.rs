//! JSON snapshots of a vector collection.
//!
//! Lets the CLI build the index once and reuse it across invocations
//! instead of re-embedding the whole catalog on every query.

use std::path::Path;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use trailhead_core::error::{ConfigurationError, IndexError};
use trailhead_core::ports::IndexedVector;

use crate::index::InMemoryVectorIndex;

/// Metadata stored alongside the vectors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexMetadata {
    pub collection: String,

    pub dimension: usize,

    pub item_count: usize,

    /// Build timestamp (RFC 3339).
    pub built_at: String,

    /// Embedding provider and model that produced the vectors.
    pub embedder: String,
}

/// A collection as persisted on disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub metadata: IndexMetadata,
    pub records: Vec<IndexedVector>,
}

impl Snapshot {
    /// Turn the snapshot back into a live index.
    ///
    /// A snapshot built with a different embedding dimension cannot be
    /// queried with the configured embedder, which is a startup error.
    pub fn into_index(self, dimension: usize) -> Result<InMemoryVectorIndex, ConfigurationError> {
        if self.metadata.dimension != dimension {
            return Err(ConfigurationError::DimensionMismatch {
                index: self.metadata.dimension,
                embedder: dimension,
            });
        }
        InMemoryVectorIndex::with_records(self.metadata.collection, dimension, self.records)
            .map_err(|e| ConfigurationError::Invalid(format!("corrupt index snapshot: {e}")))
    }
}

/// Write every record in `index` to `path`.
pub async fn write_snapshot(
    index: &InMemoryVectorIndex,
    path: &Path,
    embedder: &str,
) -> Result<IndexMetadata, IndexError> {
    let records = index.records().await;
    let metadata = IndexMetadata {
        collection: index.name().to_string(),
        dimension: trailhead_core::ports::VectorIndex::dimension(index),
        item_count: records.len(),
        built_at: Utc::now().to_rfc3339(),
        embedder: embedder.to_string(),
    };
    let snapshot = Snapshot {
        metadata: metadata.clone(),
        records,
    };

    let json =
        serde_json::to_vec(&snapshot).map_err(|e| IndexError::Snapshot(e.to_string()))?;
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| IndexError::Snapshot(format!("{}: {e}", parent.display())))?;
    }
    tokio::fs::write(path, json)
        .await
        .map_err(|e| IndexError::Snapshot(format!("{}: {e}", path.display())))?;

    log::info!(
        "Saved {} vectors from {} to {}",
        metadata.item_count,
        metadata.collection,
        path.display()
    );
    Ok(metadata)
}

/// Read a snapshot from `path`.
pub async fn read_snapshot(path: &Path) -> Result<Snapshot, IndexError> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| IndexError::Snapshot(format!("{}: {e}", path.display())))?;
    serde_json::from_slice(&bytes).map_err(|e| IndexError::Snapshot(e.to_string()))
}
