//! Builds the vector index from the catalog.
//!
//! A rebuild reads one snapshot of the catalog, embeds each item's
//! descriptive text, and upserts the vector under the item's id. Items that
//! fail to embed or store are logged and skipped; the rest of the batch
//! carries on. Rebuilding again over an unchanged catalog overwrites the
//! same keys with the same vectors.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::Mutex;
use tokio::time::timeout;
use trailhead_core::error::{ConfigurationError, EmbeddingError, IndexError};
use trailhead_core::model::{CatalogItem, ItemId};
use trailhead_core::ports::{CatalogSource, EmbeddingPort, IndexedVector, VectorIndex};

/// Default bound on each individual port call during a rebuild.
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(30);

/// Batch-level rebuild failures. Per-item failures never surface here.
#[derive(Debug, Error)]
pub enum IndexerError {
    #[error("could not read catalog: {0}")]
    Catalog(#[from] trailhead_core::Error),

    #[error("catalog read timed out")]
    CatalogTimeout,

    #[error("could not prepare vector collection: {0}")]
    Index(#[from] IndexError),
}

/// One item that could not be indexed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemFailure {
    pub id: ItemId,
    pub name: String,
    pub reason: String,
}

/// Summary of a rebuild.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RebuildReport {
    /// Items read from the catalog.
    pub total: usize,
    /// Items whose vector was stored.
    pub indexed: usize,
    pub failures: Vec<ItemFailure>,
}

impl RebuildReport {
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

#[derive(Debug, Error)]
enum ItemError {
    #[error("embedding failed: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("upsert failed: {0}")]
    Index(#[from] IndexError),
}

/// Writes catalog items into the vector index.
pub struct Indexer {
    catalog: Arc<dyn CatalogSource>,
    embedder: Arc<dyn EmbeddingPort>,
    index: Arc<dyn VectorIndex>,
    call_timeout: Duration,
    rebuild_lock: Mutex<()>,
}

impl std::fmt::Debug for Indexer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Indexer")
            .field("embedder", &self.embedder.name())
            .field("dimension", &self.index.dimension())
            .field("call_timeout", &self.call_timeout)
            .finish_non_exhaustive()
    }
}

impl Indexer {
    /// # Errors
    /// Returns [`ConfigurationError::DimensionMismatch`] when the embedder's
    /// vectors would not fit the index.
    pub fn new(
        catalog: Arc<dyn CatalogSource>,
        embedder: Arc<dyn EmbeddingPort>,
        index: Arc<dyn VectorIndex>,
    ) -> Result<Self, ConfigurationError> {
        if embedder.dimension() != index.dimension() {
            return Err(ConfigurationError::DimensionMismatch {
                index: index.dimension(),
                embedder: embedder.dimension(),
            });
        }

        Ok(Self {
            catalog,
            embedder,
            index,
            call_timeout: DEFAULT_CALL_TIMEOUT,
            rebuild_lock: Mutex::new(()),
        })
    }

    #[must_use]
    pub fn with_call_timeout(mut self, call_timeout: Duration) -> Self {
        self.call_timeout = call_timeout;
        self
    }

    /// Rebuild the index from a fresh catalog snapshot.
    ///
    /// Concurrent calls are serialised; each one runs to completion before
    /// the next starts.
    pub async fn rebuild(&self) -> Result<RebuildReport, IndexerError> {
        let _guard = self.rebuild_lock.lock().await;

        timeout(self.call_timeout, self.index.ensure_collection())
            .await
            .unwrap_or(Err(IndexError::Timeout))?;

        log::info!("Reading catalog snapshot");
        let items = timeout(self.call_timeout, self.catalog.list_all_items())
            .await
            .map_err(|_| IndexerError::CatalogTimeout)??;

        log::info!(
            "Indexing {} items with {}",
            items.len(),
            self.embedder.name()
        );

        let mut report = RebuildReport {
            total: items.len(),
            ..RebuildReport::default()
        };

        for item in items {
            let id = item.id;
            let name = item.name.clone();
            match self.index_item(item).await {
                Ok(()) => {
                    report.indexed += 1;
                    log::debug!("Indexed item {id} ({name})");
                }
                Err(e) => {
                    log::warn!("Skipping item {id} ({name}): {e}");
                    report.failures.push(ItemFailure {
                        id,
                        name,
                        reason: e.to_string(),
                    });
                }
            }
        }

        log::info!(
            "Indexed {}/{} items ({} failed)",
            report.indexed,
            report.total,
            report.failures.len()
        );
        Ok(report)
    }

    async fn index_item(&self, item: CatalogItem) -> Result<(), ItemError> {
        let text = item.embedding_text();
        let embedding = timeout(self.call_timeout, self.embedder.embed(&text))
            .await
            .unwrap_or(Err(EmbeddingError::Timeout))?;

        timeout(
            self.call_timeout,
            self.index.upsert(IndexedVector::new(item, embedding)),
        )
        .await
        .unwrap_or(Err(IndexError::Timeout))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::InMemoryVectorIndex;
    use async_trait::async_trait;
    use trailhead_core::model::{NewCatalogItem, Price};

    struct StaticCatalog(Vec<CatalogItem>);

    #[async_trait]
    impl CatalogSource for StaticCatalog {
        async fn list_all_items(&self) -> trailhead_core::Result<Vec<CatalogItem>> {
            Ok(self.0.clone())
        }
    }

    struct BrokenCatalog;

    #[async_trait]
    impl CatalogSource for BrokenCatalog {
        async fn list_all_items(&self) -> trailhead_core::Result<Vec<CatalogItem>> {
            Err(trailhead_core::Error::InvalidData("disk on fire".to_string()))
        }
    }

    /// Embeds text as a letter histogram; fails for names in `poisoned`.
    struct HistogramEmbedder {
        poisoned: Vec<&'static str>,
    }

    #[async_trait]
    impl EmbeddingPort for HistogramEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
            if self.poisoned.iter().any(|p| text.starts_with(p)) {
                return Err(EmbeddingError::Http {
                    provider: "histogram".to_string(),
                    message: "model unavailable".to_string(),
                });
            }
            let mut v = vec![0.0_f32; 26];
            for b in text.bytes().filter(u8::is_ascii_alphabetic) {
                v[usize::from(b.to_ascii_lowercase() - b'a')] += 1.0;
            }
            Ok(v)
        }

        fn dimension(&self) -> usize {
            26
        }

        fn name(&self) -> &str {
            "histogram"
        }
    }

    fn catalog(n: i64) -> Vec<CatalogItem> {
        (1..=n)
            .map(|i| {
                NewCatalogItem::new(
                    format!("Item{i}"),
                    format!("description of item {i}"),
                    Price::from_cents(i * 100).unwrap(),
                    "",
                )
                .with_id(ItemId::new(i))
            })
            .collect()
    }

    fn indexer(
        items: Vec<CatalogItem>,
        poisoned: Vec<&'static str>,
    ) -> (Indexer, Arc<InMemoryVectorIndex>) {
        let index = Arc::new(InMemoryVectorIndex::new("products", 26));
        let indexer = Indexer::new(
            Arc::new(StaticCatalog(items)),
            Arc::new(HistogramEmbedder { poisoned }),
            Arc::clone(&index) as Arc<dyn VectorIndex>,
        )
        .unwrap();
        (indexer, index)
    }

    #[tokio::test]
    async fn test_rebuild_indexes_every_item() {
        let (indexer, index) = indexer(catalog(3), vec![]);
        let report = indexer.rebuild().await.unwrap();

        assert_eq!(report.total, 3);
        assert_eq!(report.indexed, 3);
        assert!(report.is_complete());
        assert_eq!(
            index.ids().await,
            vec![ItemId::new(1), ItemId::new(2), ItemId::new(3)]
        );
    }

    #[tokio::test]
    async fn test_rebuild_is_idempotent() {
        let (indexer, index) = indexer(catalog(4), vec![]);
        indexer.rebuild().await.unwrap();
        let first = index.records().await;

        indexer.rebuild().await.unwrap();
        let second = index.records().await;

        assert_eq!(first.len(), second.len());
        for (a, b) in first.iter().zip(&second) {
            assert_eq!(a.id(), b.id());
            for (x, y) in a.embedding.iter().zip(&b.embedding) {
                assert!((x - y).abs() < 1e-6);
            }
        }
    }

    #[tokio::test]
    async fn test_per_item_failure_is_isolated() {
        let (indexer, index) = indexer(catalog(10), vec!["Item7 "]);
        let report = indexer.rebuild().await.unwrap();

        assert_eq!(report.indexed, 9);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].id, ItemId::new(7));
        assert!(report.failures[0].reason.contains("model unavailable"));

        let ids = index.ids().await;
        assert_eq!(ids.len(), 9);
        assert!(!ids.contains(&ItemId::new(7)));
        assert!(ids.contains(&ItemId::new(6)));
        assert!(ids.contains(&ItemId::new(8)));
    }

    /// Refuses to store one id; everything else goes to the inner index.
    struct RejectingIndex {
        inner: InMemoryVectorIndex,
        rejected: ItemId,
    }

    #[async_trait]
    impl VectorIndex for RejectingIndex {
        async fn ensure_collection(&self) -> Result<(), IndexError> {
            self.inner.ensure_collection().await
        }

        async fn upsert(&self, record: IndexedVector) -> Result<ItemId, IndexError> {
            if record.id() == self.rejected {
                return Err(IndexError::Snapshot("write refused".to_string()));
            }
            self.inner.upsert(record).await
        }

        async fn search(
            &self,
            query: &[f32],
            top_k: usize,
        ) -> Result<Vec<trailhead_core::ports::SearchHit>, IndexError> {
            self.inner.search(query, top_k).await
        }

        async fn len(&self) -> usize {
            self.inner.len().await
        }

        fn dimension(&self) -> usize {
            self.inner.dimension()
        }
    }

    #[tokio::test]
    async fn test_upsert_failure_is_isolated() {
        let index = Arc::new(RejectingIndex {
            inner: InMemoryVectorIndex::new("products", 26),
            rejected: ItemId::new(4),
        });
        let indexer = Indexer::new(
            Arc::new(StaticCatalog(catalog(6))),
            Arc::new(HistogramEmbedder { poisoned: vec![] }),
            Arc::clone(&index) as Arc<dyn VectorIndex>,
        )
        .unwrap();

        let report = indexer.rebuild().await.unwrap();

        assert_eq!(report.total, 6);
        assert_eq!(report.indexed, 5);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].id, ItemId::new(4));
        assert_eq!(report.failures[0].name, "Item4");
        assert!(report.failures[0].reason.starts_with("upsert failed"));
        assert!(report.failures[0].reason.contains("write refused"));
        assert_eq!(
            index.inner.ids().await,
            vec![
                ItemId::new(1),
                ItemId::new(2),
                ItemId::new(3),
                ItemId::new(5),
                ItemId::new(6)
            ]
        );
    }

    /// Never answers for texts starting with `stalled`.
    struct StallingEmbedder {
        stalled: &'static str,
    }

    #[async_trait]
    impl EmbeddingPort for StallingEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
            if text.starts_with(self.stalled) {
                tokio::time::sleep(Duration::from_secs(3600)).await;
            }
            Ok(vec![1.0; 26])
        }

        fn dimension(&self) -> usize {
            26
        }

        fn name(&self) -> &str {
            "stalling"
        }
    }

    #[tokio::test]
    async fn test_stalled_embedding_hits_call_timeout() {
        let index = Arc::new(InMemoryVectorIndex::new("products", 26));
        let indexer = Indexer::new(
            Arc::new(StaticCatalog(catalog(4))),
            Arc::new(StallingEmbedder { stalled: "Item2 " }),
            Arc::clone(&index) as Arc<dyn VectorIndex>,
        )
        .unwrap()
        .with_call_timeout(Duration::from_millis(50));

        let report = indexer.rebuild().await.unwrap();

        assert_eq!(report.indexed, 3);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].id, ItemId::new(2));
        assert_eq!(
            report.failures[0].reason,
            "embedding failed: embedding call timed out"
        );
        assert_eq!(
            index.ids().await,
            vec![ItemId::new(1), ItemId::new(3), ItemId::new(4)]
        );
    }

    #[tokio::test]
    async fn test_empty_catalog_still_creates_collection() {
        let (indexer, index) = indexer(Vec::new(), vec![]);
        let report = indexer.rebuild().await.unwrap();
        assert_eq!(report, RebuildReport::default());
        assert!(index.search(&[0.0; 26], 1).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_catalog_failure_aborts_batch() {
        let index = Arc::new(InMemoryVectorIndex::new("products", 26));
        let indexer = Indexer::new(
            Arc::new(BrokenCatalog),
            Arc::new(HistogramEmbedder { poisoned: vec![] }),
            index,
        )
        .unwrap();

        let result = indexer.rebuild().await;
        assert!(matches!(result, Err(IndexerError::Catalog(_))));
    }

    #[test]
    fn test_dimension_mismatch_fails_construction() {
        let result = Indexer::new(
            Arc::new(StaticCatalog(Vec::new())),
            Arc::new(HistogramEmbedder { poisoned: vec![] }),
            Arc::new(InMemoryVectorIndex::new("products", 384)),
        );
        assert!(matches!(
            result,
            Err(ConfigurationError::DimensionMismatch {
                index: 384,
                embedder: 26
            })
        ));
    }

    #[tokio::test]
    async fn test_overlapping_rebuilds_serialise() {
        let (indexer, index) = indexer(catalog(5), vec![]);
        let indexer = Arc::new(indexer);
        let a = tokio::spawn({
            let indexer = Arc::clone(&indexer);
            async move { indexer.rebuild().await.unwrap() }
        });
        let b = tokio::spawn({
            let indexer = Arc::clone(&indexer);
            async move { indexer.rebuild().await.unwrap() }
        });

        assert_eq!(a.await.unwrap().indexed, 5);
        assert_eq!(b.await.unwrap().indexed, 5);
        assert_eq!(index.len().await, 5);
    }
}
