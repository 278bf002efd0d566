//! In-memory vector collection.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use trailhead_core::error::IndexError;
use trailhead_core::model::ItemId;
use trailhead_core::ports::{IndexedVector, SearchHit, VectorIndex};

/// A named, fixed-dimension vector collection held in memory.
///
/// Records are keyed by item id. Search is exhaustive cosine similarity,
/// which is plenty for catalogs of a few thousand items.
#[derive(Debug)]
pub struct InMemoryVectorIndex {
    name: String,
    dimension: usize,
    records: RwLock<Option<BTreeMap<ItemId, IndexedVector>>>,
}

impl InMemoryVectorIndex {
    /// Create a handle to a collection. The collection itself is created by
    /// [`VectorIndex::ensure_collection`].
    #[must_use]
    pub fn new(name: impl Into<String>, dimension: usize) -> Self {
        Self {
            name: name.into(),
            dimension,
            records: RwLock::new(None),
        }
    }

    /// Build a collection that already holds `records`.
    pub fn with_records(
        name: impl Into<String>,
        dimension: usize,
        records: impl IntoIterator<Item = IndexedVector>,
    ) -> Result<Self, IndexError> {
        let name = name.into();
        let mut map = BTreeMap::new();
        for record in records {
            check_dimension(&name, dimension, record.embedding.len())?;
            map.insert(record.id(), record);
        }
        Ok(Self {
            name,
            dimension,
            records: RwLock::new(Some(map)),
        })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Copy of every record, in id order.
    pub async fn records(&self) -> Vec<IndexedVector> {
        self.records
            .read()
            .await
            .as_ref()
            .map(|map| map.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Ids currently stored, in ascending order.
    pub async fn ids(&self) -> Vec<ItemId> {
        self.records
            .read()
            .await
            .as_ref()
            .map(|map| map.keys().copied().collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl VectorIndex for InMemoryVectorIndex {
    async fn ensure_collection(&self) -> Result<(), IndexError> {
        let mut guard = self.records.write().await;
        if guard.is_none() {
            log::debug!("Creating vector collection {}", self.name);
            *guard = Some(BTreeMap::new());
        }
        Ok(())
    }

    async fn upsert(&self, record: IndexedVector) -> Result<ItemId, IndexError> {
        check_dimension(&self.name, self.dimension, record.embedding.len())?;

        let mut guard = self.records.write().await;
        let map = guard
            .as_mut()
            .ok_or_else(|| IndexError::CollectionMissing(self.name.clone()))?;
        let id = record.id();
        map.insert(id, record);
        Ok(id)
    }

    async fn search(&self, query: &[f32], top_k: usize) -> Result<Vec<SearchHit>, IndexError> {
        check_dimension(&self.name, self.dimension, query.len())?;
        if top_k == 0 {
            return Ok(Vec::new());
        }

        let guard = self.records.read().await;
        let Some(map) = guard.as_ref() else {
            return Ok(Vec::new());
        };

        let mut hits: Vec<SearchHit> = map
            .values()
            .map(|record| SearchHit {
                item: record.item.clone(),
                score: cosine_similarity(query, &record.embedding),
            })
            .collect();

        // Stable sort: equal scores keep ascending id order.
        hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
        hits.truncate(top_k);
        Ok(hits)
    }

    async fn len(&self) -> usize {
        self.records.read().await.as_ref().map_or(0, BTreeMap::len)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

fn check_dimension(collection: &str, expected: usize, actual: usize) -> Result<(), IndexError> {
    if expected == actual {
        Ok(())
    } else {
        Err(IndexError::DimensionMismatch {
            collection: collection.to_string(),
            expected,
            actual,
        })
    }
}

/// Cosine similarity clamped to `[0, 1]`.
///
/// Zero vectors score 0. Opposed vectors also score 0 rather than going
/// negative, so every score is comparable with a threshold in `(0, 1)`.
#[must_use]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    let mut dot = 0.0_f64;
    let mut norm_a = 0.0_f64;
    let mut norm_b = 0.0_f64;
    for (x, y) in a.iter().zip(b) {
        let (x, y) = (f64::from(*x), f64::from(*y));
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    (dot / (norm_a.sqrt() * norm_b.sqrt())).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use trailhead_core::model::{CatalogItem, NewCatalogItem, Price};

    fn item(id: i64, name: &str) -> CatalogItem {
        NewCatalogItem::new(name, "", Price::ZERO, "").with_id(ItemId::new(id))
    }

    async fn ready_index() -> InMemoryVectorIndex {
        let index = InMemoryVectorIndex::new("products", 2);
        index.ensure_collection().await.unwrap();
        index
    }

    #[test]
    fn test_cosine_similarity() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-9);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-9);
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[-1.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
    }

    #[tokio::test]
    async fn test_ensure_collection_does_not_clear() {
        let index = ready_index().await;
        index
            .upsert(IndexedVector::new(item(1, "tent"), vec![1.0, 0.0]))
            .await
            .unwrap();

        index.ensure_collection().await.unwrap();
        assert_eq!(index.len().await, 1);
    }

    #[tokio::test]
    async fn test_upsert_requires_collection() {
        let index = InMemoryVectorIndex::new("products", 2);
        let result = index
            .upsert(IndexedVector::new(item(1, "tent"), vec![1.0, 0.0]))
            .await;
        assert!(matches!(result, Err(IndexError::CollectionMissing(_))));
    }

    #[tokio::test]
    async fn test_upsert_overwrites_by_key() {
        let index = ready_index().await;
        index
            .upsert(IndexedVector::new(item(1, "old"), vec![1.0, 0.0]))
            .await
            .unwrap();
        index
            .upsert(IndexedVector::new(item(1, "new"), vec![0.0, 1.0]))
            .await
            .unwrap();

        let records = index.records().await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].item.name, "new");
        assert_eq!(records[0].embedding, vec![0.0, 1.0]);
    }

    #[tokio::test]
    async fn test_dimension_mismatch_rejected() {
        let index = ready_index().await;
        let result = index
            .upsert(IndexedVector::new(item(1, "tent"), vec![1.0, 0.0, 0.0]))
            .await;
        assert!(matches!(
            result,
            Err(IndexError::DimensionMismatch {
                expected: 2,
                actual: 3,
                ..
            })
        ));

        assert!(index.search(&[1.0], 1).await.is_err());
    }

    #[tokio::test]
    async fn test_search_orders_by_score() {
        let index = ready_index().await;
        index
            .upsert(IndexedVector::new(item(1, "stove"), vec![0.0, 1.0]))
            .await
            .unwrap();
        index
            .upsert(IndexedVector::new(item(2, "tent"), vec![1.0, 0.1]))
            .await
            .unwrap();

        let hits = index.search(&[1.0, 0.0], 2).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].item.name, "tent");
        assert!(hits[0].score > hits[1].score);

        let top = index.search(&[1.0, 0.0], 1).await.unwrap();
        assert_eq!(top.len(), 1);
    }

    #[tokio::test]
    async fn test_equal_scores_keep_id_order() {
        let index = ready_index().await;
        index
            .upsert(IndexedVector::new(item(5, "b"), vec![1.0, 0.0]))
            .await
            .unwrap();
        index
            .upsert(IndexedVector::new(item(3, "a"), vec![1.0, 0.0]))
            .await
            .unwrap();

        let hits = index.search(&[1.0, 0.0], 1).await.unwrap();
        assert_eq!(hits[0].item.id, ItemId::new(3));
    }

    #[tokio::test]
    async fn test_search_empty_collection() {
        let index = ready_index().await;
        assert!(index.is_empty().await);
        assert!(index.search(&[1.0, 0.0], 1).await.unwrap().is_empty());

        let missing = InMemoryVectorIndex::new("products", 2);
        assert!(missing.search(&[1.0, 0.0], 1).await.unwrap().is_empty());
    }

    #[test]
    fn test_with_records_validates_dimension() {
        let bad = InMemoryVectorIndex::with_records(
            "products",
            2,
            vec![IndexedVector::new(item(1, "tent"), vec![1.0])],
        );
        assert!(bad.is_err());
    }
}
