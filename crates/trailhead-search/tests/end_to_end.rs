//! End-to-end tests: SQLite catalog → indexer → in-memory index → resolver.
//!
//! The embedding and generation ports are replaced by deterministic fakes
//! so similarity scores are known in advance.

use std::sync::Arc;

use async_trait::async_trait;
use tempfile::TempDir;
use trailhead_core::error::{EmbeddingError, GenerationError};
use trailhead_core::model::{ItemId, NewCatalogItem, Price};
use trailhead_core::ports::{ChatMessage, EmbeddingPort, GenerationPort, VectorIndex};
use trailhead_core::schema::Database;
use trailhead_core::SqliteCatalog;
use trailhead_search::{
    InMemoryVectorIndex, Indexer, QueryResolver, Resolution, ResolverSettings, ScoreThreshold,
};

/// Places texts on the unit circle so cosine similarity equals a chosen value.
struct UnitCircleEmbedder;

fn at_similarity(score: f32) -> Vec<f32> {
    vec![score, (1.0 - score * score).sqrt()]
}

#[async_trait]
impl EmbeddingPort for UnitCircleEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        if text.starts_with("Trail Tent") {
            Ok(vec![1.0, 0.0])
        } else if text == "tent for two people" {
            Ok(at_similarity(0.91))
        } else if text == "kitchen blender" {
            Ok(at_similarity(0.22))
        } else {
            Err(EmbeddingError::Parse {
                provider: "unit-circle".to_string(),
                message: format!("no vector for {text:?}"),
            })
        }
    }

    fn dimension(&self) -> usize {
        2
    }

    fn name(&self) -> &str {
        "unit-circle"
    }
}

/// Replies with the user instruction it was given.
struct EchoGenerator;

#[async_trait]
impl GenerationPort for EchoGenerator {
    async fn generate(&self, messages: &[ChatMessage]) -> Result<String, GenerationError> {
        messages
            .last()
            .map(|m| m.content.clone())
            .ok_or_else(|| GenerationError::Empty {
                provider: "echo".to_string(),
            })
    }

    fn name(&self) -> &str {
        "echo"
    }
}

struct Fixture {
    _dir: TempDir,
    resolver: QueryResolver,
    index: Arc<InMemoryVectorIndex>,
    indexer: Indexer,
}

async fn fixture() -> Fixture {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("catalog.db");
    let db = Database::open(&db_path).unwrap();
    let id = db
        .insert_item(&NewCatalogItem::new(
            "Trail Tent",
            "2-person lightweight tent",
            Price::from_decimal(129.99).unwrap(),
            "images/tent.png",
        ))
        .unwrap();
    assert_eq!(id, ItemId::new(1));

    let embedder: Arc<dyn EmbeddingPort> = Arc::new(UnitCircleEmbedder);
    let index = Arc::new(InMemoryVectorIndex::new("products", 2));
    let indexer = Indexer::new(
        Arc::new(SqliteCatalog::new(&db_path)),
        Arc::clone(&embedder),
        Arc::clone(&index) as Arc<dyn VectorIndex>,
    )
    .unwrap();
    let report = indexer.rebuild().await.unwrap();
    assert_eq!(report.indexed, 1);

    let resolver = QueryResolver::new(
        embedder,
        Arc::clone(&index) as Arc<dyn VectorIndex>,
        Arc::new(EchoGenerator),
        ResolverSettings::new(ScoreThreshold::new(0.8).unwrap()),
    )
    .unwrap();

    Fixture {
        _dir: dir,
        resolver,
        index,
        indexer,
    }
}

#[tokio::test]
async fn test_matching_query_returns_the_tent() {
    let fx = fixture().await;

    let outcome = fx.resolver.resolve_outcome("tent for two people").await;
    match &outcome {
        Resolution::Matched { score, .. } => assert!((score - 0.91).abs() < 1e-4),
        other => panic!("expected a match, got {other:?}"),
    }

    let response = outcome.into_response();
    assert_eq!(response.items.len(), 1);
    assert_eq!(response.items[0].id, ItemId::new(1));
    assert!(response.response.contains("Trail Tent"));
    assert!(response.response.contains("129.99"));
}

#[tokio::test]
async fn test_unrelated_query_reports_no_match() {
    let fx = fixture().await;

    let response = fx.resolver.resolve("kitchen blender").await;
    assert_eq!(response.items.len(), 1);
    assert!(response.items[0].is_placeholder());
    assert!(response.response.contains("No product in the catalog matched"));
    assert!(!response.response.contains("Trail Tent"));
}

#[tokio::test]
async fn test_embedding_failure_returns_degraded_response() {
    let fx = fixture().await;

    let response = fx.resolver.resolve("something unembeddable").await;
    assert!(response.items.is_empty());
    assert!(response.response.contains("An error occurred"));
}

#[tokio::test]
async fn test_repeated_rebuild_converges() {
    let fx = fixture().await;
    let before = fx.index.records().await;

    let report = fx.indexer.rebuild().await.unwrap();
    assert!(report.is_complete());
    assert_eq!(fx.index.records().await, before);
}

#[tokio::test]
async fn test_response_serializes_to_flat_shape() {
    let fx = fixture().await;

    let response = fx.resolver.resolve("tent for two people").await;
    let json = serde_json::to_value(&response).unwrap();
    assert_eq!(json["items"][0]["name"], "Trail Tent");
    assert_eq!(json["items"][0]["price"], 129.99);
    assert!(json["response"].is_string());
}
