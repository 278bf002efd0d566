//! Request-time query resolution.
//!
//! A query moves through four strictly ordered stages: embed the text,
//! search the index for the single nearest item, apply the threshold, and
//! ask the generative model for a reply grounded in the outcome. Any port
//! failure or an expired deadline ends the query with a degraded response;
//! [`QueryResolver::resolve`] never returns an error.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{timeout_at, Instant};
use trailhead_core::error::{
    ConfigurationError, EmbeddingError, GenerationError, IndexError,
};
use trailhead_core::ports::{ChatMessage, EmbeddingPort, GenerationPort, SearchHit, VectorIndex};

use crate::prompt::{build_messages, SystemPrompt};
use crate::response::{Resolution, SearchResponse, Stage};
use crate::threshold::ScoreThreshold;

/// Default upper bound on the whole of one query.
pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(60);

/// Configuration injected into a [`QueryResolver`] at construction.
#[derive(Debug, Clone)]
pub struct ResolverSettings {
    pub threshold: ScoreThreshold,
    pub system_prompt: SystemPrompt,
    /// Deadline budget shared by every port call of a single query.
    pub query_timeout: Duration,
}

impl ResolverSettings {
    #[must_use]
    pub fn new(threshold: ScoreThreshold) -> Self {
        Self {
            threshold,
            system_prompt: SystemPrompt::default(),
            query_timeout: DEFAULT_QUERY_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_system_prompt(mut self, system_prompt: SystemPrompt) -> Self {
        self.system_prompt = system_prompt;
        self
    }

    #[must_use]
    pub fn with_query_timeout(mut self, query_timeout: Duration) -> Self {
        self.query_timeout = query_timeout;
        self
    }
}

/// Answers natural-language queries against the vector index.
///
/// Holds no per-query state, so one resolver can serve any number of
/// concurrent queries as long as the ports it wraps are shareable.
pub struct QueryResolver {
    embedder: Arc<dyn EmbeddingPort>,
    index: Arc<dyn VectorIndex>,
    generator: Arc<dyn GenerationPort>,
    settings: ResolverSettings,
}

impl std::fmt::Debug for QueryResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryResolver")
            .field("embedder", &self.embedder.name())
            .field("generator", &self.generator.name())
            .field("dimension", &self.index.dimension())
            .field("settings", &self.settings)
            .finish()
    }
}

impl QueryResolver {
    /// Wire a resolver from its ports.
    ///
    /// # Errors
    /// Returns [`ConfigurationError::DimensionMismatch`] when the embedder
    /// and the index disagree on vector length, and
    /// [`ConfigurationError::Invalid`] for a zero query timeout.
    pub fn new(
        embedder: Arc<dyn EmbeddingPort>,
        index: Arc<dyn VectorIndex>,
        generator: Arc<dyn GenerationPort>,
        settings: ResolverSettings,
    ) -> Result<Self, ConfigurationError> {
        if embedder.dimension() != index.dimension() {
            return Err(ConfigurationError::DimensionMismatch {
                index: index.dimension(),
                embedder: embedder.dimension(),
            });
        }
        if settings.query_timeout.is_zero() {
            return Err(ConfigurationError::Invalid(
                "query timeout must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            embedder,
            index,
            generator,
            settings,
        })
    }

    #[must_use]
    pub fn settings(&self) -> &ResolverSettings {
        &self.settings
    }

    /// Resolve a query into the flat response shape.
    pub async fn resolve(&self, query: &str) -> SearchResponse {
        self.resolve_outcome(query).await.into_response()
    }

    /// Resolve a query, keeping the matched/unmatched/failed distinction.
    pub async fn resolve_outcome(&self, query: &str) -> Resolution {
        let deadline = Instant::now() + self.settings.query_timeout;
        log::info!("Resolving query: {query}");

        let embedding = match self.embed(query, deadline).await {
            Ok(embedding) => embedding,
            Err(e) => return fail(Stage::Embedding, &e),
        };

        let nearest = match self.nearest(&embedding, deadline).await {
            Ok(nearest) => nearest,
            Err(e) => return fail(Stage::Searching, &e),
        };

        let matched = nearest.filter(|hit| {
            let accepted = self.settings.threshold.accepts(hit.score);
            log::info!(
                "Nearest item {} ({}) scored {:.3} against threshold {}: {}",
                hit.item.id,
                hit.item.name,
                hit.score,
                self.settings.threshold,
                if accepted { "match" } else { "no match" }
            );
            accepted
        });

        let messages = build_messages(
            &self.settings.system_prompt,
            query,
            matched.as_ref().map(|hit| &hit.item),
        );

        let response = match self.generate(&messages, deadline).await {
            Ok(text) => text,
            Err(e) => return fail(Stage::Generating, &e),
        };

        match matched {
            Some(SearchHit { item, score }) => Resolution::Matched {
                item,
                score,
                response,
            },
            None => Resolution::Unmatched { response },
        }
    }

    async fn embed(&self, query: &str, deadline: Instant) -> Result<Vec<f32>, EmbeddingError> {
        timeout_at(deadline, self.embedder.embed(query))
            .await
            .unwrap_or(Err(EmbeddingError::Timeout))
    }

    async fn nearest(
        &self,
        embedding: &[f32],
        deadline: Instant,
    ) -> Result<Option<SearchHit>, IndexError> {
        let hits = timeout_at(deadline, self.index.search(embedding, 1))
            .await
            .unwrap_or(Err(IndexError::Timeout))?;
        Ok(hits.into_iter().next())
    }

    async fn generate(
        &self,
        messages: &[ChatMessage],
        deadline: Instant,
    ) -> Result<String, GenerationError> {
        log::debug!(
            "Generation request: {}",
            serde_json::to_string(messages).unwrap_or_default()
        );
        timeout_at(deadline, self.generator.generate(messages))
            .await
            .unwrap_or(Err(GenerationError::Timeout))
    }
}

fn fail(stage: Stage, error: &dyn std::error::Error) -> Resolution {
    log::error!("Query failed while {stage}: {error}");
    Resolution::Failed {
        stage,
        reason: error.to_string(),
    }
}
