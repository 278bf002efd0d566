//! Ollama adapters.
//!
//! Talks to a local Ollama daemon: `/api/embed` for embeddings and
//! `/api/chat` (non-streaming) for grounded replies.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use trailhead_core::error::{ConfigurationError, EmbeddingError, GenerationError};
use trailhead_core::ports::{ChatMessage, EmbeddingPort, GenerationPort};

use crate::config::{EmbeddingSettings, GenerationSettings};
use crate::http::{build_client, post_json};

const PROVIDER: &str = "ollama";

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    #[serde(default)]
    embeddings: Vec<Vec<f32>>,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    message: Option<ChatReply>,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    #[serde(default)]
    content: String,
}

/// Embeds text with an Ollama embedding model such as `all-minilm`.
#[derive(Debug, Clone)]
pub struct OllamaEmbedder {
    http: Client,
    url: String,
    model: String,
    dimension: usize,
    label: String,
}

impl OllamaEmbedder {
    /// # Errors
    /// Fails only if the HTTP client cannot be built.
    pub fn new(settings: &EmbeddingSettings, timeout: Duration) -> Result<Self, ConfigurationError> {
        Ok(Self {
            http: build_client(timeout)?,
            url: format!("{}/api/embed", settings.base_url),
            model: settings.model.clone(),
            dimension: settings.dimension,
            label: format!("{PROVIDER}/{}", settings.model),
        })
    }
}

#[async_trait]
impl EmbeddingPort for OllamaEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let request = EmbedRequest {
            model: &self.model,
            input: text,
        };
        let response: EmbedResponse = post_json(&self.http, &self.url, None, &request)
            .await
            .map_err(|e| e.into_embedding(PROVIDER))?;

        let vector = response
            .embeddings
            .into_iter()
            .next()
            .filter(|v| !v.is_empty())
            .ok_or_else(|| EmbeddingError::Empty {
                provider: PROVIDER.to_string(),
            })?;

        if vector.len() != self.dimension {
            return Err(EmbeddingError::DimensionMismatch {
                expected: self.dimension,
                actual: vector.len(),
            });
        }
        Ok(vector)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn name(&self) -> &str {
        &self.label
    }
}

/// Generates replies with an Ollama chat model such as `llama3.2`.
#[derive(Debug, Clone)]
pub struct OllamaChat {
    http: Client,
    url: String,
    model: String,
    label: String,
}

impl OllamaChat {
    /// # Errors
    /// Fails only if the HTTP client cannot be built.
    pub fn new(
        settings: &GenerationSettings,
        timeout: Duration,
    ) -> Result<Self, ConfigurationError> {
        Ok(Self {
            http: build_client(timeout)?,
            url: format!("{}/api/chat", settings.base_url),
            model: settings.model.clone(),
            label: format!("{PROVIDER}/{}", settings.model),
        })
    }
}

#[async_trait]
impl GenerationPort for OllamaChat {
    async fn generate(&self, messages: &[ChatMessage]) -> Result<String, GenerationError> {
        let request = ChatRequest {
            model: &self.model,
            messages,
            stream: false,
        };
        let response: ChatResponse = post_json(&self.http, &self.url, None, &request)
            .await
            .map_err(|e| e.into_generation(PROVIDER))?;

        response
            .message
            .map(|m| m.content.trim().to_string())
            .filter(|c| !c.is_empty())
            .ok_or_else(|| GenerationError::Empty {
                provider: PROVIDER.to_string(),
            })
    }

    fn name(&self) -> &str {
        &self.label
    }
}
