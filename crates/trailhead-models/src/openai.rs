//! OpenAI-compatible adapters.
//!
//! Works against api.openai.com and any gateway exposing the same
//! `/embeddings` and `/chat/completions` endpoints with bearer auth.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use trailhead_core::error::{ConfigurationError, EmbeddingError, GenerationError};
use trailhead_core::ports::{ChatMessage, EmbeddingPort, GenerationPort};

use crate::config::{EmbeddingSettings, GenerationSettings};
use crate::http::{build_client, post_json};

const PROVIDER: &str = "openai";

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    #[serde(default)]
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

// ---------------------------------------------------------------------------
// Adapters
// ---------------------------------------------------------------------------

/// Embeds text with a hosted model such as `text-embedding-ada-002`.
#[derive(Clone)]
pub struct OpenAiEmbedder {
    http: Client,
    url: String,
    api_key: Option<String>,
    model: String,
    dimension: usize,
    label: String,
}

impl std::fmt::Debug for OpenAiEmbedder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiEmbedder")
            .field("url", &self.url)
            .field("model", &self.model)
            .field("dimension", &self.dimension)
            .finish_non_exhaustive()
    }
}

impl OpenAiEmbedder {
    /// # Errors
    /// Fails only if the HTTP client cannot be built.
    pub fn new(settings: &EmbeddingSettings, timeout: Duration) -> Result<Self, ConfigurationError> {
        Ok(Self {
            http: build_client(timeout)?,
            url: format!("{}/embeddings", settings.base_url),
            api_key: settings.api_key.clone(),
            model: settings.model.clone(),
            dimension: settings.dimension,
            label: format!("{PROVIDER}/{}", settings.model),
        })
    }
}

#[async_trait]
impl EmbeddingPort for OpenAiEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let request = EmbeddingRequest {
            model: &self.model,
            input: text,
        };
        let response: EmbeddingResponse =
            post_json(&self.http, &self.url, self.api_key.as_deref(), &request)
                .await
                .map_err(|e| e.into_embedding(PROVIDER))?;

        let vector = response
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
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

/// Generates replies with a hosted chat model such as `gpt-4o-mini`.
#[derive(Clone)]
pub struct OpenAiChat {
    http: Client,
    url: String,
    api_key: Option<String>,
    model: String,
    label: String,
}

impl std::fmt::Debug for OpenAiChat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiChat")
            .field("url", &self.url)
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

impl OpenAiChat {
    /// # Errors
    /// Fails only if the HTTP client cannot be built.
    pub fn new(
        settings: &GenerationSettings,
        timeout: Duration,
    ) -> Result<Self, ConfigurationError> {
        Ok(Self {
            http: build_client(timeout)?,
            url: format!("{}/chat/completions", settings.base_url),
            api_key: settings.api_key.clone(),
            model: settings.model.clone(),
            label: format!("{PROVIDER}/{}", settings.model),
        })
    }
}

#[async_trait]
impl GenerationPort for OpenAiChat {
    async fn generate(&self, messages: &[ChatMessage]) -> Result<String, GenerationError> {
        let request = CompletionRequest {
            model: &self.model,
            messages,
        };
        let response: CompletionResponse =
            post_json(&self.http, &self.url, self.api_key.as_deref(), &request)
                .await
                .map_err(|e| e.into_generation(PROVIDER))?;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .ok_or_else(|| GenerationError::Empty {
                provider: PROVIDER.to_string(),
            })
    }

    fn name(&self) -> &str {
        &self.label
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::Provider;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn embedding_settings(base_url: String) -> EmbeddingSettings {
        EmbeddingSettings {
            provider: Provider::OpenAi,
            base_url,
            model: "text-embedding-ada-002".to_string(),
            dimension: 4,
            api_key: Some("sk-test".to_string()),
            requests_per_second: None,
        }
    }

    fn generation_settings(base_url: String) -> GenerationSettings {
        GenerationSettings {
            provider: Provider::OpenAi,
            base_url,
            model: "gpt-4o-mini".to_string(),
            api_key: Some("sk-test".to_string()),
        }
    }

    #[tokio::test]
    async fn test_embedding_sends_bearer_key() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/embeddings"))
            .and(header("authorization", "Bearer sk-test"))
            .and(body_partial_json(json!({"model": "text-embedding-ada-002"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "object": "list",
                "data": [{"object": "embedding", "index": 0, "embedding": [0.5, 0.5, 0.5, 0.5]}],
                "usage": {"prompt_tokens": 3, "total_tokens": 3}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let embedder =
            OpenAiEmbedder::new(&embedding_settings(server.uri()), Duration::from_secs(5)).unwrap();
        let v = embedder.embed("rain jacket").await.unwrap();
        assert_eq!(v.len(), 4);
        assert_eq!(embedder.dimension(), 4);
    }

    #[tokio::test]
    async fn test_embedding_rate_limited_is_transient() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/embeddings"))
            .respond_with(ResponseTemplate::new(429).set_body_string("slow down"))
            .mount(&server)
            .await;

        let embedder =
            OpenAiEmbedder::new(&embedding_settings(server.uri()), Duration::from_secs(5)).unwrap();
        let err = embedder.embed("rain jacket").await.unwrap_err();
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn test_embedding_malformed_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/embeddings"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let embedder =
            OpenAiEmbedder::new(&embedding_settings(server.uri()), Duration::from_secs(5)).unwrap();
        assert!(matches!(
            embedder.embed("rain jacket").await,
            Err(EmbeddingError::Parse { .. })
        ));
    }

    #[tokio::test]
    async fn test_completion_returns_first_choice() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "chatcmpl-1",
                "choices": [{
                    "index": 0,
                    "message": {"role": "assistant", "content": "The Alpine Rain Jacket is waterproof."},
                    "finish_reason": "stop"
                }]
            })))
            .mount(&server)
            .await;

        let chat =
            OpenAiChat::new(&generation_settings(server.uri()), Duration::from_secs(5)).unwrap();
        let reply = chat
            .generate(&[ChatMessage::user("waterproof jacket?")])
            .await
            .unwrap();
        assert_eq!(reply, "The Alpine Rain Jacket is waterproof.");
    }

    #[tokio::test]
    async fn test_completion_without_choices_is_empty() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
            .mount(&server)
            .await;

        let chat =
            OpenAiChat::new(&generation_settings(server.uri()), Duration::from_secs(5)).unwrap();
        assert!(matches!(
            chat.generate(&[ChatMessage::user("hi")]).await,
            Err(GenerationError::Empty { .. })
        ));
    }

    #[tokio::test]
    async fn test_unauthorized_is_permanent() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(401).set_body_string("invalid api key"))
            .mount(&server)
            .await;

        let chat =
            OpenAiChat::new(&generation_settings(server.uri()), Duration::from_secs(5)).unwrap();
        let err = chat.generate(&[ChatMessage::user("hi")]).await.unwrap_err();
        assert!(!err.is_transient());
        assert!(err.to_string().contains("invalid api key"));
    }
}
