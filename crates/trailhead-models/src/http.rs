//! Shared JSON-over-HTTP plumbing for the model adapters.

use std::time::Duration;

use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use trailhead_core::error::{ConfigurationError, EmbeddingError, GenerationError};

const USER_AGENT: &str = concat!(
    "trailhead/",
    env!("CARGO_PKG_VERSION"),
    " (https://github.com/trailhead-search/trailhead)"
);

/// Longest error body kept for diagnostics.
const MAX_BODY: usize = 512;

pub(crate) fn build_client(timeout: Duration) -> Result<Client, ConfigurationError> {
    Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .build()
        .map_err(|e| ConfigurationError::Invalid(format!("cannot build HTTP client: {e}")))
}

/// Transport-level outcome, mapped into each port's error type by the caller.
#[derive(Debug)]
pub(crate) enum HttpFailure {
    Transport(String),
    Timeout,
    Status { status: u16, body: String },
    Parse(String),
}

pub(crate) async fn post_json<Req, Resp>(
    client: &Client,
    url: &str,
    api_key: Option<&str>,
    body: &Req,
) -> Result<Resp, HttpFailure>
where
    Req: Serialize + ?Sized,
    Resp: DeserializeOwned,
{
    let mut request = client.post(url).json(body);
    if let Some(key) = api_key {
        request = request.bearer_auth(key);
    }

    let response = request.send().await.map_err(transport)?;

    let status = response.status();
    if !status.is_success() {
        let mut body = response.text().await.unwrap_or_default();
        if body.len() > MAX_BODY {
            let mut cut = MAX_BODY;
            while !body.is_char_boundary(cut) {
                cut -= 1;
            }
            body.truncate(cut);
        }
        return Err(HttpFailure::Status {
            status: status.as_u16(),
            body,
        });
    }

    let bytes = response.bytes().await.map_err(transport)?;
    serde_json::from_slice(&bytes).map_err(|e| HttpFailure::Parse(e.to_string()))
}

fn transport(e: reqwest::Error) -> HttpFailure {
    if e.is_timeout() {
        HttpFailure::Timeout
    } else {
        HttpFailure::Transport(e.to_string())
    }
}

impl HttpFailure {
    pub(crate) fn into_embedding(self, provider: &str) -> EmbeddingError {
        match self {
            Self::Transport(message) => EmbeddingError::Http {
                provider: provider.to_string(),
                message,
            },
            Self::Timeout => EmbeddingError::Timeout,
            Self::Status { status, body } => EmbeddingError::Status {
                provider: provider.to_string(),
                status,
                body,
            },
            Self::Parse(message) => EmbeddingError::Parse {
                provider: provider.to_string(),
                message,
            },
        }
    }

    pub(crate) fn into_generation(self, provider: &str) -> GenerationError {
        match self {
            Self::Transport(message) => GenerationError::Http {
                provider: provider.to_string(),
                message,
            },
            Self::Timeout => GenerationError::Timeout,
            Self::Status { status, body } => GenerationError::Status {
                provider: provider.to_string(),
                status,
                body,
            },
            Self::Parse(message) => GenerationError::Parse {
                provider: provider.to_string(),
                message,
            },
        }
    }
}
