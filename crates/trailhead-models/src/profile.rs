//! Deployment profiles.
//!
//! A profile picks the model runtime and the defaults that go with it.
//! Different embedding models concentrate similarity scores differently, so
//! each profile also carries its own default score threshold.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Which model runtime a deployment talks to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Profile {
    /// Locally hosted Ollama with small models.
    #[default]
    Local,
    /// Hosted OpenAI-compatible endpoint with production-grade models.
    Hosted,
}

/// Wire protocol spoken by a model endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Ollama,
    OpenAi,
}

impl Profile {
    #[must_use]
    pub const fn provider(self) -> Provider {
        match self {
            Self::Local => Provider::Ollama,
            Self::Hosted => Provider::OpenAi,
        }
    }

    #[must_use]
    pub const fn default_threshold(self) -> f64 {
        match self {
            Self::Local => 0.4,
            Self::Hosted => 0.8,
        }
    }

    #[must_use]
    pub const fn default_base_url(self) -> &'static str {
        match self {
            Self::Local => "http://localhost:11434",
            Self::Hosted => "https://api.openai.com/v1",
        }
    }

    #[must_use]
    pub const fn default_embedding_model(self) -> &'static str {
        match self {
            Self::Local => "all-minilm",
            Self::Hosted => "text-embedding-ada-002",
        }
    }

    #[must_use]
    pub const fn default_embedding_dimension(self) -> usize {
        match self {
            Self::Local => 384,
            Self::Hosted => 1536,
        }
    }

    #[must_use]
    pub const fn default_chat_model(self) -> &'static str {
        match self {
            Self::Local => "llama3.2",
            Self::Hosted => "gpt-4o-mini",
        }
    }

    /// Whether the endpoints require an API key.
    #[must_use]
    pub const fn requires_api_key(self) -> bool {
        matches!(self, Self::Hosted)
    }
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local => f.write_str("local"),
            Self::Hosted => f.write_str("hosted"),
        }
    }
}

impl FromStr for Profile {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "local" | "development" | "dev" => Ok(Self::Local),
            "hosted" | "production" | "prod" => Ok(Self::Hosted),
            other => Err(format!("unknown profile '{other}' (expected 'local' or 'hosted')")),
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ollama => f.write_str("ollama"),
            Self::OpenAi => f.write_str("openai"),
        }
    }
}
