//! Builds the model ports for a resolved profile.

use std::sync::Arc;

use trailhead_core::error::ConfigurationError;
use trailhead_core::ports::{EmbeddingPort, GenerationPort};

use crate::config::Settings;
use crate::ollama::{OllamaChat, OllamaEmbedder};
use crate::openai::{OpenAiChat, OpenAiEmbedder};
use crate::profile::Provider;
use crate::resilience::{RateLimiter, Resilient};

/// The two model-backed ports every deployment needs.
#[derive(Clone)]
pub struct Ports {
    pub embedder: Arc<dyn EmbeddingPort>,
    pub generator: Arc<dyn GenerationPort>,
}

impl std::fmt::Debug for Ports {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ports")
            .field("embedder", &self.embedder.name())
            .field("generator", &self.generator.name())
            .finish()
    }
}

/// Construct retrying adapters for the profile's provider.
///
/// # Errors
/// Returns a [`ConfigurationError`] if an HTTP client cannot be built.
pub fn build_ports(settings: &Settings) -> Result<Ports, ConfigurationError> {
    let timeout = settings.call_timeout;
    let limiter = settings.embedding.requests_per_second.map(RateLimiter::new);

    let embedder: Arc<dyn EmbeddingPort> = match settings.embedding.provider {
        Provider::Ollama => Arc::new(paced(
            Resilient::new(OllamaEmbedder::new(&settings.embedding, timeout)?, settings.retry),
            limiter,
        )),
        Provider::OpenAi => Arc::new(paced(
            Resilient::new(OpenAiEmbedder::new(&settings.embedding, timeout)?, settings.retry),
            limiter,
        )),
    };

    let generator: Arc<dyn GenerationPort> = match settings.generation.provider {
        Provider::Ollama => Arc::new(Resilient::new(
            OllamaChat::new(&settings.generation, timeout)?,
            settings.retry,
        )),
        Provider::OpenAi => Arc::new(Resilient::new(
            OpenAiChat::new(&settings.generation, timeout)?,
            settings.retry,
        )),
    };

    log::debug!(
        "Model ports ready: embedder={} generator={}",
        embedder.name(),
        generator.name()
    );
    Ok(Ports {
        embedder,
        generator,
    })
}

fn paced<P>(port: Resilient<P>, limiter: Option<RateLimiter>) -> Resilient<P> {
    match limiter {
        Some(limiter) => port.with_rate_limit(limiter),
        None => port,
    }
}
