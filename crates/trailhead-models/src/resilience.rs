//! Retry and pacing for model endpoints.
//!
//! [`Resilient`] wraps any embedding or generation port, retrying transient
//! failures (transport errors, 429, 5xx) with exponential backoff and
//! optionally pacing calls through a [`RateLimiter`].

use std::sync::Arc;

use async_trait::async_trait;
use backon::{ExponentialBuilder, Retryable};
use tokio::sync::Semaphore;
use tokio::time::{sleep, Duration};
use trailhead_core::error::{EmbeddingError, GenerationError};
use trailhead_core::ports::{ChatMessage, EmbeddingPort, GenerationPort};

/// Rate limiter using a token-bucket approach.
///
/// Limits throughput to a configurable number of requests per second by
/// combining a single-permit [`Semaphore`] with a fixed sleep interval.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    semaphore: Arc<Semaphore>,
    interval: Duration,
}

impl RateLimiter {
    /// Creates a new `RateLimiter` that allows at most
    /// `requests_per_second` requests per second. Zero is treated as one.
    pub fn new(requests_per_second: u32) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(1)),
            interval: Duration::from_millis(1000 / u64::from(requests_per_second.max(1))),
        }
    }

    #[must_use]
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Waits until a request slot is available, then holds the slot for
    /// the configured interval to enforce the rate limit.
    pub async fn acquire(&self) {
        // The semaphore is never closed.
        let Ok(_permit) = self.semaphore.acquire().await else {
            return;
        };
        sleep(self.interval).await;
    }
}

/// Backoff settings for transient failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt. Zero disables retrying.
    pub max_retries: usize,
    pub min_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            min_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries.
    #[must_use]
    pub const fn none() -> Self {
        Self {
            max_retries: 0,
            min_delay: Duration::from_millis(0),
            max_delay: Duration::from_millis(0),
        }
    }

    fn backoff(&self) -> ExponentialBuilder {
        ExponentialBuilder::default()
            .with_min_delay(self.min_delay)
            .with_max_delay(self.max_delay)
            .with_max_times(self.max_retries)
            .with_jitter()
    }
}

/// A port wrapped with retry and optional rate limiting.
///
/// The enclosing deadline (indexer call timeout or query budget) still
/// bounds the whole retry loop, since it is applied around this wrapper.
#[derive(Debug)]
pub struct Resilient<P> {
    inner: P,
    retry: RetryPolicy,
    limiter: Option<RateLimiter>,
}

impl<P> Resilient<P> {
    pub fn new(inner: P, retry: RetryPolicy) -> Self {
        Self {
            inner,
            retry,
            limiter: None,
        }
    }

    #[must_use]
    pub fn with_rate_limit(mut self, limiter: RateLimiter) -> Self {
        self.limiter = Some(limiter);
        self
    }

    pub fn inner(&self) -> &P {
        &self.inner
    }

    async fn pace(&self) {
        if let Some(limiter) = &self.limiter {
            limiter.acquire().await;
        }
    }
}

#[async_trait]
impl<P: EmbeddingPort> EmbeddingPort for Resilient<P> {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        (|| async {
            self.pace().await;
            self.inner.embed(text).await
        })
        .retry(self.retry.backoff())
        .sleep(sleep)
        .when(EmbeddingError::is_transient)
        .notify(|err: &EmbeddingError, dur: Duration| {
            log::warn!(
                "{} embedding failed, retrying in {:?}: {}",
                self.inner.name(),
                dur,
                err
            );
        })
        .await
    }

    fn dimension(&self) -> usize {
        self.inner.dimension()
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}

#[async_trait]
impl<P: GenerationPort> GenerationPort for Resilient<P> {
    async fn generate(&self, messages: &[ChatMessage]) -> Result<String, GenerationError> {
        (|| async {
            self.pace().await;
            self.inner.generate(messages).await
        })
        .retry(self.retry.backoff())
        .sleep(sleep)
        .when(GenerationError::is_transient)
        .notify(|err: &GenerationError, dur: Duration| {
            log::warn!(
                "{} generation failed, retrying in {:?}: {}",
                self.inner.name(),
                dur,
                err
            );
        })
        .await
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}
