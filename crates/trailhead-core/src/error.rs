use thiserror::Error;

/// Errors raised by the catalog store.
#[derive(Debug, Error)]
pub enum Error {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("invalid data: {0}")]
    InvalidData(String),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Failure of the embedding port.
#[derive(Debug, Error)]
pub enum EmbeddingError {
    /// The request never produced a response.
    #[error("embedding request to {provider} failed: {message}")]
    Http { provider: String, message: String },

    /// The model endpoint answered with a non-success status.
    #[error("embedding endpoint {provider} returned {status}: {body}")]
    Status {
        provider: String,
        status: u16,
        body: String,
    },

    #[error("could not parse embedding response from {provider}: {message}")]
    Parse { provider: String, message: String },

    #[error("{provider} returned no embedding")]
    Empty { provider: String },

    #[error("embedding call timed out")]
    Timeout,

    #[error("embedding has {actual} dimensions, expected {expected}")]
    DimensionMismatch { expected: usize, actual: usize },
}

impl EmbeddingError {
    /// Returns `true` when retrying the call may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Http { .. } => true,
            Self::Status { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

/// Failure of the vector index.
#[derive(Debug, Error)]
pub enum IndexError {
    #[error("vector has {actual} dimensions, collection {collection} expects {expected}")]
    DimensionMismatch {
        collection: String,
        expected: usize,
        actual: usize,
    },

    #[error("collection {0} does not exist")]
    CollectionMissing(String),

    #[error("index snapshot error: {0}")]
    Snapshot(String),

    #[error("vector index call timed out")]
    Timeout,
}

/// Failure of the generation port.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("generation request to {provider} failed: {message}")]
    Http { provider: String, message: String },

    #[error("generation endpoint {provider} returned {status}: {body}")]
    Status {
        provider: String,
        status: u16,
        body: String,
    },

    #[error("could not parse generation response from {provider}: {message}")]
    Parse { provider: String, message: String },

    #[error("{provider} returned an empty completion")]
    Empty { provider: String },

    #[error("generation call timed out")]
    Timeout,
}

impl GenerationError {
    /// Returns `true` when retrying the call may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Http { .. } => true,
            Self::Status { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

/// Invalid wiring or settings detected before any query is served.
///
/// These are never produced per query; callers are expected to abort startup.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("embedding dimension mismatch: index expects {index}, embedder produces {embedder}")]
    DimensionMismatch { index: usize, embedder: usize },

    #[error("score threshold {0} must lie strictly between 0 and 1")]
    InvalidThreshold(f64),

    #[error("the {profile} profile requires an API key for {service}")]
    MissingApiKey {
        profile: String,
        service: &'static str,
    },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedding_error_transience() {
        let http = EmbeddingError::Http {
            provider: "ollama".to_string(),
            message: "connection refused".to_string(),
        };
        assert!(http.is_transient());

        let throttled = EmbeddingError::Status {
            provider: "openai".to_string(),
            status: 429,
            body: String::new(),
        };
        assert!(throttled.is_transient());

        let bad_request = EmbeddingError::Status {
            provider: "openai".to_string(),
            status: 400,
            body: "bad input".to_string(),
        };
        assert!(!bad_request.is_transient());
        assert!(!EmbeddingError::Timeout.is_transient());
    }

    #[test]
    fn test_generation_error_transience() {
        let unavailable = GenerationError::Status {
            provider: "ollama".to_string(),
            status: 503,
            body: String::new(),
        };
        assert!(unavailable.is_transient());
        assert!(!GenerationError::Empty {
            provider: "ollama".to_string()
        }
        .is_transient());
    }

    #[test]
    fn test_configuration_error_messages() {
        let err = ConfigurationError::DimensionMismatch {
            index: 384,
            embedder: 1536,
        };
        let msg = err.to_string();
        assert!(msg.contains("384"));
        assert!(msg.contains("1536"));

        let err = ConfigurationError::InvalidThreshold(1.5);
        assert!(err.to_string().contains("1.5"));
    }
}
