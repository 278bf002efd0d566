use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use confyg::{env, Confygery};
use serde::{Deserialize, Deserializer, Serialize};
use trailhead_core::error::ConfigurationError;
use trailhead_search::{ResolverSettings, ScoreThreshold, SystemPrompt};

use crate::profile::{Profile, Provider};
use crate::resilience::RetryPolicy;

/// Configuration for trailhead.
///
/// Configuration is loaded from multiple sources with the following priority:
/// 1. CLI arguments (highest priority)
/// 2. Environment variables (TRAIL_* prefix)
/// 3. Config file (~/.config/trailhead/config.toml)
/// 4. Profile defaults (lowest priority)
///
/// Unset model settings fall back to the active [`Profile`]; call
/// [`Config::resolve`] to get validated, concrete [`Settings`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Deployment profile (`local` or `hosted`).
    ///
    /// Can be set via:
    /// - CLI: --profile hosted
    /// - ENV: TRAIL_PROFILE
    /// - Config: profile = "hosted"
    pub profile: Profile,

    /// Path to the SQLite catalog database.
    pub database_path: PathBuf,

    /// Path to the vector index snapshot.
    pub index_path: PathBuf,

    pub search: SearchConfig,

    pub embedding: EmbeddingConfig,

    pub generation: GenerationConfig,
}

/// Query-time behaviour.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Similarity a hit must exceed to count as a match. Profile default
    /// when unset.
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub score_threshold: Option<f64>,

    /// Vector collection name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collection: Option<String>,

    /// Replaces the built-in assistant instruction.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,

    /// Budget for one whole query, in seconds.
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub query_timeout_secs: Option<u64>,

    /// Budget for each port call during indexing, in seconds.
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub call_timeout_secs: Option<u64>,

    /// Retries for transient model errors.
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub max_retries: Option<usize>,
}

/// Embedding endpoint overrides.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    /// Vector length produced by `model`.
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub dimension: Option<usize>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Pace embedding calls (useful for rate-limited hosted APIs).
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub requests_per_second: Option<u32>,
}

/// Generation endpoint overrides.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            profile: Profile::default(),
            database_path: default_db_path(),
            index_path: default_index_path(),
            search: SearchConfig::default(),
            embedding: EmbeddingConfig::default(),
            generation: GenerationConfig::default(),
        }
    }
}

/// Concrete settings for one embedding endpoint.
#[derive(Clone)]
pub struct EmbeddingSettings {
    pub provider: Provider,
    pub base_url: String,
    pub model: String,
    pub dimension: usize,
    pub api_key: Option<String>,
    pub requests_per_second: Option<u32>,
}

/// Concrete settings for one generation endpoint.
#[derive(Clone)]
pub struct GenerationSettings {
    pub provider: Provider,
    pub base_url: String,
    pub model: String,
    pub api_key: Option<String>,
}

impl std::fmt::Debug for EmbeddingSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbeddingSettings")
            .field("provider", &self.provider)
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("dimension", &self.dimension)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("requests_per_second", &self.requests_per_second)
            .finish()
    }
}

impl std::fmt::Debug for GenerationSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenerationSettings")
            .field("provider", &self.provider)
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Validated settings with every profile default filled in.
#[derive(Debug, Clone)]
pub struct Settings {
    pub profile: Profile,
    pub database_path: PathBuf,
    pub index_path: PathBuf,
    pub collection: String,
    pub resolver: ResolverSettings,
    pub call_timeout: Duration,
    pub retry: RetryPolicy,
    pub embedding: EmbeddingSettings,
    pub generation: GenerationSettings,
}

impl Settings {
    /// Name recorded in index snapshots, e.g. `ollama/all-minilm`.
    #[must_use]
    pub fn embedder_label(&self) -> String {
        format!("{}/{}", self.embedding.provider, self.embedding.model)
    }
}

const DEFAULT_COLLECTION: &str = "products";
const DEFAULT_QUERY_TIMEOUT_SECS: u64 = 60;
const DEFAULT_CALL_TIMEOUT_SECS: u64 = 30;

impl Config {
    /// Load configuration from file and environment variables.
    ///
    /// Searches for config file at: ~/.config/trailhead/config.toml
    /// Reads environment variables with TRAIL_ prefix.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed.
    pub fn load() -> Result<Self> {
        Self::load_from(&config_file_path())
    }

    /// Load configuration from an explicit file path plus the environment.
    ///
    /// A missing file is not an error; defaults apply.
    pub fn load_from(config_path: &Path) -> Result<Self> {
        let mut builder = Confygery::new().context("Failed to create config builder")?;

        if config_path.exists() {
            let path_str = config_path
                .to_str()
                .ok_or_else(|| anyhow::anyhow!("Config path contains invalid UTF-8"))?;
            builder
                .add_file(path_str)
                .context("Failed to load config file")?;
        }

        let mut env_opts = env::Options::with_top_level("trail");
        env_opts.add_section("search");
        env_opts.add_section("embedding");
        env_opts.add_section("generation");
        builder
            .add_env(env_opts)
            .context("Failed to load environment variables")?;

        let config: Self = builder.build().context("Failed to build configuration")?;

        Ok(config)
    }

    /// Resolve profile defaults and validate.
    ///
    /// # Errors
    /// Returns a [`ConfigurationError`] for an out-of-range threshold, a
    /// zero dimension or timeout, or a missing API key on a profile that
    /// needs one. These are startup failures.
    pub fn resolve(&self) -> std::result::Result<Settings, ConfigurationError> {
        let profile = self.profile;

        let threshold = ScoreThreshold::new(
            self.search
                .score_threshold
                .unwrap_or_else(|| profile.default_threshold()),
        )?;

        let dimension = self
            .embedding
            .dimension
            .unwrap_or_else(|| profile.default_embedding_dimension());
        if dimension == 0 {
            return Err(ConfigurationError::Invalid(
                "embedding dimension must be greater than zero".to_string(),
            ));
        }

        let query_timeout = positive_secs(
            "search.query_timeout_secs",
            self.search
                .query_timeout_secs
                .unwrap_or(DEFAULT_QUERY_TIMEOUT_SECS),
        )?;
        let call_timeout = positive_secs(
            "search.call_timeout_secs",
            self.search
                .call_timeout_secs
                .unwrap_or(DEFAULT_CALL_TIMEOUT_SECS),
        )?;

        let embedding_key = non_empty(self.embedding.api_key.as_deref());
        // A single hosted key serves both endpoints unless overridden.
        let generation_key =
            non_empty(self.generation.api_key.as_deref()).or_else(|| embedding_key.clone());
        if profile.requires_api_key() {
            if embedding_key.is_none() {
                return Err(ConfigurationError::MissingApiKey {
                    profile: profile.to_string(),
                    service: "embedding",
                });
            }
            if generation_key.is_none() {
                return Err(ConfigurationError::MissingApiKey {
                    profile: profile.to_string(),
                    service: "generation",
                });
            }
        }

        let system_prompt = non_empty(self.search.system_prompt.as_deref())
            .map(SystemPrompt::new)
            .unwrap_or_default();

        let mut retry = RetryPolicy::default();
        if let Some(max_retries) = self.search.max_retries {
            retry.max_retries = max_retries;
        }

        Ok(Settings {
            profile,
            database_path: self.database_path.clone(),
            index_path: self.index_path.clone(),
            collection: non_empty(self.search.collection.as_deref())
                .unwrap_or_else(|| DEFAULT_COLLECTION.to_string()),
            resolver: ResolverSettings::new(threshold)
                .with_system_prompt(system_prompt)
                .with_query_timeout(query_timeout),
            call_timeout,
            retry,
            embedding: EmbeddingSettings {
                provider: profile.provider(),
                base_url: trim_url(
                    self.embedding
                        .base_url
                        .as_deref()
                        .unwrap_or(profile.default_base_url()),
                ),
                model: non_empty(self.embedding.model.as_deref())
                    .unwrap_or_else(|| profile.default_embedding_model().to_string()),
                dimension,
                api_key: embedding_key,
                requests_per_second: self.embedding.requests_per_second.filter(|rps| *rps > 0),
            },
            generation: GenerationSettings {
                provider: profile.provider(),
                base_url: trim_url(
                    self.generation
                        .base_url
                        .as_deref()
                        .unwrap_or(profile.default_base_url()),
                ),
                model: non_empty(self.generation.model.as_deref())
                    .unwrap_or_else(|| profile.default_chat_model().to_string()),
                api_key: generation_key,
            },
        })
    }
}

fn positive_secs(key: &str, secs: u64) -> std::result::Result<Duration, ConfigurationError> {
    if secs == 0 {
        return Err(ConfigurationError::Invalid(format!(
            "{key} must be greater than zero"
        )));
    }
    Ok(Duration::from_secs(secs))
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn trim_url(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}

/// Accept either a native value or its string form.
///
/// Environment variables always arrive as strings, while the TOML file
/// carries typed numbers.
fn lenient<'de, D, T>(deserializer: D) -> std::result::Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr + Deserialize<'de>,
    T::Err: Display,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw<T> {
        Value(T),
        Text(String),
    }

    match Option::<Raw<T>>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Raw::Value(v)) => Ok(Some(v)),
        Some(Raw::Text(s)) if s.trim().is_empty() => Ok(None),
        Some(Raw::Text(s)) => s.trim().parse().map(Some).map_err(serde::de::Error::custom),
    }
}

/// Get the default database path.
///
/// Returns: ~/.local/share/trailhead/catalog.db (or platform equivalent)
fn default_db_path() -> PathBuf {
    data_dir().join("catalog.db")
}

/// Get the default index snapshot path.
///
/// Returns: ~/.local/share/trailhead/index/products.json (or platform equivalent)
fn default_index_path() -> PathBuf {
    data_dir().join("index").join("products.json")
}

fn data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("trailhead")
}

/// Get the config file path.
///
/// Returns:
/// - Linux: ~/.config/trailhead/config.toml
/// - macOS: ~/Library/Application Support/trailhead/config.toml
/// - Windows: %APPDATA%\trailhead\config.toml
pub fn config_file_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("trailhead")
        .join("config.toml")
}

/// Get the example config file content.
pub fn example_config() -> &'static str {
    r#"# Trailhead Configuration File
#
# Configuration is loaded from multiple sources with the following priority:
# 1. CLI arguments (highest priority)
# 2. Environment variables (TRAIL_* prefix)
# 3. This config file
# 4. Profile defaults (lowest priority)

# Deployment profile
#
# - local:  Ollama at http://localhost:11434 (all-minilm + llama3.2),
#           default score threshold 0.4
# - hosted: OpenAI-compatible API (text-embedding-ada-002 + gpt-4o-mini),
#           default score threshold 0.8, API key required
#
# Can also be set via:
# - CLI: trailhead --profile hosted ask "..."
# - Environment: TRAIL_PROFILE=hosted
profile = "local"

# Path to the SQLite catalog database
#database_path = "/path/to/catalog.db"

# Path to the vector index snapshot written by 'trailhead index'
#index_path = "/path/to/products.json"

[search]
# Similarity a result must exceed to count as a match (0 < t < 1).
# Smaller local embedding models spread scores lower than hosted ones.
#score_threshold = 0.4
#collection = "products"
#query_timeout_secs = 60
#call_timeout_secs = 30
#max_retries = 3
#system_prompt = "You are a helpful assistant for an outdoor camping store..."

[embedding]
#base_url = "http://localhost:11434"
#model = "all-minilm"
#dimension = 384
#api_key = "sk-..."
#requests_per_second = 5

[generation]
#base_url = "http://localhost:11434"
#model = "llama3.2"
#api_key = "sk-..."
"#
}

/// Create default config file if it doesn't exist.
///
/// Returns true if a new file was created, false if it already existed.
pub fn ensure_config_file() -> Result<bool> {
    let config_path = config_file_path();

    if config_path.exists() {
        return Ok(false);
    }

    if let Some(parent) = config_path.parent() {
        std::fs::create_dir_all(parent).context("Failed to create config directory")?;
    }

    std::fs::write(&config_path, example_config()).context("Failed to write config file")?;

    Ok(true)
}
