use crate::error::DocsumError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;

/// docsum application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Ollama API base URL
    pub ollama_base_url: String,

    /// Embedding model name
    pub embedding_model: String,

    /// LLM summarization model name
    pub llm_model: String,

    /// HTTP timeout for a single backend call
    pub request_timeout_secs: u64,

    /// Log directory
    pub log_dir: PathBuf,

    /// Log level
    pub log_level: String,

    /// Summarization pipeline settings
    pub pipeline: PipelineConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            ollama_base_url: "http://localhost:11434".to_string(),
            embedding_model: "nomic-embed-text".to_string(),
            llm_model: "llama3.2:latest".to_string(),
            request_timeout_secs: 300,
            log_dir: PathBuf::from("./log"),
            log_level: "info".to_string(),
            pipeline: PipelineConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables and .env file
    pub fn from_env() -> Result<Self, DocsumError> {
        // Load .env file (ignore if not exists)
        let _ = dotenv::dotenv();

        let config = Self {
            ollama_base_url: std::env::var("OLLAMA_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:11434".to_string()),
            embedding_model: std::env::var("EMBEDDING_MODEL")
                .unwrap_or_else(|_| "nomic-embed-text".to_string()),
            llm_model: std::env::var("LLM_MODEL")
                .unwrap_or_else(|_| "llama3.2:latest".to_string()),
            request_timeout_secs: env_parse("REQUEST_TIMEOUT_SECS", 300)?,
            log_dir: std::env::var("LOG_DIR")
                .ok()
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("./log")),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            pipeline: PipelineConfig::from_env()?,
        };

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), DocsumError> {
        if !self.ollama_base_url.starts_with("http://")
            && !self.ollama_base_url.starts_with("https://")
        {
            return Err(DocsumError::config(
                "Ollama base URL must start with http:// or https://",
            ));
        }

        if self.llm_model.is_empty() {
            return Err(DocsumError::config("LLM model name cannot be empty"));
        }

        if self.embedding_model.is_empty() {
            return Err(DocsumError::config("Embedding model name cannot be empty"));
        }

        if self.request_timeout_secs == 0 {
            return Err(DocsumError::config("Request timeout cannot be 0"));
        }

        self.pipeline.validate()
    }
}

/// How the number of clusters is chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElbowKind {
    /// Maximum curvature on the inertia curve
    Curvature,
    /// Always use `fallback_k`
    Fixed,
}

impl FromStr for ElbowKind {
    type Err = DocsumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "curvature" | "elbow" => Ok(Self::Curvature),
            "fixed" => Ok(Self::Fixed),
            other => Err(DocsumError::config(format!("Unknown elbow strategy: {}", other))),
        }
    }
}

/// How representative chunks are sent to the generative model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SummaryMode {
    /// One combined request, reduced hierarchically when over budget
    Aggregate,
    /// One request per representative, joined in document order
    PerCluster,
}

impl FromStr for SummaryMode {
    type Err = DocsumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "aggregate" => Ok(Self::Aggregate),
            "per_cluster" => Ok(Self::PerCluster),
            other => Err(DocsumError::config(format!("Unknown summary mode: {}", other))),
        }
    }
}

/// Settings for one pipeline run, passed explicitly to the orchestrator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Maximum chunk size in characters
    pub max_chunk_size: usize,

    /// Number of leading characters used for language detection
    pub language_detection_prefix: usize,

    /// Language assumed when detection gives no answer, and the language of the default prompt
    pub default_language: String,

    /// Texts per embedding request
    pub embedding_batch_size: usize,

    /// Embedding requests in flight at once
    pub embedding_concurrency: usize,

    /// Attempts per external call (first try included)
    pub retry_attempts: u32,

    /// Backoff before the second attempt; doubles afterwards
    pub retry_base_delay_ms: u64,

    /// Documents with at most this many chunks skip clustering
    pub small_document_threshold: usize,

    /// Upper bound of the k sweep
    pub max_clusters: usize,

    /// k used when no elbow is found (and by the fixed strategy)
    pub fallback_k: usize,

    /// Elbow strategy
    pub elbow: ElbowKind,

    /// Minimum normalized gain below the chord for an elbow to count
    pub elbow_min_gain: f64,

    /// Lloyd iterations per k-means run
    pub kmeans_max_iterations: usize,

    /// Maximum characters of content in one generative request
    pub summary_input_budget: usize,

    /// Levels of intermediate summaries before truncation
    pub summary_max_depth: usize,

    /// Generative requests in flight at once
    pub summary_concurrency: usize,

    /// Summary composition mode
    pub summary_mode: SummaryMode,

    /// Sampling temperature
    pub temperature: f32,

    /// Maximum tokens to generate per request
    pub num_predict: i32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_chunk_size: 1000,
            language_detection_prefix: 10_000,
            default_language: "en".to_string(),
            embedding_batch_size: 8,
            embedding_concurrency: 4,
            retry_attempts: 3,
            retry_base_delay_ms: 1000,
            small_document_threshold: 2,
            max_clusters: 10,
            fallback_k: 5,
            elbow: ElbowKind::Curvature,
            elbow_min_gain: 0.05,
            kmeans_max_iterations: 100,
            summary_input_budget: 12_000,
            summary_max_depth: 2,
            summary_concurrency: 10,
            summary_mode: SummaryMode::Aggregate,
            temperature: 0.0,
            num_predict: 1024,
        }
    }
}

impl PipelineConfig {
    /// Load pipeline settings from `DOCSUM_*` environment variables
    pub fn from_env() -> Result<Self, DocsumError> {
        let defaults = Self::default();

        Ok(Self {
            max_chunk_size: env_parse("DOCSUM_MAX_CHUNK_SIZE", defaults.max_chunk_size)?,
            language_detection_prefix: env_parse(
                "DOCSUM_DETECTION_PREFIX",
                defaults.language_detection_prefix,
            )?,
            default_language: std::env::var("DOCSUM_DEFAULT_LANGUAGE")
                .unwrap_or(defaults.default_language),
            embedding_batch_size: env_parse(
                "DOCSUM_EMBED_BATCH_SIZE",
                defaults.embedding_batch_size,
            )?,
            embedding_concurrency: env_parse(
                "DOCSUM_EMBED_CONCURRENCY",
                defaults.embedding_concurrency,
            )?,
            retry_attempts: env_parse("DOCSUM_RETRY_ATTEMPTS", defaults.retry_attempts)?,
            retry_base_delay_ms: env_parse(
                "DOCSUM_RETRY_BASE_DELAY_MS",
                defaults.retry_base_delay_ms,
            )?,
            small_document_threshold: defaults.small_document_threshold,
            max_clusters: env_parse("DOCSUM_MAX_CLUSTERS", defaults.max_clusters)?,
            fallback_k: env_parse("DOCSUM_FALLBACK_K", defaults.fallback_k)?,
            elbow: env_parse("DOCSUM_ELBOW", defaults.elbow)?,
            elbow_min_gain: env_parse("DOCSUM_ELBOW_MIN_GAIN", defaults.elbow_min_gain)?,
            kmeans_max_iterations: defaults.kmeans_max_iterations,
            summary_input_budget: env_parse(
                "DOCSUM_SUMMARY_BUDGET",
                defaults.summary_input_budget,
            )?,
            summary_max_depth: env_parse("DOCSUM_SUMMARY_DEPTH", defaults.summary_max_depth)?,
            summary_concurrency: env_parse(
                "DOCSUM_SUMMARY_CONCURRENCY",
                defaults.summary_concurrency,
            )?,
            summary_mode: env_parse("DOCSUM_SUMMARY_MODE", defaults.summary_mode)?,
            temperature: env_parse("DOCSUM_TEMPERATURE", defaults.temperature)?,
            num_predict: env_parse("DOCSUM_NUM_PREDICT", defaults.num_predict)?,
        })
    }

    /// Validate pipeline settings
    pub fn validate(&self) -> Result<(), DocsumError> {
        let positive = [
            ("max_chunk_size", self.max_chunk_size),
            ("language_detection_prefix", self.language_detection_prefix),
            ("embedding_batch_size", self.embedding_batch_size),
            ("embedding_concurrency", self.embedding_concurrency),
            ("max_clusters", self.max_clusters),
            ("fallback_k", self.fallback_k),
            ("kmeans_max_iterations", self.kmeans_max_iterations),
            ("summary_input_budget", self.summary_input_budget),
            ("summary_concurrency", self.summary_concurrency),
        ];
        for (name, value) in positive {
            if value == 0 {
                return Err(DocsumError::config(format!("{} must be greater than 0", name)));
            }
        }

        if self.retry_attempts == 0 {
            return Err(DocsumError::config("retry_attempts must be at least 1"));
        }

        if self.max_chunk_size > self.summary_input_budget {
            return Err(DocsumError::config(format!(
                "max_chunk_size ({}) cannot exceed summary_input_budget ({})",
                self.max_chunk_size, self.summary_input_budget
            )));
        }

        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(DocsumError::config("temperature must be within [0, 2]"));
        }

        if !(0.0..1.0).contains(&self.elbow_min_gain) {
            return Err(DocsumError::config("elbow_min_gain must be within [0, 1)"));
        }

        if self.default_language.trim().is_empty() {
            return Err(DocsumError::config("default_language cannot be empty"));
        }

        Ok(())
    }
}

/// Parse an environment variable, keeping the default when unset
fn env_parse<T>(key: &str, default: T) -> Result<T, DocsumError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| DocsumError::config(format!("Invalid value for {}: {} ({})", key, raw, e))),
        Err(_) => Ok(default),
    }
}
