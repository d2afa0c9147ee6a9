use serde::{Deserialize, Serialize};
use std::fmt;

/// docsum error types
#[derive(Debug, thiserror::Error)]
pub enum DocsumError {
    /// Input text is empty after trimming
    #[error("Empty input: {0}")]
    EmptyInput(String),

    /// Document has no content to segment
    #[error("Empty document: {0}")]
    EmptyDocument(String),

    /// Translation backend unreachable or failing
    #[error("Translation unavailable: {0}")]
    TranslationUnavailable(String),

    /// Embedding could not be produced for every chunk
    #[error("Embedding failed: {0}")]
    EmbeddingFailed(String),

    /// Clustering rejected the embedding matrix
    #[error("Clustering failed: {0}")]
    ClusteringFailed(String),

    /// Generative backend exhausted its retries
    #[error("Generation failed: {0}")]
    GenerationFailed(String),

    /// Text extraction failed before the pipeline started
    #[error("Extraction failed: {0}")]
    ExtractionFailed(String),

    /// Run was cancelled by the caller
    #[error("Cancelled during {0}")]
    Cancelled(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Network/HTTP error
    #[error("Network error: {0}")]
    Network(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// General error (anyhow integration)
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Error category attached to progress events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    EmptyInput,
    EmptyDocument,
    TranslationUnavailable,
    EmbeddingFailed,
    ClusteringFailed,
    GenerationFailed,
    ExtractionFailed,
    Cancelled,
    Config,
    Network,
    InvalidInput,
    Internal,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::EmptyInput => "EmptyInputError",
            Self::EmptyDocument => "EmptyDocumentError",
            Self::TranslationUnavailable => "TranslationUnavailableError",
            Self::EmbeddingFailed => "EmbeddingFailedError",
            Self::ClusteringFailed => "ClusteringFailedError",
            Self::GenerationFailed => "GenerationFailedError",
            Self::ExtractionFailed => "ExtractionFailedError",
            Self::Cancelled => "Cancelled",
            Self::Config => "ConfigError",
            Self::Network => "NetworkError",
            Self::InvalidInput => "InvalidInputError",
            Self::Internal => "InternalError",
        };
        f.write_str(name)
    }
}

impl DocsumError {
    /// Create empty input error
    pub fn empty_input<S: Into<String>>(msg: S) -> Self {
        Self::EmptyInput(msg.into())
    }

    /// Create empty document error
    pub fn empty_document<S: Into<String>>(msg: S) -> Self {
        Self::EmptyDocument(msg.into())
    }

    /// Create translation unavailable error
    pub fn translation_unavailable<S: Into<String>>(msg: S) -> Self {
        Self::TranslationUnavailable(msg.into())
    }

    /// Create embedding failed error
    pub fn embedding_failed<S: Into<String>>(msg: S) -> Self {
        Self::EmbeddingFailed(msg.into())
    }

    /// Create clustering failed error
    pub fn clustering_failed<S: Into<String>>(msg: S) -> Self {
        Self::ClusteringFailed(msg.into())
    }

    /// Create generation failed error
    pub fn generation_failed<S: Into<String>>(msg: S) -> Self {
        Self::GenerationFailed(msg.into())
    }

    /// Create extraction failed error
    pub fn extraction_failed<S: Into<String>>(msg: S) -> Self {
        Self::ExtractionFailed(msg.into())
    }

    /// Create cancellation error for the given unit of work
    pub fn cancelled<S: Into<String>>(during: S) -> Self {
        Self::Cancelled(during.into())
    }

    /// Create config error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::Config(msg.into())
    }

    /// Create network error
    pub fn network<S: Into<String>>(msg: S) -> Self {
        Self::Network(msg.into())
    }

    /// Create invalid input error
    pub fn invalid_input<S: Into<String>>(msg: S) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create internal error
    pub fn internal<S: Into<String>>(msg: S) -> Self {
        Self::Internal(msg.into())
    }

    /// Error category
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::EmptyInput(_) => ErrorKind::EmptyInput,
            Self::EmptyDocument(_) => ErrorKind::EmptyDocument,
            Self::TranslationUnavailable(_) => ErrorKind::TranslationUnavailable,
            Self::EmbeddingFailed(_) => ErrorKind::EmbeddingFailed,
            Self::ClusteringFailed(_) => ErrorKind::ClusteringFailed,
            Self::GenerationFailed(_) => ErrorKind::GenerationFailed,
            Self::ExtractionFailed(_) => ErrorKind::ExtractionFailed,
            Self::Cancelled(_) => ErrorKind::Cancelled,
            Self::Config(_) => ErrorKind::Config,
            Self::Network(_) => ErrorKind::Network,
            Self::InvalidInput(_) => ErrorKind::InvalidInput,
            Self::Io(_) | Self::Json(_) | Self::Internal(_) | Self::Other(_) => ErrorKind::Internal,
        }
    }

    /// Whether the pipeline continues with a degraded substitute
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::TranslationUnavailable(_) | Self::ClusteringFailed(_)
        )
    }

    /// Whether this error is a cancellation
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_mapping() {
        assert_eq!(DocsumError::empty_input("x").kind(), ErrorKind::EmptyInput);
        assert_eq!(
            DocsumError::embedding_failed("x").kind(),
            ErrorKind::EmbeddingFailed
        );
        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk");
        assert_eq!(DocsumError::from(io).kind(), ErrorKind::Internal);
    }

    #[test]
    fn test_recoverable_kinds() {
        assert!(DocsumError::translation_unavailable("offline").is_recoverable());
        assert!(DocsumError::clustering_failed("flat").is_recoverable());
        assert!(!DocsumError::generation_failed("down").is_recoverable());
        assert!(!DocsumError::embedding_failed("down").is_recoverable());
    }

    #[test]
    fn test_kind_display() {
        assert_eq!(ErrorKind::EmbeddingFailed.to_string(), "EmbeddingFailedError");
        assert_eq!(ErrorKind::Cancelled.to_string(), "Cancelled");
    }
}
