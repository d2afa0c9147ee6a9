pub mod config;
pub mod error;
pub mod logger;

// Re-export commonly used types
pub use config::{AppConfig, ElbowKind, PipelineConfig, SummaryMode};
pub use error::{DocsumError, ErrorKind};
pub type Result<T> = std::result::Result<T, DocsumError>;
