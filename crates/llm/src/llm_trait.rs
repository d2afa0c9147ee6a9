use async_trait::async_trait;
use docsum_common::Result;

use crate::types::LanguageCode;

/// Generative text model
#[async_trait]
pub trait GenerativeService: Send + Sync {
    /// Complete `prompt` (the instruction) over `context` (the content)
    async fn complete(&self, prompt: &str, context: &str) -> Result<String>;
}

/// Embedding model with a fixed output dimension
#[async_trait]
pub trait EmbeddingService: Send + Sync {
    /// Embed every text, returning vectors in input order
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

/// Machine translation backend
#[async_trait]
pub trait TranslationService: Send + Sync {
    /// Translate `text` into `target`
    async fn translate(&self, text: &str, target: &LanguageCode) -> Result<String>;
}
