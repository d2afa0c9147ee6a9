//! docsum LLM Integration
//!
//! Ollama API client, service traits, segmentation, language handling and
//! generative summarization

mod chunking;
mod client;
mod language;
mod llm_trait;
mod prompts;
mod retry;
mod service;
mod summarize;
mod types;

pub use chunking::{chunk_text, Segmenter};
pub use client::OllamaClient;
pub use language::{LanguageDetector, PromptLocalizer};
pub use llm_trait::{EmbeddingService, GenerativeService, TranslationService};
pub use prompts::{language_name, stuff_prompt, translation_instruction, DEFAULT_PROMPT};
pub use retry::RetryPolicy;
pub use service::{LlmTranslator, OllamaService};
pub use summarize::Summarizer;
pub use types::{
    Chunk, EmbedRequest, EmbedResponse, GenerateOptions, GenerateRequest, GenerateResponse,
    LanguageCode, Prompt, SummaryResult,
};
