use serde::{Deserialize, Serialize};
use std::fmt;

/// Ollama generate request
#[derive(Debug, Clone, Serialize)]
pub struct GenerateRequest {
    /// Model name (e.g., "llama3.2", "gemma2")
    pub model: String,

    /// Prompt text
    pub prompt: String,

    /// Disable streaming
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream: Option<bool>,

    /// Generation options
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<GenerateOptions>,
}

/// Generation options
#[derive(Debug, Clone, Serialize, Default)]
pub struct GenerateOptions {
    /// Temperature (0.0 - 1.0)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    /// Top-p sampling
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,

    /// Maximum tokens to generate
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_predict: Option<i32>,
}

/// Ollama generate response
#[derive(Debug, Clone, Deserialize)]
pub struct GenerateResponse {
    /// Model name
    pub model: String,

    /// Generated text
    pub response: String,

    /// Whether generation is complete
    pub done: bool,
}

/// Ollama batch embedding request (`/api/embed`)
#[derive(Debug, Clone, Serialize)]
pub struct EmbedRequest {
    /// Embedding model name
    pub model: String,

    /// Texts to embed
    pub input: Vec<String>,
}

/// Ollama batch embedding response
#[derive(Debug, Clone, Deserialize)]
pub struct EmbedResponse {
    /// One vector per input, in input order
    pub embeddings: Vec<Vec<f32>>,
}

/// Lowercase ISO-639 language code
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LanguageCode(String);

impl LanguageCode {
    pub fn new(code: impl AsRef<str>) -> Self {
        Self(code.as_ref().trim().to_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LanguageCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Contiguous slice of the document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    /// Position in document order, starting at 0
    pub id: usize,

    /// Chunk text, trimmed
    pub text: String,

    /// Start byte offset in the original text
    pub start: usize,

    /// End byte offset in the original text (exclusive)
    pub end: usize,

    /// Embedding vector, attached by the embedder
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
}

impl Chunk {
    pub fn new(id: usize, text: impl Into<String>, start: usize, end: usize) -> Self {
        Self {
            id,
            text: text.into(),
            start,
            end,
            embedding: None,
        }
    }

    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = Some(embedding);
        self
    }
}

/// Instruction prompt, localized to the document language
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prompt {
    /// Prompt as supplied (or the built-in default)
    pub original: String,

    /// Prompt sent to the model
    pub localized: String,

    /// Language the original prompt is written in
    pub language: LanguageCode,

    /// Why translation was skipped, when the original had to be kept
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub degraded: Option<String>,
}

impl Prompt {
    /// Prompt that needs no translation
    pub fn unchanged(text: impl Into<String>, language: LanguageCode) -> Self {
        let text = text.into();
        Self {
            original: text.clone(),
            localized: text,
            language,
            degraded: None,
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.degraded.is_some()
    }
}

/// Summarization result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryResult {
    /// Final summary text
    pub text: String,

    /// Number of chunks the document was split into
    pub source_chunk_count: usize,

    /// Number of clusters (representatives) summarized
    pub cluster_count: usize,

    /// Representative chunk ids in document order
    pub representative_chunk_ids: Vec<usize>,

    /// Document language, once known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<LanguageCode>,

    /// Degrade decisions taken during the run
    #[serde(default)]
    pub warnings: Vec<String>,
}

impl SummaryResult {
    /// Create new summary result
    pub fn new(
        text: String,
        source_chunk_count: usize,
        representative_chunk_ids: Vec<usize>,
    ) -> Self {
        Self {
            text,
            source_chunk_count,
            cluster_count: representative_chunk_ids.len(),
            representative_chunk_ids,
            language: None,
            warnings: Vec::new(),
        }
    }

    pub fn with_language(mut self, language: LanguageCode) -> Self {
        self.language = Some(language);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_code_normalized() {
        assert_eq!(LanguageCode::new(" EN ").as_str(), "en");
        assert_eq!(LanguageCode::new("nl"), LanguageCode::new("NL"));
    }

    #[test]
    fn test_summary_result_counts() {
        let result = SummaryResult::new("short".to_string(), 7, vec![0, 3, 5]);
        assert_eq!(result.cluster_count, 3);
        assert_eq!(result.source_chunk_count, 7);
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_generate_request_skips_empty_options() {
        let request = GenerateRequest {
            model: "llama3.2".to_string(),
            prompt: "hi".to_string(),
            stream: Some(false),
            options: None,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert!(json.get("options").is_none());
        assert_eq!(json["stream"], false);
    }
}
