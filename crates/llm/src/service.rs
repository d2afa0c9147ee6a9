use async_trait::async_trait;
use docsum_common::{AppConfig, DocsumError, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::client::OllamaClient;
use crate::llm_trait::{EmbeddingService, GenerativeService, TranslationService};
use crate::prompts::{stuff_prompt, translation_instruction};
use crate::types::{GenerateOptions, GenerateRequest, LanguageCode};

/// Ollama-backed generative and embedding service
#[derive(Debug, Clone)]
pub struct OllamaService {
    client: OllamaClient,
    llm_model: String,
    embedding_model: String,
    options: GenerateOptions,
}

impl OllamaService {
    pub fn new(
        client: OllamaClient,
        llm_model: impl Into<String>,
        embedding_model: impl Into<String>,
        options: GenerateOptions,
    ) -> Self {
        Self {
            client,
            llm_model: llm_model.into(),
            embedding_model: embedding_model.into(),
            options,
        }
    }

    /// Build the service from application configuration
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let client = OllamaClient::new(
            config.ollama_base_url.clone(),
            Duration::from_secs(config.request_timeout_secs),
        )?;
        let options = GenerateOptions {
            temperature: Some(config.pipeline.temperature),
            top_p: None,
            num_predict: Some(config.pipeline.num_predict),
        };

        Ok(Self::new(
            client,
            config.llm_model.clone(),
            config.embedding_model.clone(),
            options,
        ))
    }

    pub fn client(&self) -> &OllamaClient {
        &self.client
    }

    pub fn llm_model(&self) -> &str {
        &self.llm_model
    }

    pub fn embedding_model(&self) -> &str {
        &self.embedding_model
    }
}

#[async_trait]
impl GenerativeService for OllamaService {
    async fn complete(&self, prompt: &str, context: &str) -> Result<String> {
        let request = GenerateRequest {
            model: self.llm_model.clone(),
            prompt: stuff_prompt(context, prompt),
            stream: Some(false),
            options: Some(self.options.clone()),
        };

        let response = self.client.generate(&request).await?;
        Ok(response.trim().to_string())
    }
}

#[async_trait]
impl EmbeddingService for OllamaService {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        self.client.embed(&self.embedding_model, texts).await
    }
}

/// Translation through a generative model
pub struct LlmTranslator {
    generator: Arc<dyn GenerativeService>,
}

impl LlmTranslator {
    pub fn new(generator: Arc<dyn GenerativeService>) -> Self {
        Self { generator }
    }
}

#[async_trait]
impl TranslationService for LlmTranslator {
    async fn translate(&self, text: &str, target: &LanguageCode) -> Result<String> {
        debug!("Translating {} chars into {}", text.len(), target);

        let translated = self
            .generator
            .complete(&translation_instruction(target), text)
            .await
            .map_err(|e| DocsumError::translation_unavailable(e.to_string()))?;

        let translated = translated.trim().trim_matches('"').trim();
        if translated.is_empty() {
            return Err(DocsumError::translation_unavailable(
                "translation backend returned an empty text",
            ));
        }

        Ok(translated.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct EchoGenerator {
        reply: String,
        calls: Mutex<Vec<(String, String)>>,
    }

    #[async_trait]
    impl GenerativeService for EchoGenerator {
        async fn complete(&self, prompt: &str, context: &str) -> Result<String> {
            self.calls
                .lock()
                .unwrap()
                .push((prompt.to_string(), context.to_string()));
            Ok(self.reply.clone())
        }
    }

    #[test]
    fn test_service_from_config() {
        let config = AppConfig::default();
        let service = OllamaService::from_config(&config).unwrap();
        assert_eq!(service.llm_model(), "llama3.2:latest");
        assert_eq!(service.embedding_model(), "nomic-embed-text");
    }

    #[tokio::test]
    async fn test_translator_strips_quotes() {
        let generator = Arc::new(EchoGenerator {
            reply: "\"Vat de tekst samen.\"\n".to_string(),
            calls: Mutex::new(Vec::new()),
        });
        let translator = LlmTranslator::new(generator.clone());

        let out = translator
            .translate("Summarize the text.", &LanguageCode::new("nl"))
            .await
            .unwrap();

        assert_eq!(out, "Vat de tekst samen.");
        let calls = generator.calls.lock().unwrap();
        assert_eq!(calls[0].1, "Summarize the text.");
        assert!(calls[0].0.contains("Dutch"));
    }

    #[tokio::test]
    async fn test_translator_rejects_empty_output() {
        let generator = Arc::new(EchoGenerator {
            reply: "   ".to_string(),
            calls: Mutex::new(Vec::new()),
        });
        let translator = LlmTranslator::new(generator);

        let err = translator
            .translate("Summarize.", &LanguageCode::new("de"))
            .await
            .unwrap_err();

        assert!(matches!(err, DocsumError::TranslationUnavailable(_)));
    }
}
