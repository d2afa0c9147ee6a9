use docsum_common::{DocsumError, Result};
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, info};

use crate::types::{EmbedRequest, EmbedResponse, GenerateRequest, GenerateResponse};

/// Ollama API client
///
/// Every method performs a single attempt; callers wrap them in a
/// [`RetryPolicy`](crate::RetryPolicy).
#[derive(Debug, Clone)]
pub struct OllamaClient {
    base_url: String,
    client: Client,
}

impl OllamaClient {
    /// Create new Ollama client
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to create HTTP client: {}", e))?;

        info!("Ollama client initialized: {}", base_url);
        Ok(Self { base_url, client })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Generate text with Ollama
    pub async fn generate(&self, request: &GenerateRequest) -> Result<String> {
        let url = format!("{}/api/generate", self.base_url);

        debug!(
            "Sending generate request to Ollama - Model: {}, Prompt length: {}",
            request.model,
            request.prompt.len()
        );

        let response = self
            .client
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(|e| DocsumError::network(format!("Failed to send request: {}", e)))?
            .error_for_status()
            .map_err(|e| DocsumError::network(format!("Ollama API error: {}", e)))?;

        let result: GenerateResponse = response
            .json()
            .await
            .map_err(|e| DocsumError::network(format!("Failed to parse response: {}", e)))?;

        if result.response.trim().is_empty() {
            return Err(DocsumError::network(format!(
                "Empty response from Ollama model {}",
                result.model
            )));
        }

        debug!(
            "Received response from Ollama - Length: {}, Done: {}",
            result.response.len(),
            result.done
        );

        Ok(result.response)
    }

    /// Generate embeddings for a batch of texts
    pub async fn embed(&self, model: &str, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let url = format!("{}/api/embed", self.base_url);

        debug!(
            "Generating embeddings - Model: {}, Batch size: {}",
            model,
            texts.len()
        );

        let request = EmbedRequest {
            model: model.to_string(),
            input: texts.to_vec(),
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| DocsumError::network(format!("Failed to send embedding request: {}", e)))?
            .error_for_status()
            .map_err(|e| DocsumError::network(format!("Ollama embedding API error: {}", e)))?;

        let result: EmbedResponse = response.json().await.map_err(|e| {
            DocsumError::network(format!("Failed to parse embedding response: {}", e))
        })?;

        if result.embeddings.iter().any(|e| e.is_empty()) {
            return Err(DocsumError::network("Empty embedding from Ollama"));
        }

        debug!(
            "Received embeddings - Count: {}, Dimension: {}",
            result.embeddings.len(),
            result.embeddings.first().map(Vec::len).unwrap_or(0)
        );

        Ok(result.embeddings)
    }

    /// Test connection to Ollama
    pub async fn test_connection(&self) -> Result<bool> {
        let url = format!("{}/api/tags", self.base_url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| DocsumError::network(format!("Failed to connect to Ollama: {}", e)))?;
        Ok(response.status().is_success())
    }
}
