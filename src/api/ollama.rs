//! Local Ollama provider (`/api/generate`, non-streaming)

use super::client::send_json;
use super::{ApiError, GenerationParams, ProviderConfig, ProviderType, TextGenerator};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use tracing::debug;

pub struct OllamaProvider {
    client: Client,
    ollama_url: String,
    model: String,
    params: GenerationParams,
}

impl OllamaProvider {
    pub fn new(client: Client, config: &ProviderConfig) -> Self {
        Self {
            client,
            ollama_url: config.ollama_url().trim_end_matches('/').to_string(),
            model: config.model().to_string(),
            params: GenerationParams::from_config(config),
        }
    }

    pub(crate) fn build_request(&self, payload: &str) -> Value {
        json!({
            "model": self.model,
            "prompt": payload,
            "stream": false,
            "options": {
                "temperature": self.params.temperature,
                "num_predict": self.params.max_output_tokens
            }
        })
    }

    pub(crate) fn parse_response(json: &Value) -> Result<String, ApiError> {
        match json["response"].as_str() {
            Some(text) if !text.trim().is_empty() => Ok(text.to_string()),
            _ => Err(ApiError::EmptyResponse {
                provider: ProviderType::Ollama,
            }),
        }
    }
}

#[async_trait]
impl TextGenerator for OllamaProvider {
    async fn generate(&self, payload: &str) -> Result<String, ApiError> {
        debug!(model = %self.model, url = %self.ollama_url, "sending generate request");

        let request = self
            .client
            .post(format!("{}/api/generate", self.ollama_url))
            .timeout(self.params.timeout)
            .json(&self.build_request(payload));

        let json = send_json(ProviderType::Ollama, &self.model, request)
            .await
            .map_err(|err| match err {
                ApiError::NetworkError { provider, message } => ApiError::NetworkError {
                    provider,
                    message: format!("{}. Is Ollama running at {}?", message, self.ollama_url),
                },
                other => other,
            })?;

        Self::parse_response(&json)
    }

    fn provider_type(&self) -> ProviderType {
        ProviderType::Ollama
    }

    fn model(&self) -> &str {
        &self.model
    }
}
