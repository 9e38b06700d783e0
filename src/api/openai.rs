//! OpenAI chat completions provider

use super::client::send_json;
use super::{ApiError, GenerationParams, ProviderConfig, ProviderType, TextGenerator};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use tracing::debug;

const DEFAULT_BASE_URL: &str = "https://api.openai.com";

pub struct OpenAiProvider {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
    params: GenerationParams,
}

impl OpenAiProvider {
    pub fn new(client: Client, config: &ProviderConfig) -> Result<Self, ApiError> {
        let api_key = config
            .credential()
            .ok_or(ApiError::MissingCredential {
                provider: ProviderType::OpenAI,
            })?
            .to_string();

        Ok(Self {
            client,
            api_key,
            model: config.model().to_string(),
            base_url: config
                .base_url
                .clone()
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            params: GenerationParams::from_config(config),
        })
    }

    pub(crate) fn build_request(&self, payload: &str) -> Value {
        json!({
            "model": self.model,
            "messages": [
                {
                    "role": "user",
                    "content": payload
                }
            ],
            "temperature": self.params.temperature,
            "max_tokens": self.params.max_output_tokens,
        })
    }

    pub(crate) fn parse_response(json: &Value) -> Result<String, ApiError> {
        let provider = ProviderType::OpenAI;
        let choice = &json["choices"][0];

        let content = choice["message"]["content"].as_str().unwrap_or("");
        if content.trim().is_empty() {
            if choice["finish_reason"].as_str() == Some("content_filter") {
                return Err(ApiError::ContentBlocked {
                    provider,
                    reason: "content_filter".to_string(),
                });
            }
            return Err(ApiError::EmptyResponse { provider });
        }

        Ok(content.to_string())
    }
}

#[async_trait]
impl TextGenerator for OpenAiProvider {
    async fn generate(&self, payload: &str) -> Result<String, ApiError> {
        debug!(model = %self.model, "sending chat completion request");

        let url = format!("{}/v1/chat/completions", self.base_url.trim_end_matches('/'));
        let request = self
            .client
            .post(url)
            .bearer_auth(&self.api_key)
            .timeout(self.params.timeout)
            .json(&self.build_request(payload));

        let json = send_json(ProviderType::OpenAI, &self.model, request).await?;
        Self::parse_response(&json)
    }

    fn provider_type(&self) -> ProviderType {
        ProviderType::OpenAI
    }

    fn model(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ErrorKind;

    #[test]
    fn test_request_shape() {
        let config = ProviderConfig::new(ProviderType::OpenAI)
            .with_openai_key("sk-test")
            .with_model("gpt-4o");
        let provider = OpenAiProvider::new(Client::new(), &config).unwrap();
        let body = provider.build_request("rewrite me");

        assert_eq!(body["model"], "gpt-4o");
        assert_eq!(body["messages"][0]["content"], "rewrite me");
        assert_eq!(body["max_tokens"], 4096);
        assert!((body["temperature"].as_f64().unwrap() - 0.4).abs() < 1e-6);
    }

    #[test]
    fn test_parse_content() {
        let json = json!({
            "choices": [{
                "message": { "role": "assistant", "content": "Better prompt" },
                "finish_reason": "stop"
            }]
        });
        assert_eq!(OpenAiProvider::parse_response(&json).unwrap(), "Better prompt");
    }

    #[test]
    fn test_parse_filtered_and_empty() {
        let filtered = json!({
            "choices": [{ "message": { "content": null }, "finish_reason": "content_filter" }]
        });
        assert_eq!(
            OpenAiProvider::parse_response(&filtered).unwrap_err().kind(),
            ErrorKind::ContentBlocked
        );

        let empty = json!({ "choices": [] });
        assert_eq!(
            OpenAiProvider::parse_response(&empty).unwrap_err().kind(),
            ErrorKind::EmptyResponse
        );
    }
}
