//! Google Gemini provider (generateContent endpoint)

use super::client::send_json;
use super::{ApiError, GenerationParams, ProviderConfig, ProviderType, TextGenerator};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use tracing::debug;

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Every category Gemini filters on. All are set to `BLOCK_NONE` so that the
/// default filtering cannot silently truncate a rewritten prompt.
pub const SAFETY_CATEGORIES: [&str; 4] = [
    "HARM_CATEGORY_HARASSMENT",
    "HARM_CATEGORY_HATE_SPEECH",
    "HARM_CATEGORY_SEXUALLY_EXPLICIT",
    "HARM_CATEGORY_DANGEROUS_CONTENT",
];

/// Finish reasons that mean the model refused rather than ran dry
const BLOCKING_FINISH_REASONS: [&str; 4] =
    ["SAFETY", "RECITATION", "BLOCKLIST", "PROHIBITED_CONTENT"];

pub struct GeminiProvider {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
    params: GenerationParams,
}

impl GeminiProvider {
    /// Build from a config whose credential has already been validated
    pub fn new(client: Client, config: &ProviderConfig) -> Result<Self, ApiError> {
        let api_key = config
            .credential()
            .ok_or(ApiError::MissingCredential {
                provider: ProviderType::Gemini,
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

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        )
    }

    pub(crate) fn build_request(&self, payload: &str) -> Value {
        let safety_settings: Vec<Value> = SAFETY_CATEGORIES
            .iter()
            .map(|category| {
                json!({
                    "category": category,
                    "threshold": "BLOCK_NONE"
                })
            })
            .collect();

        json!({
            "contents": [
                {
                    "role": "user",
                    "parts": [{ "text": payload }]
                }
            ],
            "generationConfig": {
                "temperature": self.params.temperature,
                "maxOutputTokens": self.params.max_output_tokens
            },
            "safetySettings": safety_settings
        })
    }

    pub(crate) fn parse_response(json: &Value) -> Result<String, ApiError> {
        let provider = ProviderType::Gemini;

        if let Some(reason) = json["promptFeedback"]["blockReason"].as_str() {
            return Err(ApiError::ContentBlocked {
                provider,
                reason: reason.to_string(),
            });
        }

        let candidate = &json["candidates"][0];
        let text = candidate["content"]["parts"]
            .as_array()
            .map(|parts| {
                parts
                    .iter()
                    .filter_map(|part| part["text"].as_str())
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        if text.trim().is_empty() {
            if let Some(reason) = candidate["finishReason"].as_str() {
                if BLOCKING_FINISH_REASONS.contains(&reason) {
                    return Err(ApiError::ContentBlocked {
                        provider,
                        reason: reason.to_string(),
                    });
                }
            }
            return Err(ApiError::EmptyResponse { provider });
        }

        Ok(text)
    }
}

#[async_trait]
impl TextGenerator for GeminiProvider {
    async fn generate(&self, payload: &str) -> Result<String, ApiError> {
        debug!(model = %self.model, "sending generateContent request");

        let request = self
            .client
            .post(self.endpoint())
            .query(&[("key", self.api_key.as_str())])
            .timeout(self.params.timeout)
            .json(&self.build_request(payload));

        let json = send_json(ProviderType::Gemini, &self.model, request).await?;
        Self::parse_response(&json)
    }

    fn provider_type(&self) -> ProviderType {
        ProviderType::Gemini
    }

    fn model(&self) -> &str {
        &self.model
    }
}
