//! Provider selection and the single-attempt dispatch path

use super::error::classify_status;
use super::{
    normalize_response, ApiError, GeminiProvider, OllamaProvider, OpenAiProvider, ProviderConfig,
    ProviderType, TextGenerator,
};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

/// Fixed prompt used to check a credential without side effects
pub const CANARY_PAYLOAD: &str = "Reply with the single word: OK";

/// The closed set of backends, selected by [`ProviderType`]
pub enum Provider {
    Gemini(GeminiProvider),
    OpenAi(OpenAiProvider),
    Ollama(OllamaProvider),
}

impl Provider {
    /// Check preconditions and build the backend named by `config.provider`.
    /// Fails before any I/O when the credential is missing.
    pub fn from_config(client: Client, config: &ProviderConfig) -> Result<Self, ApiError> {
        config.validate()?;

        let provider = match config.provider {
            ProviderType::Gemini => Provider::Gemini(GeminiProvider::new(client, config)?),
            ProviderType::OpenAI => Provider::OpenAi(OpenAiProvider::new(client, config)?),
            ProviderType::Ollama => Provider::Ollama(OllamaProvider::new(client, config)),
        };
        Ok(provider)
    }

    fn inner(&self) -> &dyn TextGenerator {
        match self {
            Provider::Gemini(p) => p,
            Provider::OpenAi(p) => p,
            Provider::Ollama(p) => p,
        }
    }
}

#[async_trait]
impl TextGenerator for Provider {
    async fn generate(&self, payload: &str) -> Result<String, ApiError> {
        self.inner().generate(payload).await
    }

    fn provider_type(&self) -> ProviderType {
        self.inner().provider_type()
    }

    fn model(&self) -> &str {
        self.inner().model()
    }
}

/// Send a prepared request and return the JSON body of a successful response.
///
/// Transport failures become `NetworkError`; non-2xx statuses are classified.
/// A 2xx body that is not JSON comes back as `Value::Null` so the caller's
/// extraction reports it as an empty response.
pub(crate) async fn send_json(
    provider: ProviderType,
    model: &str,
    request: RequestBuilder,
) -> Result<Value, ApiError> {
    let response = request.send().await.map_err(|e| {
        warn!(%provider, error = %e, "request failed before a response arrived");
        ApiError::network(provider, &e)
    })?;

    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| ApiError::network(provider, &e))?;

    if !status.is_success() {
        let err = classify_status(provider, status.as_u16(), &body, model);
        warn!(
            %provider,
            status = status.as_u16(),
            kind = ?err.kind(),
            "provider returned an error"
        );
        return Err(err);
    }

    Ok(serde_json::from_str(&body).unwrap_or_else(|e| {
        debug!(%provider, error = %e, "response body is not JSON");
        Value::Null
    }))
}

/// Send `payload` to the provider selected by `config` and return the
/// normalized text. Exactly one attempt is made.
pub async fn dispatch(
    client: &Client,
    payload: &str,
    config: &ProviderConfig,
) -> Result<String, ApiError> {
    let provider = Provider::from_config(client.clone(), config)?;

    info!(
        provider = %provider.provider_type(),
        model = provider.model(),
        payload_chars = payload.len(),
        "dispatching payload"
    );

    let raw = provider.generate(payload).await?;
    let text = normalize_response(&raw);

    if text.is_empty() {
        return Err(ApiError::EmptyResponse {
            provider: config.provider,
        });
    }

    Ok(text)
}

/// Outcome of a credential check
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProviderTestResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ApiError>,
}

/// Dispatch the canary payload to check that `config` works. Nothing is
/// persisted either way.
pub async fn test_provider(client: &Client, config: &ProviderConfig) -> ProviderTestResult {
    match dispatch(client, CANARY_PAYLOAD, config).await {
        Ok(_) => ProviderTestResult {
            success: true,
            error: None,
        },
        Err(error) => ProviderTestResult {
            success: false,
            error: Some(error),
        },
    }
}
