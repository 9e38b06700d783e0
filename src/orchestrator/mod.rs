//! Optimization orchestration
//!
//! Ties the pipeline together for one request:
//! - validate the raw text and provider preconditions
//! - assemble the payload
//! - dispatch it once and normalize the reply
//!
//! The orchestrator owns nothing but an HTTP client, so a single instance can
//! serve any number of concurrent requests.

mod comparison;

pub use comparison::Comparison;

use crate::api::{self, ApiError, ProviderConfig, ProviderTestResult};
use crate::payload::{assemble, ContextFile, PreferenceSet};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Everything one optimization needs
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OptimizeRequest {
    pub raw_text: String,
    #[serde(default)]
    pub preferences: PreferenceSet,
    #[serde(default)]
    pub scraped_filenames: Vec<String>,
    #[serde(default)]
    pub context_files: Vec<ContextFile>,
    /// Overrides the provider's default model
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

impl OptimizeRequest {
    pub fn new(raw_text: impl Into<String>, preferences: PreferenceSet) -> Self {
        Self {
            raw_text: raw_text.into(),
            preferences,
            ..Self::default()
        }
    }

    pub fn with_filenames(mut self, filenames: Vec<String>) -> Self {
        self.scraped_filenames = filenames;
        self
    }

    pub fn with_files(mut self, files: Vec<ContextFile>) -> Self {
        self.context_files = files;
        self
    }

    pub fn with_model(mut self, model: Option<String>) -> Self {
        self.model = model;
        self
    }

    pub fn with_timeout_secs(mut self, secs: Option<u64>) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// Provider settings from the preferences plus this request's overrides
    pub fn provider_config(&self) -> ProviderConfig {
        ProviderConfig {
            model: self.model.clone(),
            timeout_secs: self.timeout_secs,
            ..self.preferences.provider_config()
        }
    }
}

/// Outcome of [`Orchestrator::optimize`]: either the optimized text or the
/// classified error, never both.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OptimizationResult {
    ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<ApiError>,
}

impl OptimizationResult {
    pub fn success(text: String) -> Self {
        Self {
            ok: true,
            text: Some(text),
            error: None,
        }
    }

    pub fn failure(error: ApiError) -> Self {
        Self {
            ok: false,
            text: None,
            error: Some(error),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.ok
    }

    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    pub fn error(&self) -> Option<&ApiError> {
        self.error.as_ref()
    }

    pub fn into_result(self) -> Result<String, ApiError> {
        match (self.text, self.error) {
            (Some(text), None) => Ok(text),
            (_, Some(error)) => Err(error),
            (None, None) => Err(ApiError::InvalidArgument(
                "optimization produced neither text nor error".to_string(),
            )),
        }
    }
}

impl From<Result<String, ApiError>> for OptimizationResult {
    fn from(result: Result<String, ApiError>) -> Self {
        match result {
            Ok(text) => Self::success(text),
            Err(error) => Self::failure(error),
        }
    }
}

/// Runs the optimization pipeline
#[derive(Debug, Clone, Default)]
pub struct Orchestrator {
    client: Client,
}

impl Orchestrator {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// The payload that `optimize` would send for this request
    pub fn payload_for(&self, request: &OptimizeRequest) -> String {
        assemble(
            &request.raw_text,
            &request.preferences,
            &request.scraped_filenames,
            &request.context_files,
        )
    }

    pub async fn optimize(&self, request: &OptimizeRequest) -> OptimizationResult {
        self.run(request).await.into()
    }

    async fn run(&self, request: &OptimizeRequest) -> Result<String, ApiError> {
        if request.raw_text.trim().is_empty() {
            return Err(ApiError::InvalidArgument("prompt text is empty".to_string()));
        }

        let config = request.provider_config();
        config.validate()?;

        let payload = self.payload_for(request);
        debug!(
            payload_chars = payload.len(),
            filenames = request.scraped_filenames.len(),
            files = request.context_files.len(),
            "payload assembled"
        );

        match api::dispatch(&self.client, &payload, &config).await {
            Ok(text) => {
                info!(provider = %config.provider, chars = text.len(), "optimization complete");
                Ok(text)
            }
            Err(e) => {
                warn!(provider = %config.provider, kind = ?e.kind(), "optimization failed: {}", e);
                Err(e)
            }
        }
    }

    /// Check the credentials in `preferences` with the canary payload
    pub async fn test_provider(&self, preferences: &PreferenceSet) -> ProviderTestResult {
        api::test_provider(&self.client, &preferences.provider_config()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{ErrorKind, ProviderType};
    use serde_json::json;
    use wiremock::matchers::{any, body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn ollama_prefs(server: &MockServer) -> PreferenceSet {
        PreferenceSet {
            provider: ProviderType::Ollama,
            ollama_url: Some(server.uri()),
            ..PreferenceSet::default()
        }
    }

    #[tokio::test]
    async fn test_optimize_success() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .and(body_string_contains("--- ORIGINAL PROMPT ---"))
            .and(body_string_contains("--- FILES DETECTED ON PAGE ---"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "response": "Optimized prompt:\nRefactor parser.rs to remove the global state.",
                "done": true
            })))
            .expect(1)
            .mount(&server)
            .await;

        let request = OptimizeRequest::new("fix parser", ollama_prefs(&server))
            .with_filenames(vec!["parser.rs".to_string()]);
        let result = Orchestrator::default().optimize(&request).await;

        assert!(result.is_ok());
        assert_eq!(
            result.text(),
            Some("Refactor parser.rs to remove the global state.")
        );
        assert!(result.error().is_none());
    }

    #[tokio::test]
    async fn test_blank_text_is_rejected_without_request() {
        let server = MockServer::start().await;

        Mock::given(any())
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let request = OptimizeRequest::new("   \n", ollama_prefs(&server));
        let result = Orchestrator::default().optimize(&request).await;

        assert!(!result.is_ok());
        assert_eq!(result.error().unwrap().kind(), ErrorKind::InvalidArgument);
    }

    #[tokio::test]
    async fn test_missing_credential_passes_through() {
        let request = OptimizeRequest::new("write a test", PreferenceSet::default());
        let result = Orchestrator::default().optimize(&request).await;

        assert_eq!(
            result.clone().into_result().unwrap_err(),
            ApiError::MissingCredential {
                provider: ProviderType::Gemini
            }
        );

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["ok"], false);
        assert_eq!(json["error"]["kind"], "missing_credential");
        assert!(json.get("text").is_none());
    }

    #[tokio::test]
    async fn test_provider_error_passes_through() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let request = OptimizeRequest::new("tidy this", ollama_prefs(&server));
        let result = Orchestrator::default().optimize(&request).await;

        assert_eq!(result.error().unwrap().kind(), ErrorKind::ProviderUnavailable);
    }

    #[tokio::test]
    async fn test_model_override_reaches_provider() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(body_string_contains("\"model\":\"qwen2.5-coder\""))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "response": "done" })))
            .expect(1)
            .mount(&server)
            .await;

        let request = OptimizeRequest::new("tidy this", ollama_prefs(&server))
            .with_model(Some("qwen2.5-coder".to_string()));
        let result = Orchestrator::default().optimize(&request).await;

        assert_eq!(result.into_result().unwrap(), "done");
    }

    #[test]
    fn test_success_serialization() {
        let json = serde_json::to_value(OptimizationResult::success("better".to_string())).unwrap();
        assert_eq!(json, json!({ "ok": true, "text": "better" }));
    }

    #[test]
    fn test_payload_for_matches_assembler() {
        let prefs = PreferenceSet::default();
        let request = OptimizeRequest::new("hello", prefs.clone());

        assert_eq!(
            Orchestrator::default().payload_for(&request),
            assemble("hello", &prefs, &[], &[])
        );
    }

    #[test]
    fn test_request_without_preferences_uses_defaults() {
        let request: OptimizeRequest = serde_json::from_value(json!({
            "raw_text": "add tests",
            "scraped_filenames": ["lib.rs"]
        }))
        .unwrap();

        assert_eq!(request.preferences, PreferenceSet::default());
        assert!(request.context_files.is_empty());
        assert_eq!(request.provider_config().provider, ProviderType::Gemini);
    }
}
