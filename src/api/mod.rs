//! Provider abstraction for the text generation backends
//!
//! Each backend implements [`TextGenerator`]. [`Provider`] is the closed set
//! of backends, selected by [`ProviderType`] and built from a
//! [`ProviderConfig`] after its credential precondition has been checked.

mod client;
mod error;
mod gemini;
mod ollama;
mod openai;
mod request;
mod response;

pub use client::{dispatch, test_provider, Provider, ProviderTestResult, CANARY_PAYLOAD};
pub use error::{ApiError, ErrorKind};
pub use gemini::GeminiProvider;
pub use ollama::OllamaProvider;
pub use openai::OpenAiProvider;
pub use request::{GenerationParams, DEFAULT_TEMPERATURE, DEFAULT_TIMEOUT_SECS};
pub use response::{normalize_response, PREAMBLE_PATTERNS};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Default address of a local Ollama server
pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderType {
    #[default]
    Gemini,
    OpenAI,
    Ollama,
}

impl ProviderType {
    pub fn default_model(&self) -> &'static str {
        match self {
            ProviderType::Gemini => "gemini-2.0-flash",
            ProviderType::OpenAI => "gpt-4o-mini",
            ProviderType::Ollama => "llama3.2",
        }
    }

    /// Whether a credential must be present before dispatching
    pub fn requires_credential(&self) -> bool {
        !matches!(self, ProviderType::Ollama)
    }
}

impl fmt::Display for ProviderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProviderType::Gemini => "Gemini",
            ProviderType::OpenAI => "OpenAI",
            ProviderType::Ollama => "Ollama",
        };
        f.write_str(name)
    }
}

impl FromStr for ProviderType {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "gemini" | "google" => Ok(ProviderType::Gemini),
            "openai" | "gpt" => Ok(ProviderType::OpenAI),
            "ollama" | "local" => Ok(ProviderType::Ollama),
            other => Err(ApiError::InvalidArgument(format!(
                "unknown provider '{}' (expected gemini, openai or ollama)",
                other
            ))),
        }
    }
}

/// Everything needed to reach one provider
///
/// Only the credential matching `provider` is consulted; the others are
/// carried along so a whole preference snapshot converts losslessly.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub provider: ProviderType,
    /// Gemini API key
    pub api_key: Option<String>,
    pub openai_key: Option<String>,
    /// Base URL of the Ollama server (default: http://localhost:11434)
    pub ollama_url: Option<String>,
    /// Model override; the provider default is used when unset
    pub model: Option<String>,
    /// Endpoint override for the cloud providers
    pub base_url: Option<String>,
    /// Request timeout override in seconds
    pub timeout_secs: Option<u64>,
}

impl ProviderConfig {
    pub fn new(provider: ProviderType) -> Self {
        Self {
            provider,
            ..Default::default()
        }
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn with_openai_key(mut self, key: impl Into<String>) -> Self {
        self.openai_key = Some(key.into());
        self
    }

    pub fn with_ollama_url(mut self, url: impl Into<String>) -> Self {
        self.ollama_url = Some(url.into());
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }

    /// The non-blank credential for the selected provider, if any
    pub fn credential(&self) -> Option<&str> {
        let key = match self.provider {
            ProviderType::Gemini => self.api_key.as_deref(),
            ProviderType::OpenAI => self.openai_key.as_deref(),
            ProviderType::Ollama => None,
        };
        key.map(str::trim).filter(|k| !k.is_empty())
    }

    pub fn model(&self) -> &str {
        self.model
            .as_deref()
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| self.provider.default_model())
    }

    pub fn ollama_url(&self) -> &str {
        self.ollama_url
            .as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .unwrap_or(DEFAULT_OLLAMA_URL)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS))
    }

    /// Check preconditions without touching the network
    pub fn validate(&self) -> Result<(), ApiError> {
        match self.provider {
            ProviderType::Gemini | ProviderType::OpenAI => {
                if self.credential().is_none() {
                    return Err(ApiError::MissingCredential {
                        provider: self.provider,
                    });
                }
            }
            ProviderType::Ollama => {
                let url = self.ollama_url();
                match reqwest::Url::parse(url) {
                    Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => {}
                    _ => {
                        return Err(ApiError::InvalidArgument(format!(
                            "Ollama URL '{}' is not a valid http(s) address",
                            url
                        )))
                    }
                }
            }
        }

        if self.timeout_secs == Some(0) {
            return Err(ApiError::InvalidArgument(
                "request timeout must be at least one second".to_string(),
            ));
        }

        Ok(())
    }
}

/// A backend that can turn a payload into generated text
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Send `payload` and return the extracted, not yet normalized, text
    async fn generate(&self, payload: &str) -> Result<String, ApiError>;

    fn provider_type(&self) -> ProviderType;

    fn model(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_type_parse() {
        assert_eq!("gemini".parse::<ProviderType>().unwrap(), ProviderType::Gemini);
        assert_eq!(" OpenAI ".parse::<ProviderType>().unwrap(), ProviderType::OpenAI);
        assert_eq!("ollama".parse::<ProviderType>().unwrap(), ProviderType::Ollama);

        let err = "claude".parse::<ProviderType>().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }

    #[test]
    fn test_missing_gemini_key() {
        let config = ProviderConfig::new(ProviderType::Gemini).with_api_key("");
        let err = config.validate().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingCredential);
    }

    #[test]
    fn test_openai_ignores_gemini_key() {
        let config = ProviderConfig::new(ProviderType::OpenAI).with_api_key("gemini-key");
        assert_eq!(config.validate().unwrap_err().kind(), ErrorKind::MissingCredential);

        let config = config.with_openai_key("sk-test");
        assert!(config.validate().is_ok());
        assert_eq!(config.credential(), Some("sk-test"));
    }

    #[test]
    fn test_ollama_needs_no_credential() {
        let config = ProviderConfig::new(ProviderType::Ollama);
        assert!(config.validate().is_ok());
        assert_eq!(config.ollama_url(), DEFAULT_OLLAMA_URL);
    }

    #[test]
    fn test_ollama_rejects_bad_url() {
        let config = ProviderConfig::new(ProviderType::Ollama).with_ollama_url("localhost:11434");
        assert_eq!(config.validate().unwrap_err().kind(), ErrorKind::InvalidArgument);

        let config = ProviderConfig::new(ProviderType::Ollama).with_ollama_url("not a url");
        assert_eq!(config.validate().unwrap_err().kind(), ErrorKind::InvalidArgument);
    }

    #[test]
    fn test_model_defaults_and_override() {
        let config = ProviderConfig::new(ProviderType::OpenAI);
        assert_eq!(config.model(), "gpt-4o-mini");
        assert_eq!(config.with_model("gpt-4o").model(), "gpt-4o");
    }
}
