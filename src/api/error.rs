//! Failure taxonomy shared by every provider

use super::ProviderType;
use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;
use thiserror::Error;

/// Discriminant of [`ApiError`], for matching and reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    MissingCredential,
    EmptyResponse,
    BadRequest,
    InvalidCredential,
    RateLimited,
    QuotaExceeded,
    ProviderUnavailable,
    ModelNotFound,
    NetworkError,
    ContentBlocked,
    InvalidArgument,
}

/// A classified provider failure. Every variant displays as a ready-to-show
/// message; raw response bodies never make it in here.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    #[error("{provider} API key is not set. Add it to your config or environment first.")]
    MissingCredential { provider: ProviderType },

    #[error("{provider} returned an empty response. Try again or shorten the prompt.")]
    EmptyResponse { provider: ProviderType },

    #[error("{provider} rejected the request: {message}")]
    BadRequest {
        provider: ProviderType,
        message: String,
    },

    #[error("{provider} rejected the API key. Check that it is valid and has access to the model.")]
    InvalidCredential { provider: ProviderType },

    #[error("{provider} rate limit reached. Wait a moment and try again.")]
    RateLimited { provider: ProviderType },

    #[error("{provider} quota exceeded. Check your plan and billing details.")]
    QuotaExceeded { provider: ProviderType },

    #[error("{provider} is temporarily unavailable (HTTP {status}). Try again later.")]
    ProviderUnavailable { provider: ProviderType, status: u16 },

    #[error("Model '{model}' is not installed in Ollama. Run `ollama pull {model}` and try again.")]
    ModelNotFound { model: String },

    #[error("Could not reach {provider}: {message}")]
    NetworkError {
        provider: ProviderType,
        message: String,
    },

    #[error("{provider} declined to answer ({reason}). Rephrase the prompt and try again.")]
    ContentBlocked {
        provider: ProviderType,
        reason: String,
    },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl ApiError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ApiError::MissingCredential { .. } => ErrorKind::MissingCredential,
            ApiError::EmptyResponse { .. } => ErrorKind::EmptyResponse,
            ApiError::BadRequest { .. } => ErrorKind::BadRequest,
            ApiError::InvalidCredential { .. } => ErrorKind::InvalidCredential,
            ApiError::RateLimited { .. } => ErrorKind::RateLimited,
            ApiError::QuotaExceeded { .. } => ErrorKind::QuotaExceeded,
            ApiError::ProviderUnavailable { .. } => ErrorKind::ProviderUnavailable,
            ApiError::ModelNotFound { .. } => ErrorKind::ModelNotFound,
            ApiError::NetworkError { .. } => ErrorKind::NetworkError,
            ApiError::ContentBlocked { .. } => ErrorKind::ContentBlocked,
            ApiError::InvalidArgument(_) => ErrorKind::InvalidArgument,
        }
    }

    pub(crate) fn network(provider: ProviderType, err: &reqwest::Error) -> Self {
        let message = if err.is_timeout() {
            "the request timed out".to_string()
        } else if err.is_connect() {
            "connection failed".to_string()
        } else {
            err.to_string()
        };
        ApiError::NetworkError { provider, message }
    }
}

impl Serialize for ApiError {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("ApiError", 2)?;
        state.serialize_field("kind", &self.kind())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

/// Map a non-success HTTP status to an [`ApiError`].
///
/// `model` is only used for Ollama's "model not pulled" 404.
pub(crate) fn classify_status(
    provider: ProviderType,
    status: u16,
    body: &str,
    model: &str,
) -> ApiError {
    let json: Value = serde_json::from_str(body).unwrap_or(Value::Null);

    match status {
        400 => ApiError::BadRequest {
            provider,
            message: "the request was malformed. Check the model name and prompt size.".to_string(),
        },
        401 | 403 => ApiError::InvalidCredential { provider },
        402 if provider == ProviderType::OpenAI => ApiError::QuotaExceeded { provider },
        404 if provider == ProviderType::Ollama => ApiError::ModelNotFound {
            model: model.to_string(),
        },
        429 if provider == ProviderType::OpenAI
            && json["error"]["code"].as_str() == Some("insufficient_quota") =>
        {
            ApiError::QuotaExceeded { provider }
        }
        429 => ApiError::RateLimited { provider },
        500..=599 => ApiError::ProviderUnavailable { provider, status },
        _ => ApiError::BadRequest {
            provider,
            message: provider_message(&json)
                .unwrap_or_else(|| format!("unexpected HTTP status {}", status)),
        },
    }
}

/// The provider's own human-readable error text, if the body carries one.
///
/// Gemini and OpenAI use `{"error": {"message": ...}}`, Ollama `{"error": "..."}`.
fn provider_message(json: &Value) -> Option<String> {
    json["error"]["message"]
        .as_str()
        .or_else(|| json["error"].as_str())
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let gemini = ProviderType::Gemini;
        assert_eq!(classify_status(gemini, 400, "", "m").kind(), ErrorKind::BadRequest);
        assert_eq!(classify_status(gemini, 401, "", "m").kind(), ErrorKind::InvalidCredential);
        assert_eq!(classify_status(gemini, 403, "", "m").kind(), ErrorKind::InvalidCredential);
        assert_eq!(classify_status(gemini, 429, "", "m").kind(), ErrorKind::RateLimited);
        assert_eq!(classify_status(gemini, 503, "", "m").kind(), ErrorKind::ProviderUnavailable);
    }

    #[test]
    fn test_provider_specific_statuses() {
        assert_eq!(
            classify_status(ProviderType::OpenAI, 402, "", "m").kind(),
            ErrorKind::QuotaExceeded
        );
        // 402 is only meaningful for OpenAI
        assert_eq!(
            classify_status(ProviderType::Gemini, 402, "", "m").kind(),
            ErrorKind::BadRequest
        );
        assert_eq!(
            classify_status(ProviderType::Ollama, 404, "", "llama3.2"),
            ApiError::ModelNotFound {
                model: "llama3.2".to_string()
            }
        );
    }

    #[test]
    fn test_openai_insufficient_quota() {
        let body =
            r#"{"error":{"message":"You exceeded your current quota","code":"insufficient_quota"}}"#;
        assert_eq!(
            classify_status(ProviderType::OpenAI, 429, body, "m").kind(),
            ErrorKind::QuotaExceeded
        );
    }

    #[test]
    fn test_unknown_status_uses_provider_message() {
        let body = r#"{"error":{"code":404,"message":"models/nope is not found"}}"#;
        let err = classify_status(ProviderType::Gemini, 404, body, "nope");
        assert_eq!(err.kind(), ErrorKind::BadRequest);
        assert!(err.to_string().contains("models/nope is not found"));

        let err = classify_status(ProviderType::Ollama, 418, r#"{"error":"teapot"}"#, "m");
        assert!(err.to_string().contains("teapot"));
    }

    #[test]
    fn test_raw_body_never_leaks() {
        let err = classify_status(ProviderType::Gemini, 418, "<html>stack trace</html>", "m");
        assert!(!err.to_string().contains("stack trace"));
        assert!(err.to_string().contains("418"));
    }

    #[test]
    fn test_serializes_kind_and_message() {
        let err = ApiError::RateLimited {
            provider: ProviderType::OpenAI,
        };
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["kind"], "rate_limited");
        assert_eq!(json["message"], err.to_string());
    }
}
