//! Generation parameters shared by all request envelopes

use super::{ProviderConfig, ProviderType};
use std::time::Duration;

/// Kept low so rewrites stay close to the user's intent
pub const DEFAULT_TEMPERATURE: f32 = 0.4;

pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Sampling and size limits sent with every request
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationParams {
    pub temperature: f32,
    /// Output length cap; always sent
    pub max_output_tokens: u32,
    pub timeout: Duration,
}

impl GenerationParams {
    pub fn for_provider(provider: ProviderType) -> Self {
        let max_output_tokens = match provider {
            ProviderType::Gemini => 8192,
            ProviderType::OpenAI | ProviderType::Ollama => 4096,
        };

        Self {
            temperature: DEFAULT_TEMPERATURE,
            max_output_tokens,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    pub fn from_config(config: &ProviderConfig) -> Self {
        Self {
            timeout: config.timeout(),
            ..Self::for_provider(config.provider)
        }
    }
}
