//! Configuration management for the prompt optimizer
//!
//! Supports configuration via:
//! 1. Config file (~/.config/prompt-optimizer/config.toml)
//! 2. Environment variables (GEMINI_API_KEY, OPENAI_API_KEY, OLLAMA_URL,
//!    PROMPT_OPTIMIZER_PROVIDER)
//! 3. CLI arguments (override file/env settings)

use crate::api::{ProviderConfig, ProviderType, DEFAULT_TIMEOUT_SECS};
use crate::orchestrator::OptimizeRequest;
use crate::payload::PreferenceSet;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;
use tracing::warn;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    SerializeError(#[from] toml::ser::Error),

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Unknown config key: {0}")]
    UnknownKey(String),
}

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directives, snippets, provider choice and credentials
    pub preferences: PreferenceSet,

    /// Request settings
    pub generation: GenerationSettings,

    /// Optimization history
    pub history: HistorySettings,
}

/// Per-request generation settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationSettings {
    /// Upper bound on a single provider request
    pub timeout_secs: u64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub gemini_model: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub openai_model: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub ollama_model: Option<String>,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            gemini_model: None,
            openai_model: None,
            ollama_model: None,
        }
    }
}

impl GenerationSettings {
    /// Model override for `provider`, if one is set
    pub fn model_for(&self, provider: ProviderType) -> Option<&str> {
        let model = match provider {
            ProviderType::Gemini => &self.gemini_model,
            ProviderType::OpenAI => &self.openai_model,
            ProviderType::Ollama => &self.ollama_model,
        };
        model.as_deref().filter(|m| !m.trim().is_empty())
    }
}

/// History settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistorySettings {
    /// Record successful optimizations
    pub enabled: bool,

    /// Oldest entries are dropped past this count
    pub max_entries: usize,

    /// Custom history file (defaults to the data dir)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

impl Default for HistorySettings {
    fn default() -> Self {
        Self {
            enabled: true,
            max_entries: 100,
            path: None,
        }
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Ok(true),
        "false" | "no" | "off" | "0" => Ok(false),
        _ => Err(ConfigError::Invalid(format!("{} expects true or false, got '{}'", key, value))),
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::Invalid(format!("{} expects a number, got '{}'", key, value)))
}

fn optional(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

fn mask(secret: &Option<String>) -> Option<String> {
    secret.as_ref().map(|s| {
        let visible: String = s.chars().take(4).collect();
        format!("{}…", visible)
    })
}

impl Config {
    /// Get default config file path
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("prompt-optimizer")
            .join("config.toml")
    }

    /// Load config from default location
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(Self::default_path())
    }

    /// Load config from specific path. A missing file yields the defaults.
    pub fn load_from(path: PathBuf) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default().with_env_overrides());
        }

        let content = std::fs::read_to_string(&path)?;
        let config: Config = toml::from_str(&content)?;

        Ok(config.with_env_overrides())
    }

    /// Apply environment variable overrides
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    fn with_overrides_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let prefs = &mut self.preferences;

        if let Some(key) = lookup("GEMINI_API_KEY").and_then(|v| optional(&v)) {
            prefs.api_key = Some(key);
        }
        if let Some(key) = lookup("OPENAI_API_KEY").and_then(|v| optional(&v)) {
            prefs.openai_key = Some(key);
        }
        if let Some(url) = lookup("OLLAMA_URL").and_then(|v| optional(&v)) {
            prefs.ollama_url = Some(url);
        }
        if let Some(name) = lookup("PROMPT_OPTIMIZER_PROVIDER") {
            match name.parse() {
                Ok(provider) => prefs.provider = provider,
                Err(_) => warn!("Ignoring PROMPT_OPTIMIZER_PROVIDER={}: unknown provider", name),
            }
        }

        self
    }

    /// Save config to default location
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(Self::default_path())
    }

    /// Save config to specific path
    pub fn save_to(&self, path: PathBuf) -> Result<(), ConfigError> {
        // Create parent directories if needed
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(&path, content)?;

        Ok(())
    }

    /// Validate configuration for the selected provider
    pub fn validate(&self) -> Result<(), ConfigError> {
        let provider = self.preferences.provider;

        if provider.requires_credential() && self.provider_config().credential().is_none() {
            let (env, key) = match provider {
                ProviderType::OpenAI => ("OPENAI_API_KEY", "preferences.openai_key"),
                _ => ("GEMINI_API_KEY", "preferences.api_key"),
            };
            return Err(ConfigError::MissingRequired(format!(
                "{} needs an API key ({} or {})",
                provider, env, key
            )));
        }

        if self.generation.timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "generation.timeout_secs must be at least 1".to_string(),
            ));
        }

        if self.history.enabled && self.history.max_entries == 0 {
            return Err(ConfigError::Invalid(
                "history.max_entries must be at least 1 when history is enabled".to_string(),
            ));
        }

        self.provider_config()
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))
    }

    /// Owned copy of the preferences for one call
    pub fn snapshot(&self) -> PreferenceSet {
        self.preferences.clone()
    }

    /// Provider settings with the configured model and timeout applied
    pub fn provider_config(&self) -> ProviderConfig {
        let provider = self.preferences.provider;
        ProviderConfig {
            model: self.generation.model_for(provider).map(str::to_string),
            timeout_secs: Some(self.generation.timeout_secs),
            ..self.preferences.provider_config()
        }
    }

    /// Start an optimization request from the current settings
    pub fn optimize_request(&self, raw_text: impl Into<String>) -> OptimizeRequest {
        let provider = self.preferences.provider;
        OptimizeRequest::new(raw_text, self.snapshot())
            .with_model(self.generation.model_for(provider).map(str::to_string))
            .with_timeout_secs(Some(self.generation.timeout_secs))
    }

    /// Set one value by its dotted key, as used by `config set`
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let prefs = &mut self.preferences;
        match key {
            "provider" | "preferences.provider" => {
                prefs.provider = value
                    .parse::<ProviderType>()
                    .map_err(|e| ConfigError::Invalid(e.to_string()))?;
            }
            "api_key" | "preferences.api_key" => prefs.api_key = optional(value),
            "openai_key" | "preferences.openai_key" => prefs.openai_key = optional(value),
            "ollama_url" | "preferences.ollama_url" => prefs.ollama_url = optional(value),
            "no_readme" | "preferences.no_readme" => prefs.no_readme = parse_bool(key, value)?,
            "full_code" | "preferences.full_code" => prefs.full_code = parse_bool(key, value)?,
            "short_summary" | "preferences.short_summary" => {
                prefs.short_summary = parse_bool(key, value)?
            }
            "prefer_vanilla" | "preferences.prefer_vanilla" => {
                prefs.prefer_vanilla = parse_bool(key, value)?
            }
            "always_include_text" | "preferences.always_include_text" => {
                prefs.always_include_text = value.to_string()
            }
            // Appends one snippet; an empty value clears the list
            "saved_snippets" | "preferences.saved_snippets" => {
                if value.is_empty() {
                    prefs.saved_snippets.clear();
                } else {
                    prefs.saved_snippets.push(value.to_string());
                }
            }
            "generation.timeout_secs" => {
                self.generation.timeout_secs = parse_number(key, value)?
            }
            "generation.gemini_model" => self.generation.gemini_model = optional(value),
            "generation.openai_model" => self.generation.openai_model = optional(value),
            "generation.ollama_model" => self.generation.ollama_model = optional(value),
            "history.enabled" => self.history.enabled = parse_bool(key, value)?,
            "history.max_entries" => self.history.max_entries = parse_number(key, value)?,
            _ => return Err(ConfigError::UnknownKey(key.to_string())),
        }
        Ok(())
    }

    /// Copy with credentials shortened for display
    pub fn redacted(&self) -> Self {
        let mut config = self.clone();
        config.preferences.api_key = mask(&self.preferences.api_key);
        config.preferences.openai_key = mask(&self.preferences.openai_key);
        config
    }

    /// Generate example config content
    pub fn example() -> String {
        let mut example = Config::default();
        example.preferences.always_include_text =
            "Target Rust 1.80 and keep the public API stable.".to_string();
        example.preferences.saved_snippets = vec!["Prefer small, focused functions.".to_string()];
        example.generation.ollama_model = Some("llama3.2".to_string());
        toml::to_string_pretty(&example).unwrap_or_default()
    }
}

/// Builder for creating Config programmatically
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    pub fn provider(mut self, provider: ProviderType) -> Self {
        self.config.preferences.provider = provider;
        self
    }

    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.preferences.api_key = Some(key.into());
        self
    }

    pub fn openai_key(mut self, key: impl Into<String>) -> Self {
        self.config.preferences.openai_key = Some(key.into());
        self
    }

    pub fn ollama_url(mut self, url: impl Into<String>) -> Self {
        self.config.preferences.ollama_url = Some(url.into());
        self
    }

    pub fn model(mut self, provider: ProviderType, model: impl Into<String>) -> Self {
        let model = Some(model.into());
        match provider {
            ProviderType::Gemini => self.config.generation.gemini_model = model,
            ProviderType::OpenAI => self.config.generation.openai_model = model,
            ProviderType::Ollama => self.config.generation.ollama_model = model,
        }
        self
    }

    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.config.generation.timeout_secs = secs;
        self
    }

    pub fn always_include(mut self, text: impl Into<String>) -> Self {
        self.config.preferences.always_include_text = text.into();
        self
    }

    pub fn snippet(mut self, snippet: impl Into<String>) -> Self {
        self.config.preferences.saved_snippets.push(snippet.into());
        self
    }

    pub fn history_max_entries(mut self, max: usize) -> Self {
        self.config.history.max_entries = max;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.preferences.provider, ProviderType::Gemini);
        assert_eq!(config.generation.timeout_secs, 60);
        assert_eq!(config.history.max_entries, 100);
        assert!(config.history.enabled);
    }

    #[test]
    fn test_config_builder() {
        let config = ConfigBuilder::new()
            .provider(ProviderType::OpenAI)
            .openai_key("sk-test")
            .model(ProviderType::OpenAI, "gpt-4o")
            .timeout_secs(15)
            .build();

        let provider = config.provider_config();
        assert_eq!(provider.provider, ProviderType::OpenAI);
        assert_eq!(provider.credential(), Some("sk-test"));
        assert_eq!(provider.model(), "gpt-4o");
        assert_eq!(provider.timeout_secs, Some(15));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_example_config() {
        let example = Config::example();
        assert!(example.contains("[preferences]"));
        assert!(example.contains("[generation]"));
        assert!(example.contains("[history]"));

        let parsed: Config = toml::from_str(&example).unwrap();
        assert_eq!(parsed.generation.ollama_model.as_deref(), Some("llama3.2"));
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let config = ConfigBuilder::new()
            .provider(ProviderType::Ollama)
            .ollama_url("http://127.0.0.1:11434")
            .always_include("Use tabs.")
            .snippet("Be brief.")
            .history_max_entries(5)
            .build();
        config.save_to(path.clone()).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let loaded: Config = toml::from_str(&content).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.generation, GenerationSettings::default());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config: Config = toml::from_str("[preferences]\nfull_code = false\n").unwrap();
        assert!(!config.preferences.full_code);
        assert!(config.preferences.no_readme);
        assert_eq!(config.history.max_entries, 100);
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("OPENAI_API_KEY", "sk-env"),
            ("OLLAMA_URL", "http://gpu-box:11434"),
            ("PROMPT_OPTIMIZER_PROVIDER", "openai"),
            ("GEMINI_API_KEY", "  "),
        ]
        .into_iter()
        .collect();

        let config = ConfigBuilder::new()
            .api_key("from-file")
            .build()
            .with_overrides_from(|k| env.get(k).map(|v| v.to_string()));

        assert_eq!(config.preferences.provider, ProviderType::OpenAI);
        assert_eq!(config.preferences.openai_key.as_deref(), Some("sk-env"));
        assert_eq!(config.preferences.ollama_url.as_deref(), Some("http://gpu-box:11434"));
        assert_eq!(config.preferences.api_key.as_deref(), Some("from-file"));
    }

    #[test]
    fn test_unknown_env_provider_ignored() {
        let config = Config::default()
            .with_overrides_from(|k| {
                (k == "PROMPT_OPTIMIZER_PROVIDER").then(|| "claude".to_string())
            });
        assert_eq!(config.preferences.provider, ProviderType::Gemini);
    }

    #[test]
    fn test_validate() {
        let err = Config::default().validate().unwrap_err();
        assert!(matches!(err, ConfigError::MissingRequired(_)));
        assert!(err.to_string().contains("GEMINI_API_KEY"));

        let ollama = ConfigBuilder::new().provider(ProviderType::Ollama).build();
        assert!(ollama.validate().is_ok());

        let bad_timeout = ConfigBuilder::new()
            .provider(ProviderType::Ollama)
            .timeout_secs(0)
            .build();
        assert!(matches!(bad_timeout.validate(), Err(ConfigError::Invalid(_))));

        let bad_url = ConfigBuilder::new()
            .provider(ProviderType::Ollama)
            .ollama_url("localhost:11434")
            .build();
        assert!(matches!(bad_url.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_set_values() {
        let mut config = Config::default();
        config.set("provider", "ollama").unwrap();
        config.set("preferences.short_summary", "off").unwrap();
        config.set("history.max_entries", "25").unwrap();
        config.set("generation.ollama_model", "phi3").unwrap();

        assert_eq!(config.preferences.provider, ProviderType::Ollama);
        assert!(!config.preferences.short_summary);
        assert_eq!(config.history.max_entries, 25);
        assert_eq!(config.provider_config().model(), "phi3");

        assert!(matches!(config.set("nope", "1"), Err(ConfigError::UnknownKey(_))));
        assert!(matches!(config.set("no_readme", "maybe"), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_set_saved_snippets_appends_and_clears() {
        let mut config = Config::default();
        config.set("saved_snippets", "Use tabs.").unwrap();
        config.set("preferences.saved_snippets", "  No unwrap.").unwrap();
        assert_eq!(
            config.preferences.saved_snippets,
            vec!["Use tabs.".to_string(), "  No unwrap.".to_string()]
        );

        config.set("saved_snippets", "").unwrap();
        assert!(config.preferences.saved_snippets.is_empty());
    }

    #[test]
    fn test_redacted_hides_keys() {
        let config = ConfigBuilder::new().api_key("AIzaSyExample").build().redacted();
        assert_eq!(config.preferences.api_key.as_deref(), Some("AIza…"));
    }

    #[test]
    fn test_optimize_request_carries_settings() {
        let config = ConfigBuilder::new()
            .provider(ProviderType::Ollama)
            .model(ProviderType::Ollama, "mistral")
            .timeout_secs(30)
            .build();
        let request = config.optimize_request("do it");

        assert_eq!(request.raw_text, "do it");
        assert_eq!(request.model.as_deref(), Some("mistral"));
        assert_eq!(request.provider_config().timeout_secs, Some(30));
    }
}
