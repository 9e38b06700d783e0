//! Payload assembly and the data it is built from
//!
//! A payload is the single string sent to a provider: a fixed instruction
//! block, the user's raw text, then whichever context sections have content.

mod assembler;
mod language;

pub use assembler::{assemble, dedup_filenames, INSTRUCTION_PREAMBLE};
pub use language::language_for_extension;

use crate::api::{ProviderConfig, ProviderType};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Attached files longer than this are cut down to their first lines
pub const MAX_CONTEXT_LINES: usize = 50;

pub const NO_README_DIRECTIVE: &str =
    "Do not generate README files or documentation unless explicitly requested.";
pub const FULL_CODE_DIRECTIVE: &str =
    "Always provide complete code. Never use placeholders like '// rest of code here' or omit sections.";
pub const PREFER_VANILLA_DIRECTIVE: &str =
    "Prefer vanilla/native solutions over adding new libraries or frameworks.";
pub const SHORT_SUMMARY_DIRECTIVE: &str = "End with a short summary of the changes made.";

/// User preferences captured for one optimization call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreferenceSet {
    pub no_readme: bool,
    pub full_code: bool,
    pub short_summary: bool,
    pub prefer_vanilla: bool,
    pub always_include_text: String,
    pub saved_snippets: Vec<String>,
    pub provider: ProviderType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub openai_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ollama_url: Option<String>,
}

impl Default for PreferenceSet {
    fn default() -> Self {
        Self {
            no_readme: true,
            full_code: true,
            short_summary: true,
            prefer_vanilla: true,
            always_include_text: String::new(),
            saved_snippets: Vec::new(),
            provider: ProviderType::default(),
            api_key: None,
            openai_key: None,
            ollama_url: None,
        }
    }
}

impl PreferenceSet {
    /// Directive sentences for every flag that is on, in payload order
    pub fn directives(&self) -> Vec<&'static str> {
        [
            (self.no_readme, NO_README_DIRECTIVE),
            (self.full_code, FULL_CODE_DIRECTIVE),
            (self.prefer_vanilla, PREFER_VANILLA_DIRECTIVE),
            (self.short_summary, SHORT_SUMMARY_DIRECTIVE),
        ]
        .into_iter()
        .filter_map(|(enabled, directive)| enabled.then_some(directive))
        .collect()
    }

    /// Connection settings for the selected provider
    pub fn provider_config(&self) -> ProviderConfig {
        ProviderConfig {
            provider: self.provider,
            api_key: self.api_key.clone(),
            openai_key: self.openai_key.clone(),
            ollama_url: self.ollama_url.clone(),
            ..ProviderConfig::default()
        }
    }
}

/// A file attached as context. Only the first [`MAX_CONTEXT_LINES`] lines are
/// kept; `total_lines` remembers how long the original was.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextFile {
    pub name: String,
    pub extension: String,
    pub text: String,
    pub truncated: bool,
    /// Line count before the cut; 0 means "count `text`"
    #[serde(default)]
    pub total_lines: usize,
}

impl ContextFile {
    pub fn new(name: impl Into<String>, text: &str) -> Self {
        let name = name.into();
        let extension = Path::new(&name)
            .extension()
            .map(|ext| ext.to_string_lossy().into_owned())
            .unwrap_or_default();

        let total_lines = text.lines().count();
        let truncated = total_lines > MAX_CONTEXT_LINES;
        let text = if truncated {
            text.lines()
                .take(MAX_CONTEXT_LINES)
                .collect::<Vec<_>>()
                .join("\n")
        } else {
            text.to_string()
        };

        Self {
            name,
            extension,
            text,
            truncated,
            total_lines,
        }
    }

    /// Original length in lines, falling back to the length of `text`
    pub fn line_count(&self) -> usize {
        if self.total_lines == 0 {
            self.text.lines().count()
        } else {
            self.total_lines
        }
    }

    /// Read a file from disk, naming it by its file name
    pub fn from_path(path: &Path) -> std::io::Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self::new(name, &text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_flags_on() {
        let prefs = PreferenceSet::default();
        assert!(prefs.no_readme && prefs.full_code && prefs.short_summary && prefs.prefer_vanilla);
        assert_eq!(prefs.provider, ProviderType::Gemini);
        assert_eq!(prefs.directives().len(), 4);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let prefs: PreferenceSet =
            toml::from_str("short_summary = false\nprovider = \"ollama\"").unwrap();
        assert!(!prefs.short_summary);
        assert!(prefs.no_readme);
        assert_eq!(prefs.provider, ProviderType::Ollama);
        assert_eq!(
            prefs.directives(),
            vec![NO_README_DIRECTIVE, FULL_CODE_DIRECTIVE, PREFER_VANILLA_DIRECTIVE]
        );
    }

    #[test]
    fn test_provider_config_carries_credentials() {
        let prefs = PreferenceSet {
            provider: ProviderType::OpenAI,
            openai_key: Some("sk-abc".to_string()),
            ..PreferenceSet::default()
        };
        let config = prefs.provider_config();

        assert_eq!(config.provider, ProviderType::OpenAI);
        assert_eq!(config.credential(), Some("sk-abc"));
        assert!(config.model.is_none());
    }

    #[test]
    fn test_context_file_extension() {
        assert_eq!(ContextFile::new("src/main.rs", "fn main() {}").extension, "rs");
        assert_eq!(ContextFile::new("archive.tar.gz", "").extension, "gz");
        assert_eq!(ContextFile::new("Makefile", "all:").extension, "");
    }

    #[test]
    fn test_context_file_truncation() {
        let text = (1..=75).map(|i| format!("line {}", i)).collect::<Vec<_>>().join("\n");
        let file = ContextFile::new("long.py", &text);

        assert!(file.truncated);
        assert_eq!(file.total_lines, 75);
        assert_eq!(file.text.lines().count(), MAX_CONTEXT_LINES);
        assert!(file.text.ends_with("line 50"));

        let exact = (1..=50).map(|i| i.to_string()).collect::<Vec<_>>().join("\n");
        let file = ContextFile::new("ok.py", &exact);
        assert!(!file.truncated);
        assert_eq!(file.text, exact);
    }

    #[test]
    fn test_context_file_without_total_lines() {
        let json = serde_json::json!({
            "name": "notes.md",
            "extension": "md",
            "text": "one\ntwo\nthree",
            "truncated": false,
        });
        let file: ContextFile = serde_json::from_value(json).unwrap();

        assert_eq!(file.total_lines, 0);
        assert_eq!(file.line_count(), 3);
    }

    #[test]
    fn test_context_file_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.ts");
        std::fs::write(&path, "export const x = 1;\n").unwrap();

        let file = ContextFile::from_path(&path).unwrap();
        assert_eq!(file.name, "app.ts");
        assert_eq!(file.extension, "ts");
        assert_eq!(file.total_lines, 1);
    }
}
