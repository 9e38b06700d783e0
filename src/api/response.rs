//! Response normalization
//!
//! Models like to open with boilerplate such as "Here's the optimized
//! prompt:". The patterns below are tried in order against the start of the
//! trimmed text; the first one that matches is stripped, once.

use regex::Regex;
use std::sync::LazyLock;

/// Case-insensitive, start-anchored preamble patterns, in priority order
pub const PREAMBLE_PATTERNS: &[&str] = &[
    r"(?i)^(?:sure|certainly|of course|absolutely)[,!.]?\s+here(?:'s|’s| is)[^:\n]*:\s*",
    r"(?i)^here(?:'s|’s| is) (?:the|your|an?) (?:optimized|improved|rewritten|refined|enhanced|revised)(?: version of (?:the|your) prompt| prompt)?\s*:\s*",
    r"(?i)^(?:the )?(?:optimized|improved|rewritten|refined|enhanced|revised) prompt\s*:\s*",
    r"(?i)^here(?:'s|’s| is) (?:the|your|an?) [^:\n]{0,60}prompt\s*:\s*",
];

static PREAMBLE_REGEXES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    PREAMBLE_PATTERNS
        .iter()
        .map(|pattern| Regex::new(pattern).unwrap())
        .collect()
});

/// Trim the text and strip at most one leading preamble.
pub fn normalize_response(text: &str) -> String {
    let trimmed = text.trim();

    for regex in PREAMBLE_REGEXES.iter() {
        if let Some(found) = regex.find(trimmed) {
            return trimmed[found.end()..].trim().to_string();
        }
    }

    trimmed.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_patterns_compile() {
        assert_eq!(PREAMBLE_REGEXES.len(), PREAMBLE_PATTERNS.len());
    }

    #[test]
    fn test_strips_common_preamble() {
        assert_eq!(
            normalize_response("Here's the optimized prompt:\n\nWrite a CLI in Rust."),
            "Write a CLI in Rust."
        );
        assert_eq!(
            normalize_response("HERE IS YOUR IMPROVED PROMPT: Do the thing"),
            "Do the thing"
        );
        assert_eq!(
            normalize_response("Optimized prompt:\nList the steps."),
            "List the steps."
        );
        assert_eq!(
            normalize_response("Sure! Here is the rewritten version:\nBe concise."),
            "Be concise."
        );
    }

    #[test]
    fn test_strips_only_once() {
        let text = "Here's the optimized prompt: Here's the optimized prompt: keep me";
        assert_eq!(
            normalize_response(text),
            "Here's the optimized prompt: keep me"
        );
    }

    #[test]
    fn test_leaves_plain_text_alone() {
        assert_eq!(
            normalize_response("  Refactor the module to use async IO.\n"),
            "Refactor the module to use async IO."
        );
        // Not at the start, so not a preamble
        assert_eq!(
            normalize_response("Explain why here's the optimized prompt: matters"),
            "Explain why here's the optimized prompt: matters"
        );
    }
}
