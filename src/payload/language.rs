/// Fence tag for a file extension. Matching ignores case; extensions not in
/// the table are returned as given, and a missing extension is `text`.
pub fn language_for_extension(extension: &str) -> String {
    if extension.is_empty() {
        return "text".to_string();
    }

    let tag = match extension.to_ascii_lowercase().as_str() {
        "rs" => "rust",
        "py" | "pyw" => "python",
        "js" | "mjs" | "cjs" => "javascript",
        "jsx" => "jsx",
        "ts" | "mts" | "cts" => "typescript",
        "tsx" => "tsx",
        "java" => "java",
        "kt" | "kts" => "kotlin",
        "scala" => "scala",
        "go" => "go",
        "rb" => "ruby",
        "php" => "php",
        "swift" => "swift",
        "c" | "h" => "c",
        "cc" | "cpp" | "cxx" | "hpp" | "hh" => "cpp",
        "cs" => "csharp",
        "dart" => "dart",
        "lua" => "lua",
        "r" => "r",
        "sh" | "bash" => "bash",
        "zsh" => "zsh",
        "ps1" => "powershell",
        "html" | "htm" => "html",
        "css" => "css",
        "scss" => "scss",
        "vue" => "vue",
        "svelte" => "svelte",
        "json" => "json",
        "yaml" | "yml" => "yaml",
        "toml" => "toml",
        "xml" => "xml",
        "sql" => "sql",
        "md" | "markdown" => "markdown",
        "txt" => "text",
        _ => return extension.to_string(),
    };

    tag.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_extensions() {
        assert_eq!(language_for_extension("rs"), "rust");
        assert_eq!(language_for_extension("py"), "python");
        assert_eq!(language_for_extension("yml"), "yaml");
        assert_eq!(language_for_extension("TSX"), "tsx");
    }

    #[test]
    fn test_unknown_and_missing() {
        assert_eq!(language_for_extension("zig"), "zig");
        assert_eq!(language_for_extension("Proto"), "Proto");
        assert_eq!(language_for_extension(""), "text");
    }
}
