use super::{language_for_extension, ContextFile, PreferenceSet, MAX_CONTEXT_LINES};
use std::collections::HashSet;

/// Opening instructions for the rewriting model
pub const INSTRUCTION_PREAMBLE: &str = "You are an expert prompt engineer. Rewrite the prompt \
below so that an AI coding assistant produces the best possible result. Make it clear, specific \
and well structured, and keep every requirement from the original. Use the context sections only \
to inform the rewrite. Output only the rewritten prompt, with no commentary before or after it.";

/// Filenames in first-seen order with exact duplicates and blanks removed
pub fn dedup_filenames(filenames: &[String]) -> Vec<&str> {
    let mut seen = HashSet::new();
    filenames
        .iter()
        .map(String::as_str)
        .filter(|name| !name.trim().is_empty())
        .filter(|name| seen.insert(*name))
        .collect()
}

fn file_block(file: &ContextFile) -> String {
    let body = if file.truncated {
        file.text
            .lines()
            .take(MAX_CONTEXT_LINES)
            .collect::<Vec<_>>()
            .join("\n")
    } else {
        file.text.clone()
    };

    let mut block = format!(
        "### File: {}\n```{}\n{}",
        file.name,
        language_for_extension(&file.extension),
        body
    );
    if file.truncated {
        block.push_str(&format!("\n... (truncated, {} lines total)", file.line_count()));
    }
    block.push_str("\n```");
    block
}

/// Build the payload sent to the provider. Same inputs, same string.
pub fn assemble(
    raw_text: &str,
    prefs: &PreferenceSet,
    scraped_filenames: &[String],
    context_files: &[ContextFile],
) -> String {
    let mut sections = Vec::new();

    let directives = prefs.directives();
    if directives.is_empty() {
        sections.push(INSTRUCTION_PREAMBLE.to_string());
    } else {
        let lines = directives
            .iter()
            .map(|d| format!("- {}", d))
            .collect::<Vec<_>>()
            .join("\n");
        sections.push(format!(
            "{}\n\nThe rewritten prompt must also tell the assistant:\n{}",
            INSTRUCTION_PREAMBLE, lines
        ));
    }

    sections.push(format!("--- ORIGINAL PROMPT ---\n{}", raw_text));

    let always = &prefs.always_include_text;
    if !always.trim().is_empty() {
        sections.push(format!("--- ALWAYS INCLUDE ---\n{}", always));
    }

    let snippets: Vec<&str> = prefs
        .saved_snippets
        .iter()
        .map(String::as_str)
        .filter(|s| !s.trim().is_empty())
        .collect();
    if !snippets.is_empty() {
        sections.push(format!("--- SAVED SNIPPETS ---\n{}", snippets.join("\n---\n")));
    }

    let filenames = dedup_filenames(scraped_filenames);
    if !filenames.is_empty() {
        sections.push(format!(
            "--- FILES DETECTED ON PAGE ---\n{}",
            filenames.join(", ")
        ));
    }

    if !context_files.is_empty() {
        let blocks = context_files
            .iter()
            .map(file_block)
            .collect::<Vec<_>>()
            .join("\n\n");
        sections.push(format!("--- ATTACHED FILES ---\n{}", blocks));
    }

    sections.join("\n\n")
}
