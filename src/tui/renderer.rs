//! Terminal rendering with markdown support

use crossterm::style::{Color, Stylize};
use termimad::MadSkin;

use super::theme::Theme;
use crate::api::{ProviderType, ProviderTestResult};
use crate::diff::{ChangeKind, LineChange, WordChange};
use crate::history::HistoryEntry;
use crate::metrics::MetricsSummary;
use crate::orchestrator::Comparison;
use crate::tokens::{format_count, TokenSavings};

/// Terminal renderer with markdown and styled output
pub struct TerminalRenderer {
    theme: Theme,
    skin: MadSkin,
}

impl TerminalRenderer {
    pub fn new() -> Self {
        let theme = Theme::default();
        let skin = Self::build_skin(&theme);
        Self { theme, skin }
    }

    fn build_skin(theme: &Theme) -> MadSkin {
        let mut skin = MadSkin::default();
        skin.set_headers_fg(to_termimad_color(theme.title));
        skin.bold.set_fg(to_termimad_color(Color::White));
        skin.italic.set_fg(to_termimad_color(Color::DarkYellow));
        skin.inline_code.set_fg(to_termimad_color(Color::Green));
        skin.code_block.set_fg(to_termimad_color(Color::Green));
        skin
    }

    pub fn render_header(&self, title: &str) {
        println!();
        println!("  {}", title.with(self.theme.title).bold());
    }

    /// Print optimized text, through the markdown skin when it has markup
    pub fn render_text(&self, content: &str) {
        if has_markdown_elements(content) {
            self.skin.print_text(content);
        } else {
            println!("{}", content.with(self.theme.text));
        }
    }

    /// Both sides of a word diff, changed words colored
    pub fn render_word_diff(&self, original: &[WordChange], optimized: &[WordChange]) {
        println!("  {}", "Original:".with(self.theme.dim));
        println!("{}", self.colorize_words(original));
        println!();
        println!("  {}", "Optimized:".with(self.theme.dim));
        println!("{}", self.colorize_words(optimized));
    }

    fn colorize_words(&self, words: &[WordChange]) -> String {
        words
            .iter()
            .map(|w| match w.kind {
                ChangeKind::Unchanged => w.word.clone(),
                ChangeKind::Added => w.word.as_str().with(self.theme.added).bold().to_string(),
                ChangeKind::Removed => w
                    .word
                    .as_str()
                    .with(self.theme.removed)
                    .crossed_out()
                    .to_string(),
            })
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn render_line_diff(&self, lines: &[LineChange]) {
        for line in lines {
            match line.kind {
                ChangeKind::Unchanged => println!("  {}", line.text.as_str().with(self.theme.dim)),
                ChangeKind::Added => {
                    println!("{}", format!("+ {}", line.text).with(self.theme.added))
                }
                ChangeKind::Removed => {
                    println!("{}", format!("- {}", line.text).with(self.theme.removed))
                }
            }
        }
    }

    /// One-line token and similarity summary
    pub fn render_comparison(&self, comparison: &Comparison) {
        let stats = &comparison.diff.stats;
        println!(
            "\n  {} ~{} \u{2192} ~{} tokens ({}) {} similarity {}% {} {} {}",
            "\u{2022}".with(self.theme.dim),
            format_count(comparison.tokens_before).with(self.theme.stats),
            format_count(comparison.tokens_after).with(self.theme.stats),
            savings_label(&comparison.savings).with(self.theme.stats),
            "\u{00b7}".with(self.theme.dim),
            comparison.similarity.to_string().with(self.theme.stats),
            "\u{00b7}".with(self.theme.dim),
            format!("+{}", stats.added).with(self.theme.added),
            format!("-{}", stats.removed).with(self.theme.removed),
        );
    }

    pub fn render_count(&self, tokens: usize) {
        println!(
            "  ~{} tokens",
            format_count(tokens).with(self.theme.stats)
        );
    }

    pub fn render_provider_test(&self, provider: ProviderType, result: &ProviderTestResult) {
        match &result.error {
            None => self.render_success(&format!(
                "{} is reachable and the credential works",
                provider
            )),
            Some(error) => self.render_error(&format!("{}: {}", provider, error)),
        }
    }

    pub fn render_history(&self, entries: &[HistoryEntry]) {
        if entries.is_empty() {
            self.render_info("No history yet.");
            return;
        }

        for entry in entries {
            println!(
                "  {} {} {} ~{} \u{2192} ~{}",
                format!("#{}", entry.id).with(self.theme.title),
                entry.timestamp.format("%Y-%m-%d %H:%M").to_string().with(self.theme.dim),
                entry.provider.to_string().with(self.theme.dim),
                format_count(entry.tokens_before).with(self.theme.stats),
                format_count(entry.tokens_after).with(self.theme.stats),
            );
            println!("    {}", preview(&entry.original, 72));
        }
    }

    pub fn render_summary(&self, summary: &MetricsSummary) {
        for line in summary.to_string().lines() {
            println!("  {}", line.with(self.theme.dim));
        }
    }

    /// Render an error message
    pub fn render_error(&self, msg: &str) {
        eprintln!(
            "  {} {}",
            "\u{2717}".with(self.theme.error),
            msg.with(self.theme.error)
        );
    }

    /// Render a success message
    pub fn render_success(&self, msg: &str) {
        println!(
            "  {} {}",
            "\u{2713}".with(self.theme.success),
            msg.with(self.theme.success)
        );
    }

    /// Render info text
    pub fn render_info(&self, msg: &str) {
        println!("  {}", msg.with(self.theme.dim));
    }
}

impl Default for TerminalRenderer {
    fn default() -> Self {
        Self::new()
    }
}

/// "-5 tokens, 20% fewer" or "+18 tokens, 150% more"
pub fn savings_label(savings: &TokenSavings) -> String {
    if savings.saved == 0 {
        return "no change".to_string();
    }

    let direction = if savings.is_reduction { "fewer" } else { "more" };
    format!(
        "{:+} tokens, {}% {}",
        -savings.saved,
        savings.percentage.abs(),
        direction
    )
}

/// First line of `text`, cut to `max` chars
fn preview(text: &str, max: usize) -> String {
    let line = text.lines().next().unwrap_or("");
    if line.chars().count() > max {
        format!("{}\u{2026}", line.chars().take(max).collect::<String>())
    } else {
        line.to_string()
    }
}

/// Check if content has markdown elements worth rendering through the skin
fn has_markdown_elements(content: &str) -> bool {
    content.contains("```")
        || content.contains("## ")
        || content.contains("# ")
        || content.contains("**")
        || content.contains("| ")
        || content.contains("- [")
}

/// Convert crossterm Color to termimad color
fn to_termimad_color(color: Color) -> termimad::crossterm::style::Color {
    // termimad re-exports crossterm, so these types are compatible
    match color {
        Color::Black => termimad::crossterm::style::Color::Black,
        Color::DarkGrey => termimad::crossterm::style::Color::DarkGrey,
        Color::Red => termimad::crossterm::style::Color::Red,
        Color::Green => termimad::crossterm::style::Color::Green,
        Color::Yellow => termimad::crossterm::style::Color::Yellow,
        Color::DarkYellow => termimad::crossterm::style::Color::DarkYellow,
        Color::Blue => termimad::crossterm::style::Color::Blue,
        Color::Magenta => termimad::crossterm::style::Color::Magenta,
        Color::Cyan => termimad::crossterm::style::Color::Cyan,
        Color::White => termimad::crossterm::style::Color::White,
        Color::Grey => termimad::crossterm::style::Color::Grey,
        _ => termimad::crossterm::style::Color::Reset,
    }
}
