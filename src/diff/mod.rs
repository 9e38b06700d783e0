//! Word and line level comparison of an original prompt and its rewrite
//!
//! Both diffs are approximate. The word diff is set based (order is kept for
//! display, but membership decides the marker). The line diff compares by
//! index and only falls back to a membership check when the lines at an index
//! differ; it is not an LCS alignment.

use serde::Serialize;
use std::collections::HashSet;

/// How a word or line differs between the two texts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Unchanged,
    Added,
    Removed,
}

/// A single word with its marker
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WordChange {
    pub word: String,
    pub kind: ChangeKind,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DiffStats {
    pub added: usize,
    pub removed: usize,
    /// Counted once per occurrence on the original side only
    pub unchanged: usize,
    pub original_word_count: usize,
    pub optimized_word_count: usize,
}

/// Word-level comparison of two texts
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiffResult {
    /// Original words rendered with `[-removed-]` markers
    pub original_markup: String,
    /// Optimized words rendered with `{+added+}` markers
    pub optimized_markup: String,
    pub original: Vec<WordChange>,
    pub optimized: Vec<WordChange>,
    pub stats: DiffStats,
}

/// A line in the positional line diff
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LineChange {
    pub kind: ChangeKind,
    pub text: String,
}

fn lowercase_set<'a>(words: impl IntoIterator<Item = &'a str>) -> HashSet<String> {
    words.into_iter().map(str::to_lowercase).collect()
}

/// Compare two texts word by word, case-insensitively.
pub fn word_diff(original: &str, optimized: &str) -> DiffResult {
    let original_words: Vec<&str> = original.split_whitespace().collect();
    let optimized_words: Vec<&str> = optimized.split_whitespace().collect();

    let original_set = lowercase_set(original_words.iter().copied());
    let optimized_set = lowercase_set(optimized_words.iter().copied());

    let mut stats = DiffStats {
        original_word_count: original_words.len(),
        optimized_word_count: optimized_words.len(),
        ..Default::default()
    };

    let original: Vec<WordChange> = original_words
        .iter()
        .map(|word| {
            let kind = if optimized_set.contains(&word.to_lowercase()) {
                stats.unchanged += 1;
                ChangeKind::Unchanged
            } else {
                stats.removed += 1;
                ChangeKind::Removed
            };
            WordChange {
                word: (*word).to_string(),
                kind,
            }
        })
        .collect();

    let optimized: Vec<WordChange> = optimized_words
        .iter()
        .map(|word| {
            let kind = if original_set.contains(&word.to_lowercase()) {
                ChangeKind::Unchanged
            } else {
                stats.added += 1;
                ChangeKind::Added
            };
            WordChange {
                word: (*word).to_string(),
                kind,
            }
        })
        .collect();

    DiffResult {
        original_markup: render_markup(&original),
        optimized_markup: render_markup(&optimized),
        original,
        optimized,
        stats,
    }
}

/// Join words with single spaces, wrapping changed words in wdiff-style markers.
pub fn render_markup(words: &[WordChange]) -> String {
    words
        .iter()
        .map(|change| match change.kind {
            ChangeKind::Unchanged => change.word.clone(),
            ChangeKind::Added => format!("{{+{}+}}", change.word),
            ChangeKind::Removed => format!("[-{}-]", change.word),
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Positional line diff.
///
/// Lines at the same index that are equal are unchanged. Otherwise the
/// original line is reported as removed only if it appears nowhere in the
/// optimized text, and the optimized line as added only if it appears nowhere
/// in the original.
pub fn line_diff(original: &str, optimized: &str) -> Vec<LineChange> {
    let a: Vec<&str> = original.split('\n').collect();
    let b: Vec<&str> = optimized.split('\n').collect();

    let a_set: HashSet<&str> = a.iter().copied().collect();
    let b_set: HashSet<&str> = b.iter().copied().collect();

    let mut changes = Vec::new();

    for i in 0..a.len().max(b.len()) {
        let old = a.get(i).copied();
        let new = b.get(i).copied();

        if let (Some(old), Some(new)) = (old, new) {
            if old == new {
                changes.push(LineChange {
                    kind: ChangeKind::Unchanged,
                    text: old.to_string(),
                });
                continue;
            }
        }

        if let Some(old) = old {
            if !b_set.contains(old) {
                changes.push(LineChange {
                    kind: ChangeKind::Removed,
                    text: old.to_string(),
                });
            }
        }

        if let Some(new) = new {
            if !a_set.contains(new) {
                changes.push(LineChange {
                    kind: ChangeKind::Added,
                    text: new.to_string(),
                });
            }
        }
    }

    changes
}

/// Jaccard similarity of the lowercase word sets, as a rounded percentage.
pub fn similarity(a: &str, b: &str) -> u32 {
    let a_set = lowercase_set(a.split_whitespace());
    let b_set = lowercase_set(b.split_whitespace());

    match (a_set.is_empty(), b_set.is_empty()) {
        (true, true) => return 100,
        (true, false) | (false, true) => return 0,
        _ => {}
    }

    let intersection = a_set.intersection(&b_set).count();
    let union = a_set.union(&b_set).count();

    (intersection as f64 / union as f64 * 100.0).round() as u32
}
