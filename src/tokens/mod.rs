//! Heuristic token estimation
//!
//! Counts are approximate. Words are bucketed by length, punctuation and
//! newlines add a little on top. Good enough to compare a prompt before and
//! after optimization without pulling in a real tokenizer.

use serde::{Deserialize, Serialize};

/// Characters that tend to become their own token in BPE vocabularies
const PUNCTUATION: &str = "{}[]()<>;:,.!?\"'`~@#$%^&*-+=/\\|";

/// Estimate the token count of `text`.
///
/// Returns 0 only for the empty string; any other input yields at least 1.
pub fn estimate(text: &str) -> usize {
    if text.is_empty() {
        return 0;
    }

    let word_units: usize = text.split_whitespace().map(word_units).sum();

    let punctuation = text.chars().filter(|c| PUNCTUATION.contains(*c)).count();
    let newlines = text.chars().filter(|&c| c == '\n').count();

    (word_units + punctuation.div_ceil(2) + newlines).max(1)
}

fn word_units(word: &str) -> usize {
    match word.chars().count() {
        0..=4 => 1,
        5..=8 => 2,
        9..=12 => 3,
        len => len.div_ceil(4),
    }
}

/// Render a token count for display: `999` stays as is, `1500` becomes `1.5k`.
pub fn format_count(count: usize) -> String {
    if count >= 1000 {
        format!("{:.1}k", count as f64 / 1000.0)
    } else {
        count.to_string()
    }
}

/// Difference between two token counts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenSavings {
    /// `before - after`; negative when the text grew
    pub saved: i64,
    /// `saved` as a rounded percentage of `before`
    pub percentage: i64,
    pub is_reduction: bool,
}

pub fn calculate_savings(before: usize, after: usize) -> TokenSavings {
    let saved = before as i64 - after as i64;
    let percentage = if before > 0 {
        (saved as f64 / before as f64 * 100.0).round() as i64
    } else {
        0
    };

    TokenSavings {
        saved,
        percentage,
        is_reduction: saved > 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_is_zero() {
        assert_eq!(estimate(""), 0);
    }

    #[test]
    fn test_non_empty_has_floor_of_one() {
        assert_eq!(estimate(" "), 1);
        assert_eq!(estimate("\t"), 1);
        assert!(estimate("a") >= 1);
    }

    #[test]
    fn test_word_buckets() {
        assert_eq!(estimate("fix"), 1);
        assert_eq!(estimate("function"), 2);
        assert_eq!(estimate("optimization"), 3);
        // 16 chars -> ceil(16 / 4)
        assert_eq!(estimate("internationalize"), 4);
        assert_eq!(estimate("fix my code"), 3);
    }

    #[test]
    fn test_punctuation_and_newlines() {
        // "fn" + "main()" -> 1 + 2 word units, 2 punctuation -> 1
        assert_eq!(estimate("fn main()"), 4);
        // two words, one newline
        assert_eq!(estimate("one\ntwo"), 3);
        // three punctuation chars round up to 2
        assert_eq!(estimate("a.b.c."), 2 + 2);
    }

    #[test]
    fn test_estimate_is_deterministic() {
        let text = "Refactor the parser so that errors carry spans.\nKeep the API stable.";
        assert_eq!(estimate(text), estimate(text));
    }

    #[test]
    fn test_format_count() {
        assert_eq!(format_count(0), "0");
        assert_eq!(format_count(999), "999");
        assert_eq!(format_count(1000), "1.0k");
        assert_eq!(format_count(1500), "1.5k");
        assert_eq!(format_count(12_345), "12.3k");
    }

    #[test]
    fn test_calculate_savings_reduction() {
        let savings = calculate_savings(100, 60);
        assert_eq!(
            savings,
            TokenSavings {
                saved: 40,
                percentage: 40,
                is_reduction: true
            }
        );
    }

    #[test]
    fn test_calculate_savings_no_change() {
        let savings = calculate_savings(50, 50);
        assert_eq!(savings.saved, 0);
        assert_eq!(savings.percentage, 0);
        assert!(!savings.is_reduction);
    }

    #[test]
    fn test_calculate_savings_growth_and_zero_base() {
        let grown = calculate_savings(40, 50);
        assert_eq!(grown.saved, -10);
        assert_eq!(grown.percentage, -25);
        assert!(!grown.is_reduction);

        assert_eq!(calculate_savings(0, 10).percentage, 0);
    }
}
