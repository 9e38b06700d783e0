//! Before/after view of one optimization

use crate::diff::{similarity, word_diff, DiffResult};
use crate::tokens::{calculate_savings, estimate, TokenSavings};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Comparison {
    pub tokens_before: usize,
    pub tokens_after: usize,
    pub savings: TokenSavings,
    /// Word-set overlap, 0..=100
    pub similarity: u32,
    pub diff: DiffResult,
}

impl Comparison {
    pub fn between(original: &str, optimized: &str) -> Self {
        let tokens_before = estimate(original);
        let tokens_after = estimate(optimized);

        Self {
            tokens_before,
            tokens_after,
            savings: calculate_savings(tokens_before, tokens_after),
            similarity: similarity(original, optimized),
            diff: word_diff(original, optimized),
        }
    }
}
