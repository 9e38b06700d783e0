//! Prompt Optimizer - Rewrite prompts through an LLM before they reach a coding agent
//!
//! This library assembles a prompt together with its surrounding context into a
//! single payload, sends it to one of several interchangeable providers, and
//! compares what comes back against what went in.
//!
//! ## Key Features
//!
//! - **Payload Assembly**: Directives, saved snippets, detected filenames and attached files in fixed sections
//! - **Multi-Provider Dispatch**: Gemini, OpenAI and Ollama behind one call, with classified errors
//! - **Token Estimation**: Fast approximate counts and before/after savings
//! - **Diffing**: Word and line diffs plus a similarity score
//! - **History and Metrics**: Recent optimizations on disk, per-run counters in memory

pub mod api;
pub mod config;
pub mod diff;
pub mod history;
pub mod metrics;
pub mod orchestrator;
pub mod payload;
pub mod tokens;
pub mod tui;

pub use api::{
    dispatch, test_provider, ApiError, ErrorKind, ProviderConfig, ProviderTestResult, ProviderType,
};
pub use config::{Config, ConfigBuilder, ConfigError};
pub use diff::{line_diff, similarity, word_diff, DiffResult};
pub use history::{History, HistoryEntry, HistoryError};
pub use metrics::{MetricsSummary, MetricsTracker};
pub use orchestrator::{Comparison, OptimizationResult, OptimizeRequest, Orchestrator};
pub use payload::{assemble, ContextFile, PreferenceSet};
pub use tokens::{calculate_savings, estimate, format_count, TokenSavings};
