//! Terminal output for the CLI
//!
//! Colored diffs, token summaries and a spinner for the one request each
//! optimization makes.

pub mod renderer;
pub mod spinner;
pub mod theme;

pub use renderer::{savings_label, TerminalRenderer};
pub use spinner::DispatchSpinner;
pub use theme::Theme;
