//! Terminal theme and color definitions

use crossterm::style::Color;

/// Theme colors for CLI output
pub struct Theme {
    /// Color for section headers
    pub title: Color,
    /// Color for optimized text
    pub text: Color,
    /// Color for error messages
    pub error: Color,
    /// Color for dim/secondary info
    pub dim: Color,
    /// Color for success messages
    pub success: Color,
    /// Color for token counts and percentages
    pub stats: Color,
    /// Words or lines present only in the optimized text
    pub added: Color,
    /// Words or lines present only in the original text
    pub removed: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            title: Color::Magenta,
            text: Color::White,
            error: Color::Red,
            dim: Color::DarkGrey,
            success: Color::Green,
            stats: Color::Blue,
            added: Color::Green,
            removed: Color::Red,
        }
    }
}
