//! Spinner shown while a provider request is in flight

use indicatif::{ProgressBar, ProgressStyle};

pub struct DispatchSpinner {
    bar: ProgressBar,
    active: bool,
}

impl DispatchSpinner {
    pub fn new() -> Self {
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("  {spinner:.cyan} {msg} {elapsed:.dim}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&[
                "\u{2800}", "\u{2801}", "\u{2803}", "\u{2807}", "\u{280f}",
                "\u{281f}", "\u{283f}", "\u{287f}", "\u{28ff}", "\u{28fe}",
                "\u{28fc}", "\u{28f8}", "\u{28f0}", "\u{28e0}", "\u{28c0}",
                "\u{2880}", "\u{2800}",
            ]);
        bar.set_style(style);
        Self { bar, active: false }
    }

    /// A spinner that never draws, for machine-readable output
    pub fn hidden() -> Self {
        Self {
            bar: ProgressBar::hidden(),
            active: false,
        }
    }

    /// Start the spinner with a message
    pub fn start(&mut self, msg: &str) {
        self.bar.set_message(msg.to_string());
        self.bar.enable_steady_tick(std::time::Duration::from_millis(80));
        self.active = true;
    }

    /// Stop and clear the spinner
    pub fn stop(&mut self) {
        if self.active {
            self.bar.finish_and_clear();
            self.active = false;
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }
}

impl Default for DispatchSpinner {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for DispatchSpinner {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_stop() {
        let mut spinner = DispatchSpinner::hidden();
        assert!(!spinner.is_active());

        spinner.start("Optimizing");
        assert!(spinner.is_active());

        spinner.stop();
        assert!(!spinner.is_active());
    }
}
