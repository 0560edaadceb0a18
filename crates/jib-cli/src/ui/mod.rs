//! Terminal UI utilities for status messages and build output.
//!
//! Handles environment detection (CI, TTY) and degrades gracefully when
//! terminal features are unavailable.
//!
//! # Examples
//!
//! ```no_run
//! use jib_cli::ui;
//!
//! ui::init_colors();
//! ui::success("Build complete");
//! ui::error("Failed to parse jib.config.json");
//! ```

mod format;
mod messages;
mod spinner;

pub use format::{format_duration, format_size, print_build_summary};
pub use messages::{error, info, success, warning};
pub use spinner::Spinner;

/// Check if running in a CI environment.
pub fn is_ci() -> bool {
    std::env::var("CI").is_ok()
        || std::env::var("GITHUB_ACTIONS").is_ok()
        || std::env::var("GITLAB_CI").is_ok()
}

/// Check if color output should be enabled.
///
/// Respects NO_COLOR and FORCE_COLOR, falls back to terminal detection.
pub fn should_use_color() -> bool {
    if std::env::var("NO_COLOR").is_ok() {
        return false;
    }
    if std::env::var("FORCE_COLOR").is_ok() {
        return true;
    }
    console::user_attended_stderr()
}

/// Initialize color support based on environment.
///
/// owo-colors respects NO_COLOR and terminal capabilities on its own; this
/// exists for explicit initialization and future extension.
pub fn init_colors() {
    let _ = should_use_color();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn color_detection_does_not_panic() {
        let _ = should_use_color();
        init_colors();
    }

    #[test]
    fn ci_detection_reads_env() {
        // Value depends on the environment running the tests; just exercise it.
        let _ = is_ci();
    }
}
