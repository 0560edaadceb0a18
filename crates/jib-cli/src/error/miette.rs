//! Miette conversion for CLI errors.
//!
//! Happens once, at the binary edge: commands return [`CliError`], `main`
//! converts the failure into a report with a remediation hint where one
//! exists.

use miette::Report;

use crate::error::{CliError, ConfigError};

/// Convert a [`CliError`] into a miette report.
pub fn to_report(err: CliError) -> Report {
    match err {
        // jib-bundler errors carry their own Diagnostic impl with hints.
        CliError::Bundle(e) => Report::new(e),
        CliError::ToolNotFound { name } => miette::miette!(
            help = format!("Install it first, e.g. `npm install --global {name}`, or put it on PATH."),
            "'{name}' not found on PATH"
        ),
        CliError::Config(ConfigError::Load(e)) => miette::miette!(
            help = "Check jib.config.json for syntax errors and unknown keys.",
            "Failed to load jib.config.json: {e}"
        ),
        CliError::Config(ConfigError::InvalidValue { field, value, hint }) => miette::miette!(
            help = hint.to_string(),
            "Invalid value for '{field}': {value}"
        ),
        other => miette::miette!("{}", other),
    }
}
