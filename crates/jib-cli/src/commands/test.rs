//! Test command implementation.
//!
//! `jib test` is a thin wrapper over jest: it assembles the full runner
//! configuration in memory (see [`TestRunnerConfig`]), applies the default
//! argument policy, and forwards everything else verbatim. The child's exit
//! status becomes ours.

use std::process::ExitCode;

use jib_bundler::TestRunnerConfig;
use tracing::debug;

use crate::cli::{Globals, TestArgs};
use crate::commands::run::forward_status;
use crate::config::ProjectPaths;
use crate::error::{CliError, Result};

/// Execute the test command.
pub async fn execute(globals: &Globals, args: TestArgs) -> Result<ExitCode> {
    let paths = ProjectPaths::resolve(globals.root.as_deref())?;

    let mut argv = default_argv(args.args);
    argv.push("--config".to_string());
    argv.push(TestRunnerConfig::new(&paths.root).to_config_arg());

    let (program, prefix) = jest_invocation()?;
    debug!(?program, ?argv, "running jest");

    let status = tokio::process::Command::new(&program)
        .args(prefix)
        .args(&argv)
        .current_dir(&paths.root)
        .env("NODE_ENV", "test")
        .env("BABEL_ENV", "test")
        .env("DEV_SERVER", "false")
        .status()
        .await
        .map_err(|source| CliError::Spawn {
            name: "jest",
            source,
        })?;

    Ok(forward_status(status))
}

/// Apply the default argument policy: watch-all mode unless the caller asked
/// for coverage or watching explicitly.
fn default_argv(mut argv: Vec<String>) -> Vec<String> {
    let explicit = argv
        .iter()
        .any(|arg| arg == "--coverage" || arg == "--watchAll");
    if !explicit {
        argv.push("--watchAll".to_string());
    }
    argv
}

/// Find a jest invocation: the binary itself when installed, `npx jest`
/// otherwise.
fn jest_invocation() -> Result<(std::path::PathBuf, &'static [&'static str])> {
    if let Ok(jest) = which::which("jest") {
        return Ok((jest, &[]));
    }
    if let Ok(npx) = which::which("npx") {
        return Ok((npx, &["jest"]));
    }
    Err(CliError::ToolNotFound { name: "jest" })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn watch_all_is_the_default() {
        assert_eq!(default_argv(vec![]), argv(&["--watchAll"]));
        assert_eq!(
            default_argv(argv(&["MyComponent"])),
            argv(&["MyComponent", "--watchAll"])
        );
    }

    #[test]
    fn coverage_disables_the_default() {
        assert_eq!(default_argv(argv(&["--coverage"])), argv(&["--coverage"]));
    }

    #[test]
    fn explicit_watch_all_is_not_doubled() {
        let out = default_argv(argv(&["--watchAll", "MyComponent"]));
        assert_eq!(out.iter().filter(|a| *a == "--watchAll").count(), 1);
    }
}
