//! Serve command implementation.
//!
//! `jib serve` runs the built server bundle under node with clustering
//! enabled, inheriting stdio and mirroring the child's exit status. The
//! bundle must exist; `jib build` produces it.

use std::process::ExitCode;

use tracing::{debug, info};

use crate::cli::{Globals, ServeArgs};
use crate::commands::run::forward_status;
use crate::config::ProjectPaths;
use crate::error::{CliError, Result};

/// Execute the serve command.
pub async fn execute(globals: &Globals, args: ServeArgs) -> Result<ExitCode> {
    let paths = ProjectPaths::resolve(globals.root.as_deref())?;

    if !paths.server_bundle.is_file() {
        return Err(CliError::FileNotFound(paths.server_bundle));
    }

    let node = which::which("node").map_err(|_| CliError::ToolNotFound { name: "node" })?;

    let mut command = tokio::process::Command::new(node);
    if args.inspect {
        command.arg("--inspect");
    }
    command.arg(&paths.server_bundle);
    if args.ui {
        command.arg("--ui");
    }
    if args.ghost {
        command.arg("--ghost");
    }
    command.args(&args.args);

    command
        .current_dir(&paths.root)
        .env("DEV_SERVER", "false")
        .env("JIB_CLUSTER_WORKERS", cluster_workers());

    info!(bundle = %paths.server_bundle.display(), "starting production server");
    debug!(?args, "serve arguments");

    let status = command.status().await.map_err(|source| CliError::Spawn {
        name: "node",
        source,
    })?;

    Ok(forward_status(status))
}

/// Worker count for the clustered server: the caller's override, otherwise
/// one worker per available core.
fn cluster_workers() -> String {
    std::env::var("JIB_CLUSTER_WORKERS").unwrap_or_else(|_| {
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
            .to_string()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Globals;
    use tempfile::TempDir;

    #[tokio::test]
    async fn missing_bundle_is_reported_before_spawning() {
        let dir = TempDir::new().unwrap();
        let globals = Globals {
            verbose: false,
            root: Some(dir.path().to_path_buf()),
        };

        let err = execute(&globals, ServeArgs::default()).await.unwrap_err();
        assert!(matches!(err, CliError::FileNotFound(_)));
        assert!(err.to_string().contains("server.js"));
    }

    #[test]
    fn cluster_workers_is_a_positive_count() {
        let workers: usize = cluster_workers().parse().unwrap();
        assert!(workers >= 1);
    }
}
