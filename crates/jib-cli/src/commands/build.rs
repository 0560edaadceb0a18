//! Build command implementation.
//!
//! `jib build` produces the deployable output directory in four steps:
//! clean, copy static assets, bundle both targets, write the asset
//! manifests. A service worker (when `GENERATE_SW` is set) and a container
//! image (`--docker`) are appended when asked for.

use std::path::Path;
use std::time::Instant;

use jib_bundler::{
    BuildEnv, BundleConfig, BundleInputs, CompileStats, Esbuild, ServiceWorkerConfig,
    write_manifests,
};
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::cli::{BuildArgs, Globals};
use crate::config::{AppConfig, ProjectPaths};
use crate::error::{CliError, Result};
use crate::ui;

/// Execute the build command.
pub async fn execute(globals: &Globals, args: BuildArgs) -> Result<()> {
    let started = Instant::now();

    let paths = ProjectPaths::resolve(globals.root.as_deref())?;
    let config = AppConfig::load(&paths.config_file)?;

    let mut env = BuildEnv::from_env();
    // A one-shot build never serves; the define must not leak in from the shell.
    env.dev_server = false;

    info!(root = %paths.root.display(), mode = env.mode(), "building");

    clean(&paths, &config.log_file)?;
    copy_public(&paths)?;

    let inputs = BundleInputs::new(&paths.src, &paths.build)
        .public_path(config.public_path.clone())
        .globals(config.globals.clone())
        .verbose(globals.verbose);
    let client_config = BundleConfig::client(&inputs, &env)?;
    let server_config = BundleConfig::server(&inputs, &env)?;
    let esbuild = Esbuild::locate()?;

    let spinner = ui::Spinner::new("Bundling client and server...");
    let compiled = if env.parallel {
        let (client, server) = tokio::join!(
            esbuild.compile(&client_config),
            esbuild.compile(&server_config)
        );
        match (client, server) {
            (Ok(client), Ok(server)) => Ok((client, server)),
            (Err(err), _) | (_, Err(err)) => Err(err),
        }
    } else {
        match esbuild.compile(&client_config).await {
            Ok(client) => esbuild.compile(&server_config).await.map(|s| (client, s)),
            Err(err) => Err(err),
        }
    };
    let (client_stats, server_stats) = match compiled {
        Ok(stats) => stats,
        Err(err) => {
            spinner.fail("Bundling failed");
            return Err(err.into());
        }
    };
    spinner.finish("Bundles written");

    write_manifests(&paths.build, &config.public_path, &client_stats.metafile)?;

    if let Some(sw) = service_worker(&config, &paths, &env) {
        sw.generate().await?;
    }

    if args.docker {
        docker_build(&paths.root, config.docker_tag()).await?;
    }

    ui::print_build_summary(&summary_entries(&[client_stats, server_stats]), started.elapsed());
    Ok(())
}

/// Reset the output directory and the app log.
///
/// Everything under the build directory goes except `.gitkeep`, so the
/// directory can stay checked in. The log file is truncated rather than
/// deleted; the production server appends to it without reopening.
pub(crate) fn clean(paths: &ProjectPaths, log_file: &str) -> Result<()> {
    if paths.build.is_dir() {
        for entry in std::fs::read_dir(&paths.build)? {
            let entry = entry?;
            if entry.file_name() == ".gitkeep" {
                continue;
            }
            if entry.file_type()?.is_dir() {
                std::fs::remove_dir_all(entry.path())?;
            } else {
                std::fs::remove_file(entry.path())?;
            }
        }
    } else {
        std::fs::create_dir_all(&paths.build)?;
    }

    let log = paths.log_file(log_file);
    if log.is_file() {
        std::fs::File::create(&log)?;
    }

    Ok(())
}

/// Copy `public/` into the build output, preserving the directory shape.
///
/// A project without a public directory is fine; there is just nothing to
/// copy.
pub(crate) fn copy_public(paths: &ProjectPaths) -> Result<()> {
    if !paths.public.is_dir() {
        debug!(dir = %paths.public.display(), "no public directory, skipping copy");
        return Ok(());
    }

    for entry in WalkDir::new(&paths.public) {
        let entry = entry.map_err(|e| CliError::Custom(format!("failed to walk public/: {}", e)))?;
        let relative = entry
            .path()
            .strip_prefix(&paths.public)
            .expect("walkdir yields children of its root");
        let dest = paths.build_public.join(relative);

        if entry.file_type().is_dir() {
            std::fs::create_dir_all(&dest)?;
        } else {
            if let Some(parent) = dest.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::copy(entry.path(), &dest)?;
        }
    }

    Ok(())
}

/// Assemble the service-worker configuration, folding in the project's
/// overrides from jib.config.json.
fn service_worker(
    config: &AppConfig,
    paths: &ProjectPaths,
    env: &BuildEnv,
) -> Option<ServiceWorkerConfig> {
    let mut sw = ServiceWorkerConfig::from_env(
        &config.name,
        &config.version,
        &paths.build_public,
        &paths.build,
        env,
    )?;

    if let Some(overrides) = &config.sw {
        if let Some(fallback) = &overrides.navigate_fallback {
            sw.navigate_fallback = fallback.clone();
        }
        if let Some(patterns) = &overrides.glob_patterns {
            sw.glob_patterns = patterns.clone();
        }
    }

    Some(sw)
}

/// Run `docker build -t <tag> .` in the project root, inheriting stdio.
async fn docker_build(root: &Path, tag: &str) -> Result<()> {
    let docker = which::which("docker").map_err(|_| CliError::ToolNotFound { name: "docker" })?;

    info!(tag, "building container image");
    let status = tokio::process::Command::new(docker)
        .args(["build", "-t", tag, "."])
        .current_dir(root)
        .status()
        .await
        .map_err(|source| CliError::Spawn {
            name: "docker",
            source,
        })?;

    if !status.success() {
        return Err(CliError::Custom(format!(
            "docker build failed with {}",
            status
        )));
    }

    ui::success(&format!("Image '{}' built", tag));
    Ok(())
}

fn summary_entries(stats: &[CompileStats]) -> Vec<(String, u64)> {
    stats
        .iter()
        .flat_map(|s| &s.output_files)
        .filter(|f| f.path.extension().is_none_or(|ext| ext != "map"))
        .map(|f| {
            let name = f
                .path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| f.path.display().to_string());
            (name, f.bytes)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn project() -> (TempDir, ProjectPaths) {
        let dir = TempDir::new().unwrap();
        let paths = ProjectPaths::new(dir.path());
        (dir, paths)
    }

    #[test]
    fn clean_preserves_gitkeep_and_truncates_the_log() {
        let (_dir, paths) = project();
        fs::create_dir_all(&paths.build_public).unwrap();
        fs::write(paths.build.join(".gitkeep"), "").unwrap();
        fs::write(paths.build.join("server.js"), "old").unwrap();
        fs::write(paths.build_public.join("stale.js"), "old").unwrap();
        fs::create_dir_all(paths.root.join("log")).unwrap();
        fs::write(paths.root.join("log/app.log"), "previous run\n").unwrap();

        clean(&paths, "log/app.log").unwrap();

        assert!(paths.build.join(".gitkeep").exists());
        assert!(!paths.build.join("server.js").exists());
        assert!(!paths.build_public.exists());
        assert_eq!(
            fs::read_to_string(paths.root.join("log/app.log")).unwrap(),
            ""
        );
    }

    #[test]
    fn clean_creates_a_missing_build_dir() {
        let (_dir, paths) = project();
        clean(&paths, "log/app.log").unwrap();
        assert!(paths.build.is_dir());
    }

    #[test]
    fn copy_public_mirrors_the_tree() {
        let (_dir, paths) = project();
        fs::create_dir_all(paths.public.join("icons")).unwrap();
        fs::write(paths.public.join("favicon.ico"), "ico").unwrap();
        fs::write(paths.public.join("icons/192.png"), "png").unwrap();

        copy_public(&paths).unwrap();

        assert_eq!(
            fs::read_to_string(paths.build_public.join("favicon.ico")).unwrap(),
            "ico"
        );
        assert!(paths.build_public.join("icons/192.png").exists());
    }

    #[test]
    fn copy_public_is_a_noop_without_the_directory() {
        let (_dir, paths) = project();
        copy_public(&paths).unwrap();
        assert!(!paths.build_public.exists());
    }

    #[test]
    fn summary_skips_source_maps() {
        let stats = CompileStats {
            target: jib_bundler::TargetKind::Client,
            duration: std::time::Duration::from_millis(1),
            output_files: vec![
                jib_bundler::OutputFile {
                    path: "build/public/assets/client.js".into(),
                    bytes: 100,
                },
                jib_bundler::OutputFile {
                    path: "build/public/assets/client.js.map".into(),
                    bytes: 900,
                },
            ],
            metafile: serde_json::from_str(r#"{"outputs":{}}"#).unwrap(),
        };

        let entries = summary_entries(&[stats]);
        assert_eq!(entries, vec![("client.js".to_string(), 100)]);
    }
}
