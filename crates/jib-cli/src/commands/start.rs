//! Start command implementation.
//!
//! `jib start` brings up the development server:
//!
//! 1. clean the build output and copy static assets
//! 2. compile both bundles once (fatal on error; there is nothing to serve)
//! 3. spawn the app module from the fresh server bundle
//! 4. bind the HTTP server and open the readiness gate
//! 5. watch the project and hand every change to the orchestrator
//!
//! The command runs until interrupted or until the HTTP server dies.

use std::net::SocketAddr;
use std::sync::Arc;

use jib_bundler::{BuildEnv, BundleInputs, CompileState, TargetKind, write_manifests};
use tracing::{debug, info};

use crate::cli::{Globals, StartArgs};
use crate::commands::build;
use crate::config::{AppConfig, ProjectPaths};
use crate::dev::{
    AppHandle, AppLoader, BundleCache, Compiler, DevOrchestrator, DevServerState, EsbuildCompiler,
    FileWatcher, NodeAppLoader, server, watcher,
};
use crate::error::Result;
use crate::ui;

/// Debounce window for filesystem events.
const WATCH_DEBOUNCE_MS: u64 = 300;

/// Execute the start command.
pub async fn execute(globals: &Globals, args: StartArgs) -> Result<()> {
    let paths = ProjectPaths::resolve(globals.root.as_deref())?;
    let config = AppConfig::load(&paths.config_file)?;

    let mut env = BuildEnv::from_env();
    env.dev_server = true;

    info!(root = %paths.root.display(), "starting development server");

    build::clean(&paths, &config.log_file)?;
    build::copy_public(&paths)?;

    let inputs = BundleInputs::new(&paths.src, &paths.build)
        .public_path(config.public_path.clone())
        .globals(config.globals.clone())
        .verbose(globals.verbose);
    let compiler: Arc<dyn Compiler> = Arc::new(EsbuildCompiler::new(&inputs, &env)?);

    // The first compile is fatal on error; until it succeeds there is no
    // bundle to serve and no module to load.
    let spinner = ui::Spinner::new("Compiling initial bundles...");
    let compiled = if env.parallel {
        let (client, server) = tokio::join!(
            compiler.compile(TargetKind::Client),
            compiler.compile(TargetKind::Server)
        );
        match (client, server) {
            (Ok(client), Ok(server)) => Ok((client, server)),
            (Err(err), _) | (_, Err(err)) => Err(err),
        }
    } else {
        match compiler.compile(TargetKind::Client).await {
            Ok(client) => compiler
                .compile(TargetKind::Server)
                .await
                .map(|server| (client, server)),
            Err(err) => Err(err),
        }
    };
    let (client_stats, _server_stats) = match compiled {
        Ok(stats) => stats,
        Err(err) => {
            spinner.fail("Initial compile failed");
            return Err(err.into());
        }
    };
    spinner.finish("Initial bundles ready");

    write_manifests(&paths.build, &config.public_path, &client_stats.metafile)?;

    let loader = Arc::new(NodeAppLoader::new(&paths.root, &paths.server_bundle)?);
    let loaded = loader.load().await?;

    let state = Arc::new(DevServerState::new(
        AppHandle::new(loaded.module),
        paths.public.clone(),
        args.ui,
        args.ghost,
    ));
    state.update_cache(BundleCache::load_from_dir(&paths.build_public)?);
    // The initial compile already succeeded for both targets.
    state.set_compile_state(TargetKind::Client, CompileState::Done { success: true });
    state.set_compile_state(TargetKind::Server, CompileState::Done { success: true });
    // The module is up and the cache is seeded; requests may proceed.
    state.gate.open();

    let orchestrator = Arc::new(DevOrchestrator::new(
        Arc::clone(&compiler),
        loader,
        loaded.hot,
        Arc::clone(&state),
        paths.build.clone(),
        paths.build_public.clone(),
        config.public_path.clone(),
    ));

    let addr = SocketAddr::from(([127, 0, 0, 1], resolved_port(&args, &config)));
    let mut http = tokio::spawn(server::serve(addr, Arc::clone(&state)));

    let (_watcher, mut changes) = FileWatcher::new(
        paths.root.clone(),
        watcher::default_ignores(),
        WATCH_DEBOUNCE_MS,
    )?;
    debug!(root = %paths.root.display(), "watching for changes");

    loop {
        tokio::select! {
            change = changes.recv() => {
                match change {
                    // Cycles run off the select loop, so changes landing
                    // mid-cycle reach the gate's suppression path instead of
                    // queueing behind the running cycle.
                    Some(change) => {
                        let orchestrator = Arc::clone(&orchestrator);
                        let path = change.path().to_path_buf();
                        tokio::spawn(async move { orchestrator.on_change(&path).await });
                    }
                    // The watcher thread is gone; nothing left to react to.
                    None => break,
                }
            }
            result = &mut http => {
                match result {
                    Ok(outcome) => outcome?,
                    Err(err) => info!("http server task ended: {}", err),
                }
                break;
            }
            _ = tokio::signal::ctrl_c() => {
                info!("interrupt received, shutting down");
                break;
            }
        }
    }

    state.app.current().shutdown().await;
    Ok(())
}

/// The dev server port: the `--port` flag wins over jib.config.json.
fn resolved_port(args: &StartArgs, config: &AppConfig) -> u16 {
    args.port.unwrap_or(config.port)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn port_flag_beats_config() {
        let config = AppConfig {
            port: 3000,
            ..AppConfig::default()
        };

        let args = StartArgs::default();
        assert_eq!(resolved_port(&args, &config), 3000);

        let args = StartArgs {
            port: Some(4100),
            ..StartArgs::default()
        };
        assert_eq!(resolved_port(&args, &config), 4100);
    }
}
