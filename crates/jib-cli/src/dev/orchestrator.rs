//! The watch-cycle state machine.
//!
//! One [`DevOrchestrator`] per `jib start`, owning the compile/update/reload
//! coordination. A filesystem change drives one cycle:
//!
//! 1. `WatchTriggered` - if the previous cycle's gate is still pending, the
//!    new cycle is suppressed (a dirty bit earns it one follow-up cycle).
//! 2. `Compiling` - both targets compile. The server target gates the cycle;
//!    the client target runs as an independent task that refreshes the
//!    bundle cache and notifies browsers.
//! 3. `UpdateCheck` - the hot runtime is asked to apply pending updates,
//!    looping while updates keep arriving. An `abort`/`fail` outcome drops
//!    the app module and reloads it fresh from the build output, exactly
//!    once.
//! 4. `Ready` - the gate opens; queued and future requests proceed.
//!
//! Compile errors never kill the dev server: the stale module keeps serving
//! until the next successful cycle.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use jib_bundler::{CompileState, TargetKind, write_manifests};
use parking_lot::RwLock;
use tracing::{debug, info, warn};

use crate::dev::DevEvent;
use crate::dev::app::{AppLoader, HotCheckOutcome, HotRuntime, HotStatus};
use crate::dev::compiler::Compiler;
use crate::dev::state::{BundleCache, ClientBundleStatus, SharedState};

/// Stages of one watch cycle, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleStage {
    WatchTriggered,
    Compiling,
    UpdateCheck,
    Ready,
}

impl fmt::Display for CycleStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CycleStage::WatchTriggered => "watch-triggered",
            CycleStage::Compiling => "compiling",
            CycleStage::UpdateCheck => "update-check",
            CycleStage::Ready => "ready",
        })
    }
}

/// Coordinates compiles, hot updates, and module reloads for the dev server.
pub struct DevOrchestrator {
    compiler: Arc<dyn Compiler>,
    loader: Arc<dyn AppLoader>,
    hot: RwLock<Option<Arc<dyn HotRuntime>>>,
    state: SharedState,
    build_dir: PathBuf,
    build_public: PathBuf,
    public_path: String,
    /// A change arrived while a gate was pending; run one follow-up cycle.
    dirty: AtomicBool,
}

impl DevOrchestrator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        compiler: Arc<dyn Compiler>,
        loader: Arc<dyn AppLoader>,
        hot: Option<Arc<dyn HotRuntime>>,
        state: SharedState,
        build_dir: PathBuf,
        build_public: PathBuf,
        public_path: String,
    ) -> Self {
        DevOrchestrator {
            compiler,
            loader,
            hot: RwLock::new(hot),
            state,
            build_dir,
            build_public,
            public_path,
            dirty: AtomicBool::new(false),
        }
    }

    pub fn state(&self) -> &SharedState {
        &self.state
    }

    /// React to a filesystem change.
    ///
    /// At most one cycle runs at a time; changes arriving mid-cycle are
    /// collapsed into a single follow-up cycle instead of queueing.
    pub async fn on_change(&self, path: &Path) {
        if !self.state.gate.arm() {
            self.dirty.store(true, Ordering::SeqCst);
            debug!(path = %path.display(), "change during pending cycle, suppressed");
            return;
        }
        debug!(path = %path.display(), stage = %CycleStage::WatchTriggered, "change detected");

        loop {
            self.run_cycle().await;
            if self.dirty.swap(false, Ordering::SeqCst) && self.state.gate.arm() {
                debug!("running follow-up cycle for changes seen mid-cycle");
                continue;
            }
            break;
        }
    }

    /// One armed cycle: compile, update-check, open the gate.
    ///
    /// The caller must have armed the gate; this always opens it.
    async fn run_cycle(&self) {
        debug!(stage = %CycleStage::Compiling, "cycle");
        self.state.set_status(ClientBundleStatus::Building);
        self.state.broadcast(&DevEvent::Building).await;

        self.spawn_client_compile();

        self.state
            .set_compile_state(TargetKind::Server, CompileState::Compiling);
        match self.compiler.compile(TargetKind::Server).await {
            Ok(stats) => {
                self.state
                    .set_compile_state(TargetKind::Server, CompileState::Done { success: true });
                info!(
                    "server bundle compiled in {} ms",
                    stats.duration.as_millis()
                );
                debug!(stage = %CycleStage::UpdateCheck, "cycle");
                self.update_check().await;
            }
            Err(err) => {
                self.state
                    .set_compile_state(TargetKind::Server, CompileState::Done { success: false });
                // The stale module keeps serving until the next good compile.
                warn!("server compile failed: {}", err);
            }
        }

        debug!(stage = %CycleStage::Ready, "cycle");
        self.state.gate.open();
    }

    /// Compile the client bundle off the cycle's critical path.
    ///
    /// Client output never gates request serving; on success the bundle
    /// cache and manifests refresh and browsers reload, on failure browsers
    /// get the error overlay.
    fn spawn_client_compile(&self) {
        let compiler = Arc::clone(&self.compiler);
        let state = Arc::clone(&self.state);
        let build_dir = self.build_dir.clone();
        let build_public = self.build_public.clone();
        let public_path = self.public_path.clone();

        self.state
            .set_compile_state(TargetKind::Client, CompileState::Compiling);
        tokio::spawn(async move {
            match compiler.compile(TargetKind::Client).await {
                Ok(stats) => {
                    state.set_compile_state(TargetKind::Client, CompileState::Done {
                        success: true,
                    });
                    match BundleCache::load_from_dir(&build_public) {
                        Ok(cache) => state.update_cache(cache),
                        Err(err) => warn!("failed to refresh bundle cache: {}", err),
                    }
                    if let Err(err) = write_manifests(&build_dir, &public_path, &stats.metafile) {
                        warn!("failed to write manifests: {}", err);
                    }
                    state.set_status(ClientBundleStatus::Ready);
                    state.broadcast(&DevEvent::Reload).await;
                    info!(
                        "client bundle compiled in {} ms",
                        stats.duration.as_millis()
                    );
                }
                Err(err) => {
                    state.set_compile_state(TargetKind::Client, CompileState::Done {
                        success: false,
                    });
                    let error = err.to_string();
                    warn!("client compile failed: {}", error);
                    state.set_status(ClientBundleStatus::Failed {
                        error: error.clone(),
                    });
                    state.broadcast(&DevEvent::BuildFailed { error }).await;
                }
            }
        });
    }

    /// Ask the hot runtime to apply pending updates.
    ///
    /// Loops while applies keep surfacing new updates. An `abort`/`fail`
    /// outcome falls back to a full module reload; other failures are
    /// logged and the cycle still completes.
    async fn update_check(&self) {
        let hot = self.hot.read().clone();
        let Some(hot) = hot else {
            // Without hot replacement, a fresh compile means a fresh module.
            self.full_reload("hot replacement unavailable").await;
            return;
        };

        match hot.status().await {
            Ok(HotStatus::Idle) => {}
            Ok(status) => {
                debug!(?status, "hot runtime busy, skipping update check");
                return;
            }
            Err(err) => {
                warn!("hot status check failed: {}", err);
                self.full_reload("hot runtime unreachable").await;
                return;
            }
        }

        let mut from_update = false;
        loop {
            match hot.check(true).await {
                Ok(HotCheckOutcome::Unchanged) => {
                    if from_update {
                        info!("[HMR] Update applied.");
                    } else {
                        info!("[HMR] Nothing hot updated.");
                    }
                    return;
                }
                Ok(HotCheckOutcome::Applied { modules }) => {
                    info!("[HMR] Updated modules:");
                    for module in &modules {
                        info!("[HMR]  - {}", module);
                    }
                    self.state.broadcast(&DevEvent::HotApplied { modules }).await;
                    // New updates may have arrived while this one applied.
                    from_update = true;
                }
                Ok(HotCheckOutcome::Failed { status, reason }) if status.is_failure() => {
                    warn!("[HMR] Cannot apply update: {}", reason);
                    self.full_reload("hot update aborted").await;
                    return;
                }
                Ok(HotCheckOutcome::Failed { reason, .. }) => {
                    warn!("[HMR] Update failed: {}", reason);
                    return;
                }
                Err(err) => {
                    match hot.status().await {
                        Ok(status) if status.is_failure() => {
                            warn!("[HMR] Cannot apply update: {}", err);
                            self.full_reload("hot update aborted").await;
                        }
                        _ => warn!("[HMR] Update failed: {}", err),
                    }
                    return;
                }
            }
        }
    }

    /// Drop the current app module and load a fresh one from the build
    /// output, replacing the hot runtime along with it.
    async fn full_reload(&self, why: &str) {
        match self.loader.load().await {
            Ok(loaded) => {
                let old = self.state.app.replace(loaded.module);
                old.shutdown().await;
                *self.hot.write() = loaded.hot;
                warn!("[HMR] App has been reloaded ({}).", why);
            }
            Err(err) => {
                // Keep the stale module; it still serves.
                warn!("app reload failed, keeping previous module: {}", err);
            }
        }
    }
}
