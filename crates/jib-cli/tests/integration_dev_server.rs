//! Orchestrator behavior against scripted compiler, loader, and hot-runtime
//! doubles. These exercise the watch-cycle state machine end to end without
//! esbuild or node.

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use axum::http::{HeaderMap, Method, StatusCode};
use parking_lot::Mutex;

use jib_bundler::{CompileState, CompileStats, TargetKind};
use jib_cli::dev::{
    AppHandle, AppLoader, AppModule, Compiler, DevOrchestrator, DevServerState, HotCheckOutcome,
    HotRuntime, HotStatus, LoadedApp, ProxyRequest, ProxyResponse, SharedState,
};
use jib_cli::error::DevResult;

// --- doubles ---------------------------------------------------------------

struct StubApp(&'static str);

#[async_trait]
impl AppModule for StubApp {
    async fn handle(&self, _request: ProxyRequest) -> DevResult<ProxyResponse> {
        Ok(ProxyResponse {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            body: self.0.as_bytes().to_vec(),
        })
    }
}

struct MockCompiler {
    server_compiles: AtomicUsize,
    client_compiles: AtomicUsize,
    server_ok: bool,
    delay: Duration,
}

impl MockCompiler {
    fn new(server_ok: bool) -> Arc<Self> {
        Self::with_delay(server_ok, Duration::ZERO)
    }

    fn with_delay(server_ok: bool, delay: Duration) -> Arc<Self> {
        Arc::new(MockCompiler {
            server_compiles: AtomicUsize::new(0),
            client_compiles: AtomicUsize::new(0),
            server_ok,
            delay,
        })
    }

    fn stats(target: TargetKind) -> CompileStats {
        CompileStats {
            target,
            duration: Duration::from_millis(1),
            output_files: Vec::new(),
            metafile: serde_json::from_str(r#"{"outputs":{}}"#).unwrap(),
        }
    }
}

#[async_trait]
impl Compiler for MockCompiler {
    async fn compile(&self, target: TargetKind) -> jib_bundler::Result<CompileStats> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        match target {
            TargetKind::Client => {
                self.client_compiles.fetch_add(1, Ordering::SeqCst);
                Ok(Self::stats(target))
            }
            TargetKind::Server => {
                self.server_compiles.fetch_add(1, Ordering::SeqCst);
                if self.server_ok {
                    Ok(Self::stats(target))
                } else {
                    Err(jib_bundler::Error::Compile {
                        target,
                        stderr: "src/server.ts: unexpected token".to_string(),
                    })
                }
            }
        }
    }
}

/// Hot runtime that reports idle and replays a scripted outcome sequence,
/// answering `Unchanged` once the script runs out.
struct ScriptedHot {
    outcomes: Mutex<VecDeque<HotCheckOutcome>>,
    checks: AtomicUsize,
}

impl ScriptedHot {
    fn new(outcomes: Vec<HotCheckOutcome>) -> Arc<Self> {
        Arc::new(ScriptedHot {
            outcomes: Mutex::new(outcomes.into()),
            checks: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl HotRuntime for ScriptedHot {
    async fn status(&self) -> DevResult<HotStatus> {
        Ok(HotStatus::Idle)
    }

    async fn check(&self, _apply: bool) -> DevResult<HotCheckOutcome> {
        self.checks.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .outcomes
            .lock()
            .pop_front()
            .unwrap_or(HotCheckOutcome::Unchanged))
    }
}

struct MockLoader {
    loads: AtomicUsize,
}

impl MockLoader {
    fn new() -> Arc<Self> {
        Arc::new(MockLoader {
            loads: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl AppLoader for MockLoader {
    async fn load(&self) -> DevResult<LoadedApp> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        Ok(LoadedApp {
            module: Arc::new(StubApp("reloaded")),
            hot: Some(ScriptedHot::new(Vec::new())),
        })
    }
}

// --- helpers ---------------------------------------------------------------

fn state() -> SharedState {
    Arc::new(DevServerState::new(
        AppHandle::new(Arc::new(StubApp("initial"))),
        PathBuf::from("public"),
        false,
        false,
    ))
}

fn orchestrator(
    compiler: Arc<MockCompiler>,
    loader: Arc<MockLoader>,
    hot: Option<Arc<dyn HotRuntime>>,
    state: SharedState,
) -> DevOrchestrator {
    DevOrchestrator::new(
        compiler,
        loader,
        hot,
        state,
        PathBuf::from("/nonexistent/build"),
        PathBuf::from("/nonexistent/build/public"),
        "/assets/".to_string(),
    )
}

async fn served_body(state: &SharedState) -> Vec<u8> {
    state
        .app
        .current()
        .handle(ProxyRequest {
            method: Method::GET,
            uri: "/".to_string(),
            headers: HeaderMap::new(),
            body: Vec::new(),
        })
        .await
        .unwrap()
        .body
}

async fn assert_gate_opens(state: &SharedState) {
    tokio::time::timeout(Duration::from_secs(1), state.gate.wait_open())
        .await
        .expect("gate should open when the cycle completes");
}

// --- tests -----------------------------------------------------------------

#[tokio::test]
async fn changes_during_a_pending_cycle_collapse_into_one_followup() {
    let compiler = MockCompiler::new(true);
    let loader = MockLoader::new();
    let state = state();
    let orch = orchestrator(
        Arc::clone(&compiler),
        Arc::clone(&loader),
        Some(ScriptedHot::new(Vec::new())),
        Arc::clone(&state),
    );

    // Simulate a cycle already in flight.
    assert!(state.gate.arm());
    orch.on_change(std::path::Path::new("src/a.ts")).await;
    assert_eq!(compiler.server_compiles.load(Ordering::SeqCst), 0);

    // The in-flight cycle finishes; the next change runs its own cycle plus
    // exactly one follow-up for the suppressed one.
    state.gate.open();
    orch.on_change(std::path::Path::new("src/b.ts")).await;
    assert_eq!(compiler.server_compiles.load(Ordering::SeqCst), 2);
    assert!(!state.gate.is_pending());
    assert_gate_opens(&state).await;
}

#[tokio::test]
async fn concurrent_changes_collapse_into_one_followup_cycle() {
    let compiler = MockCompiler::with_delay(true, Duration::from_millis(200));
    let loader = MockLoader::new();
    let state = state();
    let orch = Arc::new(orchestrator(
        Arc::clone(&compiler),
        loader,
        Some(ScriptedHot::new(Vec::new())),
        Arc::clone(&state),
    ));

    // First change starts a slow cycle in its own task, as `start` wires it.
    let first = {
        let orch = Arc::clone(&orch);
        tokio::spawn(async move {
            orch.on_change(std::path::Path::new("src/a.ts")).await;
        })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;

    // These land mid-cycle; none may start a cycle of its own.
    orch.on_change(std::path::Path::new("src/b.ts")).await;
    orch.on_change(std::path::Path::new("src/c.ts")).await;
    orch.on_change(std::path::Path::new("src/d.ts")).await;

    first.await.unwrap();

    // One cycle for the triggering change, one follow-up for everything
    // that arrived while it ran.
    assert_eq!(compiler.server_compiles.load(Ordering::SeqCst), 2);
    assert_gate_opens(&state).await;
}

#[tokio::test]
async fn unchanged_hot_check_keeps_the_module() {
    let compiler = MockCompiler::new(true);
    let loader = MockLoader::new();
    let hot = ScriptedHot::new(Vec::new());
    let state = state();
    let orch = orchestrator(
        compiler,
        Arc::clone(&loader),
        Some(Arc::clone(&hot) as Arc<dyn HotRuntime>),
        Arc::clone(&state),
    );

    assert_eq!(state.compile_state(TargetKind::Server), CompileState::Idle);
    orch.on_change(std::path::Path::new("src/a.ts")).await;

    assert_eq!(hot.checks.load(Ordering::SeqCst), 1);
    assert_eq!(loader.loads.load(Ordering::SeqCst), 0);
    assert!(state.compile_state(TargetKind::Server).succeeded());
    assert_eq!(served_body(&state).await, b"initial");
    assert_gate_opens(&state).await;
}

#[tokio::test]
async fn applied_updates_loop_until_unchanged() {
    let compiler = MockCompiler::new(true);
    let loader = MockLoader::new();
    let hot = ScriptedHot::new(vec![
        HotCheckOutcome::Applied {
            modules: vec!["./src/api.ts".to_string()],
        },
        HotCheckOutcome::Applied {
            modules: vec!["./src/db.ts".to_string()],
        },
    ]);
    let state = state();
    let orch = orchestrator(
        compiler,
        Arc::clone(&loader),
        Some(Arc::clone(&hot) as Arc<dyn HotRuntime>),
        Arc::clone(&state),
    );

    orch.on_change(std::path::Path::new("src/api.ts")).await;

    // Two applies plus the terminating unchanged answer, no full reload.
    assert_eq!(hot.checks.load(Ordering::SeqCst), 3);
    assert_eq!(loader.loads.load(Ordering::SeqCst), 0);
    assert_eq!(served_body(&state).await, b"initial");
}

#[tokio::test]
async fn aborted_hot_update_reloads_the_module_exactly_once() {
    let compiler = MockCompiler::new(true);
    let loader = MockLoader::new();
    let hot = ScriptedHot::new(vec![HotCheckOutcome::Failed {
        status: HotStatus::Abort,
        reason: "module declined the update".to_string(),
    }]);
    let state = state();
    let orch = orchestrator(
        compiler,
        Arc::clone(&loader),
        Some(hot),
        Arc::clone(&state),
    );

    orch.on_change(std::path::Path::new("src/api.ts")).await;

    assert_eq!(loader.loads.load(Ordering::SeqCst), 1);
    assert_eq!(served_body(&state).await, b"reloaded");
    assert_gate_opens(&state).await;

    // The replacement module's hot runtime answers unchanged; no second load.
    orch.on_change(std::path::Path::new("src/api.ts")).await;
    assert_eq!(loader.loads.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn server_compile_failure_keeps_the_stale_module_serving() {
    let compiler = MockCompiler::new(false);
    let loader = MockLoader::new();
    let hot = ScriptedHot::new(Vec::new());
    let state = state();
    let orch = orchestrator(
        Arc::clone(&compiler),
        Arc::clone(&loader),
        Some(Arc::clone(&hot) as Arc<dyn HotRuntime>),
        Arc::clone(&state),
    );

    orch.on_change(std::path::Path::new("src/server.ts")).await;

    // No update check and no reload on a broken compile; the gate still
    // opens so queued requests reach the stale module.
    assert_eq!(compiler.server_compiles.load(Ordering::SeqCst), 1);
    assert_eq!(hot.checks.load(Ordering::SeqCst), 0);
    assert_eq!(loader.loads.load(Ordering::SeqCst), 0);
    assert_eq!(
        state.compile_state(TargetKind::Server),
        CompileState::Done { success: false }
    );
    assert_eq!(served_body(&state).await, b"initial");
    assert_gate_opens(&state).await;
}

#[tokio::test]
async fn missing_hot_runtime_forces_a_full_reload() {
    let compiler = MockCompiler::new(true);
    let loader = MockLoader::new();
    let state = state();
    let orch = orchestrator(compiler, Arc::clone(&loader), None, Arc::clone(&state));

    orch.on_change(std::path::Path::new("src/server.ts")).await;

    assert_eq!(loader.loads.load(Ordering::SeqCst), 1);
    assert_eq!(served_body(&state).await, b"reloaded");
}
