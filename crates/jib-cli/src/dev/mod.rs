//! Development server for `jib start`.
//!
//! The pieces, leaves first:
//! - [`gate`] - the readiness gate requests wait on during a rebuild
//! - [`app`] - the app-module abstraction and the swappable handle
//! - [`node`] - the production implementations backed by a node child process
//! - [`compiler`] - the per-target compile abstraction over the esbuild driver
//! - [`state`] - shared server state: bundle cache, SSE clients, gate, handle
//! - [`orchestrator`] - the watch-cycle state machine (the interesting part)
//! - [`server`] - the axum HTTP surface
//! - [`watcher`] - debounced file watching
//! - [`error_overlay`] - the in-browser compile-error page

pub mod app;
pub mod compiler;
pub mod error_overlay;
pub mod gate;
pub mod node;
pub mod orchestrator;
pub mod server;
pub mod state;
pub mod watcher;

// Re-exports
pub use app::{
    AppHandle, AppLoader, AppModule, HotCheckOutcome, HotRuntime, HotStatus, LoadedApp,
    ProxyRequest, ProxyResponse,
};
pub use compiler::{Compiler, EsbuildCompiler};
pub use gate::ReadyGate;
pub use node::NodeAppLoader;
pub use orchestrator::{CycleStage, DevOrchestrator};
pub use state::{BundleCache, ClientBundleStatus, DevServerState, SharedState};
pub use watcher::{FileChange, FileWatcher};

use serde::{Deserialize, Serialize};

/// Events pushed to connected browsers over the SSE channel.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum DevEvent {
    /// A compile cycle started
    Building,

    /// The client bundle was rebuilt; the page should reload
    Reload,

    /// The client bundle failed to compile
    BuildFailed { error: String },

    /// A server hot update was applied
    HotApplied { modules: Vec<String> },

    /// A browser connected to the event stream
    ClientConnected { id: usize },

    /// Ghost-mode payload mirrored across connected browsers
    Sync { payload: serde_json::Value },
}
