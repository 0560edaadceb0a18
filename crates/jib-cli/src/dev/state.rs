//! Shared state for the development server.
//!
//! One [`DevServerState`] per `jib start`, shared between the HTTP handlers
//! and the orchestrator behind an `Arc`. Interior mutability uses
//! parking_lot locks; none of the guarded sections await.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use jib_bundler::{CompileState, TargetKind};
use parking_lot::RwLock;
use tokio::sync::mpsc;
use tracing::debug;
use walkdir::WalkDir;

use crate::dev::DevEvent;
use crate::dev::app::AppHandle;
use crate::dev::gate::ReadyGate;
use crate::error::Result;

/// Client-bundle status, driving the in-browser error overlay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientBundleStatus {
    /// Last client compile succeeded (or none has run yet).
    Ready,
    /// A client compile is in flight.
    Building,
    /// Last client compile failed; HTML navigations get the overlay.
    Failed { error: String },
}

impl ClientBundleStatus {
    pub fn error(&self) -> Option<&str> {
        match self {
            ClientBundleStatus::Failed { error } => Some(error),
            _ => None,
        }
    }
}

/// In-memory copy of the client bundle output, keyed by URL path.
///
/// Rebuilt wholesale from disk after each successful client compile, so a
/// half-written output directory is never served.
#[derive(Debug, Default)]
pub struct BundleCache {
    files: HashMap<String, (Vec<u8>, &'static str)>,
}

impl BundleCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load every file under `dir` into the cache, keyed by its URL path
    /// relative to the dev server root.
    ///
    /// `dir` is the build output's public directory, so a file at
    /// `build/public/assets/client.js` lands under `/assets/client.js`.
    pub fn load_from_dir(dir: &Path) -> Result<Self> {
        let mut cache = BundleCache::new();
        if !dir.is_dir() {
            return Ok(cache);
        }

        for entry in WalkDir::new(dir).into_iter().filter_map(|e| e.ok()) {
            if !entry.file_type().is_file() {
                continue;
            }
            let relative = entry
                .path()
                .strip_prefix(dir)
                .expect("walkdir yields children of its root");
            let url = format!("/{}", relative.to_string_lossy().replace('\\', "/"));
            let content = std::fs::read(entry.path())?;
            cache.insert(url, content);
        }

        debug!(files = cache.len(), dir = %dir.display(), "bundle cache loaded");
        Ok(cache)
    }

    pub fn insert(&mut self, url: String, content: Vec<u8>) {
        let content_type = content_type_for(&url);
        self.files.insert(url, (content, content_type));
    }

    pub fn get(&self, url: &str) -> Option<&(Vec<u8>, &'static str)> {
        self.files.get(url)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

fn target_slot(target: TargetKind) -> usize {
    match target {
        TargetKind::Client => 0,
        TargetKind::Server => 1,
    }
}

/// Content type from the URL's extension.
pub(crate) fn content_type_for(path: &str) -> &'static str {
    let extension = Path::new(path)
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or("");

    match extension {
        "js" | "mjs" => "application/javascript",
        "json" | "map" => "application/json",
        "html" => "text/html; charset=utf-8",
        "css" => "text/css",
        "ico" => "image/x-icon",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "webmanifest" => "application/manifest+json",
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        "ttf" => "font/ttf",
        "txt" => "text/plain; charset=utf-8",
        _ => "application/octet-stream",
    }
}

/// Shared development server state.
pub struct DevServerState {
    /// Client-bundle status for the overlay.
    pub status: RwLock<ClientBundleStatus>,

    /// Per-target compile lifecycle, `[client, server]`, updated by the
    /// orchestrator as compiles start and finish.
    compiles: RwLock<[CompileState; 2]>,

    /// In-memory client bundle artifacts.
    pub cache: RwLock<BundleCache>,

    /// The readiness gate proxied requests wait on.
    pub gate: ReadyGate,

    /// The current app module.
    pub app: AppHandle,

    /// Static assets served from disk (`public/`).
    pub public_dir: PathBuf,

    /// Show the reload client's status toast.
    pub ui: bool,

    /// Mirror scroll/navigation across connected browsers.
    pub ghost: bool,

    /// Connected SSE clients.
    clients: RwLock<HashMap<usize, mpsc::Sender<String>>>,
    next_client_id: RwLock<usize>,
}

/// Shared handle passed to the HTTP handlers and the orchestrator.
pub type SharedState = Arc<DevServerState>;

impl DevServerState {
    pub fn new(app: AppHandle, public_dir: PathBuf, ui: bool, ghost: bool) -> Self {
        DevServerState {
            status: RwLock::new(ClientBundleStatus::Ready),
            compiles: RwLock::new([CompileState::Idle; 2]),
            cache: RwLock::new(BundleCache::new()),
            gate: ReadyGate::new(),
            app,
            public_dir,
            ui,
            ghost,
            clients: RwLock::new(HashMap::new()),
            next_client_id: RwLock::new(0),
        }
    }

    pub fn set_status(&self, status: ClientBundleStatus) {
        *self.status.write() = status;
    }

    pub fn set_compile_state(&self, target: TargetKind, state: CompileState) {
        self.compiles.write()[target_slot(target)] = state;
    }

    pub fn compile_state(&self, target: TargetKind) -> CompileState {
        self.compiles.read()[target_slot(target)]
    }

    pub fn get_status(&self) -> ClientBundleStatus {
        self.status.read().clone()
    }

    pub fn update_cache(&self, cache: BundleCache) {
        *self.cache.write() = cache;
    }

    pub fn get_cached_file(&self, url: &str) -> Option<(Vec<u8>, &'static str)> {
        self.cache.read().get(url).cloned()
    }

    /// Register an SSE client; returns its id and the event receiver.
    pub fn register_client(&self) -> (usize, mpsc::Receiver<String>) {
        let id = {
            let mut next = self.next_client_id.write();
            let id = *next;
            *next += 1;
            id
        };

        let (tx, rx) = mpsc::channel(100);
        self.clients.write().insert(id, tx);
        (id, rx)
    }

    pub fn unregister_client(&self, id: usize) {
        self.clients.write().remove(&id);
    }

    pub fn client_count(&self) -> usize {
        self.clients.read().len()
    }

    /// Send an event to every connected browser, pruning dead connections.
    pub async fn broadcast(&self, event: &DevEvent) {
        let json = serde_json::to_string(event).unwrap_or_else(|_| "{}".to_string());
        let clients: Vec<(usize, mpsc::Sender<String>)> = self
            .clients
            .read()
            .iter()
            .map(|(id, tx)| (*id, tx.clone()))
            .collect();

        let mut dead = Vec::new();
        for (id, tx) in clients {
            if tx.send(json.clone()).await.is_err() {
                dead.push(id);
            }
        }
        for id in dead {
            self.unregister_client(id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dev::app::{AppModule, ProxyRequest, ProxyResponse};
    use crate::error::DevResult;
    use async_trait::async_trait;
    use axum::http::{HeaderMap, StatusCode};

    struct NullApp;

    #[async_trait]
    impl AppModule for NullApp {
        async fn handle(&self, _request: ProxyRequest) -> DevResult<ProxyResponse> {
            Ok(ProxyResponse {
                status: StatusCode::OK,
                headers: HeaderMap::new(),
                body: Vec::new(),
            })
        }
    }

    fn state() -> DevServerState {
        DevServerState::new(
            AppHandle::new(Arc::new(NullApp)),
            PathBuf::from("public"),
            false,
            false,
        )
    }

    #[test]
    fn cache_loads_from_disk_keyed_by_url() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("assets")).unwrap();
        std::fs::write(dir.path().join("assets/client.js"), "app();").unwrap();
        std::fs::write(dir.path().join("assets/client.css"), "body{}").unwrap();

        let cache = BundleCache::load_from_dir(dir.path()).unwrap();
        assert_eq!(cache.len(), 2);

        let (content, content_type) = cache.get("/assets/client.js").unwrap();
        assert_eq!(content, b"app();");
        assert_eq!(*content_type, "application/javascript");
        assert_eq!(cache.get("/assets/client.css").unwrap().1, "text/css");
    }

    #[test]
    fn cache_from_missing_dir_is_empty() {
        let cache = BundleCache::load_from_dir(Path::new("/no/such/dir")).unwrap();
        assert!(cache.is_empty());
    }

    #[test]
    fn compile_state_is_tracked_per_target() {
        let state = state();
        assert_eq!(state.compile_state(TargetKind::Client), CompileState::Idle);
        assert_eq!(state.compile_state(TargetKind::Server), CompileState::Idle);

        state.set_compile_state(TargetKind::Server, CompileState::Compiling);
        assert!(state.compile_state(TargetKind::Server).is_compiling());
        assert_eq!(state.compile_state(TargetKind::Client), CompileState::Idle);

        state.set_compile_state(TargetKind::Server, CompileState::Done { success: false });
        state.set_compile_state(TargetKind::Client, CompileState::Done { success: true });
        assert!(!state.compile_state(TargetKind::Server).succeeded());
        assert!(state.compile_state(TargetKind::Client).succeeded());
    }

    #[test]
    fn status_transitions() {
        let state = state();
        assert_eq!(state.get_status(), ClientBundleStatus::Ready);

        state.set_status(ClientBundleStatus::Building);
        assert!(state.get_status().error().is_none());

        state.set_status(ClientBundleStatus::Failed {
            error: "x is not defined".to_string(),
        });
        assert_eq!(state.get_status().error(), Some("x is not defined"));
    }

    #[tokio::test]
    async fn broadcast_prunes_disconnected_clients() {
        let state = state();
        let (_id1, mut rx1) = state.register_client();
        let (_id2, rx2) = state.register_client();
        assert_eq!(state.client_count(), 2);

        // Drop one receiver; the next broadcast should prune it.
        drop(rx2);
        state.broadcast(&DevEvent::Reload).await;

        assert_eq!(state.client_count(), 1);
        let received = rx1.recv().await.unwrap();
        assert!(received.contains("reload"));
    }
}
