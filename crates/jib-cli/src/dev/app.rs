//! The app-module abstraction.
//!
//! The dev server never links the SSR application in; it talks to it through
//! these traits. [`AppModule`] handles one proxied request, [`AppLoader`]
//! produces a fresh module (plus its hot-update runtime) from the build
//! output, and [`HotRuntime`] mirrors the hot-replacement state machine the
//! running app exposes. [`AppHandle`] is the single swappable reference
//! request handlers read the current module through.

use std::sync::Arc;

use async_trait::async_trait;
use axum::http::{HeaderMap, Method, StatusCode};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::error::DevResult;

/// A buffered request forwarded into the app module.
#[derive(Debug, Clone)]
pub struct ProxyRequest {
    pub method: Method,
    /// Path and query, e.g. `/profile?tab=settings`.
    pub uri: String,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

/// A buffered response from the app module.
#[derive(Debug, Clone)]
pub struct ProxyResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl ProxyResponse {
    /// Whether the response body is an HTML document (reload-script
    /// injection only applies to those).
    pub fn is_html(&self) -> bool {
        self.headers
            .get(axum::http::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("text/html"))
    }
}

/// The currently loaded server bundle, seen as a request handler.
#[async_trait]
pub trait AppModule: Send + Sync {
    async fn handle(&self, request: ProxyRequest) -> DevResult<ProxyResponse>;

    /// Release the module's resources (the node implementation kills its
    /// child process). Called before the handle swaps in a replacement.
    async fn shutdown(&self) {}
}

/// A freshly loaded app: the module plus the hot runtime that belongs to it.
///
/// The two travel together because a full reload replaces both; a hot
/// runtime pointed at a dead module is useless.
pub struct LoadedApp {
    pub module: Arc<dyn AppModule>,
    pub hot: Option<Arc<dyn HotRuntime>>,
}

impl std::fmt::Debug for LoadedApp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadedApp")
            .field("hot", &self.hot.is_some())
            .finish_non_exhaustive()
    }
}

/// Loads a fresh [`AppModule`] from the build output.
#[async_trait]
pub trait AppLoader: Send + Sync {
    async fn load(&self) -> DevResult<LoadedApp>;
}

/// The hot-replacement runtime's state machine, mirrored.
///
/// This side never owns the state; it only reads it and reacts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HotStatus {
    Idle,
    Check,
    Prepare,
    Ready,
    Abort,
    Fail,
}

impl HotStatus {
    /// Abort and fail both mean the update cannot be applied and the module
    /// must be reloaded wholesale.
    pub fn is_failure(&self) -> bool {
        matches!(self, HotStatus::Abort | HotStatus::Fail)
    }
}

/// Result of one hot-update check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "lowercase")]
pub enum HotCheckOutcome {
    /// No modules changed since the last apply.
    Unchanged,
    /// An update was applied; further updates may have arrived meanwhile.
    Applied { modules: Vec<String> },
    /// The update could not be applied.
    Failed { status: HotStatus, reason: String },
}

/// Control surface for the app's hot-replacement runtime.
#[async_trait]
pub trait HotRuntime: Send + Sync {
    async fn status(&self) -> DevResult<HotStatus>;
    async fn check(&self, apply: bool) -> DevResult<HotCheckOutcome>;
}

/// Swappable reference to the current app module.
///
/// Mutated only by the orchestrator; request handlers clone the `Arc` out
/// under the read lock, so an in-flight request keeps the module it started
/// with even across a swap.
pub struct AppHandle {
    current: RwLock<Arc<dyn AppModule>>,
}

impl AppHandle {
    pub fn new(initial: Arc<dyn AppModule>) -> Self {
        AppHandle {
            current: RwLock::new(initial),
        }
    }

    /// The module serving requests right now.
    pub fn current(&self) -> Arc<dyn AppModule> {
        Arc::clone(&self.current.read())
    }

    /// Install a replacement module, returning the one it displaced.
    pub fn replace(&self, next: Arc<dyn AppModule>) -> Arc<dyn AppModule> {
        std::mem::replace(&mut *self.current.write(), next)
    }
}
