//! Node-backed implementations of the app abstractions.
//!
//! The dev build of the server bundle is run as a `node` child on an
//! ephemeral loopback port. Requests are forwarded over HTTP; the bundle's
//! dev runtime additionally exposes hot-update control endpoints
//! (`/__jib/hot/status`, `/__jib/hot/check`) that [`NodeHotRuntime`] speaks
//! to.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::process::{Child, Command};
use tracing::{debug, info, warn};

use crate::dev::app::{
    AppLoader, AppModule, HotCheckOutcome, HotRuntime, HotStatus, LoadedApp, ProxyRequest,
    ProxyResponse,
};
use crate::error::{DevError, DevResult};

const STARTUP_ATTEMPTS: u32 = 50;
const STARTUP_POLL: Duration = Duration::from_millis(100);

/// A running server-bundle child, addressed over loopback HTTP.
pub struct NodeApp {
    client: reqwest::Client,
    base: String,
    child: Mutex<Child>,
}

#[async_trait]
impl AppModule for NodeApp {
    async fn handle(&self, request: ProxyRequest) -> DevResult<ProxyResponse> {
        let url = format!("{}{}", self.base, request.uri);
        let response = self
            .client
            .request(request.method, &url)
            .headers(request.headers)
            .body(request.body)
            .send()
            .await?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await?.to_vec();

        Ok(ProxyResponse {
            status,
            headers,
            body,
        })
    }

    async fn shutdown(&self) {
        // kill_on_drop backs this up; killing eagerly frees the port sooner.
        if let Err(err) = self.child.lock().start_kill() {
            debug!(%err, "app child already gone");
        }
    }
}

/// Hot-update control over the app child's dev endpoints.
pub struct NodeHotRuntime {
    client: reqwest::Client,
    base: String,
}

#[derive(serde::Deserialize)]
struct StatusBody {
    status: HotStatus,
}

#[async_trait]
impl HotRuntime for NodeHotRuntime {
    async fn status(&self) -> DevResult<HotStatus> {
        let body: StatusBody = self
            .client
            .get(format!("{}/__jib/hot/status", self.base))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(body.status)
    }

    async fn check(&self, apply: bool) -> DevResult<HotCheckOutcome> {
        let response = self
            .client
            .post(format!("{}/__jib/hot/check", self.base))
            .json(&serde_json::json!({ "apply": apply }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(DevError::HotControl(format!(
                "check endpoint answered {}",
                response.status()
            )));
        }

        Ok(response.json().await?)
    }
}

/// Loads the server bundle by spawning a fresh node child.
pub struct NodeAppLoader {
    node: PathBuf,
    bundle: PathBuf,
    root: PathBuf,
}

impl NodeAppLoader {
    /// Locate node on PATH and target the given bundle.
    pub fn new(root: impl Into<PathBuf>, bundle: impl Into<PathBuf>) -> DevResult<Self> {
        let node = which::which("node")
            .map_err(|_| DevError::AppStart("'node' not found on PATH".to_string()))?;
        Ok(Self::with_node(node, root, bundle))
    }

    /// Use an explicit node binary instead of searching PATH.
    pub fn with_node(
        node: impl Into<PathBuf>,
        root: impl Into<PathBuf>,
        bundle: impl Into<PathBuf>,
    ) -> Self {
        NodeAppLoader {
            node: node.into(),
            bundle: bundle.into(),
            root: root.into(),
        }
    }
}

#[async_trait]
impl AppLoader for NodeAppLoader {
    async fn load(&self) -> DevResult<LoadedApp> {
        if !self.bundle.is_file() {
            return Err(DevError::AppStart(format!(
                "server bundle missing: {}",
                self.bundle.display()
            )));
        }

        let port = free_port()?;
        let mut child = Command::new(&self.node)
            .arg(&self.bundle)
            .current_dir(&self.root)
            .env("PORT", port.to_string())
            .env("DEV_SERVER", "true")
            .env("JIB_CLUSTER_WORKERS", "1")
            .kill_on_drop(true)
            .spawn()?;

        wait_reachable(&mut child, port).await?;
        info!(port, bundle = %self.bundle.display(), "app module loaded");

        let client = reqwest::Client::new();
        let base = format!("http://127.0.0.1:{}", port);
        let hot: Arc<dyn HotRuntime> = Arc::new(NodeHotRuntime {
            client: client.clone(),
            base: base.clone(),
        });

        Ok(LoadedApp {
            module: Arc::new(NodeApp {
                client,
                base,
                child: Mutex::new(child),
            }),
            hot: Some(hot),
        })
    }
}

/// Ask the kernel for an unused loopback port.
///
/// The listener is dropped before the child binds; the race window is
/// acceptable for a dev tool.
fn free_port() -> DevResult<u16> {
    let listener = std::net::TcpListener::bind(("127.0.0.1", 0))?;
    Ok(listener.local_addr()?.port())
}

/// Poll until the child accepts connections, with a bounded retry budget.
async fn wait_reachable(child: &mut Child, port: u16) -> DevResult<()> {
    for attempt in 0..STARTUP_ATTEMPTS {
        if let Some(status) = child.try_wait()? {
            return Err(DevError::AppStart(format!(
                "app process exited with {} before accepting connections",
                status
            )));
        }

        match tokio::net::TcpStream::connect(("127.0.0.1", port)).await {
            Ok(_) => return Ok(()),
            Err(err) => {
                if attempt == STARTUP_ATTEMPTS - 1 {
                    warn!(%err, port, "app never became reachable");
                }
            }
        }

        tokio::time::sleep(STARTUP_POLL).await;
    }

    let _ = child.start_kill();
    Err(DevError::AppStart(format!(
        "app did not accept connections on port {} within {:?}",
        port,
        STARTUP_POLL * STARTUP_ATTEMPTS
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn free_ports_are_usable() {
        let port = free_port().unwrap();
        assert_ne!(port, 0);
        // Rebinding the same port immediately should succeed.
        std::net::TcpListener::bind(("127.0.0.1", port)).unwrap();
    }

    #[tokio::test]
    async fn missing_bundle_fails_before_spawning() {
        let loader = NodeAppLoader::with_node("/no/such/node", "/proj", "/proj/build/server.js");
        let err = loader.load().await.unwrap_err();
        assert!(err.to_string().contains("server bundle missing"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn early_child_exit_is_reported() {
        let dir = tempfile::TempDir::new().unwrap();
        let bundle = dir.path().join("server.js");
        std::fs::write(&bundle, "exit 7\n").unwrap();

        // `sh` stands in for node; the script exits without ever listening.
        let loader = NodeAppLoader::with_node("/bin/sh", dir.path(), &bundle);
        let err = loader.load().await.unwrap_err();
        assert!(err.to_string().contains("before accepting connections"));
    }
}
