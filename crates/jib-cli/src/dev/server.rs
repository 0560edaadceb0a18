//! The dev server's HTTP surface.
//!
//! Routing, most specific first:
//! - `/__jib/client.js` - the live-reload client, served with the session's
//!   options prepended
//! - `/__jib/events` - the SSE event stream browsers subscribe to
//! - `/__jib/sync` - ghost-mode ingestion, re-broadcast to other browsers
//! - everything else: bundle cache, then `public/` on disk, then the gated
//!   proxy into the app module (with reload-script injection into HTML)
//!
//! While the client bundle is broken, HTML navigations get the error overlay
//! instead of a proxied page.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::path::{Component, Path, PathBuf};

use axum::{
    Json, Router,
    body::Body,
    extract::{Request, State},
    http::{HeaderMap, StatusCode, header},
    response::{
        IntoResponse, Response,
        sse::{Event, KeepAlive, Sse},
    },
    routing::{get, post},
};
use tokio_stream::{StreamExt, wrappers::ReceiverStream};
use tower_http::cors::{Any, CorsLayer};
use tracing::{debug, warn};

use crate::dev::DevEvent;
use crate::dev::app::ProxyRequest;
use crate::dev::error_overlay;
use crate::dev::state::{ClientBundleStatus, SharedState, content_type_for};
use crate::error::{DevError, DevResult};
use crate::ui;

const RELOAD_CLIENT: &str = include_str!("../../assets/dev/reload-client.js");
const RELOAD_SCRIPT_TAG: &str = r#"<script src="/__jib/client.js"></script>"#;

/// Largest request body the proxy will buffer.
const MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

/// Bind the address and serve until the process ends.
pub async fn serve(addr: SocketAddr, state: SharedState) -> DevResult<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|source| DevError::Bind { addr, source })?;

    ui::success(&format!("Development server running at http://{}", addr));

    axum::serve(listener, router(state))
        .await
        .map_err(DevError::Io)
}

/// The full router; separate from [`serve`] so tests can drive it directly.
pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/__jib/client.js", get(handle_client_script))
        .route("/__jib/events", get(handle_events))
        .route("/__jib/sync", post(handle_sync))
        .fallback(handle_request)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

/// Serve the reload client with this session's options prepended.
async fn handle_client_script(State(state): State<SharedState>) -> impl IntoResponse {
    let script = format!(
        "window.__JIB_OPTIONS__ = {{ ui: {}, ghost: {} }};\n{}",
        state.ui, state.ghost, RELOAD_CLIENT
    );

    (
        [
            (header::CONTENT_TYPE, "application/javascript"),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        script,
    )
}

/// SSE subscription endpoint.
async fn handle_events(
    State(state): State<SharedState>,
) -> Sse<impl tokio_stream::Stream<Item = Result<Event, Infallible>>> {
    let (id, rx) = state.register_client();
    debug!(id, "browser connected to event stream");
    state.broadcast(&DevEvent::ClientConnected { id }).await;

    let stream = ReceiverStream::new(rx).map(|data| Ok(Event::default().data(data)));

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(std::time::Duration::from_secs(15))
            .text("ping"),
    )
}

/// Ghost-mode ingestion: one browser posts, everyone else mirrors.
async fn handle_sync(
    State(state): State<SharedState>,
    Json(payload): Json<serde_json::Value>,
) -> StatusCode {
    if state.ghost {
        state.broadcast(&DevEvent::Sync { payload }).await;
    }
    StatusCode::NO_CONTENT
}

/// Everything that is not a control endpoint.
async fn handle_request(State(state): State<SharedState>, request: Request) -> Response {
    let path = request.uri().path().to_string();

    // A broken client bundle turns HTML navigations into the overlay page;
    // asset requests keep falling through so the overlay itself can load.
    if let ClientBundleStatus::Failed { error } = state.get_status() {
        if wants_html(request.headers()) {
            return html_response(error_overlay::page(&error).into_bytes());
        }
    }

    if let Some((content, content_type)) = state.get_cached_file(&path) {
        return file_response(content, content_type);
    }

    if let Some(file) = resolve_public(&state.public_dir, &path) {
        match tokio::fs::read(&file).await {
            Ok(content) => return file_response(content, content_type_for(&path)),
            Err(err) => warn!(file = %file.display(), "failed to read static file: {}", err),
        }
    }

    proxy(state, request).await
}

/// Forward a request into the current app module, behind the gate.
async fn proxy(state: SharedState, request: Request) -> Response {
    state.gate.wait_open().await;
    let app = state.app.current();

    let (parts, body) = request.into_parts();
    let body = match axum::body::to_bytes(body, MAX_BODY_BYTES).await {
        Ok(bytes) => bytes.to_vec(),
        Err(err) => {
            return plain_response(
                StatusCode::PAYLOAD_TOO_LARGE,
                format!("Request body rejected: {}", err),
            );
        }
    };

    let uri = parts
        .uri
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| parts.uri.path().to_string());

    let outcome = app
        .handle(ProxyRequest {
            method: parts.method,
            uri,
            headers: parts.headers,
            body,
        })
        .await;

    match outcome {
        Ok(upstream) => {
            let body = if upstream.is_html() {
                inject_reload_script(&upstream.body)
            } else {
                upstream.body.clone()
            };

            let mut builder = Response::builder().status(upstream.status);
            for (name, value) in &upstream.headers {
                // The body may have grown; the framework recomputes length.
                if *name == header::CONTENT_LENGTH || *name == header::TRANSFER_ENCODING {
                    continue;
                }
                builder = builder.header(name, value);
            }
            builder
                .body(Body::from(body))
                .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
        }
        Err(err) => {
            warn!("app request failed: {}", err);
            plain_response(
                StatusCode::BAD_GATEWAY,
                format!("App request failed: {}", err),
            )
        }
    }
}

/// Map a URL path onto the public directory, refusing traversal.
fn resolve_public(public_dir: &Path, url_path: &str) -> Option<PathBuf> {
    let relative = Path::new(url_path.trim_start_matches('/'));
    if relative
        .components()
        .any(|c| !matches!(c, Component::Normal(_)))
    {
        return None;
    }

    let file = public_dir.join(relative);
    file.is_file().then_some(file)
}

/// Whether the request is an HTML navigation rather than an asset fetch.
fn wants_html(headers: &HeaderMap) -> bool {
    headers
        .get(header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|accept| accept.contains("text/html"))
}

/// Add the reload client before `</body>`, or at the end when the document
/// has no closing body tag.
fn inject_reload_script(content: &[u8]) -> Vec<u8> {
    let html = String::from_utf8_lossy(content);

    if let Some(pos) = html.rfind("</body>") {
        let mut out = String::with_capacity(html.len() + RELOAD_SCRIPT_TAG.len() + 8);
        out.push_str(&html[..pos]);
        out.push_str("\n  ");
        out.push_str(RELOAD_SCRIPT_TAG);
        out.push('\n');
        out.push_str(&html[pos..]);
        return out.into_bytes();
    }

    let mut out = html.into_owned();
    out.push('\n');
    out.push_str(RELOAD_SCRIPT_TAG);
    out.into_bytes()
}

fn file_response(content: Vec<u8>, content_type: &'static str) -> Response {
    (
        [
            (header::CONTENT_TYPE, content_type),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        content,
    )
        .into_response()
}

fn html_response(content: Vec<u8>) -> Response {
    (
        [
            (header::CONTENT_TYPE, "text/html; charset=utf-8"),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        content,
    )
        .into_response()
}

fn plain_response(status: StatusCode, message: String) -> Response {
    (status, message).into_response()
}
