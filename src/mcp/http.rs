//! HTTP transport.
//!
//! `POST /mcp` carries one JSON-RPC message per request. Sessions are keyed by
//! the `Mcp-Session-Id` header (`X-Mcp-Session-Id` is accepted too). An
//! `initialize` request without one opens a new session and receives its id
//! in the response header; any other message without one is rejected with
//! `400`. Requests get `200` with the reply, notifications `202` with no body.
//!
//! Each session has its own lock, so requests on different sessions run
//! concurrently. The decompilation itself runs on the blocking pool.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};

use axum::extract::State;
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;

use crate::decompiler::DecompilerService;
use crate::mcp::protocol::{parse_message, IncomingMessage};
use crate::mcp::session::McpSession;

/// Header carrying the session id.
pub const SESSION_HEADER: &str = "mcp-session-id";

/// Older spelling of [`SESSION_HEADER`], still accepted on requests.
pub const LEGACY_SESSION_HEADER: &str = "x-mcp-session-id";

type SharedSession = Arc<Mutex<McpSession>>;

/// Shared state of the HTTP transport.
pub struct HttpState {
    service: Arc<DecompilerService>,
    sessions: Mutex<HashMap<String, SharedSession>>,
}

impl HttpState {
    /// Creates state with no open sessions.
    #[must_use]
    pub fn new(service: Arc<DecompilerService>) -> Self {
        Self {
            service,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Number of open sessions.
    #[must_use]
    pub fn session_count(&self) -> usize {
        self.sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn get(&self, id: &str) -> Option<SharedSession> {
        self.sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
    }

    fn open(&self) -> (String, SharedSession) {
        let id = uuid::Uuid::new_v4().to_string();
        let session = Arc::new(Mutex::new(McpSession::new(Arc::clone(&self.service))));
        self.sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id.clone(), Arc::clone(&session));
        tracing::info!(session = %id, "Opened HTTP session");
        (id, session)
    }

    fn close(&self, id: &str) -> bool {
        let removed = self
            .sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(id);
        if let Some(session) = &removed {
            session
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .shutdown();
            tracing::info!(session = %id, "Closed HTTP session");
        }
        removed.is_some()
    }
}

/// Builds the router.
pub fn router(service: Arc<DecompilerService>) -> Router {
    router_with_state(Arc::new(HttpState::new(service)))
}

/// Builds the router around existing state.
pub fn router_with_state(state: Arc<HttpState>) -> Router {
    Router::new()
        .route("/mcp", post(handle_post).delete(handle_delete))
        .route("/health", get(health))
        .with_state(state)
}

/// Binds `host:port` and serves until `shutdown` resolves.
///
/// # Errors
///
/// Returns an error if the address cannot be bound or the server fails.
pub async fn serve<F>(
    service: Arc<DecompilerService>,
    host: &str,
    port: u16,
    shutdown: F,
) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let listener = tokio::net::TcpListener::bind((host, port)).await?;
    tracing::info!(address = %listener.local_addr()?, "HTTP transport listening");

    axum::serve(listener, router(service))
        .with_graceful_shutdown(shutdown)
        .await
}

/// Registers the shutdown signals and returns a future that resolves when
/// one arrives: SIGINT or SIGTERM on unix, Ctrl+C on windows.
///
/// Handlers are installed by this call, not when the future is first polled,
/// so a signal sent in between is not lost. Must be called inside a runtime.
///
/// # Errors
///
/// Returns an error if a signal handler cannot be installed.
#[cfg(unix)]
pub fn shutdown_signal() -> std::io::Result<impl Future<Output = ()> + Send + 'static> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;

    Ok(async move {
        tokio::select! {
            _ = sigint.recv() => {
                tracing::info!("Received SIGINT, initiating graceful shutdown");
            }
            _ = sigterm.recv() => {
                tracing::info!("Received SIGTERM, initiating graceful shutdown");
            }
        }
    })
}

/// Returns a future that resolves on Ctrl+C.
///
/// # Errors
///
/// Never fails on windows; the signature matches the unix version.
#[cfg(windows)]
pub fn shutdown_signal() -> std::io::Result<impl Future<Output = ()> + Send + 'static> {
    Ok(async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
        tracing::info!("Received Ctrl+C, initiating graceful shutdown");
    })
}

fn session_id(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(SESSION_HEADER)
        .or_else(|| headers.get(LEGACY_SESSION_HEADER))
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty())
}

fn session_not_found(id: &str) -> Response {
    tracing::debug!(session = %id, "Unknown HTTP session");
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "error": format!("Session not found: {id}") })),
    )
        .into_response()
}

/// Only an `initialize` request may arrive without a session id.
fn opens_session(body: &str) -> bool {
    matches!(
        parse_message(body),
        Ok(IncomingMessage::Request(req)) if req.method == "initialize"
    )
}

async fn handle_post(
    State(state): State<Arc<HttpState>>,
    headers: HeaderMap,
    body: String,
) -> Response {
    let (id, session) = match session_id(&headers) {
        Some(id) => match state.get(id) {
            Some(session) => (id.to_string(), session),
            None => return session_not_found(id),
        },
        None if opens_session(&body) => state.open(),
        None => {
            tracing::debug!("Rejected message without a session id");
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({
                    "error": "Missing Mcp-Session-Id header; only initialize opens a session"
                })),
            )
                .into_response();
        }
    };

    let reply = tokio::task::spawn_blocking(move || {
        session
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .handle_line(&body)
    })
    .await;

    let mut response = match reply {
        Ok(Some(reply)) => (StatusCode::OK, Json(reply)).into_response(),
        Ok(None) => StatusCode::ACCEPTED.into_response(),
        Err(e) => {
            tracing::error!(session = %id, error = %e, "Request handler panicked");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    };

    if let Ok(value) = HeaderValue::from_str(&id) {
        response.headers_mut().insert(SESSION_HEADER, value);
    }
    response
}

async fn handle_delete(State(state): State<Arc<HttpState>>, headers: HeaderMap) -> Response {
    let Some(id) = session_id(&headers) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "Missing Mcp-Session-Id header" })),
        )
            .into_response();
    };

    if state.close(id) {
        StatusCode::NO_CONTENT.into_response()
    } else {
        session_not_found(id)
    }
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}
