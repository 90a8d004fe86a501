use axum::body::Body;
use axum::extract::State;
use axum::http::{HeaderMap, HeaderValue, Request, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use sqlx::SqlitePool;

use super::handlers;
use super::jsonrpc::{JsonRpcErrorResponse, JsonRpcRequest};
use super::session::SessionManager;
use crate::agenda::Viewer;

/// `Mcp-Session-Id`, lowercased so it can be used as a static header name.
pub const SESSION_HEADER: &str = "mcp-session-id";
const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Shared state for the MCP server.
#[derive(Clone)]
pub struct McpState {
    pub pool: SqlitePool,
    pub sessions: SessionManager,
}

fn session_header(headers: &HeaderMap) -> Option<&str> {
    headers.get(SESSION_HEADER).and_then(|v| v.to_str().ok())
}

/// POST /mcp: one JSON-RPC message from the client.
pub async fn handle_post(
    State(state): State<McpState>,
    Extension(viewer): Extension<Viewer>,
    request: Request<Body>,
) -> Response {
    // A session id, when sent, must belong to the caller.
    if let Some(session_id) = session_header(request.headers()) {
        match state.sessions.viewer_for(session_id) {
            Some(owner) if owner.user_id == viewer.user_id => {}
            _ => return (StatusCode::NOT_FOUND, "Session not found").into_response(),
        }
    }

    let body = match axum::body::to_bytes(request.into_body(), MAX_BODY_BYTES).await {
        Ok(b) => b,
        Err(_) => return (StatusCode::PAYLOAD_TOO_LARGE, "Request body too large").into_response(),
    };

    let rpc_request: JsonRpcRequest = match serde_json::from_slice(&body) {
        Ok(req) => req,
        Err(e) => return Json(JsonRpcErrorResponse::parse_error(e).into_value()).into_response(),
    };

    let handled = handlers::handle_request(&state.pool, &state.sessions, &viewer, &rpc_request).await;

    if rpc_request.is_notification() {
        return StatusCode::ACCEPTED.into_response();
    }

    let mut response = Json(handled.body).into_response();
    if let Some(value) = handled
        .session_id
        .and_then(|id| HeaderValue::from_str(&id).ok())
    {
        response.headers_mut().insert(SESSION_HEADER, value);
    }
    response
}

/// GET /mcp: the server never pushes, so the stream is empty.
pub async fn handle_get() -> Response {
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/event-stream"),
            (header::CACHE_CONTROL, "no-cache"),
        ],
    )
        .into_response()
}

/// DELETE /mcp: end the caller's session.
pub async fn handle_delete(
    State(state): State<McpState>,
    Extension(viewer): Extension<Viewer>,
    headers: HeaderMap,
) -> Response {
    let Some(session_id) = session_header(&headers) else {
        return (StatusCode::BAD_REQUEST, "Missing Mcp-Session-Id header").into_response();
    };

    match state.sessions.viewer_for(session_id) {
        Some(owner) if owner.user_id == viewer.user_id => {
            state.sessions.remove_session(session_id);
            (StatusCode::OK, "Session terminated").into_response()
        }
        _ => (StatusCode::NOT_FOUND, "Session not found").into_response(),
    }
}
