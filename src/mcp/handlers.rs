use serde_json::{Value, json};
use sqlx::SqlitePool;

use super::jsonrpc::{INVALID_REQUEST, JsonRpcErrorResponse, JsonRpcRequest, JsonRpcResponse};
use super::session::SessionManager;
use super::tools;
use crate::agenda::Viewer;

pub const PROTOCOL_VERSION: &str = "2025-03-26";
pub const SERVER_NAME: &str = "smarttask-planner";

/// Result of handling one JSON-RPC message.
pub struct Handled {
    pub body: Value,
    /// Set when the message opened a new session.
    pub session_id: Option<String>,
}

impl From<Value> for Handled {
    fn from(body: Value) -> Self {
        Self {
            body,
            session_id: None,
        }
    }
}

/// Route one JSON-RPC request to its method handler.
pub async fn handle_request(
    pool: &SqlitePool,
    sessions: &SessionManager,
    viewer: &Viewer,
    request: &JsonRpcRequest,
) -> Handled {
    if request.jsonrpc != "2.0" {
        return JsonRpcErrorResponse::error(request.id.clone(), INVALID_REQUEST, "Expected jsonrpc 2.0")
            .into_value()
            .into();
    }

    match request.method.as_str() {
        "initialize" => handle_initialize(sessions, viewer, request),
        "notifications/initialized" => Value::Null.into(),
        "ping" => JsonRpcResponse::success(request.id.clone(), json!({}))
            .into_value()
            .into(),
        "tools/list" => handle_tools_list(request).into(),
        "tools/call" => handle_tools_call(pool, viewer, request).await.into(),
        other => {
            tracing::debug!(method = other, "unknown json-rpc method");
            JsonRpcErrorResponse::method_not_found(request.id.clone())
                .into_value()
                .into()
        }
    }
}

fn handle_initialize(sessions: &SessionManager, viewer: &Viewer, request: &JsonRpcRequest) -> Handled {
    let session_id = sessions.create_session(viewer);

    let result = json!({
        "protocolVersion": PROTOCOL_VERSION,
        "capabilities": {
            "tools": {
                "listChanged": false
            }
        },
        "serverInfo": {
            "name": SERVER_NAME,
            "version": env!("CARGO_PKG_VERSION")
        },
        "instructions": "Plan your calendar events and tasks. Use agenda_for_date or upcoming_items for an overview, list_events and list_tasks for detail, and the create/update tools to make changes."
    });

    Handled {
        body: JsonRpcResponse::success(request.id.clone(), result).into_value(),
        session_id: Some(session_id),
    }
}

fn handle_tools_list(request: &JsonRpcRequest) -> Value {
    let tools_json: Vec<Value> = tools::all_tools()
        .iter()
        .map(|t| {
            json!({
                "name": t.name,
                "description": t.description,
                "inputSchema": t.input_schema,
            })
        })
        .collect();

    JsonRpcResponse::success(request.id.clone(), json!({ "tools": tools_json })).into_value()
}

async fn handle_tools_call(pool: &SqlitePool, viewer: &Viewer, request: &JsonRpcRequest) -> Value {
    let Some(tool_name) = request.params.get("name").and_then(|v| v.as_str()) else {
        return JsonRpcErrorResponse::invalid_params(request.id.clone(), "Missing 'name' in params")
            .into_value();
    };

    let arguments = request
        .params
        .get("arguments")
        .cloned()
        .unwrap_or_else(|| json!({}));

    if !arguments.is_object() {
        return JsonRpcErrorResponse::invalid_params(request.id.clone(), "'arguments' must be an object")
            .into_value();
    }

    let content = match tools::dispatch(pool, viewer, tool_name, &arguments).await {
        Ok(result) => json!({
            "content": [{
                "type": "text",
                "text": serde_json::to_string_pretty(&result).unwrap_or_default()
            }],
            "structuredContent": result,
            "isError": false
        }),
        Err(err) => {
            tracing::info!(tool = tool_name, user_id = %viewer.user_id, error = %err, "tool call failed");
            json!({
                "content": [{
                    "type": "text",
                    "text": err.to_string()
                }],
                "isError": true
            })
        }
    };

    JsonRpcResponse::success(request.id.clone(), content).into_value()
}
