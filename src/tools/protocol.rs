//! MCP wire protocol
//!
//! JSON-RPC 2.0 framing, the handful of MCP methods the tool layer needs
//! (`initialize`, `tools/list`, `tools/call`), and the pending-request table
//! used by transports that receive responses out of band.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::oneshot;
use tracing::{debug, warn};

use crate::core::{Result, StewardError, ToolDescriptor};

pub const PROTOCOL_VERSION: &str = "2024-11-05";

/// Outgoing JSON-RPC request or notification (no id)
#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl JsonRpcRequest {
    pub fn request(id: u64, method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: "2.0",
            id: Some(id),
            method: method.into(),
            params,
        }
    }

    pub fn notification(method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: "2.0",
            id: None,
            method: method.into(),
            params,
        }
    }
}

/// JSON-RPC error object
#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcError {
    pub code: i64,
    pub message: String,
    #[serde(default)]
    pub data: Option<Value>,
}

/// Incoming JSON-RPC response
#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcResponse {
    #[serde(default)]
    pub id: Value,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<JsonRpcError>,
}

impl JsonRpcResponse {
    /// Unwrap the result, turning a JSON-RPC error into a Connection error
    pub fn into_result(self) -> Result<Value> {
        if let Some(err) = self.error {
            return Err(StewardError::connection(format!(
                "JSON-RPC error {}: {}",
                err.code, err.message
            )));
        }
        Ok(self.result.unwrap_or(Value::Null))
    }
}

/// Classify an incoming frame: responses are returned, server notifications
/// and requests are logged and dropped.
pub fn parse_incoming(raw: &str) -> Option<JsonRpcResponse> {
    let value: Value = match serde_json::from_str(raw) {
        Ok(v) => v,
        Err(e) => {
            debug!(error = %e, "ignoring non-JSON line from tool server");
            return None;
        }
    };

    let is_response = value.get("id").is_some_and(|id| !id.is_null())
        && (value.get("result").is_some() || value.get("error").is_some());

    if is_response {
        return serde_json::from_value(value).ok();
    }

    match value.get("method").and_then(Value::as_str) {
        Some(method) if value.get("id").is_some() => {
            warn!(method, "tool server sent a request; requests are not supported");
        }
        Some(method) => debug!(method, "tool server notification"),
        None => debug!("ignoring unrecognized frame from tool server"),
    }
    None
}

/// `initialize` parameters
pub fn initialize_params(client_name: &str, client_version: &str) -> Value {
    serde_json::json!({
        "protocolVersion": PROTOCOL_VERSION,
        "capabilities": {},
        "clientInfo": { "name": client_name, "version": client_version }
    })
}

/// `tools/list` parameters
pub fn tools_list_params(cursor: Option<&str>) -> Option<Value> {
    cursor.map(|c| serde_json::json!({ "cursor": c }))
}

/// `tools/call` parameters; MCP requires an object for arguments
pub fn tools_call_params(name: &str, arguments: Value) -> Value {
    let arguments = match arguments {
        Value::Null => Value::Object(Default::default()),
        other => other,
    };
    serde_json::json!({ "name": name, "arguments": arguments })
}

/// Tool as listed by an MCP server
#[derive(Debug, Clone, Deserialize)]
pub struct McpTool {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(rename = "inputSchema", default)]
    pub input_schema: Option<Value>,
}

impl From<McpTool> for ToolDescriptor {
    fn from(tool: McpTool) -> Self {
        ToolDescriptor::new(
            tool.name,
            tool.description.unwrap_or_default(),
            tool.input_schema
                .unwrap_or_else(|| serde_json::json!({ "type": "object", "properties": {} })),
        )
    }
}

/// `tools/list` result
#[derive(Debug, Clone, Deserialize)]
pub struct ToolsListResult {
    #[serde(default)]
    pub tools: Vec<McpTool>,
    #[serde(rename = "nextCursor", default)]
    pub next_cursor: Option<String>,
}

/// Normalize a `tools/call` result into a single payload.
///
/// `{content: [...]}` yields the content array; a result without `content`
/// is used whole; `isError: true` becomes an `Err` carrying the joined text.
pub fn normalize_call_result(result: Value) -> std::result::Result<Value, String> {
    let is_error = result
        .get("isError")
        .and_then(Value::as_bool)
        .unwrap_or(false);

    let payload = match result {
        Value::Object(mut map) => match map.remove("content") {
            Some(content) => content,
            None => Value::Object(map),
        },
        other => other,
    };

    if is_error {
        let text = content_text(&payload);
        return Err(if text.is_empty() {
            payload.to_string()
        } else {
            text
        });
    }

    Ok(payload)
}

/// Concatenate the `text` members of an MCP content array
pub fn content_text(content: &Value) -> String {
    match content {
        Value::Array(items) => items
            .iter()
            .filter_map(|item| item.get("text").and_then(Value::as_str))
            .collect::<Vec<_>>()
            .join("\n"),
        Value::String(s) => s.clone(),
        _ => String::new(),
    }
}

/// Request/response waiter.
type ResponseWaiter = oneshot::Sender<JsonRpcResponse>;

/// Requests awaiting a response delivered by a background reader.
///
/// The map lock is never held across an await, so it is a plain mutex and
/// entries can be removed from `Drop`.
#[derive(Default)]
pub struct PendingRequests {
    next_id: AtomicU64,
    waiters: Mutex<HashMap<u64, ResponseWaiter>>,
}

impl PendingRequests {
    pub fn new() -> Self {
        Self::default()
    }

    fn waiters(&self) -> MutexGuard<'_, HashMap<u64, ResponseWaiter>> {
        self.waiters.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Allocate an id and register a waiter for it. Dropping the returned
    /// [`PendingResponse`] unregisters the id, including when the awaiting
    /// future is cancelled.
    pub fn register(&self) -> PendingResponse<'_> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let (tx, rx) = oneshot::channel();
        self.waiters().insert(id, tx);
        PendingResponse {
            pending: self,
            id,
            rx,
        }
    }

    /// Hand a response to its waiter
    pub fn resolve(&self, response: JsonRpcResponse) {
        let Some(id) = response.id.as_u64() else {
            warn!(id = %response.id, "response with non-numeric id");
            return;
        };

        match self.waiters().remove(&id) {
            Some(waiter) => {
                let _ = waiter.send(response);
            }
            None => warn!(id, "received response for unknown request id"),
        }
    }

    /// Fail every outstanding request (their receivers observe a closed channel)
    pub fn fail_all(&self) {
        self.waiters().clear();
    }

    /// Number of requests still waiting for a response
    pub fn outstanding(&self) -> usize {
        self.waiters().len()
    }
}

/// One registered request
pub struct PendingResponse<'a> {
    pending: &'a PendingRequests,
    id: u64,
    rx: oneshot::Receiver<JsonRpcResponse>,
}

impl PendingResponse<'_> {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Await the response, mapping a dropped waiter to a Connection error
    pub async fn wait(mut self, server: &str, method: &str) -> Result<Value> {
        (&mut self.rx)
            .await
            .map_err(|_| {
                StewardError::connection(format!(
                    "Tool server '{}' closed before answering {}",
                    server, method
                ))
            })?
            .into_result()
    }
}

impl Drop for PendingResponse<'_> {
    fn drop(&mut self) {
        self.pending.waiters().remove(&self.id);
    }
}
