//! MCP over HTTP POST against a local mock tool server

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{json, Value};
use steward::core::config::ToolsConfig;
use steward::core::ToolCall;
use steward::tools::{McpConnection, ServerConfig, ToolConnectionManager, ToolServer, TransportKind};
use tokio::net::TcpListener;

const SESSION: &str = "sess-42";

#[derive(Default)]
struct Seen {
    /// (method, session header, authorization header) per request
    requests: Mutex<Vec<(String, Option<String>, Option<String>)>>,
}

fn rpc_result(id: &Value, result: Value) -> Value {
    json!({ "jsonrpc": "2.0", "id": id, "result": result })
}

async fn handle(State(seen): State<Arc<Seen>>, headers: HeaderMap, Json(frame): Json<Value>) -> Response {
    let method = frame["method"].as_str().unwrap_or_default().to_string();
    let header_value = |name: &str| headers.get(name).and_then(|v| v.to_str().ok()).map(str::to_string);
    seen.requests.lock().unwrap().push((
        method.clone(),
        header_value("mcp-session-id"),
        header_value("authorization"),
    ));

    let Some(id) = frame.get("id").cloned() else {
        return StatusCode::ACCEPTED.into_response();
    };

    match method.as_str() {
        "initialize" => (
            [("Mcp-Session-Id", SESSION)],
            Json(rpc_result(
                &id,
                json!({
                    "protocolVersion": "2024-11-05",
                    "capabilities": { "tools": {} },
                    "serverInfo": { "name": "mock-calendar", "version": "1.0" }
                }),
            )),
        )
            .into_response(),
        "tools/list" => {
            let page = match frame["params"]["cursor"].as_str() {
                None => json!({
                    "tools": [{
                        "name": "list-events",
                        "description": "List calendar events",
                        "inputSchema": { "type": "object", "properties": { "calendarId": { "type": "string" } } }
                    }],
                    "nextCursor": "page-2"
                }),
                Some(_) => json!({ "tools": [{ "name": "get-event" }] }),
            };
            Json(rpc_result(&id, page)).into_response()
        }
        "tools/call" => match frame["params"]["name"].as_str() {
            Some("list-events") => {
                // Answer on an event stream, preceded by an unrelated notification
                let body = format!(
                    "event: message\ndata: {}\n\nevent: message\ndata: {}\n\n",
                    json!({ "jsonrpc": "2.0", "method": "notifications/progress", "params": {} }),
                    rpc_result(
                        &id,
                        json!({ "content": [{ "type": "text", "text": "1. Event: Standup" }] })
                    )
                );
                ([(header::CONTENT_TYPE, "text/event-stream")], body).into_response()
            }
            Some("get-event") => Json(rpc_result(
                &id,
                json!({ "content": [{ "type": "text", "text": "not found" }], "isError": true }),
            ))
            .into_response(),
            _ => Json(json!({
                "jsonrpc": "2.0",
                "id": id,
                "error": { "code": -32602, "message": "Unknown tool" }
            }))
            .into_response(),
        },
        _ => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn spawn_mock() -> (SocketAddr, Arc<Seen>) {
    let seen = Arc::new(Seen::default());
    let app = Router::new()
        .route("/rpc", post(handle))
        .with_state(Arc::clone(&seen));
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (addr, seen)
}

#[tokio::test]
async fn test_http_connection_lists_and_calls_tools() {
    let (addr, seen) = spawn_mock().await;
    let config = ServerConfig {
        name: "calendar".to_string(),
        transport: TransportKind::Http {
            url: format!("http://{}/rpc", addr),
            headers: HashMap::from([("Authorization".to_string(), "secret-token".to_string())]),
        },
    };

    let connection = McpConnection::connect(&config).await.unwrap();

    let tools = connection.list_tools().await.unwrap();
    let names: Vec<&str> = tools.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, ["list-events", "get-event"]);
    assert_eq!(tools[0].description, "List calendar events");
    assert_eq!(tools[1].parameter_schema, json!({ "type": "object", "properties": {} }));

    let payload = connection
        .call_tool("list-events", json!({ "calendarId": "primary" }))
        .await
        .unwrap();
    assert_eq!(payload, json!([{ "type": "text", "text": "1. Event: Standup" }]));

    let err = connection.call_tool("get-event", json!({})).await.unwrap_err();
    assert!(err.to_string().contains("not found"));

    let err = connection.call_tool("missing", Value::Null).await.unwrap_err();
    assert!(err.to_string().contains("Unknown tool"));

    let requests = seen.requests.lock().unwrap().clone();
    let methods: Vec<&str> = requests.iter().map(|(m, _, _)| m.as_str()).collect();
    assert_eq!(
        methods,
        [
            "initialize",
            "notifications/initialized",
            "tools/list",
            "tools/list",
            "tools/call",
            "tools/call",
            "tools/call"
        ]
    );
    assert_eq!(requests[0].1, None);
    assert!(requests[1..].iter().all(|(_, session, _)| session.as_deref() == Some(SESSION)));
    assert!(requests
        .iter()
        .all(|(_, _, auth)| auth.as_deref() == Some("Bearer secret-token")));
}

#[tokio::test]
async fn test_manager_boots_http_server_from_config_file() {
    let (addr, _seen) = spawn_mock().await;
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("mcp.json");
    std::env::set_var("STEWARD_TEST_HTTP_TOKEN", "from-env");
    std::fs::write(
        &path,
        json!({
            "servers": [{
                "alias": "calendar",
                "type": "http",
                "url": format!("http://{}", addr),
                "headers": { "Authorization": "env:STEWARD_TEST_HTTP_TOKEN" }
            }]
        })
        .to_string(),
    )
    .unwrap();

    let manager = ToolConnectionManager::new(ToolsConfig {
        enabled: true,
        config_path: path,
        connect_timeout_secs: 5,
        call_timeout_secs: 5,
    });
    tokio_test::assert_ok!(manager.boot(true).await);

    let report = manager.status_report().await;
    assert_eq!(report.status, "connected");
    assert_eq!(report.tools_count, Some(2));

    let ok = manager
        .invoke(&ToolCall::new("1", "list-events", json!({})))
        .await;
    assert!(ok.is_success());
    assert_eq!(ok.id, "1");

    let failed = manager.invoke(&ToolCall::new("2", "get-event", json!({}))).await;
    assert_eq!(failed.id, "2");
    assert!(failed.error.unwrap().contains("not found"));

    manager.cleanup().await;
    assert_eq!(manager.status_report().await.status, "not_booted");
}

#[tokio::test]
async fn test_unreachable_http_server_fails_strict_boot() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("mcp.json");
    // Bind then drop to get a port nothing listens on
    let port = TcpListener::bind("127.0.0.1:0")
        .await
        .unwrap()
        .local_addr()
        .unwrap()
        .port();
    std::fs::write(
        &path,
        json!({ "servers": [{ "alias": "gone", "type": "http", "url": format!("http://127.0.0.1:{}", port) }] })
            .to_string(),
    )
    .unwrap();

    let manager = ToolConnectionManager::new(ToolsConfig {
        enabled: true,
        config_path: path,
        connect_timeout_secs: 5,
        call_timeout_secs: 5,
    });
    tokio_test::assert_err!(manager.boot(true).await);

    let report = manager.status_report().await;
    assert_eq!(report.status, "failed");
    assert!(report.error.unwrap().contains("gone"));
}
