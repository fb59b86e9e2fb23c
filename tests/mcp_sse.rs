//! MCP over a server-push event stream against a local mock tool server

use std::collections::HashMap;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, Sse};
use axum::routing::{get, post};
use axum::{Json, Router};
use futures::{stream, Stream, StreamExt};
use serde_json::{json, Value};
use steward::tools::{McpConnection, ServerConfig, ToolServer, TransportKind};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;

#[derive(Default)]
struct MockState {
    outbox: Mutex<Option<mpsc::UnboundedSender<Value>>>,
    sessions: Mutex<Vec<String>>,
}

async fn open_stream(
    State(state): State<Arc<MockState>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let (tx, rx) = mpsc::unbounded_channel();
    *state.outbox.lock().unwrap() = Some(tx);

    let endpoint = stream::once(async {
        Ok(Event::default()
            .event("endpoint")
            .data("/messages?session=abc"))
    });
    let messages = UnboundedReceiverStream::new(rx)
        .map(|frame: Value| Ok(Event::default().event("message").data(frame.to_string())));
    Sse::new(endpoint.chain(messages))
}

async fn receive(
    State(state): State<Arc<MockState>>,
    Query(query): Query<HashMap<String, String>>,
    Json(frame): Json<Value>,
) -> StatusCode {
    if let Some(session) = query.get("session") {
        state.sessions.lock().unwrap().push(session.clone());
    }

    let Some(id) = frame.get("id").cloned() else {
        return StatusCode::ACCEPTED;
    };

    let result = match frame["method"].as_str() {
        Some("initialize") => json!({
            "protocolVersion": "2024-11-05",
            "capabilities": { "tools": {} },
            "serverInfo": { "name": "mock-sse" }
        }),
        Some("tools/list") => json!({
            "tools": [{ "name": "search", "description": "Search the web" }]
        }),
        Some("tools/call") if frame["params"]["name"] == "hang-up" => {
            // Close the event stream without answering
            state.outbox.lock().unwrap().take();
            return StatusCode::ACCEPTED;
        }
        Some("tools/call") => json!({
            "content": [{ "type": "text", "text": format!("results for {}", frame["params"]["arguments"]["q"]) }]
        }),
        _ => return StatusCode::BAD_REQUEST,
    };

    if let Some(outbox) = state.outbox.lock().unwrap().as_ref() {
        let _ = outbox.send(json!({ "jsonrpc": "2.0", "id": id, "result": result }));
    }
    StatusCode::ACCEPTED
}

async fn spawn_mock() -> (SocketAddr, Arc<MockState>) {
    let state = Arc::new(MockState::default());
    let app = Router::new()
        .route("/sse", get(open_stream))
        .route("/messages", post(receive))
        .with_state(Arc::clone(&state));
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (addr, state)
}

fn sse_config(addr: SocketAddr) -> ServerConfig {
    ServerConfig {
        name: "search".to_string(),
        transport: TransportKind::Sse {
            url: format!("http://{}/sse", addr),
            headers: HashMap::new(),
        },
    }
}

#[tokio::test]
async fn test_sse_connection_round_trips_over_announced_endpoint() {
    let (addr, state) = spawn_mock().await;

    let connection = McpConnection::connect(&sse_config(addr)).await.unwrap();

    let tools = connection.list_tools().await.unwrap();
    assert_eq!(tools.len(), 1);
    assert_eq!(tools[0].name, "search");
    assert_eq!(tools[0].description, "Search the web");

    let payload = connection
        .call_tool("search", json!({ "q": "rust" }))
        .await
        .unwrap();
    assert_eq!(
        payload,
        json!([{ "type": "text", "text": "results for \"rust\"" }])
    );

    // initialize, notifications/initialized, tools/list, tools/call
    let sessions = state.sessions.lock().unwrap().clone();
    assert_eq!(sessions.len(), 4);
    assert!(sessions.iter().all(|s| s == "abc"));

    connection.shutdown().await;
}

#[tokio::test]
async fn test_closed_stream_fails_outstanding_request() {
    let (addr, _state) = spawn_mock().await;
    let connection = McpConnection::connect(&sse_config(addr)).await.unwrap();

    let err = connection.call_tool("hang-up", json!({})).await.unwrap_err();
    assert!(err.to_string().contains("search"));
}
