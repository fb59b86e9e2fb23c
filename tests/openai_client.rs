//! Chat-completions client against a local mock endpoint

use std::sync::{Arc, Mutex};

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{json, Value};
use steward::core::config::LlmConfig;
use steward::core::{Message, ToolCall, ToolDefinition};
use steward::llm::{LLMProvider, OpenAiClient};
use tokio::net::TcpListener;

type Captured = Arc<Mutex<Vec<(Option<String>, Value)>>>;

async fn completions(
    State(captured): State<Captured>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let auth = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    captured.lock().unwrap().push((auth, body.clone()));

    if body["model"] == "broken-model" {
        return (StatusCode::UNAUTHORIZED, "invalid api key").into_response();
    }

    let message = if body.get("tools").is_some() {
        json!({
            "role": "assistant",
            "content": null,
            "tool_calls": [{
                "id": "call_7",
                "type": "function",
                "function": { "name": "list-events", "arguments": "{\"calendarId\":\"primary\"}" }
            }]
        })
    } else {
        json!({ "role": "assistant", "content": "Plain answer." })
    };
    Json(json!({ "model": body["model"], "choices": [{ "message": message }] })).into_response()
}

async fn client() -> (OpenAiClient, Captured) {
    let captured: Captured = Arc::default();
    let app = Router::new()
        .route("/v1/chat/completions", post(completions))
        .with_state(Arc::clone(&captured));
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let config = LlmConfig {
        base_url: format!("http://{}/v1/", addr),
        timeout_secs: 5,
        ..LlmConfig::default()
    };
    let client = OpenAiClient::from_config(&config)
        .unwrap()
        .with_api_key("sk-test");
    (client, captured)
}

#[tokio::test]
async fn test_tool_request_and_response() {
    let (client, captured) = client().await;
    let tools = [ToolDefinition::function(
        "list-events",
        "List calendar events",
        json!({ "type": "object", "properties": {} }),
    )];
    let history = [
        Message::system("You are a test assistant."),
        Message::user("What's on my calendar?"),
        Message::assistant_tool_calls(None, vec![ToolCall::new("call_1", "list-events", json!({}))]),
        Message::tool("call_1", "[]"),
    ];

    let response = client
        .chat_with_tools("gpt-test", &history, &tools, None)
        .await
        .unwrap();

    assert!(response.has_tool_calls());
    assert_eq!(response.tool_calls[0].id, "call_7");
    assert_eq!(response.tool_calls[0].arguments, json!({ "calendarId": "primary" }));

    let (auth, body) = captured.lock().unwrap()[0].clone();
    assert_eq!(auth.as_deref(), Some("Bearer sk-test"));
    assert_eq!(body["tool_choice"], "auto");
    assert_eq!(body["tools"][0]["function"]["name"], "list-events");
    assert_eq!(body["messages"][2]["tool_calls"][0]["function"]["arguments"], "{}");
    assert_eq!(body["messages"][3]["role"], "tool");
    assert_eq!(body["messages"][3]["tool_call_id"], "call_1");
    assert!(body.get("temperature").is_none());
}

#[tokio::test]
async fn test_empty_tool_list_omits_tools() {
    let (client, captured) = client().await;

    let response = client
        .chat_with_tools("gpt-test", &[Message::user("Hi")], &[], None)
        .await
        .unwrap();

    assert_eq!(response.answer(), Some("Plain answer."));
    let body = captured.lock().unwrap()[0].1.clone();
    assert!(body.get("tools").is_none());
    assert!(body.get("tool_choice").is_none());
}

#[tokio::test]
async fn test_error_status_is_model_error() {
    let (client, _captured) = client().await;

    let err = client
        .chat("broken-model", &[Message::user("Hi")], None)
        .await
        .unwrap_err();
    let message = err.to_string();
    assert!(message.contains("401"));
    assert!(message.contains("invalid api key"));
}
