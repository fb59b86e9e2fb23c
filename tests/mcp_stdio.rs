//! MCP over a child process's stdio, using `sh` as a scripted server
#![cfg(unix)]

use std::collections::HashMap;

use serde_json::json;
use steward::tools::{McpConnection, ServerConfig, ToolServer, TransportKind};

/// Answers initialize (id 1), skips the initialized notification, then
/// answers tools/list (id 2) and one tools/call (id 3).
const SCRIPT: &str = r#"
read l; echo "npm WARN deprecated" >&2
echo 'starting up'
printf '%s\n' '{"jsonrpc":"2.0","id":1,"result":{"protocolVersion":"2024-11-05","capabilities":{},"serverInfo":{"name":"sh"}}}'
read l
read l; printf '%s\n' '{"jsonrpc":"2.0","method":"notifications/message","params":{}}'
printf '%s\n' '{"jsonrpc":"2.0","id":2,"result":{"tools":[{"name":"echo","description":"Echo text"}]}}'
read l; printf '%s\n' '{"jsonrpc":"2.0","id":3,"result":{"content":[{"type":"text","text":"hi"}]}}'
cat > /dev/null
"#;

fn sh(name: &str, script: &str) -> ServerConfig {
    ServerConfig {
        name: name.to_string(),
        transport: TransportKind::Stdio {
            command: "sh".to_string(),
            args: vec!["-c".to_string(), script.to_string()],
            env: HashMap::new(),
        },
    }
}

#[tokio::test]
async fn test_stdio_server_handshake_and_call() {
    let connection = McpConnection::connect(&sh("echo", SCRIPT)).await.unwrap();

    let tools = connection.list_tools().await.unwrap();
    assert_eq!(tools.len(), 1);
    assert_eq!(tools[0].name, "echo");
    assert_eq!(tools[0].description, "Echo text");

    let payload = connection
        .call_tool("echo", json!({ "text": "hi" }))
        .await
        .unwrap();
    assert_eq!(payload, json!([{ "type": "text", "text": "hi" }]));

    connection.shutdown().await;
}

#[tokio::test]
async fn test_exiting_process_fails_handshake() {
    let err = McpConnection::connect(&sh("quitter", "exit 0"))
        .await
        .err()
        .unwrap();
    assert!(err.to_string().contains("quitter"));
}

#[tokio::test]
async fn test_missing_binary_fails_to_spawn() {
    let config = ServerConfig {
        name: "ghost".to_string(),
        transport: TransportKind::Stdio {
            command: "/nonexistent/steward-tool-server".to_string(),
            args: Vec::new(),
            env: HashMap::new(),
        },
    };
    let err = McpConnection::connect(&config).await.err().unwrap();
    assert!(err.to_string().contains("Failed to start tool server 'ghost'"));
}
