//! Shared fakes for integration tests
#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Value};
use steward::core::config::ToolsConfig;
use steward::core::{Config, Message, Result, StewardError, ToolCall, ToolDefinition, ToolDescriptor};
use steward::llm::{GenerateOptions, LLMProvider, LLMResponse};
use steward::tools::{ServerConfig, ServerConnector, ToolServer};

/// One request the scripted model received
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub messages: Vec<Message>,
    pub tools: Vec<ToolDefinition>,
}

/// Model that replays a fixed script of responses
pub struct ScriptedLlm {
    script: Mutex<VecDeque<Result<LLMResponse>>>,
    repeat: Option<LLMResponse>,
    panics: bool,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedLlm {
    pub fn new(script: Vec<Result<LLMResponse>>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            repeat: None,
            panics: false,
            calls: Mutex::new(Vec::new()),
        })
    }

    /// Panics inside every request, as a crashing backend would
    pub fn panicking() -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(VecDeque::new()),
            repeat: None,
            panics: true,
            calls: Mutex::new(Vec::new()),
        })
    }

    /// Answers every request with `response`
    pub fn always(response: LLMResponse) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(VecDeque::new()),
            repeat: Some(response),
            panics: false,
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    fn next(&self, messages: &[Message], tools: &[ToolDefinition]) -> Result<LLMResponse> {
        self.calls.lock().unwrap().push(RecordedCall {
            messages: messages.to_vec(),
            tools: tools.to_vec(),
        });
        if self.panics {
            panic!("model backend crashed");
        }
        match self.script.lock().unwrap().pop_front() {
            Some(response) => response,
            None => self
                .repeat
                .clone()
                .ok_or_else(|| StewardError::model("script exhausted")),
        }
    }
}

#[async_trait]
impl LLMProvider for ScriptedLlm {
    async fn chat(
        &self,
        _model: &str,
        messages: &[Message],
        _options: Option<GenerateOptions>,
    ) -> Result<LLMResponse> {
        self.next(messages, &[])
    }

    async fn chat_with_tools(
        &self,
        _model: &str,
        messages: &[Message],
        tools: &[ToolDefinition],
        _options: Option<GenerateOptions>,
    ) -> Result<LLMResponse> {
        self.next(messages, tools)
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

pub fn tool_call(id: &str, name: &str, arguments: Value) -> LLMResponse {
    LLMResponse::with_tool_calls(vec![ToolCall::new(id, name, arguments)])
}

/// Tool behaviour: a payload or an error message
pub type Outcome = std::result::Result<Value, String>;

pub struct FakeServer {
    name: String,
    tools: Vec<(ToolDescriptor, Outcome)>,
    invocations: Arc<Mutex<Vec<(String, Value)>>>,
}

#[async_trait]
impl ToolServer for FakeServer {
    fn name(&self) -> &str {
        &self.name
    }

    async fn list_tools(&self) -> Result<Vec<ToolDescriptor>> {
        Ok(self.tools.iter().map(|(d, _)| d.clone()).collect())
    }

    async fn call_tool(&self, name: &str, arguments: Value) -> Result<Value> {
        self.invocations
            .lock()
            .unwrap()
            .push((name.to_string(), arguments));
        let (_, outcome) = self
            .tools
            .iter()
            .find(|(d, _)| d.name == name)
            .ok_or_else(|| StewardError::tool(format!("no such tool {}", name)))?;
        outcome.clone().map_err(StewardError::tool)
    }

    async fn shutdown(&self) {}
}

/// Connector serving in-memory servers by alias; unknown aliases are unreachable
#[derive(Default)]
pub struct FakeConnector {
    servers: HashMap<String, Vec<(ToolDescriptor, Outcome)>>,
    pub connects: AtomicUsize,
    pub invocations: Arc<Mutex<Vec<(String, Value)>>>,
}

impl FakeConnector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tool(mut self, server: &str, name: &str, outcome: Outcome) -> Self {
        self.servers.entry(server.to_string()).or_default().push((
            ToolDescriptor::new(
                name,
                format!("{} tool", name),
                json!({ "type": "object", "properties": {} }),
            ),
            outcome,
        ));
        self
    }

    pub fn connect_count(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    pub fn invocation_count(&self) -> usize {
        self.invocations.lock().unwrap().len()
    }
}

#[async_trait]
impl ServerConnector for FakeConnector {
    async fn connect(&self, config: &ServerConfig) -> Result<Arc<dyn ToolServer>> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        let tools = self.servers.get(&config.name).cloned().ok_or_else(|| {
            StewardError::connection(format!("{}: connection refused", config.name))
        })?;
        Ok(Arc::new(FakeServer {
            name: config.name.clone(),
            tools,
            invocations: Arc::clone(&self.invocations),
        }))
    }
}

/// Write an `mcp.json` naming `servers` (as stdio entries) into `dir`
pub fn tools_config(dir: &tempfile::TempDir, servers: &[&str]) -> ToolsConfig {
    let path = dir.path().join("mcp.json");
    let entries: Vec<Value> = servers
        .iter()
        .map(|alias| json!({ "alias": alias, "command": "fake-server" }))
        .collect();
    let mut file = std::fs::File::create(&path).unwrap();
    write!(file, "{}", json!({ "servers": entries })).unwrap();

    ToolsConfig {
        enabled: true,
        config_path: path,
        connect_timeout_secs: 5,
        call_timeout_secs: 5,
    }
}

pub fn config(tools: ToolsConfig) -> Config {
    let mut config = Config::default();
    config.tools = tools;
    config.agent.system_prompt = Some("You are a test assistant.".to_string());
    config.agent.system_prompt_path = None;
    config.agent.max_iterations = 5;
    config.agent.name = "llm_agent".to_string();
    config.llm.model = "test-model".to_string();
    config
}

pub fn calendar_payload() -> Value {
    json!([{ "title": "Standup", "start": "2025-03-03T09:00:00Z", "end": "2025-03-03T09:15:00Z" }])
}
