//! OpenAI-compatible chat-completions client
//!
//! Async HTTP client for any endpoint exposing `/chat/completions` with the
//! function-calling convention (tool calls carry an id, arguments are a JSON
//! string, tool results reference the id through `tool_call_id`).

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::core::config::LlmConfig;
use crate::core::{Message, Result, Role, StewardError, ToolCall, ToolDefinition};
use crate::llm::traits::{GenerateOptions, LLMProvider, LLMResponse, TokenUsage};

const CHAT_COMPLETIONS_PATH: &str = "/chat/completions";

/// OpenAI-compatible API client
#[derive(Clone)]
pub struct OpenAiClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    api_key_env: String,
}

/// Chat-completions request
#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<&'a [ToolDefinition]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_completion_tokens: Option<u32>,
}

/// Message in wire format
#[derive(Debug, Serialize, Deserialize)]
struct WireMessage {
    role: Role,
    #[serde(default)]
    content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<WireToolCall>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

/// Tool call in wire format
#[derive(Debug, Clone, Serialize, Deserialize)]
struct WireToolCall {
    id: String,
    #[serde(rename = "type", default = "function_type")]
    call_type: String,
    function: WireFunction,
}

fn function_type() -> String {
    "function".to_string()
}

/// Function in a tool call; arguments are a JSON-encoded string
#[derive(Debug, Clone, Serialize, Deserialize)]
struct WireFunction {
    name: String,
    #[serde(default)]
    arguments: String,
}

/// Chat-completions response
#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    model: String,
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<WireUsage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: WireMessage,
}

#[derive(Debug, Deserialize)]
struct WireUsage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
    #[serde(default)]
    total_tokens: u32,
}

impl OpenAiClient {
    /// Create a client from configuration; the API key is read from the
    /// configured environment variable.
    pub fn from_config(config: &LlmConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| StewardError::config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: std::env::var(&config.api_key_env)
                .ok()
                .filter(|k| !k.trim().is_empty()),
            api_key_env: config.api_key_env.clone(),
        })
    }

    /// Override the API key (mostly useful for local endpoints and tests)
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Convert internal Message to wire format
    fn to_wire_message(msg: &Message) -> WireMessage {
        WireMessage {
            role: msg.role,
            content: msg.content.clone(),
            tool_calls: msg.tool_calls.as_ref().map(|calls| {
                calls
                    .iter()
                    .map(|tc| WireToolCall {
                        id: tc.id.clone(),
                        call_type: function_type(),
                        function: WireFunction {
                            name: tc.name.clone(),
                            arguments: tc.arguments.to_string(),
                        },
                    })
                    .collect()
            }),
            tool_call_id: msg.tool_call_id.clone(),
        }
    }

    /// Parse the JSON-encoded arguments of a tool call. Unparseable arguments
    /// are passed through as a string so the tool can report the problem.
    fn parse_arguments(call: &WireToolCall) -> serde_json::Value {
        let raw = call.function.arguments.trim();
        if raw.is_empty() {
            return serde_json::json!({});
        }
        serde_json::from_str(raw).unwrap_or_else(|e| {
            warn!(tool = %call.function.name, error = %e, "tool call arguments are not valid JSON");
            serde_json::Value::String(raw.to_string())
        })
    }

    /// Convert a wire response to LLMResponse
    fn to_llm_response(response: ChatResponse) -> Result<LLMResponse> {
        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| StewardError::model("Response contained no choices"))?;

        let tool_calls = choice
            .message
            .tool_calls
            .unwrap_or_default()
            .iter()
            .map(|tc| ToolCall {
                id: tc.id.clone(),
                name: tc.function.name.clone(),
                arguments: Self::parse_arguments(tc),
            })
            .collect();

        Ok(LLMResponse {
            content: choice.message.content,
            tool_calls,
            usage: response.usage.map(|u| TokenUsage {
                prompt_tokens: u.prompt_tokens,
                completion_tokens: u.completion_tokens,
                total_tokens: u.total_tokens,
            }),
            model: response.model,
        })
    }

    async fn send(&self, request: &ChatRequest<'_>) -> Result<LLMResponse> {
        let api_key = self.api_key.as_deref().ok_or_else(|| {
            StewardError::model(format!("{} is not set", self.api_key_env))
        })?;

        let url = format!("{}{}", self.base_url, CHAT_COMPLETIONS_PATH);
        let started = Instant::now();

        let response = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    StewardError::timeout(format!("Model request to {} timed out", self.base_url))
                } else if e.is_connect() {
                    StewardError::model(format!("Cannot connect to {}", self.base_url))
                } else {
                    StewardError::model(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(StewardError::model(format!(
                "API error ({}): {}",
                status, error_text
            )));
        }

        let response_text = response.text().await?;
        info!(
            model = request.model,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "model call completed"
        );
        debug!(body = %truncate(&response_text, 500), "model response");

        let chat_response: ChatResponse = serde_json::from_str(&response_text)
            .map_err(|e| StewardError::model(format!("Failed to parse response: {}", e)))?;

        Self::to_llm_response(chat_response)
    }
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[async_trait]
impl LLMProvider for OpenAiClient {
    async fn chat(
        &self,
        model: &str,
        messages: &[Message],
        options: Option<GenerateOptions>,
    ) -> Result<LLMResponse> {
        let options = options.unwrap_or_default();
        let request = ChatRequest {
            model,
            messages: messages.iter().map(Self::to_wire_message).collect(),
            tools: None,
            tool_choice: None,
            temperature: options.temperature,
            max_completion_tokens: options.max_tokens,
        };

        self.send(&request).await
    }

    async fn chat_with_tools(
        &self,
        model: &str,
        messages: &[Message],
        tools: &[ToolDefinition],
        options: Option<GenerateOptions>,
    ) -> Result<LLMResponse> {
        if tools.is_empty() {
            return self.chat(model, messages, options).await;
        }

        let options = options.unwrap_or_default();
        let request = ChatRequest {
            model,
            messages: messages.iter().map(Self::to_wire_message).collect(),
            tools: Some(tools),
            tool_choice: Some("auto"),
            temperature: options.temperature,
            max_completion_tokens: options.max_tokens,
        };

        self.send(&request).await
    }

    fn name(&self) -> &str {
        "openai"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_tool_call_round_trips_through_wire_format() {
        let call = ToolCall::new("call_1", "list-events", json!({"calendarId": "primary"}));
        let msg = Message::assistant_tool_calls(None, vec![call]);
        let wire = serde_json::to_value(OpenAiClient::to_wire_message(&msg)).unwrap();

        assert_eq!(wire["role"], "assistant");
        assert!(wire["content"].is_null());
        assert_eq!(wire["tool_calls"][0]["type"], "function");
        assert_eq!(
            wire["tool_calls"][0]["function"]["arguments"],
            r#"{"calendarId":"primary"}"#
        );
    }

    #[test]
    fn test_response_parsing() {
        let raw = json!({
            "model": "gpt-5",
            "choices": [{
                "message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [{
                        "id": "call_abc",
                        "type": "function",
                        "function": {"name": "list-events", "arguments": "{\"calendarId\":\"primary\"}"}
                    }]
                }
            }],
            "usage": {"prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15}
        });
        let parsed: ChatResponse = serde_json::from_value(raw).unwrap();
        let response = OpenAiClient::to_llm_response(parsed).unwrap();

        assert_eq!(response.tool_calls.len(), 1);
        assert_eq!(response.tool_calls[0].id, "call_abc");
        assert_eq!(response.tool_calls[0].arguments["calendarId"], "primary");
        assert_eq!(response.usage.unwrap().total_tokens, 15);
    }

    #[test]
    fn test_empty_choices_is_model_error() {
        let parsed: ChatResponse = serde_json::from_value(json!({"choices": []})).unwrap();
        let err = OpenAiClient::to_llm_response(parsed).unwrap_err();
        assert!(matches!(err, StewardError::ModelCall(_)));
    }

    #[test]
    fn test_invalid_arguments_pass_through_as_string() {
        let call = WireToolCall {
            id: "call_1".into(),
            call_type: function_type(),
            function: WireFunction {
                name: "x".into(),
                arguments: "{not json".into(),
            },
        };
        assert_eq!(OpenAiClient::parse_arguments(&call), json!("{not json"));
    }

    #[tokio::test]
    async fn test_missing_api_key_is_model_error() {
        let config = LlmConfig {
            api_key_env: "STEWARD_TEST_KEY_THAT_IS_NEVER_SET".to_string(),
            ..LlmConfig::default()
        };
        let client = OpenAiClient::from_config(&config).unwrap();
        let err = client
            .chat("gpt-5", &[Message::user("hi")], None)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("STEWARD_TEST_KEY_THAT_IS_NEVER_SET"));
    }
}
