//! Configuration management for Steward
//!
//! Supports environment variables, config files, and runtime overrides.
//!
//! Config file location: ~/.config/steward/config.toml

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use crate::core::error::{Result, StewardError};

/// Main configuration for Steward
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Language-model endpoint configuration
    #[serde(default)]
    pub llm: LlmConfig,
    /// Tool layer configuration
    #[serde(default)]
    pub tools: ToolsConfig,
    /// Agent behavior configuration
    #[serde(default)]
    pub agent: AgentConfig,
    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,
}

/// OpenAI-compatible model endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Base URL of the chat-completions API
    pub base_url: String,
    /// Name of the environment variable holding the API key
    pub api_key_env: String,
    /// Model name sent with every request
    pub model: String,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
    /// Sampling temperature; omitted from requests when unset
    pub temperature: Option<f32>,
}

/// Tool layer configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    /// Whether tool execution is allowed in this deployment
    pub enabled: bool,
    /// Path to the tool-server list (mcp.json)
    pub config_path: PathBuf,
    /// Time allowed for each server to connect and handshake
    pub connect_timeout_secs: u64,
    /// Time allowed for a single tool call
    pub call_timeout_secs: u64,
}

/// Agent behavior configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Name reported in every reply
    pub name: String,
    /// Model round-trips allowed before forcing a textual answer
    /// Default: 5
    pub max_iterations: usize,
    /// Inline system prompt
    pub system_prompt: Option<String>,
    /// File to read the system prompt from (wins over the inline prompt)
    pub system_prompt_path: Option<PathBuf>,
    /// Location reported in the context block
    pub location: Option<String>,
    /// Number of recent chat messages rendered into the context block
    pub history_limit: usize,
    /// Calendar cache entries older than this are not shown to the model
    pub calendar_max_age_mins: i64,
    /// Whether to show debug output
    pub debug: bool,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

fn env_flag(key: &str) -> Option<bool> {
    env::var(key).ok().map(|v| v == "true" || v == "1")
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: env::var("STEWARD_LLM_BASE_URL")
                .unwrap_or_else(|_| "https://api.openai.com/v1".to_string()),
            api_key_env: "OPENAI_API_KEY".to_string(),
            model: env::var("STEWARD_MODEL").unwrap_or_else(|_| "gpt-5".to_string()),
            timeout_secs: 120,
            temperature: None,
        }
    }
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            enabled: env_flag("STEWARD_TOOLS_ENABLED").unwrap_or(true),
            config_path: env::var("STEWARD_MCP_CONFIG")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("config/mcp.json")),
            connect_timeout_secs: 30,
            call_timeout_secs: 60,
        }
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            name: "llm_agent".to_string(),
            max_iterations: 5,
            system_prompt: None,
            system_prompt_path: None,
            location: env::var("STEWARD_LOCATION").ok(),
            history_limit: 40,
            calendar_max_age_mins: 60,
            debug: env_flag("STEWARD_DEBUG").unwrap_or(false),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: env::var("STEWARD_HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: env::var("STEWARD_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3000),
        }
    }
}

impl ToolsConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.call_timeout_secs)
    }
}

impl ServerConfig {
    /// Get the socket address
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl AgentConfig {
    /// Resolve the system prompt: file first, then inline, then the built-in default
    pub fn resolve_system_prompt(&self) -> Result<String> {
        if let Some(ref path) = self.system_prompt_path {
            return fs::read_to_string(path).map_err(|e| {
                StewardError::config(format!(
                    "Failed to read system prompt {}: {}",
                    path.display(),
                    e
                ))
            });
        }

        Ok(self
            .system_prompt
            .clone()
            .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string()))
    }
}

/// Built-in instructions used when no prompt is configured
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a personal assistant. \
Answer concisely. When a tool can answer the question, call it instead of guessing, \
and base your final answer on the tool results.";

impl Config {
    /// Get the config directory path
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("steward")
    }

    /// Get the config file path
    pub fn config_file() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    /// Load configuration from file, environment, and defaults
    /// Priority: CLI args > config file > env vars > defaults
    pub fn load() -> Self {
        let _ = dotenvy::dotenv();

        match Self::load_from_file() {
            Ok(config) => config,
            Err(e) => {
                tracing::debug!(error = %e, "using default configuration");
                Self::default()
            }
        }
    }

    /// Load configuration from file only
    pub fn load_from_file() -> Result<Self> {
        let config_path = Self::config_file();

        if !config_path.exists() {
            return Err(StewardError::config("Config file not found"));
        }

        let content = fs::read_to_string(&config_path)
            .map_err(|e| StewardError::config(format!("Failed to read config: {}", e)))?;

        Self::from_toml(&content)
    }

    /// Parse configuration from TOML text; missing sections use defaults
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| StewardError::config(format!("Failed to parse config: {}", e)))
    }
}
