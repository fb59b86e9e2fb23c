//! Tool-server list configuration
//!
//! Reads the declarative server list (`mcp.json`):
//!
//! ```json
//! { "servers": [
//!     { "alias": "calendar", "command": "npx", "args": ["-y", "@cocal/google-calendar-mcp"],
//!       "env": { "GOOGLE_OAUTH_CREDENTIALS": "file:config/gcp-oauth.keys.json" } },
//!     { "alias": "search", "type": "http", "url": "https://tools.example.com",
//!       "headers": { "Authorization": "env:SEARCH_TOKEN" } }
//! ] }
//! ```
//!
//! Credential material is never embedded literally: `env:NAME` resolves to an
//! environment variable, `file:path` to an existing file relative to the
//! config file, and absolute paths must exist.

use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::core::{Result, StewardError};

const DEFAULT_HTTP_ENDPOINT: &str = "/rpc";

/// How a tool server is reached
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportKind {
    /// Local child process speaking newline-delimited JSON-RPC on stdio
    Stdio {
        command: String,
        args: Vec<String>,
        env: HashMap<String, String>,
    },
    /// JSON-RPC over HTTP POST
    Http {
        url: String,
        headers: HashMap<String, String>,
    },
    /// Server-push event stream with a POST endpoint announced by the server
    Sse {
        url: String,
        headers: HashMap<String, String>,
    },
}

impl TransportKind {
    pub fn label(&self) -> &'static str {
        match self {
            TransportKind::Stdio { .. } => "stdio",
            TransportKind::Http { .. } => "http",
            TransportKind::Sse { .. } => "sse",
        }
    }
}

/// One resolved tool-server entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Display name used in logs
    pub name: String,
    pub transport: TransportKind,
}

#[derive(Debug, Deserialize)]
struct ServerListFile {
    #[serde(default)]
    servers: Vec<RawServerEntry>,
}

#[derive(Debug, Deserialize)]
struct RawServerEntry {
    alias: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
    command: Option<String>,
    #[serde(default)]
    args: Vec<String>,
    #[serde(default)]
    env: HashMap<String, serde_json::Value>,
    url: Option<String>,
    endpoint: Option<String>,
    #[serde(default)]
    headers: HashMap<String, serde_json::Value>,
}

/// Load and resolve the server list at `path`
pub fn load(path: &Path) -> Result<Vec<ServerConfig>> {
    if !path.exists() {
        return Err(StewardError::config(format!(
            "Missing tool server config {}",
            path.display()
        )));
    }

    let content = fs::read_to_string(path)?;
    let base_dir = path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));

    parse(&content, &base_dir)
}

/// Parse a server list; relative `file:` references resolve against `base_dir`
pub fn parse(content: &str, base_dir: &Path) -> Result<Vec<ServerConfig>> {
    let file: ServerListFile = serde_json::from_str(content)
        .map_err(|e| StewardError::config(format!("Invalid tool server config: {}", e)))?;

    file.servers
        .into_iter()
        .enumerate()
        .map(|(index, entry)| resolve_entry(index, entry, base_dir))
        .collect()
}

fn resolve_entry(index: usize, entry: RawServerEntry, base_dir: &Path) -> Result<ServerConfig> {
    let name = entry
        .alias
        .clone()
        .unwrap_or_else(|| format!("server-{}", index + 1));
    let kind = entry.kind.as_deref();

    let transport = if kind == Some("stdio") || entry.command.is_some() {
        let command = entry.command.ok_or_else(|| {
            StewardError::config(format!("Server '{}' is stdio but has no command", name))
        })?;
        TransportKind::Stdio {
            command,
            args: entry.args,
            env: resolve_map(&entry.env, base_dir, &name)?,
        }
    } else if let Some(url) = entry.url {
        let headers = resolve_map(&entry.headers, base_dir, &name)?;
        if kind == Some("sse") || (kind.is_none() && url.contains("/sse")) {
            TransportKind::Sse { url, headers }
        } else {
            let endpoint = entry.endpoint.as_deref().unwrap_or(DEFAULT_HTTP_ENDPOINT);
            TransportKind::Http {
                url: join_endpoint(&url, endpoint),
                headers,
            }
        }
    } else {
        return Err(StewardError::config(format!(
            "Server '{}' needs either a command or a url",
            name
        )));
    };

    Ok(ServerConfig { name, transport })
}

fn join_endpoint(base: &str, endpoint: &str) -> String {
    if endpoint.is_empty() {
        return base.to_string();
    }
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        endpoint.trim_start_matches('/')
    )
}

fn resolve_map(
    raw: &HashMap<String, serde_json::Value>,
    base_dir: &Path,
    server: &str,
) -> Result<HashMap<String, String>> {
    raw.iter()
        .map(|(key, value)| {
            let value = match value {
                serde_json::Value::String(s) => resolve_credential(s, base_dir, server)?,
                other => other.to_string(),
            };
            Ok((key.clone(), value))
        })
        .collect()
}

/// Resolve one credential reference
pub fn resolve_credential(value: &str, base_dir: &Path, server: &str) -> Result<String> {
    if let Some(key) = value.strip_prefix("env:") {
        return std::env::var(key).map_err(|_| {
            StewardError::config(format!("Missing ENV[{}] for tool server '{}'", key, server))
        });
    }

    if let Some(rel) = value.strip_prefix("file:") {
        let path = base_dir.join(rel);
        if !path.exists() {
            return Err(StewardError::config(format!(
                "Missing credential file {}",
                path.display()
            )));
        }
        return Ok(path.to_string_lossy().into_owned());
    }

    if value.starts_with('/') && !Path::new(value).exists() {
        return Err(StewardError::config(format!(
            "Missing credential file {}",
            value
        )));
    }

    Ok(value.to_string())
}
