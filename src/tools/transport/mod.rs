//! Tool server transports
//!
//! Local process (stdio), HTTP POST, and server-push event stream.

pub mod http;
pub mod sse;
pub mod stdio;

use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, USER_AGENT};
use serde_json::Value;
use tracing::warn;

use crate::core::{Result, StewardError};
use crate::tools::server_config::{ServerConfig, TransportKind};

pub use http::HttpTransport;
pub use sse::SseTransport;
pub use stdio::StdioTransport;

pub const EVENT_STREAM_MIME_TYPE: &str = "text/event-stream";
pub const JSON_MIME_TYPE: &str = "application/json";

/// Transport type.
pub enum Transport {
    Stdio(StdioTransport),
    Http(HttpTransport),
    Sse(SseTransport),
}

impl Transport {
    /// Establish the transport for a configured server (no handshake yet)
    pub async fn open(config: &ServerConfig) -> Result<Self> {
        match &config.transport {
            TransportKind::Stdio { command, args, env } => Ok(Transport::Stdio(
                StdioTransport::spawn(&config.name, command, args, env)?,
            )),
            TransportKind::Http { url, headers } => Ok(Transport::Http(HttpTransport::new(
                &config.name,
                url,
                build_default_headers(headers),
            )?)),
            TransportKind::Sse { url, headers } => Ok(Transport::Sse(
                SseTransport::connect(&config.name, url, build_default_headers(headers)).await?,
            )),
        }
    }

    pub async fn request(&self, method: &str, params: Option<Value>) -> Result<Value> {
        match self {
            Transport::Stdio(t) => t.request(method, params).await,
            Transport::Http(t) => t.request(method, params).await,
            Transport::Sse(t) => t.request(method, params).await,
        }
    }

    pub async fn notify(&self, method: &str, params: Option<Value>) -> Result<()> {
        match self {
            Transport::Stdio(t) => t.notify(method, params).await,
            Transport::Http(t) => t.notify(method, params).await,
            Transport::Sse(t) => t.notify(method, params).await,
        }
    }

    pub async fn close(&self) {
        match self {
            Transport::Stdio(t) => t.close().await,
            Transport::Http(t) => t.close().await,
            Transport::Sse(t) => t.close().await,
        }
    }
}

pub(crate) fn build_client(headers: HeaderMap) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(10))
        .default_headers(headers)
        .build()
        .map_err(|e| StewardError::config(format!("Failed to create HTTP client: {}", e)))
}

fn normalize_authorization_value(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }

    // Values that already carry a scheme are kept as-is.
    if trimmed.contains(char::is_whitespace) {
        return Some(trimmed.to_string());
    }

    Some(format!("Bearer {}", trimmed))
}

/// Build default request headers from resolved config values. Invalid names
/// or values are skipped with a warning; a bare Authorization token gets the
/// Bearer scheme.
pub fn build_default_headers(headers: &HashMap<String, String>) -> HeaderMap {
    let mut header_map = HeaderMap::new();

    for (name, value) in headers {
        let Ok(header_name) = HeaderName::from_str(name) else {
            warn!("Invalid HTTP header name in tool server config (skipping): {}", name);
            continue;
        };

        let header_value_str = if header_name == AUTHORIZATION {
            match normalize_authorization_value(value) {
                Some(v) => v,
                None => continue,
            }
        } else {
            value.trim().to_string()
        };

        let Ok(header_value) = HeaderValue::from_str(&header_value_str) else {
            warn!("Invalid HTTP header value in tool server config (skipping): header={}", name);
            continue;
        };

        header_map.insert(header_name, header_value);
    }

    if !header_map.contains_key(USER_AGENT) {
        header_map.insert(
            USER_AGENT,
            HeaderValue::from_static(concat!("steward/", env!("CARGO_PKG_VERSION"))),
        );
    }

    header_map
}
