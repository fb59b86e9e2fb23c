//! HTTP transport
//!
//! One POST per JSON-RPC message. Servers may answer with a JSON body or an
//! event stream carrying the response; a session id handed out by the server
//! is echoed on every later request.

use std::sync::atomic::{AtomicU64, Ordering};

use eventsource_stream::Eventsource;
use futures::StreamExt;
use reqwest::header::{HeaderMap, ACCEPT, CONTENT_TYPE};
use reqwest::{Client, StatusCode};
use serde_json::Value;
use tokio::sync::RwLock;

use crate::core::{Result, StewardError};
use crate::tools::protocol::{parse_incoming, JsonRpcRequest, JsonRpcResponse};

use super::{build_client, EVENT_STREAM_MIME_TYPE, JSON_MIME_TYPE};

pub const HEADER_SESSION_ID: &str = "Mcp-Session-Id";

pub struct HttpTransport {
    name: String,
    url: String,
    client: Client,
    session_id: RwLock<Option<String>>,
    next_id: AtomicU64,
}

impl HttpTransport {
    pub fn new(name: &str, url: &str, headers: HeaderMap) -> Result<Self> {
        Ok(Self {
            name: name.to_string(),
            url: url.to_string(),
            client: build_client(headers)?,
            session_id: RwLock::new(None),
            next_id: AtomicU64::new(0),
        })
    }

    async fn post(&self, frame: &JsonRpcRequest) -> Result<reqwest::Response> {
        let mut request = self
            .client
            .post(&self.url)
            .header(ACCEPT, format!("{}, {}", JSON_MIME_TYPE, EVENT_STREAM_MIME_TYPE))
            .json(frame);

        if let Some(session) = self.session_id.read().await.as_deref() {
            request = request.header(HEADER_SESSION_ID, session);
        }

        let response = request.send().await.map_err(|e| {
            StewardError::connection(format!("Tool server '{}' unreachable: {}", self.name, e))
        })?;

        if let Some(session) = response
            .headers()
            .get(HEADER_SESSION_ID)
            .and_then(|v| v.to_str().ok())
        {
            *self.session_id.write().await = Some(session.to_string());
        }

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StewardError::connection(format!(
                "Tool server '{}' returned {}: {}",
                self.name, status, body
            )));
        }

        Ok(response)
    }

    pub async fn request(&self, method: &str, params: Option<Value>) -> Result<Value> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let response = self
            .post(&JsonRpcRequest::request(id, method, params))
            .await?;

        if matches!(response.status(), StatusCode::ACCEPTED | StatusCode::NO_CONTENT) {
            return Err(StewardError::connection(format!(
                "Tool server '{}' accepted {} without answering",
                self.name, method
            )));
        }

        let is_event_stream = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|ct| ct.to_str().ok())
            .is_some_and(|ct| ct.starts_with(EVENT_STREAM_MIME_TYPE));

        let rpc_response = if is_event_stream {
            self.read_streamed_response(response, id, method).await?
        } else {
            response.json::<JsonRpcResponse>().await.map_err(|e| {
                StewardError::connection(format!(
                    "Tool server '{}' sent an invalid response to {}: {}",
                    self.name, method, e
                ))
            })?
        };

        rpc_response.into_result()
    }

    async fn read_streamed_response(
        &self,
        response: reqwest::Response,
        id: u64,
        method: &str,
    ) -> Result<JsonRpcResponse> {
        let mut events = Box::pin(response.bytes_stream().eventsource());
        while let Some(event) = events.next().await {
            let event = event.map_err(|e| {
                StewardError::connection(format!("Tool server '{}' stream: {}", self.name, e))
            })?;
            if let Some(response) = parse_incoming(&event.data) {
                if response.id.as_u64() == Some(id) {
                    return Ok(response);
                }
            }
        }

        Err(StewardError::connection(format!(
            "Tool server '{}' closed the stream before answering {}",
            self.name, method
        )))
    }

    pub async fn notify(&self, method: &str, params: Option<Value>) -> Result<()> {
        self.post(&JsonRpcRequest::notification(method, params))
            .await
            .map(|_| ())
    }

    pub async fn close(&self) {
        *self.session_id.write().await = None;
    }
}
