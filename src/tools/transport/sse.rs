//! Server-push event stream transport
//!
//! The client opens a long-lived GET event stream; the server's first
//! `endpoint` event names the URL to POST requests to. Responses arrive on
//! the stream as `message` events and are matched to waiters by id.

use std::sync::Arc;

use eventsource_stream::Eventsource;
use futures::StreamExt;
use reqwest::header::{HeaderMap, ACCEPT};
use reqwest::Client;
use serde_json::Value;
use tokio::task::JoinHandle;
use tracing::{debug, info};
use url::Url;

use crate::core::{Result, StewardError};
use crate::tools::protocol::{parse_incoming, JsonRpcRequest, PendingRequests};

use super::{build_client, EVENT_STREAM_MIME_TYPE};

pub struct SseTransport {
    name: String,
    endpoint: Url,
    client: Client,
    pending: Arc<PendingRequests>,
    reader: JoinHandle<()>,
}

impl SseTransport {
    /// Open the event stream and wait for the `endpoint` announcement
    pub async fn connect(name: &str, url: &str, headers: HeaderMap) -> Result<Self> {
        let client = build_client(headers)?;
        let base = Url::parse(url)
            .map_err(|e| StewardError::config(format!("Invalid url for '{}': {}", name, e)))?;

        let response = client
            .get(base.clone())
            .header(ACCEPT, EVENT_STREAM_MIME_TYPE)
            .send()
            .await
            .map_err(|e| {
                StewardError::connection(format!("Tool server '{}' unreachable: {}", name, e))
            })?;

        if !response.status().is_success() {
            return Err(StewardError::connection(format!(
                "Tool server '{}' refused the event stream: {}",
                name,
                response.status()
            )));
        }

        let mut events = Box::pin(response.bytes_stream().eventsource());

        let endpoint = loop {
            match events.next().await {
                Some(Ok(event)) if event.event == "endpoint" => {
                    break base.join(event.data.trim()).map_err(|e| {
                        StewardError::connection(format!(
                            "Tool server '{}' announced an invalid endpoint: {}",
                            name, e
                        ))
                    })?;
                }
                Some(Ok(event)) => debug!(server = name, event = %event.event, "skipping event before endpoint"),
                Some(Err(e)) => {
                    return Err(StewardError::connection(format!(
                        "Tool server '{}' stream: {}",
                        name, e
                    )))
                }
                None => {
                    return Err(StewardError::connection(format!(
                        "Tool server '{}' closed the stream before announcing an endpoint",
                        name
                    )))
                }
            }
        };

        let pending = Arc::new(PendingRequests::new());
        let reader = {
            let pending = Arc::clone(&pending);
            let server = name.to_string();
            tokio::spawn(async move {
                while let Some(event) = events.next().await {
                    match event {
                        Ok(event) if event.event.is_empty() || event.event == "message" => {
                            if let Some(response) = parse_incoming(&event.data) {
                                pending.resolve(response);
                            }
                        }
                        Ok(event) => debug!(server = %server, event = %event.event, "ignoring event"),
                        Err(e) => {
                            info!(server = %server, error = %e, "event stream failed");
                            break;
                        }
                    }
                }
                pending.fail_all();
            })
        };

        Ok(Self {
            name: name.to_string(),
            endpoint,
            client,
            pending,
            reader,
        })
    }

    async fn post(&self, frame: &JsonRpcRequest) -> Result<()> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .json(frame)
            .send()
            .await
            .map_err(|e| {
                StewardError::connection(format!("Tool server '{}' unreachable: {}", self.name, e))
            })?;

        if !response.status().is_success() {
            return Err(StewardError::connection(format!(
                "Tool server '{}' rejected {}: {}",
                self.name,
                frame.method,
                response.status()
            )));
        }
        Ok(())
    }

    pub async fn request(&self, method: &str, params: Option<Value>) -> Result<Value> {
        let waiter = self.pending.register();
        self.post(&JsonRpcRequest::request(waiter.id(), method, params))
            .await?;
        waiter.wait(&self.name, method).await
    }

    pub async fn notify(&self, method: &str, params: Option<Value>) -> Result<()> {
        self.post(&JsonRpcRequest::notification(method, params))
            .await
    }

    pub async fn close(&self) {
        self.reader.abort();
        self.pending.fail_all();
    }
}

impl Drop for SseTransport {
    fn drop(&mut self) {
        self.reader.abort();
    }
}
