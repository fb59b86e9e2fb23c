//! MCP client connection
//!
//! Performs the `initialize` handshake over any transport and implements
//! [`ToolServer`] on top of `tools/list` and `tools/call`.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, info};

use crate::core::{Result, StewardError, ToolDescriptor};
use crate::tools::backend::{ServerConnector, ToolServer};
use crate::tools::protocol::{
    initialize_params, normalize_call_result, tools_call_params, tools_list_params,
    ToolsListResult,
};
use crate::tools::server_config::ServerConfig;
use crate::tools::transport::Transport;

const CLIENT_NAME: &str = "steward";

/// Upper bound on `tools/list` pages, guarding against cursor loops
const MAX_LIST_PAGES: usize = 50;

pub struct McpConnection {
    name: String,
    transport: Transport,
}

impl McpConnection {
    /// Open the transport and complete the handshake
    pub async fn connect(config: &ServerConfig) -> Result<Self> {
        debug!(server = %config.name, transport = config.transport.label(), "connecting");
        let transport = Transport::open(config).await?;
        let connection = Self {
            name: config.name.clone(),
            transport,
        };

        if let Err(e) = connection.initialize().await {
            connection.transport.close().await;
            return Err(e);
        }
        Ok(connection)
    }

    async fn initialize(&self) -> Result<()> {
        let result = self
            .transport
            .request(
                "initialize",
                Some(initialize_params(CLIENT_NAME, env!("CARGO_PKG_VERSION"))),
            )
            .await?;

        let server_info = result
            .get("serverInfo")
            .and_then(|info| info.get("name"))
            .and_then(Value::as_str)
            .unwrap_or("unknown");
        info!(
            server = %self.name,
            server_info,
            protocol = result.get("protocolVersion").and_then(serde_json::Value::as_str).unwrap_or("?"),
            "tool server initialized"
        );

        self.transport
            .notify("notifications/initialized", None)
            .await
    }
}

#[async_trait]
impl ToolServer for McpConnection {
    fn name(&self) -> &str {
        &self.name
    }

    async fn list_tools(&self) -> Result<Vec<ToolDescriptor>> {
        let mut tools = Vec::new();
        let mut cursor: Option<String> = None;

        for _ in 0..MAX_LIST_PAGES {
            let result = self
                .transport
                .request("tools/list", tools_list_params(cursor.as_deref()))
                .await?;
            let page: ToolsListResult = serde_json::from_value(result).map_err(|e| {
                StewardError::connection(format!(
                    "Tool server '{}' sent an invalid tools/list result: {}",
                    self.name, e
                ))
            })?;

            tools.extend(page.tools.into_iter().map(ToolDescriptor::from));
            match page.next_cursor {
                Some(next) if !next.is_empty() => cursor = Some(next),
                _ => return Ok(tools),
            }
        }

        Ok(tools)
    }

    async fn call_tool(&self, name: &str, arguments: Value) -> Result<Value> {
        let result = self
            .transport
            .request("tools/call", Some(tools_call_params(name, arguments)))
            .await?;
        normalize_call_result(result).map_err(StewardError::tool)
    }

    async fn shutdown(&self) {
        self.transport.close().await;
    }
}

/// Connector that speaks MCP over the configured transport
#[derive(Debug, Default, Clone, Copy)]
pub struct McpConnector;

#[async_trait]
impl ServerConnector for McpConnector {
    async fn connect(&self, config: &ServerConfig) -> Result<Arc<dyn ToolServer>> {
        let connection = McpConnection::connect(config).await?;
        Ok(Arc::new(connection))
    }
}
