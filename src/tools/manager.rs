//! Tool connection manager
//!
//! Owns the connections to every configured tool server and presents one
//! describe/invoke surface to the agent. Boot and cleanup take the write
//! lock; steady-state calls take the read lock, check state and proceed.
//!
//! Steady-state operations never fail: when the layer is not booted or is
//! disabled, listing returns nothing and invocation returns an error result.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::RwLock;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

use crate::core::config::ToolsConfig;
use crate::core::{Result, StewardError, ToolCall, ToolDefinition, ToolDescriptor, ToolInvocationResult};
use crate::tools::backend::{ServerConnector, ToolServer};
use crate::tools::connection::McpConnector;
use crate::tools::server_config::{self, ServerConfig};

/// Lifecycle of the tool layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionState {
    NotBooted,
    Booted,
    Disabled,
    Failed(String),
}

impl ConnectionState {
    pub fn label(&self) -> &'static str {
        match self {
            ConnectionState::NotBooted => "not_booted",
            ConnectionState::Booted => "connected",
            ConnectionState::Disabled => "disabled",
            ConnectionState::Failed(_) => "failed",
        }
    }
}

/// Diagnostic snapshot of the tool layer
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusReport {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

struct Inner {
    state: ConnectionState,
    servers: Vec<Arc<dyn ToolServer>>,
    tools: Vec<ToolDescriptor>,
    /// Tool name -> index into `servers`
    routes: HashMap<String, usize>,
}

impl Inner {
    fn empty(state: ConnectionState) -> Self {
        Self {
            state,
            servers: Vec::new(),
            tools: Vec::new(),
            routes: HashMap::new(),
        }
    }
}

struct Connected {
    servers: Vec<Arc<dyn ToolServer>>,
    tools: Vec<ToolDescriptor>,
    routes: HashMap<String, usize>,
}

pub struct ToolConnectionManager {
    settings: ToolsConfig,
    connector: Arc<dyn ServerConnector>,
    inner: RwLock<Inner>,
}

impl ToolConnectionManager {
    /// Manager that reaches servers over MCP
    pub fn new(settings: ToolsConfig) -> Self {
        Self::with_connector(settings, Arc::new(McpConnector))
    }

    pub fn with_connector(settings: ToolsConfig, connector: Arc<dyn ServerConnector>) -> Self {
        Self {
            settings,
            connector,
            inner: RwLock::new(Inner::empty(ConnectionState::NotBooted)),
        }
    }

    /// Connect to every configured server.
    ///
    /// A no-op when already booted or disabled. A failure after a strict boot
    /// leaves the layer `Failed` and is returned; a non-strict failure is
    /// logged and leaves it `NotBooted`.
    pub async fn boot(&self, strict: bool) -> Result<()> {
        let mut inner = self.inner.write().await;

        match &inner.state {
            ConnectionState::Booted | ConnectionState::Disabled => return Ok(()),
            ConnectionState::Failed(reason) => {
                if strict {
                    return Err(StewardError::connection(reason.clone()));
                }
                return Ok(());
            }
            ConnectionState::NotBooted => {}
        }

        if !self.settings.enabled {
            info!("Tool execution disabled in this deployment");
            inner.state = ConnectionState::Disabled;
            return Ok(());
        }

        info!(config = %self.settings.config_path.display(), "Booting tool layer");
        match self.connect_all().await {
            Ok(connected) => {
                info!(
                    servers = connected.servers.len(),
                    tools = connected.tools.len(),
                    "Tool layer booted"
                );
                *inner = Inner {
                    state: ConnectionState::Booted,
                    servers: connected.servers,
                    tools: connected.tools,
                    routes: connected.routes,
                };
                Ok(())
            }
            Err(e) => {
                error!(error = %e, "Tool layer boot failed");
                if strict {
                    *inner = Inner::empty(ConnectionState::Failed(e.to_string()));
                    Err(e)
                } else {
                    *inner = Inner::empty(ConnectionState::NotBooted);
                    Ok(())
                }
            }
        }
    }

    async fn connect_all(&self) -> Result<Connected> {
        let configs = server_config::load(&self.settings.config_path)?;
        let mut connected = Connected {
            servers: Vec::with_capacity(configs.len()),
            tools: Vec::new(),
            routes: HashMap::new(),
        };

        for config in &configs {
            match self.connect_one(config).await {
                Ok((server, tools)) => {
                    let index = connected.servers.len();
                    for tool in tools {
                        if connected.routes.contains_key(&tool.name) {
                            warn!(
                                tool = %tool.name,
                                server = %config.name,
                                "Duplicate tool name; keeping the first registration"
                            );
                            continue;
                        }
                        connected.routes.insert(tool.name.clone(), index);
                        connected.tools.push(tool);
                    }
                    connected.servers.push(server);
                }
                Err(e) => {
                    for server in &connected.servers {
                        server.shutdown().await;
                    }
                    return Err(e);
                }
            }
        }

        Ok(connected)
    }

    async fn connect_one(
        &self,
        config: &ServerConfig,
    ) -> Result<(Arc<dyn ToolServer>, Vec<ToolDescriptor>)> {
        let limit = self.settings.connect_timeout();
        let (server, tools) = timeout(limit, self.handshake(config))
            .await
            .map_err(|_| {
                StewardError::timeout(format!(
                    "Tool server '{}' did not connect within {}s",
                    config.name,
                    limit.as_secs()
                ))
            })??;

        debug!(server = %config.name, tools = tools.len(), "Tool server connected");
        Ok((server, tools))
    }

    async fn handshake(
        &self,
        config: &ServerConfig,
    ) -> Result<(Arc<dyn ToolServer>, Vec<ToolDescriptor>)> {
        let server = self.connector.connect(config).await?;
        match server.list_tools().await {
            Ok(tools) => Ok((server, tools)),
            Err(e) => {
                server.shutdown().await;
                Err(e)
            }
        }
    }

    pub async fn state(&self) -> ConnectionState {
        self.inner.read().await.state.clone()
    }

    /// Tools of all connected servers; empty unless booted
    pub async fn list_tools(&self) -> Vec<ToolDescriptor> {
        let inner = self.inner.read().await;
        match inner.state {
            ConnectionState::Booted => inner.tools.clone(),
            _ => Vec::new(),
        }
    }

    /// Tool schemas in the function-calling convention of the model endpoint
    pub async fn describe_for_model(&self) -> Vec<ToolDefinition> {
        self.list_tools()
            .await
            .iter()
            .map(ToolDefinition::from)
            .collect()
    }

    /// Human-readable tool list for the system prompt
    pub async fn tool_catalogue(&self) -> String {
        self.list_tools()
            .await
            .iter()
            .map(|tool| format!("- {}: {}", tool.name, tool.description))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Invoke one tool call. Never fails: every problem becomes an error result.
    pub async fn invoke(&self, call: &ToolCall) -> ToolInvocationResult {
        let inner = self.inner.read().await;

        match inner.state {
            ConnectionState::Booted => {}
            ConnectionState::Disabled => {
                return ToolInvocationResult::failure(&call.id, "tool execution disabled")
            }
            _ => return ToolInvocationResult::failure(&call.id, "tool layer not booted"),
        }

        let Some(server) = inner
            .routes
            .get(&call.name)
            .and_then(|&index| inner.servers.get(index))
        else {
            warn!(tool = %call.name, "Model requested an unknown tool");
            return ToolInvocationResult::failure(&call.id, format!("Unknown tool: {}", call.name));
        };

        let limit = self.settings.call_timeout();
        let outcome = match timeout(limit, server.call_tool(&call.name, call.arguments.clone())).await {
            Ok(result) => result,
            Err(_) => Err(StewardError::timeout(format!(
                "{} did not answer within {}s",
                call.name,
                limit.as_secs()
            ))),
        };

        match outcome {
            Ok(payload) => ToolInvocationResult::success(&call.id, payload),
            Err(e) => {
                error!(tool = %call.name, server = server.name(), error = %e, "Tool call failed");
                ToolInvocationResult::failure(&call.id, e.to_string())
            }
        }
    }

    /// Release every connection and return to `NotBooted`; safe from any state
    pub async fn cleanup(&self) {
        let mut inner = self.inner.write().await;
        for server in inner.servers.drain(..) {
            server.shutdown().await;
        }
        *inner = Inner::empty(ConnectionState::NotBooted);
    }

    pub async fn status_report(&self) -> StatusReport {
        let inner = self.inner.read().await;
        let mut report = StatusReport {
            status: inner.state.label().to_string(),
            tools_count: None,
            tools: None,
            error: None,
        };

        match &inner.state {
            ConnectionState::Booted => {
                report.tools_count = Some(inner.tools.len());
                report.tools = Some(inner.tools.iter().map(|t| t.name.clone()).collect());
            }
            ConnectionState::Failed(reason) => report.error = Some(reason.clone()),
            ConnectionState::NotBooted | ConnectionState::Disabled => {}
        }

        report
    }

    pub fn settings(&self) -> &ToolsConfig {
        &self.settings
    }
}

impl std::fmt::Debug for ToolConnectionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolConnectionManager")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}
