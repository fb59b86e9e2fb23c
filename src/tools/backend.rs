//! Seams between the connection manager and concrete tool servers

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::core::{Result, ToolDescriptor};
use crate::tools::server_config::ServerConfig;

/// A connected tool server
#[async_trait]
pub trait ToolServer: Send + Sync {
    /// Display name from the server list
    fn name(&self) -> &str;

    /// Enumerate the tools this server offers
    async fn list_tools(&self) -> Result<Vec<ToolDescriptor>>;

    /// Call one tool; the returned value is the normalized payload
    async fn call_tool(&self, name: &str, arguments: Value) -> Result<Value>;

    /// Release the connection (kill the process, drop the stream)
    async fn shutdown(&self);
}

/// Establishes connections for configured servers
#[async_trait]
pub trait ServerConnector: Send + Sync {
    async fn connect(&self, config: &ServerConfig) -> Result<Arc<dyn ToolServer>>;
}
