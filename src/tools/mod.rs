//! Tools module - external tool servers
//!
//! The connection manager boots the servers listed in `mcp.json`, routes
//! tool calls to them and reports the layer's status. Servers are reached
//! over MCP via a local process, HTTP, or a server-push event stream.

pub mod backend;
pub mod connection;
pub mod manager;
pub mod protocol;
pub mod server_config;
pub mod transport;

pub use backend::{ServerConnector, ToolServer};
pub use connection::{McpConnection, McpConnector};
pub use manager::{ConnectionState, StatusReport, ToolConnectionManager};
pub use server_config::{ServerConfig, TransportKind};
