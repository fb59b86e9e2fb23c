//! Steward - tool-calling assistant
//!
//! Drives a bounded conversation loop between an OpenAI-compatible model
//! endpoint and tools discovered on MCP servers, producing a final answer
//! and optionally streaming progress to the caller.
//!
//! # Architecture
//!
//! - **Core**: Shared types, configuration, and error handling
//! - **LLM**: Model endpoint abstraction with a chat-completions client
//! - **Tools**: Tool server connections (stdio, HTTP, SSE) and the connection manager
//! - **Agent**: The tool-calling loop, progress events, and the orchestrator
//! - **Context**: Chat history and calendar cache rendered into the prompt
//! - **Calendar**: Calendar listing decoder and cache refresh
//! - **Server**: HTTP endpoints, including the streaming endpoint
//! - **CLI**: Command-line interface and REPL
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use steward::context::MemoryContextStore;
//! use steward::{Config, Orchestrator};
//!
//! #[tokio::main]
//! async fn main() -> steward::Result<()> {
//!     let config = Config::load();
//!     let orchestrator = Orchestrator::from_config(&config, Arc::new(MemoryContextStore::new()))?;
//!
//!     let reply = orchestrator.run("What's on my calendar?").await;
//!     println!("{}", reply.text);
//!     Ok(())
//! }
//! ```

pub mod agent;
pub mod calendar;
pub mod cli;
pub mod context;
pub mod core;
pub mod llm;
pub mod server;
pub mod tools;

// Re-export commonly used items
pub use agent::{AgentKind, ConversationAgent, Orchestrator, ProgressEvent, ProgressSink};
pub use cli::Repl;
pub use core::{AgentReply, Config, Result, StewardError};
pub use tools::ToolConnectionManager;
