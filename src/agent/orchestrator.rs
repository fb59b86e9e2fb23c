//! Agent orchestrator
//!
//! Composition root for a turn: boots the tool layer once for the lifetime
//! of the orchestrator (non-strict, so a broken tool layer degrades to a
//! plain responder) and delegates each request to the agent.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::OnceCell;
use tracing::{info, warn};

use crate::agent::llm_agent::{AgentKind, ConversationAgent};
use crate::agent::progress::ProgressSink;
use crate::context::ContextStore;
use crate::core::{AgentReply, Config, Result};
use crate::llm::OpenAiClient;
use crate::tools::{StatusReport, ToolConnectionManager};

/// Health check body
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthReport {
    pub tool_layer: StatusReport,
}

pub struct Orchestrator {
    agent: ConversationAgent,
    tools: Arc<ToolConnectionManager>,
    booted: OnceCell<()>,
}

impl Orchestrator {
    pub fn new(agent: ConversationAgent, tools: Arc<ToolConnectionManager>) -> Self {
        Self {
            agent,
            tools,
            booted: OnceCell::new(),
        }
    }

    /// Wire the default stack: an OpenAI-compatible model client, MCP tool
    /// servers from the configured list, and a progress-reporting agent
    /// reading context from `store`.
    pub fn from_config(config: &Config, store: Arc<dyn ContextStore>) -> Result<Self> {
        let llm = Arc::new(OpenAiClient::from_config(&config.llm)?);
        let tools = Arc::new(ToolConnectionManager::new(config.tools.clone()));
        let agent = ConversationAgent::new(
            AgentKind::ToolCallingWithProgress,
            llm,
            Arc::clone(&tools),
            config,
        )?
        .with_context(store, &config.agent);

        Ok(Self::new(agent, tools))
    }

    /// Boot the tool layer on first use; concurrent callers wait for the one attempt
    pub async fn ensure_booted(&self) {
        self.booted
            .get_or_init(|| async {
                info!("Initializing tool layer");
                if let Err(e) = self.tools.boot(false).await {
                    warn!(error = %e, "Continuing without tools");
                }
            })
            .await;
    }

    pub async fn run(&self, input: &str) -> AgentReply {
        self.ensure_booted().await;
        self.agent.respond(input, None).await
    }

    /// Like [`run`](Self::run), reporting progress to `sink` when the agent supports it
    pub async fn run_with_progress(&self, input: &str, sink: &ProgressSink) -> AgentReply {
        if !self.agent.kind().reports_progress() {
            return self.run(input).await;
        }
        self.ensure_booted().await;
        self.agent.respond(input, Some(sink)).await
    }

    pub async fn health(&self) -> HealthReport {
        self.ensure_booted().await;
        HealthReport {
            tool_layer: self.tools.status_report().await,
        }
    }

    pub fn agent(&self) -> &ConversationAgent {
        &self.agent
    }

    pub fn tools(&self) -> &Arc<ToolConnectionManager> {
        &self.tools
    }

    /// Release tool connections
    pub async fn shutdown(&self) {
        self.tools.cleanup().await;
    }
}
