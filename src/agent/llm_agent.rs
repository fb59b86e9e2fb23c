//! Conversation agent
//!
//! Runs one bounded request/response/tool-call loop against the model:
//!
//! ```text
//! Start -> AwaitingModel -> (HasToolCalls -> ExecutingTools -> AwaitingModel)* -> Answered
//! ```
//!
//! When the iteration ceiling is reached without a tool-free answer, one last
//! model call is made with tools omitted (`Exhausted`).

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::agent::conversation::Conversation;
use crate::agent::loop_state::{AgentLoopState, LoopOutcome};
use crate::agent::progress::{ProgressEvent, ProgressSink};
use crate::context::{ChatRecord, ContextAssembler, ContextStore};
use crate::core::config::AgentConfig;
use crate::core::{
    AgentReply, Config, Message, Result, Role, StewardError, ToolCall, ToolDefinition,
    ToolInvocationResult,
};
use crate::llm::{GenerateOptions, LLMProvider, LLMResponse};
use crate::tools::ToolConnectionManager;

/// Answer used when the model returns no text
pub const EMPTY_ANSWER_FALLBACK: &str = "I apologize, but I couldn't generate a response.";

/// Capabilities of an agent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentKind {
    /// One model call, no tools
    Plain,
    /// Tool-calling loop
    ToolCalling,
    /// Tool-calling loop that reports progress to a sink
    ToolCallingWithProgress,
}

impl AgentKind {
    pub fn uses_tools(self) -> bool {
        !matches!(self, AgentKind::Plain)
    }

    pub fn reports_progress(self) -> bool {
        matches!(self, AgentKind::ToolCallingWithProgress)
    }
}

/// Reply plus the loop bookkeeping of the turn that produced it
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    pub reply: AgentReply,
    pub state: AgentLoopState,
}

pub struct ConversationAgent {
    name: String,
    kind: AgentKind,
    llm: Arc<dyn LLMProvider>,
    tools: Arc<ToolConnectionManager>,
    model: String,
    options: GenerateOptions,
    max_iterations: usize,
    system_prompt: String,
    context: Option<ContextAssembler>,
}

impl ConversationAgent {
    /// Create an agent; fails only if a configured system prompt file is unreadable
    pub fn new(
        kind: AgentKind,
        llm: Arc<dyn LLMProvider>,
        tools: Arc<ToolConnectionManager>,
        config: &Config,
    ) -> Result<Self> {
        Ok(Self {
            name: config.agent.name.clone(),
            kind,
            llm,
            tools,
            model: config.llm.model.clone(),
            options: GenerateOptions {
                temperature: config.llm.temperature,
                max_tokens: None,
            },
            max_iterations: config.agent.max_iterations,
            system_prompt: config.agent.resolve_system_prompt()?,
            context: None,
        })
    }

    /// Read context from `store` and record finished turns into it
    pub fn with_context(mut self, store: Arc<dyn ContextStore>, config: &AgentConfig) -> Self {
        self.context = Some(ContextAssembler::new(store, config));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> AgentKind {
        self.kind
    }

    /// Answer `input`. Never fails: a model error becomes the reply text.
    ///
    /// `progress` is only used by agents that report progress.
    pub async fn respond(&self, input: &str, progress: Option<&ProgressSink>) -> AgentReply {
        match self.try_respond(input, progress).await {
            Ok(outcome) => {
                self.record_turn(input, &outcome.reply.text).await;
                outcome.reply
            }
            Err(e) => {
                warn!(agent = %self.name, error = %e, "Turn aborted");
                let detail = match &e {
                    StewardError::ModelCall(message) | StewardError::Timeout(message) => {
                        message.clone()
                    }
                    other => other.to_string(),
                };
                AgentReply::new(&self.name, format!("I encountered an error: {}", detail))
            }
        }
    }

    /// Run one turn, returning model errors instead of converting them
    pub async fn try_respond(
        &self,
        input: &str,
        progress: Option<&ProgressSink>,
    ) -> Result<TurnOutcome> {
        let sink = progress.filter(|_| self.kind.reports_progress());
        let definitions = if self.kind.uses_tools() {
            self.tools.describe_for_model().await
        } else {
            Vec::new()
        };

        let system = self.build_system_prompt(!definitions.is_empty()).await;
        let mut conversation = Conversation::new(system, input);
        let mut state = AgentLoopState::new(self.max_iterations);

        if !self.kind.uses_tools() {
            let response = self.call_model(conversation.messages(), &[], &mut state).await?;
            state.finish(LoopOutcome::Answered);
            return Ok(self.outcome(answer_text(&response), state));
        }

        let mut answer = None;
        while state.should_continue() {
            emit(
                sink,
                ProgressEvent::Iteration {
                    number: state.current_number(),
                    max: state.max_iterations,
                },
            );

            let response = self
                .call_model(conversation.messages(), &definitions, &mut state)
                .await?;

            if !response.has_tool_calls() {
                answer = Some(answer_text(&response));
                state.finish(LoopOutcome::Answered);
                break;
            }

            let results = self.execute_tools(&response.tool_calls, sink, &mut state).await;
            conversation.push_tool_round(response.content, response.tool_calls, &results);
            state.next_iteration();
        }

        let answer = match answer {
            Some(answer) => answer,
            None => {
                warn!(
                    agent = %self.name,
                    max_iterations = state.max_iterations,
                    "Iteration ceiling reached; requesting a final answer without tools"
                );
                let response = self.call_model(conversation.messages(), &[], &mut state).await?;
                state.finish(LoopOutcome::Exhausted);
                answer_text(&response)
            }
        };

        info!(
            agent = %self.name,
            model_calls = state.model_calls,
            tool_invocations = state.tool_invocations,
            failed_invocations = state.failed_invocations,
            outcome = ?state.outcome,
            "Turn complete"
        );
        Ok(self.outcome(answer, state))
    }

    fn outcome(&self, text: String, state: AgentLoopState) -> TurnOutcome {
        TurnOutcome {
            reply: AgentReply::new(&self.name, text),
            state,
        }
    }

    async fn build_system_prompt(&self, has_tools: bool) -> String {
        let mut prompt = self.system_prompt.clone();

        if has_tools {
            prompt.push_str("\n\n## Available Tools\n");
            prompt.push_str(&self.tools.tool_catalogue().await);
            prompt.push('\n');
        }

        if let Some(context) = &self.context {
            prompt.push_str(&context.format_for_model(Utc::now()).await);
        }

        prompt
    }

    /// One model round-trip; an empty `tools` slice omits tools from the request
    async fn call_model(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
        state: &mut AgentLoopState,
    ) -> Result<LLMResponse> {
        let start = Instant::now();
        let response = if tools.is_empty() {
            self.llm
                .chat(&self.model, messages, Some(self.options.clone()))
                .await?
        } else {
            self.llm
                .chat_with_tools(&self.model, messages, tools, Some(self.options.clone()))
                .await?
        };
        state.record_model_call();

        debug!(
            provider = self.llm.name(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            tool_calls = response.tool_calls.len(),
            "Model responded"
        );
        Ok(response)
    }

    /// Invoke each call in order. Failures become error results; the batch always
    /// yields exactly one result per call.
    async fn execute_tools(
        &self,
        calls: &[ToolCall],
        sink: Option<&ProgressSink>,
        state: &mut AgentLoopState,
    ) -> Vec<ToolInvocationResult> {
        let mut results = Vec::with_capacity(calls.len());

        for call in calls {
            emit(
                sink,
                ProgressEvent::ToolStart {
                    name: call.name.clone(),
                    args: call.arguments.clone(),
                },
            );

            let result = self.tools.invoke(call).await;
            state.record_invocation(result.is_success());

            emit(
                sink,
                ProgressEvent::ToolComplete {
                    name: call.name.clone(),
                    success: result.is_success(),
                    error: result.error.clone(),
                },
            );
            results.push(result);
        }

        results
    }

    async fn record_turn(&self, input: &str, answer: &str) {
        let Some(context) = &self.context else {
            return;
        };

        let now = Utc::now();
        for record in [
            ChatRecord::new(Role::User, input, now),
            ChatRecord::new(Role::Assistant, answer, now),
        ] {
            if let Err(e) = context.store().append_chat(record).await {
                warn!(error = %e, "Failed to record chat history");
                return;
            }
        }
    }
}

fn emit(sink: Option<&ProgressSink>, event: ProgressEvent) {
    if let Some(sink) = sink {
        sink.emit(event);
    }
}

fn answer_text(response: &LLMResponse) -> String {
    response
        .answer()
        .map(str::to_string)
        .unwrap_or_else(|| EMPTY_ANSWER_FALLBACK.to_string())
}
