//! Agent loop state management
//!
//! Tracks one turn of the tool-calling loop: iterations used, model calls
//! made, tool invocations performed, and how the loop ended.

use serde::Serialize;

/// How a turn's loop ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoopOutcome {
    /// The model answered without requesting tools
    Answered,
    /// The iteration ceiling was reached; the answer came from a tools-disabled call
    Exhausted,
}

/// State of the agent loop for one turn
#[derive(Debug, Clone, Serialize)]
pub struct AgentLoopState {
    /// Completed round-trips (model call plus its tool batch)
    pub iteration: usize,
    /// Iteration ceiling
    pub max_iterations: usize,
    pub model_calls: usize,
    pub tool_invocations: usize,
    pub failed_invocations: usize,
    pub outcome: Option<LoopOutcome>,
}

impl AgentLoopState {
    pub fn new(max_iterations: usize) -> Self {
        Self {
            iteration: 0,
            max_iterations,
            model_calls: 0,
            tool_invocations: 0,
            failed_invocations: 0,
            outcome: None,
        }
    }

    /// Whether another tool-enabled model call is allowed
    pub fn should_continue(&self) -> bool {
        self.outcome.is_none() && self.iteration < self.max_iterations
    }

    /// 1-based number of the round-trip about to start
    pub fn current_number(&self) -> usize {
        self.iteration + 1
    }

    pub fn record_model_call(&mut self) {
        self.model_calls += 1;
    }

    pub fn record_invocation(&mut self, success: bool) {
        self.tool_invocations += 1;
        if !success {
            self.failed_invocations += 1;
        }
    }

    pub fn next_iteration(&mut self) {
        self.iteration += 1;
    }

    pub fn finish(&mut self, outcome: LoopOutcome) {
        self.outcome = Some(outcome);
    }
}
