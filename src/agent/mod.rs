//! Agent module - conversation loop and orchestration
//!
//! Contains the agent that drives the model/tool loop, its per-turn state,
//! progress reporting, and the orchestrator that fronts it.

pub mod conversation;
pub mod llm_agent;
pub mod loop_state;
pub mod orchestrator;
pub mod progress;

pub use conversation::Conversation;
pub use llm_agent::{AgentKind, ConversationAgent, TurnOutcome, EMPTY_ANSWER_FALLBACK};
pub use loop_state::{AgentLoopState, LoopOutcome};
pub use orchestrator::{HealthReport, Orchestrator};
pub use progress::{ProgressEvent, ProgressSink};
