//! Per-turn transcript
//!
//! The message sequence replayed to the model. It is append-only: earlier
//! messages are never rewritten, so every request is a prefix extension of
//! the one before it.

use crate::core::{Message, ToolCall, ToolInvocationResult};

#[derive(Debug, Clone, Default)]
pub struct Conversation {
    messages: Vec<Message>,
}

impl Conversation {
    /// Start a turn: the system prompt followed by the user's input
    pub fn new(system_prompt: impl Into<String>, user_input: impl Into<String>) -> Self {
        Self {
            messages: vec![Message::system(system_prompt), Message::user(user_input)],
        }
    }

    /// Append one tool round: the assistant message echoing `calls`, then
    /// one tool message per result in the same order.
    ///
    /// `results` must answer `calls` one-to-one.
    pub fn push_tool_round(
        &mut self,
        content: Option<String>,
        calls: Vec<ToolCall>,
        results: &[ToolInvocationResult],
    ) {
        debug_assert_eq!(calls.len(), results.len());
        debug_assert!(calls.iter().zip(results).all(|(c, r)| c.id == r.id));

        self.messages
            .push(Message::assistant_tool_calls(content, calls));
        for result in results {
            self.messages
                .push(Message::tool(&result.id, result.to_message_content()));
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}
