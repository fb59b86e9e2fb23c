//! Context records - chat history and calendar cache
//!
//! The agent reads both to build the context block of its system prompt and
//! appends each finished turn to the chat history.

pub mod assembler;
pub mod store;

pub use assembler::ContextAssembler;
pub use store::{CalendarSnapshot, ChatRecord, ContextStore, JsonFileContextStore, MemoryContextStore};
