//! LLM module - Language Model integrations
//!
//! Provides the model endpoint contract and an OpenAI-compatible client.

pub mod openai;
pub mod traits;

pub use openai::OpenAiClient;
pub use traits::{GenerateOptions, LLMProvider, LLMResponse, TokenUsage};
