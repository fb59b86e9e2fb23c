//! Custom error types for Steward
//!
//! Mirrors the failure taxonomy of the orchestration engine: configuration,
//! connection, single-tool and model-call failures are kept distinct so each
//! layer can decide whether to degrade or abort.

use thiserror::Error;

/// Main error type for Steward operations
#[derive(Error, Debug)]
pub enum StewardError {
    /// Missing or invalid tool-server / application configuration
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Tool layer unreachable
    #[error("Connection error: {0}")]
    Connection(String),

    /// A single tool call failed
    #[error("Tool invocation error: {0}")]
    ToolInvocation(String),

    /// Language-model endpoint unreachable or returned an error
    #[error("Model call error: {0}")]
    ModelCall(String),

    /// An external call exceeded its time budget
    #[error("Timed out: {0}")]
    Timeout(String),

    /// JSON parsing errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP request errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error for other cases
    #[error("{0}")]
    Other(String),
}

/// Convenience Result type for Steward operations
pub type Result<T> = std::result::Result<T, StewardError>;

impl StewardError {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Create a connection error
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    /// Create a tool invocation error
    pub fn tool(msg: impl Into<String>) -> Self {
        Self::ToolInvocation(msg.into())
    }

    /// Create a model call error
    pub fn model(msg: impl Into<String>) -> Self {
        Self::ModelCall(msg.into())
    }

    /// Create a timeout error
    pub fn timeout(msg: impl Into<String>) -> Self {
        Self::Timeout(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_carries_category() {
        assert_eq!(
            StewardError::config("Missing config/mcp.json").to_string(),
            "Configuration error: Missing config/mcp.json"
        );
        assert_eq!(
            StewardError::model("401 Unauthorized").to_string(),
            "Model call error: 401 Unauthorized"
        );
    }

    #[test]
    fn test_json_conversion() {
        let err: StewardError = serde_json::from_str::<serde_json::Value>("{")
            .unwrap_err()
            .into();
        assert!(matches!(err, StewardError::Json(_)));
    }
}
