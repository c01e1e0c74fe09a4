//! Error types for the chat orchestration core

use thiserror::Error;

use super::config::LlmEngine;
use super::domain::DebugTrace;

/// Errors that can occur while handling a chat turn
#[derive(Debug, Error)]
pub enum AgentError {
    /// Agent or tool not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// LLM provider error
    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    /// Tool execution error
    #[error("Tool execution error: {0}")]
    ToolExecution(String),

    /// Memory/persistence error
    #[error("Memory error: {0}")]
    Memory(String),

    /// A turn for this agent has not settled yet
    #[error("A turn is already in progress for agent {0}")]
    TurnInFlight(String),

    /// Voice synthesis error
    #[error("Speech generation error: {0}")]
    Speech(String),

    /// Timeout
    #[error("Operation timed out after {0}s")]
    Timeout(u64),

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Errors specific to LLM provider operations
#[derive(Debug, Error)]
pub enum LlmError {
    /// No API key configured for the engine
    #[error("{} API key is missing", .0.label())]
    MissingApiKey(LlmEngine),

    /// Vendor or relay returned a non-success status
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Network error
    #[error("Network error: {0}")]
    Network(String),

    /// Streaming error
    #[error("Streaming error: {0}")]
    Streaming(String),

    /// Parse error
    #[error("Parse error: {0}")]
    Parse(String),

    /// Invalid request
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Timeout
    #[error("Request timed out")]
    Timeout,
}

impl From<reqwest::Error> for LlmError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            LlmError::Timeout
        } else if err.is_connect() {
            LlmError::Network(format!("Connection error: {}", err))
        } else {
            LlmError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for AgentError {
    fn from(err: serde_json::Error) -> Self {
        AgentError::Serialization(err.to_string())
    }
}

impl From<std::io::Error> for AgentError {
    fn from(err: std::io::Error) -> Self {
        AgentError::Internal(format!("IO error: {}", err))
    }
}

/// A turn that reached FAILED, with the trace recorded up to the failure
#[derive(Debug, Error)]
#[error("{error}")]
pub struct TurnFailure {
    #[source]
    pub error: AgentError,
    pub debug: Box<DebugTrace>,
}

impl TurnFailure {
    pub fn new(error: AgentError, mut debug: DebugTrace) -> Self {
        debug.error = Some(error.to_string());
        Self {
            error,
            debug: Box::new(debug),
        }
    }
}

impl From<TurnFailure> for AgentError {
    fn from(failure: TurnFailure) -> Self {
        failure.error
    }
}

/// Result type alias for agent operations
pub type AgentResult<T> = Result<T, AgentError>;

/// Result type alias for LLM operations
pub type LlmResult<T> = Result<T, LlmError>;
