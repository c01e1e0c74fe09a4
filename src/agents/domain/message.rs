//! Message types exchanged with providers

use serde::{Deserialize, Serialize};

use super::FunctionCall;
use crate::domain::ToolExecution;

/// Message role in a conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System message (instructions to the LLM)
    System,
    /// User message
    User,
    /// Assistant (LLM) message
    Assistant,
    /// Function result message
    Function,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::System => write!(f, "system"),
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
            Role::Function => write!(f, "function"),
        }
    }
}

/// A message in a conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Role of the message sender
    pub role: Role,
    /// Message text; absent for an assistant message that only calls a function
    pub content: Option<String>,
    /// Function name, set on function-role messages
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Function call requested by the assistant
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_call: Option<FunctionCall>,
}

impl Message {
    fn text(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: Some(content.into()),
            name: None,
            function_call: None,
        }
    }

    /// Create a system message
    pub fn system(content: impl Into<String>) -> Self {
        Self::text(Role::System, content)
    }

    /// Create a user message
    pub fn user(content: impl Into<String>) -> Self {
        Self::text(Role::User, content)
    }

    /// Create an assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::text(Role::Assistant, content)
    }

    /// Create an assistant message carrying a function call
    pub fn assistant_function_call(call: FunctionCall) -> Self {
        Self {
            role: Role::Assistant,
            content: None,
            name: None,
            function_call: Some(call),
        }
    }

    /// Create a function-role message carrying a tool execution result
    pub fn function_result(name: impl Into<String>, result: &ToolExecution) -> Self {
        Self {
            role: Role::Function,
            content: Some(serde_json::to_string(result).unwrap_or_else(|_| "{}".to_string())),
            name: Some(name.into()),
            function_call: None,
        }
    }

    /// Text content, empty when absent
    pub fn content_str(&self) -> &str {
        self.content.as_deref().unwrap_or_default()
    }
}
