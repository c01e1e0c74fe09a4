use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

mod agent;
pub mod openapi;
mod tool;

pub use agent::{Agent, Faq};
pub use tool::{sanitize_function_name, HttpMethod, Tool, ToolSection};

/// Outcome of one tool invocation.
///
/// Failures are values, not errors: they are embedded in the conversation and
/// the debug trace so a broken endpoint never aborts a turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolExecution {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub tool_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<Value>,
}

impl ToolExecution {
    pub fn success(tool: &Tool, input: Value, data: Value) -> Self {
        Self {
            success: true,
            data: Some(data.clone()),
            error: None,
            tool_name: tool.name.clone(),
            description: Some(tool.description.clone()),
            input: Some(input),
            output: Some(data),
        }
    }

    pub fn failure(tool_name: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
            tool_name: tool_name.into(),
            description: None,
            input: None,
            output: None,
        }
    }
}

/// Executes a tool against its configured endpoint
#[async_trait]
pub trait ToolPort: Send + Sync {
    async fn execute_tool(&self, tool: &Tool, parameters: &Value) -> ToolExecution;
}
