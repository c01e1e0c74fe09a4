//! Diagnostic record of a turn

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{FunctionCall, Message};
use crate::domain::ToolExecution;

/// Snapshot of every intermediate artifact of one turn.
///
/// Purely diagnostic: nothing reads it for control flow. A field is absent
/// when the corresponding step never ran.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DebugTrace {
    /// RFC 3339 time the turn started
    pub timestamp: String,
    /// Messages sent on the first pass
    #[serde(default)]
    pub messages: Vec<Message>,
    /// Vendor-formatted tool declarations
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub functions: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_request: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_response: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_call: Option<FunctionCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_result: Option<ToolExecution>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_request: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_response: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DebugTrace {
    pub fn new(messages: Vec<Message>) -> Self {
        Self {
            timestamp: chrono::Utc::now().to_rfc3339(),
            messages,
            ..Default::default()
        }
    }
}
