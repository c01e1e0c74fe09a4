//! Turn results and orchestration states

use serde::{Deserialize, Serialize};

use super::{DebugTrace, FunctionCallRecord};

/// States a turn moves through while being orchestrated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TurnState {
    AwaitFirstResponse,
    StreamingText,
    ToolDetected,
    ExecutingTool,
    AwaitSecondResponse,
    Done,
    Failed,
}

impl std::fmt::Display for TurnState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            TurnState::AwaitFirstResponse => "AWAIT_FIRST_RESPONSE",
            TurnState::StreamingText => "STREAMING_TEXT",
            TurnState::ToolDetected => "TOOL_DETECTED",
            TurnState::ExecutingTool => "EXECUTING_TOOL",
            TurnState::AwaitSecondResponse => "AWAIT_SECOND_RESPONSE",
            TurnState::Done => "DONE",
            TurnState::Failed => "FAILED",
        };
        f.write_str(name)
    }
}

/// Final result of a successful turn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatOutcome {
    /// Text of the last provider pass
    pub response: String,
    /// The executed tool call, if any
    pub function_call: Option<FunctionCallRecord>,
    pub debug: DebugTrace,
}
