//! Function calls decoded from provider streams

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::ToolExecution;

/// A vendor-normalized request from the model to invoke a tool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionCall {
    /// Sanitized tool identifier
    pub name: String,
    /// JSON-encoded arguments, fully assembled
    pub arguments: String,
}

impl FunctionCall {
    pub fn new(name: impl Into<String>, arguments: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            arguments: arguments.into(),
        }
    }

    /// Decode the arguments; blank arguments decode to an empty object
    pub fn parse_arguments(&self) -> Result<Value, serde_json::Error> {
        if self.arguments.trim().is_empty() {
            return Ok(Value::Object(Default::default()));
        }
        serde_json::from_str(&self.arguments)
    }
}

/// A function call that was matched to a tool and executed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCallRecord {
    pub name: String,
    pub args: Value,
    pub result: ToolExecution,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_arguments() {
        let call = FunctionCall::new("weather", r#"{"params":{"city":"Bangkok"}}"#);
        assert_eq!(call.parse_arguments().unwrap()["params"]["city"], "Bangkok");

        assert!(FunctionCall::new("weather", "").parse_arguments().unwrap().is_object());
        assert!(FunctionCall::new("weather", "{\"city\":").parse_arguments().is_err());
    }
}
