//! Conversational agent records

use serde::{Deserialize, Serialize};

use crate::agents::config::LlmEngine;

/// A question/answer pair the agent should answer consistently
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Faq {
    pub question: String,
    pub answer: String,
}

/// A configured agent: personality, behaviour, provider and tools
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    #[serde(default)]
    pub id: String,
    pub name: String,
    /// Personality prompt text
    #[serde(default)]
    pub character: String,
    /// Behaviour instructions
    #[serde(default)]
    pub actions: String,
    #[serde(default)]
    pub llm_engine: LlmEngine,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub greeting: Option<String>,
    /// Ids of the tools this agent may call
    #[serde(default)]
    pub enabled_tools: Vec<String>,
    #[serde(default)]
    pub faqs: Vec<Faq>,
}

impl Agent {
    pub fn new(id: impl Into<String>, name: impl Into<String>, llm_engine: LlmEngine) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            character: String::new(),
            actions: String::new(),
            llm_engine,
            greeting: None,
            enabled_tools: Vec::new(),
            faqs: Vec::new(),
        }
    }

    pub fn with_character(mut self, character: impl Into<String>) -> Self {
        self.character = character.into();
        self
    }

    pub fn with_actions(mut self, actions: impl Into<String>) -> Self {
        self.actions = actions.into();
        self
    }

    pub fn with_tool(mut self, tool_id: impl Into<String>) -> Self {
        self.enabled_tools.push(tool_id.into());
        self
    }

    pub fn with_faq(mut self, question: impl Into<String>, answer: impl Into<String>) -> Self {
        self.faqs.push(Faq {
            question: question.into(),
            answer: answer.into(),
        });
        self
    }

    pub fn has_tool(&self, tool_id: &str) -> bool {
        self.enabled_tools.iter().any(|id| id == tool_id)
    }
}
