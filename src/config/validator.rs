use std::collections::HashSet;
use thiserror::Error;

use crate::config::Settings;
use crate::domain::{Agent, Tool};

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Cross-reference error: {0}")]
    CrossReference(String),

    #[error("Duplicate entry: {0}")]
    Duplicate(String),
}

pub struct ConfigValidator;

impl ConfigValidator {
    pub fn validate(settings: &Settings) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        Self::validate_relay(settings, &mut errors);
        Self::validate_tools(&settings.tools, &mut errors);
        Self::validate_agents(&settings.agents, &mut errors);
        Self::validate_cross_references(settings, &mut errors);

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    fn validate_relay(settings: &Settings, errors: &mut Vec<ValidationError>) {
        if settings.relay.url.trim().is_empty() {
            errors.push(ValidationError::MissingField("relay.url".to_string()));
        } else if let Err(e) = reqwest::Url::parse(&settings.relay.url) {
            errors.push(ValidationError::InvalidValue {
                field: "relay.url".to_string(),
                reason: e.to_string(),
            });
        }

        let timeouts = [
            ("relay.connect_timeout_secs", settings.relay.connect_timeout_secs),
            ("orchestrator.stream_timeout_secs", settings.orchestrator.stream_timeout_secs),
            ("orchestrator.tool_timeout_secs", settings.orchestrator.tool_timeout_secs),
            ("voice.timeout_secs", settings.voice.timeout_secs),
        ];
        for (field, secs) in timeouts {
            if secs == 0 {
                errors.push(ValidationError::InvalidValue {
                    field: field.to_string(),
                    reason: "must be greater than 0".to_string(),
                });
            }
        }
    }

    fn validate_tools(tools: &[Tool], errors: &mut Vec<ValidationError>) {
        let mut ids = HashSet::new();
        let mut function_names = HashSet::new();

        for tool in tools {
            if tool.name.trim().is_empty() {
                errors.push(ValidationError::MissingField(format!("tools[{}].name", tool.id)));
                continue;
            }
            if !tool.id.is_empty() && !ids.insert(tool.id.as_str()) {
                errors.push(ValidationError::Duplicate(format!("tool id '{}'", tool.id)));
            }
            if !function_names.insert(tool.function_name()) {
                errors.push(ValidationError::Duplicate(format!(
                    "tool function name '{}'",
                    tool.function_name()
                )));
            }

            if tool.endpoint.trim().is_empty() {
                errors.push(ValidationError::MissingField(format!("tools.{}.endpoint", tool.name)));
            } else if let Err(e) = reqwest::Url::parse(tool.endpoint.trim()) {
                errors.push(ValidationError::InvalidValue {
                    field: format!("tools.{}.endpoint", tool.name),
                    reason: e.to_string(),
                });
            }

            if let Err(e) = tool.header_map() {
                errors.push(ValidationError::InvalidValue {
                    field: format!("tools.{}.headers", tool.name),
                    reason: e.to_string(),
                });
            }
        }
    }

    fn validate_agents(agents: &[Agent], errors: &mut Vec<ValidationError>) {
        let mut ids = HashSet::new();

        for agent in agents {
            if agent.name.trim().is_empty() {
                errors.push(ValidationError::MissingField(format!("agents[{}].name", agent.id)));
            }
            if !agent.id.is_empty() && !ids.insert(agent.id.as_str()) {
                errors.push(ValidationError::Duplicate(format!("agent id '{}'", agent.id)));
            }
        }
    }

    fn validate_cross_references(settings: &Settings, errors: &mut Vec<ValidationError>) {
        let tool_ids: HashSet<&str> = settings.tools.iter().map(|t| t.id.as_str()).collect();

        for agent in &settings.agents {
            for tool_id in &agent.enabled_tools {
                if !tool_ids.contains(tool_id.as_str()) {
                    errors.push(ValidationError::CrossReference(format!(
                        "Agent '{}' enables unknown tool '{}'",
                        agent.name, tool_id
                    )));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::config::LlmEngine;
    use crate::domain::HttpMethod;

    fn tool(id: &str, name: &str, endpoint: &str) -> Tool {
        let mut tool = Tool::new(name, HttpMethod::Get, endpoint);
        tool.id = id.to_string();
        tool
    }

    #[test]
    fn test_valid_config() {
        let settings = Settings {
            tools: vec![tool("t1", "Weather", "https://api.example.com/weather")],
            agents: vec![Agent::new("a1", "Guide", LlmEngine::OpenAI).with_tool("t1")],
            ..Default::default()
        };

        assert!(ConfigValidator::validate(&settings).is_ok());
    }

    #[test]
    fn test_invalid_relay_and_timeout() {
        let mut settings = Settings::default();
        settings.relay.url = "not a url".to_string();
        settings.orchestrator.stream_timeout_secs = 0;

        let errors = ConfigValidator::validate(&settings).unwrap_err();
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn test_duplicate_tools() {
        let settings = Settings {
            tools: vec![
                tool("t1", "Weather", "https://api.example.com/a"),
                tool("t1", "weather", "https://api.example.com/b"),
            ],
            ..Default::default()
        };

        let errors = ConfigValidator::validate(&settings).unwrap_err();
        assert!(errors.iter().any(|e| matches!(e, ValidationError::Duplicate(m) if m.contains("tool id"))));
        assert!(errors
            .iter()
            .any(|e| matches!(e, ValidationError::Duplicate(m) if m.contains("function name"))));
    }

    #[test]
    fn test_bad_tool_fields() {
        let mut bad = tool("t1", "Weather", "ftp//nowhere");
        bad.headers = "{not json".to_string();
        let settings = Settings {
            tools: vec![bad, tool("t2", "News", "")],
            ..Default::default()
        };

        let errors = ConfigValidator::validate(&settings).unwrap_err();
        assert_eq!(errors.len(), 3);
    }

    #[test]
    fn test_unknown_tool_reference() {
        let settings = Settings {
            agents: vec![Agent::new("a1", "Guide", LlmEngine::Claude).with_tool("missing")],
            ..Default::default()
        };

        let errors = ConfigValidator::validate(&settings).unwrap_err();
        assert!(matches!(&errors[0], ValidationError::CrossReference(m) if m.contains("missing")));
    }
}
