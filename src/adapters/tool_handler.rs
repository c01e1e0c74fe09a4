use crate::agents::error::{AgentError, AgentResult};
use crate::domain::{HttpMethod, Tool, ToolExecution, ToolPort};
use async_trait::async_trait;
use regex::Regex;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use serde_json::{Map, Value};
use std::sync::OnceLock;
use std::time::Duration;

/// Argument keys that describe the request rather than carry data
const RESERVED_KEYS: [&str; 4] = ["api_url", "method", "headers", "params"];

/// Executes tools by calling their HTTP endpoints
pub struct HttpToolHandler {
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpToolHandler {
    pub fn new(timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            timeout,
        }
    }

    async fn call(&self, tool: &Tool, parameters: &Value) -> AgentResult<Value> {
        if tool.endpoint.trim().is_empty() {
            return Err(AgentError::Configuration(format!("Tool {} has no endpoint", tool.name)));
        }
        let mut url = reqwest::Url::parse(tool.endpoint.trim())
            .map_err(|e| AgentError::Validation(format!("Invalid endpoint URL {}: {}", tool.endpoint, e)))?;

        // header names are case-insensitive; configured headers win over caller-supplied ones
        let mut headers = Map::new();
        headers.insert(ACCEPT.to_string(), Value::String("application/json".to_string()));
        let configured = tool
            .header_map()
            .map_err(|e| AgentError::Validation(format!("Invalid headers for tool {}: {}", tool.name, e)))?;
        let supplied = parameters.get("headers").and_then(Value::as_object).cloned().unwrap_or_default();
        for (name, value) in supplied.into_iter().chain(configured) {
            headers.insert(name.to_ascii_lowercase(), value);
        }

        let mut request = match tool.method {
            HttpMethod::Get => {
                let pairs = query_params(parameters);
                if !pairs.is_empty() {
                    let mut query = url.query_pairs_mut();
                    for (key, value) in &pairs {
                        query.append_pair(key, value);
                    }
                }
                self.client.get(url)
            }
            HttpMethod::Post => {
                let body = render_body(tool.body.as_deref(), parameters);
                self.client
                    .post(url)
                    .header(CONTENT_TYPE, "application/json")
                    .body(body)
            }
        };

        for (name, value) in &headers {
            request = request.header(name.as_str(), header_value(value));
        }

        tracing::debug!(tool = %tool.name, method = %tool.method, "Calling tool endpoint");

        let response = request.timeout(self.timeout).send().await.map_err(|e| {
            if e.is_timeout() {
                AgentError::ToolExecution(format!("Request timed out after {}s", self.timeout.as_secs()))
            } else {
                AgentError::ToolExecution(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(AgentError::ToolExecution(format!(
                "API request failed with status {}",
                status.as_u16()
            )));
        }

        let text = response
            .text()
            .await
            .map_err(|e| AgentError::ToolExecution(e.to_string()))?;
        serde_json::from_str(&text)
            .map_err(|e| AgentError::ToolExecution(format!("Invalid JSON response: {}", e)))
    }
}

#[async_trait]
impl ToolPort for HttpToolHandler {
    async fn execute_tool(&self, tool: &Tool, parameters: &Value) -> ToolExecution {
        match self.call(tool, parameters).await {
            Ok(data) => ToolExecution::success(tool, parameters.clone(), data),
            Err(e) => {
                let message = match e {
                    AgentError::ToolExecution(message) => message,
                    other => other.to_string(),
                };
                tracing::warn!(tool = %tool.name, "Tool execution failed: {}", message);
                ToolExecution::failure(&tool.name, message)
            }
        }
    }
}

fn header_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null => None,
        other => Some(other.to_string()),
    }
}

/// Query pairs for a GET: `params` when it is an object, otherwise the
/// top-level arguments minus the request-describing keys
fn query_params(parameters: &Value) -> Vec<(String, String)> {
    let source = match parameters.get("params").and_then(Value::as_object) {
        Some(params) => params.iter().collect::<Vec<_>>(),
        None => parameters
            .as_object()
            .map(|args| {
                args.iter()
                    .filter(|(key, _)| !RESERVED_KEYS.contains(&key.as_str()))
                    .collect()
            })
            .unwrap_or_default(),
    };
    source
        .into_iter()
        .filter_map(|(key, value)| scalar_text(value).map(|text| (key.clone(), text)))
        .collect()
}

fn lookup<'a>(parameters: &'a Value, key: &str) -> Option<&'a Value> {
    parameters
        .get("params")
        .and_then(|params| params.get(key))
        .or_else(|| parameters.get(key))
}

fn placeholder() -> &'static Regex {
    static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();
    PLACEHOLDER.get_or_init(|| Regex::new(r"\{\{\s*([^}]+?)\s*\}\}").expect("placeholder pattern is valid"))
}

/// Fill `{{key}}` placeholders in a POST body template.
///
/// A JSON template is walked value by value: a string that is exactly one
/// placeholder takes the argument's JSON value, placeholders inside longer
/// strings take its text. Anything else is substituted textually with
/// JSON-encoded values.
pub fn render_body(template: Option<&str>, parameters: &Value) -> String {
    let template = match template.map(str::trim) {
        Some(t) if !t.is_empty() => t,
        _ => return parameters.to_string(),
    };

    match serde_json::from_str::<Value>(template) {
        Ok(parsed) => fill_value(parsed, parameters).to_string(),
        Err(_) => placeholder()
            .replace_all(template, |caps: &regex::Captures| {
                lookup(parameters, &caps[1]).cloned().unwrap_or(Value::Null).to_string()
            })
            .into_owned(),
    }
}

fn fill_value(value: Value, parameters: &Value) -> Value {
    match value {
        Value::String(text) => fill_string(text, parameters),
        Value::Array(items) => Value::Array(items.into_iter().map(|v| fill_value(v, parameters)).collect()),
        Value::Object(map) => Value::Object(map.into_iter().map(|(k, v)| (k, fill_value(v, parameters))).collect()),
        other => other,
    }
}

fn fill_string(text: String, parameters: &Value) -> Value {
    let pattern = placeholder();
    let whole = pattern
        .captures(&text)
        .filter(|caps| caps[0].len() == text.trim().len())
        .map(|caps| caps[1].to_string());
    if let Some(key) = whole {
        return lookup(parameters, &key).cloned().unwrap_or(Value::Null);
    }
    if !pattern.is_match(&text) {
        return Value::String(text);
    }
    let filled = pattern
        .replace_all(&text, |caps: &regex::Captures| {
            lookup(parameters, &caps[1]).and_then(scalar_text).unwrap_or_default()
        })
        .into_owned();
    Value::String(filled)
}
