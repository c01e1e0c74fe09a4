//! User-authored HTTP tools

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// HTTP method a tool is invoked with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    #[default]
    #[serde(alias = "get")]
    Get,
    #[serde(alias = "post")]
    Post,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HttpMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(HttpMethod::Get),
            "POST" => Ok(HttpMethod::Post),
            other => Err(format!("Unsupported HTTP method: {}", other)),
        }
    }
}

/// Input or output half of a tool: prose plus a JSON Schema kept as text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSection {
    #[serde(default)]
    pub description: String,
    #[serde(default = "empty_object", deserialize_with = "json_text")]
    pub schema: String,
}

impl Default for ToolSection {
    fn default() -> Self {
        Self {
            description: String::new(),
            schema: empty_object(),
        }
    }
}

/// An external HTTP capability an agent may invoke
///
/// Schemas, headers and the body template are stored as JSON text because they
/// are authored by hand. They are only parsed when a declaration is generated
/// or the tool is executed, so a malformed value never breaks loading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tool {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub input: ToolSection,
    #[serde(default)]
    pub output: ToolSection,
    #[serde(default)]
    pub method: HttpMethod,
    #[serde(default)]
    pub endpoint: String,
    #[serde(default = "empty_object", deserialize_with = "json_text")]
    pub headers: String,
    /// JSON template with `{{param}}` placeholders, used for POST
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "optional_json_text")]
    pub body: Option<String>,
}

impl Tool {
    /// Create a tool with empty schemas
    pub fn new(name: impl Into<String>, method: HttpMethod, endpoint: impl Into<String>) -> Self {
        Self {
            id: String::new(),
            name: name.into(),
            description: String::new(),
            input: ToolSection::default(),
            output: ToolSection::default(),
            method,
            endpoint: endpoint.into(),
            headers: empty_object(),
            body: None,
        }
    }

    /// Name the tool is declared under to every provider
    pub fn function_name(&self) -> String {
        sanitize_function_name(&self.name)
    }

    /// Parse the input JSON Schema
    pub fn input_schema(&self) -> Result<Value, serde_json::Error> {
        serde_json::from_str(&self.input.schema)
    }

    /// Parse the output JSON Schema
    pub fn output_schema(&self) -> Result<Value, serde_json::Error> {
        serde_json::from_str(&self.output.schema)
    }

    /// Parse the configured headers; blank text means no headers
    pub fn header_map(&self) -> Result<Map<String, Value>, serde_json::Error> {
        if self.headers.trim().is_empty() {
            return Ok(Map::new());
        }
        serde_json::from_str(&self.headers)
    }
}

/// Turn a human label into an identifier every provider accepts.
///
/// Lowercases, replaces anything outside `[a-z0-9_-]` with `_`, and replaces a
/// leading character that is not a letter with `fn_`.
pub fn sanitize_function_name(name: &str) -> String {
    let lowered: String = name
        .to_lowercase()
        .chars()
        .map(|c| match c {
            'a'..='z' | '0'..='9' | '_' | '-' => c,
            _ => '_',
        })
        .collect();

    match lowered.chars().next() {
        Some(c) if c.is_ascii_lowercase() => lowered,
        Some(c) => format!("fn_{}", &lowered[c.len_utf8()..]),
        None => "fn_".to_string(),
    }
}

fn empty_object() -> String {
    "{}".to_string()
}

/// Accept either JSON text or an inline JSON/YAML value and keep it as text
fn json_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(text) => text,
        Value::Null => empty_object(),
        other => other.to_string(),
    })
}

fn optional_json_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => None,
        Some(Value::String(text)) => Some(text),
        Some(other) => Some(other.to_string()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_sanitize_function_name() {
        assert_eq!(sanitize_function_name("Weather"), "weather");
        assert_eq!(sanitize_function_name("Get Stock Price!"), "get_stock_price_");
        assert_eq!(sanitize_function_name("3d-render"), "fn_d-render");
        assert_eq!(sanitize_function_name("_private"), "fn_private");
        assert_eq!(sanitize_function_name("สภาพอากาศ"), format!("fn_{}", "_".repeat(8)));
        assert_eq!(sanitize_function_name(""), "fn_");
    }

    #[test]
    fn test_sanitized_names_are_identifiers() {
        let pattern = regex::Regex::new(r"^[a-z][a-z0-9_-]*$").unwrap();
        for name in ["Weather", "9 lives", "  spaced  ", "Ünïcode tool", "a", "-dash", "ok_name-2"] {
            let sanitized = sanitize_function_name(name);
            assert!(pattern.is_match(&sanitized), "{} -> {}", name, sanitized);
        }
    }

    #[test]
    fn test_tool_accepts_inline_schemas() {
        let tool: Tool = serde_json::from_value(json!({
            "name": "Weather",
            "endpoint": "https://x/weather",
            "input": {
                "description": "City to look up",
                "schema": {"type": "object", "properties": {"city": {"type": "string"}}}
            },
            "headers": {"X-Key": "abc"},
            "body": {"city": "{{city}}"}
        }))
        .unwrap();

        assert_eq!(tool.method, HttpMethod::Get);
        assert_eq!(tool.input_schema().unwrap()["properties"]["city"]["type"], "string");
        assert_eq!(tool.header_map().unwrap()["X-Key"], "abc");
        assert_eq!(tool.body.as_deref(), Some(r#"{"city":"{{city}}"}"#));
        assert_eq!(tool.output.schema, "{}");
    }

    #[test]
    fn test_method_parsing() {
        assert_eq!("post".parse::<HttpMethod>().unwrap(), HttpMethod::Post);
        assert_eq!("GET".parse::<HttpMethod>().unwrap(), HttpMethod::Get);
        assert!("DELETE".parse::<HttpMethod>().is_err());
    }
}
