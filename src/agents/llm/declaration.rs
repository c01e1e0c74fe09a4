//! Building blocks shared by the vendor tool declarations

use serde_json::{json, Map, Value};

use crate::domain::Tool;

/// A tool can only be declared with a name and an endpoint
pub fn is_declarable(tool: &Tool) -> bool {
    if tool.name.trim().is_empty() || tool.endpoint.trim().is_empty() {
        tracing::warn!(tool = %tool.name, "Skipping tool without name or endpoint");
        return false;
    }
    true
}

/// Parameter schema derived from the tool's input schema.
///
/// Uses the schema's `properties` and `required`; when the schema is not
/// valid JSON or has no properties object, falls back to a single required
/// `query` string.
pub fn tool_parameters(tool: &Tool) -> Value {
    let schema = match tool.input_schema() {
        Ok(schema) => schema,
        Err(e) => {
            tracing::warn!(tool = %tool.name, "Invalid input schema, declaring a query parameter: {}", e);
            return query_parameters(tool);
        }
    };

    let Some(properties) = schema.get("properties").and_then(Value::as_object) else {
        return query_parameters(tool);
    };

    let required = match schema.get("required").and_then(Value::as_array) {
        Some(required) => Value::Array(required.clone()),
        None => Value::Array(properties.keys().cloned().map(Value::String).collect()),
    };

    json!({
        "type": "object",
        "properties": properties,
        "required": required,
    })
}

fn query_parameters(tool: &Tool) -> Value {
    let description = if tool.input.description.trim().is_empty() {
        "Input query"
    } else {
        tool.input.description.as_str()
    };
    json!({
        "type": "object",
        "properties": {
            "query": { "type": "string", "description": description }
        },
        "required": ["query"],
    })
}

/// Description including the endpoint and the input/output summaries
pub fn detailed_description(tool: &Tool) -> String {
    format!(
        "{}\n\nEndpoint: {}\n\nInput: {}\nOutput: {}",
        tool.description,
        tool.endpoint,
        non_empty_or(&tool.input.description, "Input query"),
        non_empty_or(&tool.output.description, "Function output"),
    )
}

/// Description including only the endpoint
pub fn short_description(tool: &Tool) -> String {
    format!("{}\n\nEndpoint: {}", tool.description, tool.endpoint)
}

fn non_empty_or<'a>(value: &'a str, fallback: &'a str) -> &'a str {
    if value.trim().is_empty() {
        fallback
    } else {
        value
    }
}

/// Rewrite every JSON Schema `type` to the uppercase form Gemini expects
pub fn uppercase_types(schema: &Value) -> Value {
    match schema {
        Value::Object(map) => {
            let mut out = Map::with_capacity(map.len());
            for (key, value) in map {
                let value = match (key.as_str(), value) {
                    ("type", Value::String(kind)) => Value::String(kind.to_uppercase()),
                    // property names must keep their case
                    ("properties", Value::Object(props)) => Value::Object(
                        props
                            .iter()
                            .map(|(name, prop)| (name.clone(), uppercase_types(prop)))
                            .collect(),
                    ),
                    _ => uppercase_types(value),
                };
                out.insert(key.clone(), value);
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(items.iter().map(uppercase_types).collect()),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::HttpMethod;

    fn tool_with_schema(schema: &str) -> Tool {
        let mut tool = Tool::new("Weather", HttpMethod::Get, "https://api.example.com/weather");
        tool.description = "Current weather".to_string();
        tool.input.schema = schema.to_string();
        tool
    }

    #[test]
    fn test_parameters_from_schema() {
        let tool = tool_with_schema(
            r#"{"type":"object","properties":{"city":{"type":"string"},"days":{"type":"integer"}},"required":["city"]}"#,
        );
        let params = tool_parameters(&tool);
        assert_eq!(params["properties"]["city"]["type"], "string");
        assert_eq!(params["required"], json!(["city"]));
    }

    #[test]
    fn test_required_defaults_to_all_properties() {
        let tool = tool_with_schema(r#"{"properties":{"city":{"type":"string"}}}"#);
        assert_eq!(tool_parameters(&tool)["required"], json!(["city"]));
    }

    #[test]
    fn test_invalid_schema_falls_back_to_query() {
        for schema in ["{not json", "[1, 2]", r#"{"type":"object"}"#] {
            let params = tool_parameters(&tool_with_schema(schema));
            assert_eq!(params["required"], json!(["query"]), "schema {schema}");
            assert_eq!(params["properties"]["query"]["type"], "string");
        }
    }

    #[test]
    fn test_descriptions() {
        let tool = tool_with_schema("{}");
        assert_eq!(
            detailed_description(&tool),
            "Current weather\n\nEndpoint: https://api.example.com/weather\n\nInput: Input query\nOutput: Function output"
        );
        assert_eq!(short_description(&tool), "Current weather\n\nEndpoint: https://api.example.com/weather");
    }

    #[test]
    fn test_uppercase_types_keeps_property_names() {
        let schema = json!({
            "type": "object",
            "properties": {
                "type": {"type": "string"},
                "tags": {"type": "array", "items": {"type": "string"}}
            }
        });
        let converted = uppercase_types(&schema);
        assert_eq!(converted["type"], "OBJECT");
        assert_eq!(converted["properties"]["type"]["type"], "STRING");
        assert_eq!(converted["properties"]["tags"]["items"]["type"], "STRING");
    }

    #[test]
    fn test_undeclarable_tool() {
        let tool = Tool::new("  ", HttpMethod::Get, "https://api.example.com");
        assert!(!is_declarable(&tool));
        let tool = Tool::new("Weather", HttpMethod::Get, "");
        assert!(!is_declarable(&tool));
    }
}
