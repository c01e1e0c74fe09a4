//! OpenAPI export and import of tools
//!
//! A tool maps onto a single-operation OpenAPI 3.1 document: the server URL is
//! the endpoint, the only path is `/`, and the operation key is the lowercase
//! HTTP method. Importing reads the same shape back.

use serde_json::{json, Map, Value};
use thiserror::Error;

use super::{HttpMethod, Tool};

#[derive(Debug, Error)]
pub enum OpenApiError {
    #[error("Invalid JSON in tool {field}: {source}")]
    InvalidJson {
        field: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("Not an OpenAPI document: {0}")]
    NotOpenApi(String),
}

/// Build an OpenAPI document describing the tool
pub fn export_tool(tool: &Tool) -> Result<Value, OpenApiError> {
    let input = tool
        .input_schema()
        .map_err(|source| OpenApiError::InvalidJson { field: "input.schema", source })?;
    let output = tool
        .output_schema()
        .map_err(|source| OpenApiError::InvalidJson { field: "output.schema", source })?;
    let headers = tool
        .header_map()
        .map_err(|source| OpenApiError::InvalidJson { field: "headers", source })?;

    let required: Vec<&str> = input
        .get("required")
        .and_then(Value::as_array)
        .map(|r| r.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();

    let location = match tool.method {
        HttpMethod::Get => "query",
        HttpMethod::Post => "body",
    };

    let parameters: Vec<Value> = input
        .get("properties")
        .and_then(Value::as_object)
        .map(|props| {
            props
                .iter()
                .map(|(key, prop)| {
                    let mut schema = Map::new();
                    if let Some(kind) = prop.get("type") {
                        schema.insert("type".into(), kind.clone());
                    }
                    if let Some(values) = prop.get("enum") {
                        schema.insert("enum".into(), values.clone());
                    }
                    if let Some(default) = prop.get("default") {
                        schema.insert("default".into(), default.clone());
                    }
                    let description = prop
                        .get("description")
                        .and_then(Value::as_str)
                        .map(str::to_string)
                        .unwrap_or_else(|| format!("The {} parameter", key));
                    json!({
                        "name": key,
                        "in": location,
                        "description": description,
                        "required": required.contains(&key.as_str()),
                        "schema": Value::Object(schema),
                    })
                })
                .collect()
        })
        .unwrap_or_default();

    let operation_id: String = tool.name.chars().filter(|c| c.is_ascii_alphanumeric()).collect();
    let response_description = if tool.output.description.is_empty() {
        "Successful response"
    } else {
        tool.output.description.as_str()
    };

    let mut operation = json!({
        "description": tool.description,
        "operationId": operation_id,
        "parameters": parameters,
        "responses": {
            "200": {
                "description": response_description,
                "content": { "application/json": { "schema": output } }
            }
        },
        "deprecated": false
    });
    if !tool.input.description.is_empty() {
        operation["x-input-description"] = json!(tool.input.description);
    }

    let mut path = Map::new();
    path.insert(tool.method.as_str().to_lowercase(), operation);

    let mut document = json!({
        "openapi": "3.1.0",
        "info": {
            "title": tool.name,
            "description": tool.description,
            "version": "v1.0.0"
        },
        "servers": [{ "url": tool.endpoint }],
        "paths": { "/": Value::Object(path) },
        "components": { "schemas": {} }
    });

    if headers.contains_key("Authorization") || headers.contains_key("authorization") {
        document["components"]["securitySchemes"] = json!({
            "BearerAuth": { "type": "http", "scheme": "bearer" }
        });
        document["security"] = json!([{ "BearerAuth": [] }]);
    }

    Ok(document)
}

/// Read an OpenAPI document back into a tool, keeping `base` values the
/// document does not carry (id, headers, body template).
pub fn import_tool(document: &Value, base: &Tool) -> Result<Tool, OpenApiError> {
    if document.get("openapi").is_none() {
        return Err(OpenApiError::NotOpenApi("missing `openapi` field".to_string()));
    }

    let paths = document
        .get("paths")
        .and_then(Value::as_object)
        .ok_or_else(|| OpenApiError::NotOpenApi("missing `paths`".to_string()))?;
    let path = paths
        .get("/")
        .or_else(|| paths.values().next())
        .and_then(Value::as_object)
        .ok_or_else(|| OpenApiError::NotOpenApi("no path items".to_string()))?;
    let (method_key, operation) = path
        .iter()
        .next()
        .ok_or_else(|| OpenApiError::NotOpenApi("path has no operation".to_string()))?;
    let method: HttpMethod = method_key.parse().map_err(OpenApiError::NotOpenApi)?;

    let mut properties = Map::new();
    let mut required = Vec::new();
    for param in operation
        .get("parameters")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
    {
        let Some(name) = param.get("name").and_then(Value::as_str) else {
            continue;
        };
        let schema = param.get("schema").cloned().unwrap_or_else(|| json!({}));
        let mut prop = Map::new();
        if let Some(kind) = schema.get("type") {
            prop.insert("type".into(), kind.clone());
        }
        if let Some(description) = param.get("description") {
            prop.insert("description".into(), description.clone());
        }
        if let Some(values) = schema.get("enum") {
            prop.insert("enum".into(), values.clone());
        }
        if let Some(default) = schema.get("default") {
            prop.insert("default".into(), default.clone());
        }
        properties.insert(name.to_string(), Value::Object(prop));
        if param.get("required").and_then(Value::as_bool).unwrap_or(false) {
            required.push(json!(name));
        }
    }

    let ok_response = operation.get("responses").and_then(|r| r.get("200"));
    let output_schema = ok_response
        .and_then(|r| r.pointer("/content/application~1json/schema"))
        .cloned()
        .unwrap_or_else(|| json!({}));

    let info = document.get("info");
    let text = |value: Option<&Value>| value.and_then(Value::as_str).map(str::to_string);

    let mut tool = base.clone();
    if let Some(title) = text(info.and_then(|i| i.get("title"))) {
        tool.name = title;
    }
    if let Some(description) = text(info.and_then(|i| i.get("description"))) {
        tool.description = description;
    }
    tool.method = method;
    if let Some(url) = text(document.pointer("/servers/0/url")) {
        tool.endpoint = url;
    }
    if let Some(description) = text(operation.get("x-input-description")) {
        tool.input.description = description;
    }
    tool.input.schema = json!({
        "type": "object",
        "properties": properties,
        "required": required
    })
    .to_string();
    if let Some(description) = text(ok_response.and_then(|r| r.get("description"))) {
        tool.output.description = description;
    }
    tool.output.schema = output_schema.to_string();

    Ok(tool)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn weather_tool() -> Tool {
        let mut tool = Tool::new("Weather Lookup", HttpMethod::Post, "https://api.example.com/weather");
        tool.description = "Current weather for a city".to_string();
        tool.input.description = "City name".to_string();
        tool.input.schema = json!({
            "type": "object",
            "properties": {
                "city": {"type": "string", "description": "City name"},
                "units": {"type": "string", "enum": ["metric", "imperial"], "default": "metric"}
            },
            "required": ["city"]
        })
        .to_string();
        tool.output.description = "Weather report".to_string();
        tool.output.schema = json!({"type": "object", "properties": {"temp": {"type": "number"}}}).to_string();
        tool.headers = json!({"Authorization": "Bearer secret"}).to_string();
        tool
    }

    #[test]
    fn test_export_shape() {
        let document = export_tool(&weather_tool()).unwrap();

        assert_eq!(document["openapi"], "3.1.0");
        assert_eq!(document["servers"][0]["url"], "https://api.example.com/weather");
        let operation = &document["paths"]["/"]["post"];
        assert_eq!(operation["operationId"], "WeatherLookup");
        let params = operation["parameters"].as_array().unwrap();
        assert_eq!(params.len(), 2);
        assert!(params.iter().all(|p| p["in"] == "body"));
        let city = params.iter().find(|p| p["name"] == "city").unwrap();
        assert_eq!(city["required"], true);
        assert_eq!(document["security"][0]["BearerAuth"], json!([]));
    }

    #[test]
    fn test_round_trip_keeps_identity() {
        let tool = weather_tool();
        let document = export_tool(&tool).unwrap();
        let imported = import_tool(&document, &Tool::new("", HttpMethod::Get, "")).unwrap();

        assert_eq!(imported.name, tool.name);
        assert_eq!(imported.method, tool.method);
        assert_eq!(imported.endpoint, tool.endpoint);
        assert_eq!(imported.description, tool.description);
        assert_eq!(imported.output.description, "Weather report");

        let schema = imported.input_schema().unwrap();
        assert_eq!(schema["required"], json!(["city"]));
        assert_eq!(schema["properties"]["units"]["enum"], json!(["metric", "imperial"]));
    }

    #[test]
    fn test_import_rejects_other_documents() {
        let base = Tool::new("base", HttpMethod::Get, "https://x");
        assert!(import_tool(&json!({"tools": []}), &base).is_err());
    }

    #[test]
    fn test_export_rejects_invalid_schema() {
        let mut tool = weather_tool();
        tool.input.schema = "{not json".to_string();
        assert!(matches!(
            export_tool(&tool),
            Err(OpenApiError::InvalidJson { field: "input.schema", .. })
        ));
    }
}
