use super::tool_handler::HttpToolHandler;
use crate::domain::{HttpMethod, Tool, ToolPort};
use httpmock::prelude::*;
use serde_json::json;
use std::time::Duration;

fn handler() -> HttpToolHandler {
    HttpToolHandler::new(Duration::from_secs(2))
}

#[tokio::test]
async fn test_get_appends_params_as_query() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/weather")
                .query_param("city", "Bangkok")
                .header("accept", "application/json")
                .header("x-api-key", "secret");
            then.status(200).json_body(json!({"temp": 31}));
        })
        .await;

    let mut tool = Tool::new("Weather", HttpMethod::Get, server.url("/weather"));
    tool.description = "Current weather".to_string();
    tool.headers = r#"{"X-Api-Key": "secret"}"#.to_string();

    let result = handler()
        .execute_tool(&tool, &json!({"params": {"city": "Bangkok"}}))
        .await;

    mock.assert_async().await;
    assert!(result.success);
    assert_eq!(result.data, Some(json!({"temp": 31})));
    assert_eq!(result.tool_name, "Weather");
    assert_eq!(result.description.as_deref(), Some("Current weather"));
    assert_eq!(result.input, Some(json!({"params": {"city": "Bangkok"}})));
}

#[tokio::test]
async fn test_post_interpolates_body_template() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/orders")
                .header("content-type", "application/json")
                .json_body(json!({"item": "coffee", "quantity": 2}));
            then.status(201).json_body(json!({"id": "o-1"}));
        })
        .await;

    let mut tool = Tool::new("Order", HttpMethod::Post, server.url("/orders"));
    tool.body = Some(r#"{"item": "{{item}}", "quantity": "{{quantity}}"}"#.to_string());

    let result = handler()
        .execute_tool(&tool, &json!({"item": "coffee", "quantity": 2}))
        .await;

    mock.assert_async().await;
    assert!(result.success, "{:?}", result.error);
    assert_eq!(result.data, Some(json!({"id": "o-1"})));
}

#[tokio::test]
async fn test_error_status_is_a_failed_execution() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/broken");
            then.status(500).body("internal error");
        })
        .await;

    let tool = Tool::new("Broken", HttpMethod::Get, server.url("/broken"));
    let result = handler().execute_tool(&tool, &json!({})).await;

    assert!(!result.success);
    assert_eq!(result.error.as_deref(), Some("API request failed with status 500"));
    assert_eq!(result.tool_name, "Broken");
    assert!(result.data.is_none());
}

#[tokio::test]
async fn test_slow_endpoint_times_out() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/slow");
            then.status(200).delay(Duration::from_millis(1500)).json_body(json!({}));
        })
        .await;

    let tool = Tool::new("Slow", HttpMethod::Get, server.url("/slow"));
    let result = HttpToolHandler::new(Duration::from_millis(200))
        .execute_tool(&tool, &json!({}))
        .await;

    assert!(!result.success);
    assert!(result.error.unwrap().contains("timed out"));
}

#[tokio::test]
async fn test_invalid_headers_fail_without_request() {
    let mut tool = Tool::new("Weather", HttpMethod::Get, "http://127.0.0.1:9/weather");
    tool.headers = "{not json".to_string();

    let result = handler().execute_tool(&tool, &json!({})).await;
    assert!(!result.success);
    assert!(result.error.unwrap().contains("Invalid headers"));
}

#[tokio::test]
async fn test_non_json_response_is_a_failure() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/html");
            then.status(200).body("<html></html>");
        })
        .await;

    let tool = Tool::new("Html", HttpMethod::Get, server.url("/html"));
    let result = handler().execute_tool(&tool, &json!({})).await;
    assert!(!result.success);
    assert!(result.error.unwrap().starts_with("Invalid JSON response"));
}
