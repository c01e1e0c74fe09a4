//! Claude adapter
//!
//! The relay answers with Anthropic's event stream, optionally extended with
//! a `tool_call` event carrying an already assembled call. Native
//! `tool_use` content blocks are reassembled from their `input_json_delta`
//! fragments.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;

use super::declaration::{detailed_description, is_declarable, tool_parameters};
use super::relay::RelayClient;
use super::stream::{spawn_sse_stream, FunctionCallDecoder, RawResponse, SseDecoder, StreamEvent};
use super::{redact_api_key, require_api_key, LlmProvider, LlmStream, SentRequest};
use crate::agents::config::{LlmEngine, ProviderConfig};
use crate::agents::domain::{FunctionCall, Message, Role};
use crate::agents::error::{LlmError, LlmResult};
use crate::domain::Tool;

const DEFAULT_MAX_TOKENS: u32 = 4096;

/// Claude provider
pub struct ClaudeProvider {
    relay: Arc<RelayClient>,
    config: ProviderConfig,
}

impl ClaudeProvider {
    pub fn new(relay: Arc<RelayClient>, config: ProviderConfig) -> Self {
        Self { relay, config }
    }

    fn build_request_body(&self, messages: &[Message], declarations: &[Value], api_key: &str) -> Value {
        let mut body = json!({
            "engine": LlmEngine::Claude.relay_name(),
            "apiKey": api_key,
            "model": self.config.model,
            "messages": convert_messages(messages),
            "max_tokens": self.config.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            "stream": true,
        });

        if let Some(temperature) = self.config.temperature {
            body["temperature"] = json!(temperature);
        }

        if !declarations.is_empty() {
            let functions: Vec<&Value> = declarations
                .iter()
                .map(|d| d.get("function").unwrap_or(d))
                .collect();
            body["tools"] = json!({"type": "function", "functions": functions});
        }

        body
    }
}

/// Claude only knows `user` and `assistant`.
///
/// Function traffic is rendered as text and consecutive messages of the same
/// role are merged so roles alternate.
fn convert_messages(messages: &[Message]) -> Vec<Value> {
    let mut converted: Vec<(&'static str, String)> = Vec::new();

    for msg in messages {
        let (role, text) = match (msg.role, &msg.function_call) {
            (Role::Assistant, Some(call)) => (
                "assistant",
                format!("Calling function {} with arguments {}", call.name, call.arguments),
            ),
            (Role::Assistant, None) => ("assistant", msg.content_str().to_string()),
            (Role::Function, _) => (
                "user",
                format!(
                    "Function {} returned: {}",
                    msg.name.as_deref().unwrap_or("function"),
                    msg.content_str()
                ),
            ),
            (Role::System | Role::User, _) => ("user", msg.content_str().to_string()),
        };

        if text.is_empty() {
            continue;
        }
        match converted.last_mut() {
            Some((last_role, last_text)) if *last_role == role => {
                last_text.push_str("\n\n");
                last_text.push_str(&text);
            }
            _ => converted.push((role, text)),
        }
    }

    converted
        .into_iter()
        .map(|(role, content)| json!({"role": role, "content": content}))
        .collect()
}

fn arguments_text(arguments: Option<&Value>) -> String {
    match arguments {
        Some(Value::String(text)) => text.clone(),
        Some(Value::Null) | None => "{}".to_string(),
        Some(other) => other.to_string(),
    }
}

/// Decodes Anthropic stream events
#[derive(Debug, Default)]
pub struct ClaudeDecoder {
    calls: FunctionCallDecoder,
}

impl ClaudeDecoder {
    fn flush(&mut self, events: &mut Vec<StreamEvent>) {
        if let Some(call) = self.calls.other_delta() {
            events.push(StreamEvent::FunctionCall(call));
        }
    }
}

impl SseDecoder for ClaudeDecoder {
    fn decode(&mut self, payload: &Value, events: &mut Vec<StreamEvent>) -> LlmResult<bool> {
        let event_type = payload.get("type").and_then(Value::as_str).unwrap_or_default();

        match event_type {
            "tool_call" => {
                self.flush(events);
                let call = payload.get("tool_call").unwrap_or(payload);
                let Some(name) = call.get("name").and_then(Value::as_str) else {
                    tracing::warn!("Ignoring tool_call event without a name");
                    return Ok(true);
                };
                let arguments = arguments_text(call.get("arguments").or_else(|| call.get("input")));
                events.push(StreamEvent::FunctionCall(FunctionCall::new(name, arguments)));
            }
            "content_block_start" => {
                let block = payload.get("content_block");
                if block.and_then(|b| b.get("type")).and_then(Value::as_str) == Some("tool_use") {
                    self.flush(events);
                    let name = block.and_then(|b| b.get("name")).and_then(Value::as_str);
                    self.calls.function_delta(name, None);
                }
            }
            "content_block_delta" => {
                let delta = payload.get("delta");
                if let Some(partial) = delta.and_then(|d| d.get("partial_json")).and_then(Value::as_str) {
                    self.calls.function_delta(None, Some(partial));
                } else if let Some(text) = delta.and_then(|d| d.get("text")).and_then(Value::as_str) {
                    self.flush(events);
                    if !text.is_empty() {
                        events.push(StreamEvent::Text(text.to_string()));
                    }
                }
            }
            "content_block_stop" => self.flush(events),
            "message_stop" => return Ok(false),
            "error" => {
                let message = payload
                    .pointer("/error/message")
                    .and_then(Value::as_str)
                    .unwrap_or("Claude stream returned an error");
                return Err(LlmError::Streaming(message.to_string()));
            }
            _ => {}
        }

        Ok(true)
    }

    fn finish(&mut self, events: &mut Vec<StreamEvent>) {
        if let Some(call) = self.calls.finish() {
            events.push(StreamEvent::FunctionCall(call));
        }
    }
}

#[async_trait]
impl LlmProvider for ClaudeProvider {
    fn engine(&self) -> LlmEngine {
        LlmEngine::Claude
    }

    fn model(&self) -> &str {
        &self.config.model
    }

    fn format_tool(&self, tool: &Tool) -> Option<Value> {
        if !is_declarable(tool) {
            return None;
        }
        Some(json!({
            "type": "function",
            "function": {
                "name": tool.function_name(),
                "description": detailed_description(tool),
                "parameters": tool_parameters(tool),
            }
        }))
    }

    async fn send(&self, messages: &[Message], declarations: &[Value], api_key: &str) -> LlmResult<SentRequest> {
        require_api_key(LlmEngine::Claude, api_key)?;
        let body = self.build_request_body(messages, declarations, api_key);
        let response = self.relay.post(LlmEngine::Claude, &body).await?;
        Ok(SentRequest {
            request: redact_api_key(body),
            response,
        })
    }

    fn decode_stream(&self, response: RawResponse) -> LlmStream {
        spawn_sse_stream(response, ClaudeDecoder::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{HttpMethod, ToolExecution};
    use std::time::Duration;

    fn provider() -> ClaudeProvider {
        let relay = RelayClient::new("http://127.0.0.1:9/llm-proxy", None, Duration::from_secs(1)).unwrap();
        ClaudeProvider::new(Arc::new(relay), ProviderConfig::claude())
    }

    fn event(payload: Value) -> String {
        format!("event: {}\ndata: {}\n\n", payload["type"].as_str().unwrap_or("x"), payload)
    }

    async fn decode(chunks: Vec<String>) -> Vec<StreamEvent> {
        provider()
            .decode_stream(RawResponse::from_chunks(chunks))
            .collect_events()
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_text_and_relay_tool_call() {
        let events = decode(vec![
            event(json!({"type": "message_start", "message": {"id": "msg_1"}})),
            event(json!({"type": "content_block_delta", "index": 0, "delta": {"type": "text_delta", "text": "Checking"}})),
            event(json!({"type": "tool_call", "tool_call": {"name": "weather", "arguments": {"city": "Bangkok"}}})),
            event(json!({"type": "message_stop"})),
            event(json!({"type": "content_block_delta", "delta": {"text": "ignored"}})),
        ])
        .await;

        assert_eq!(
            events,
            vec![
                StreamEvent::Text("Checking".into()),
                StreamEvent::FunctionCall(FunctionCall::new("weather", r#"{"city":"Bangkok"}"#)),
            ]
        );
    }

    #[tokio::test]
    async fn test_native_tool_use_block() {
        let events = decode(vec![
            event(json!({"type": "content_block_start", "index": 1,
                "content_block": {"type": "tool_use", "id": "toolu_1", "name": "weather", "input": {}}})),
            event(json!({"type": "content_block_delta", "index": 1,
                "delta": {"type": "input_json_delta", "partial_json": "{\"city\": "}})),
            event(json!({"type": "content_block_delta", "index": 1,
                "delta": {"type": "input_json_delta", "partial_json": "\"Tokyo\"}"}})),
            event(json!({"type": "content_block_stop", "index": 1})),
        ])
        .await;

        assert_eq!(
            events,
            vec![StreamEvent::FunctionCall(FunctionCall::new("weather", "{\"city\": \"Tokyo\"}"))]
        );
    }

    #[tokio::test]
    async fn test_unterminated_tool_use_flushed_at_end() {
        let events = decode(vec![
            event(json!({"type": "content_block_start", "content_block": {"type": "tool_use", "name": "weather"}})),
            event(json!({"type": "content_block_delta", "delta": {"type": "input_json_delta", "partial_json": "{}"}})),
        ])
        .await;
        assert_eq!(events, vec![StreamEvent::FunctionCall(FunctionCall::new("weather", "{}"))]);
    }

    #[test]
    fn test_messages_alternate_roles() {
        let result = ToolExecution::failure("Weather", "boom");
        let messages = vec![
            Message::system("You are helpful"),
            Message::user("weather?"),
            Message::assistant_function_call(FunctionCall::new("weather", "{}")),
            Message::function_result("weather", &result),
        ];
        let converted = convert_messages(&messages);

        assert_eq!(converted.len(), 3);
        assert_eq!(converted[0]["role"], "user");
        assert_eq!(converted[0]["content"], "You are helpful\n\nweather?");
        assert_eq!(converted[1]["role"], "assistant");
        assert_eq!(converted[1]["content"], "Calling function weather with arguments {}");
        assert!(converted[2]["content"]
            .as_str()
            .unwrap()
            .starts_with("Function weather returned: {"));
    }

    #[test]
    fn test_tools_wrapped_for_relay() {
        let mut tool = Tool::new("Weather", HttpMethod::Get, "https://api.example.com/weather");
        tool.input.schema = r#"{"properties":{"city":{"type":"string"}}}"#.to_string();
        let declaration = provider().format_tool(&tool).unwrap();
        assert_eq!(declaration["type"], "function");
        assert_eq!(declaration["function"]["name"], "weather");

        let body = provider().build_request_body(&[Message::user("hi")], &[declaration], "key");
        assert_eq!(body["engine"], "claude");
        assert_eq!(body["max_tokens"], 4096);
        assert_eq!(body["tools"]["type"], "function");
        assert_eq!(body["tools"]["functions"][0]["name"], "weather");
    }
}
