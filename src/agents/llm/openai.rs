//! OpenAI adapter: chat completions streamed as SSE through the relay

use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;

use super::declaration::{detailed_description, is_declarable, tool_parameters};
use super::relay::RelayClient;
use super::stream::{spawn_sse_stream, FunctionCallDecoder, RawResponse, SseDecoder, StreamEvent};
use super::{redact_api_key, require_api_key, LlmProvider, LlmStream, SentRequest};
use crate::agents::config::{LlmEngine, ProviderConfig};
use crate::agents::domain::{Message, Role};
use crate::agents::error::{LlmError, LlmResult};
use crate::domain::Tool;

/// OpenAI provider
pub struct OpenAiProvider {
    relay: Arc<RelayClient>,
    config: ProviderConfig,
}

impl OpenAiProvider {
    pub fn new(relay: Arc<RelayClient>, config: ProviderConfig) -> Self {
        Self { relay, config }
    }

    fn build_request_body(&self, messages: &[Message], declarations: &[Value], api_key: &str) -> Value {
        let mut body = json!({
            "engine": LlmEngine::OpenAI.relay_name(),
            "apiKey": api_key,
            "model": self.config.model,
            "messages": convert_messages(messages),
            "stream": true,
        });

        if let Some(temperature) = self.config.temperature {
            body["temperature"] = json!(temperature);
        }
        if let Some(max_tokens) = self.config.max_tokens {
            body["max_tokens"] = json!(max_tokens);
        }

        if !declarations.is_empty() {
            let tools: Vec<Value> = declarations
                .iter()
                .map(|function| json!({"type": "function", "function": function}))
                .collect();
            body["tools"] = json!(tools);
            body["tool_choice"] = json!("auto");
        }

        body
    }
}

/// Id linking an assistant tool call to its result message
fn call_id(name: &str) -> String {
    format!("call_{}", name)
}

fn convert_messages(messages: &[Message]) -> Vec<Value> {
    messages
        .iter()
        .map(|msg| match (msg.role, &msg.function_call) {
            (Role::Assistant, Some(call)) => json!({
                "role": "assistant",
                "content": msg.content,
                "tool_calls": [{
                    "id": call_id(&call.name),
                    "type": "function",
                    "function": {"name": call.name, "arguments": call.arguments}
                }]
            }),
            (Role::Function, _) => {
                let name = msg.name.as_deref().unwrap_or_default();
                json!({
                    "role": "tool",
                    "tool_call_id": call_id(name),
                    "content": msg.content_str(),
                })
            }
            (role, _) => json!({
                "role": role.to_string(),
                "content": msg.content_str(),
            }),
        })
        .collect()
}

/// Decodes `chat.completion.chunk` payloads.
///
/// Parallel tool calls arrive as fragments keyed by `tool_calls[].index`; a
/// fragment for a new index completes the call buffered before it.
#[derive(Debug, Default)]
pub struct OpenAiDecoder {
    calls: FunctionCallDecoder,
    index: Option<u64>,
}

impl OpenAiDecoder {
    fn tool_call_delta(&mut self, tool_call: &Value, events: &mut Vec<StreamEvent>) {
        let index = tool_call.get("index").and_then(Value::as_u64).unwrap_or(0);
        if self.index.is_some_and(|current| current != index) {
            if let Some(call) = self.calls.other_delta() {
                events.push(StreamEvent::FunctionCall(call));
            }
        }
        self.index = Some(index);

        let function = tool_call.get("function");
        self.calls.function_delta(
            function.and_then(|f| f.get("name")).and_then(Value::as_str),
            function.and_then(|f| f.get("arguments")).and_then(Value::as_str),
        );
    }
}

impl SseDecoder for OpenAiDecoder {
    fn decode(&mut self, payload: &Value, events: &mut Vec<StreamEvent>) -> LlmResult<bool> {
        if let Some(error) = payload.get("error") {
            let message = error
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("OpenAI stream returned an error");
            return Err(LlmError::Streaming(message.to_string()));
        }

        let Some(delta) = payload.pointer("/choices/0/delta") else {
            return Ok(true);
        };

        let tool_calls = delta
            .get("tool_calls")
            .and_then(Value::as_array)
            .filter(|calls| !calls.is_empty());

        match (delta.get("function_call"), tool_calls) {
            (Some(function), _) => {
                self.calls.function_delta(
                    function.get("name").and_then(Value::as_str),
                    function.get("arguments").and_then(Value::as_str),
                );
            }
            (None, Some(tool_calls)) => {
                for tool_call in tool_calls {
                    self.tool_call_delta(tool_call, events);
                }
            }
            (None, None) => {
                if let Some(call) = self.calls.other_delta() {
                    events.push(StreamEvent::FunctionCall(call));
                }
                self.index = None;
                if let Some(text) = delta.get("content").and_then(Value::as_str) {
                    if !text.is_empty() {
                        events.push(StreamEvent::Text(text.to_string()));
                    }
                }
            }
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
impl LlmProvider for OpenAiProvider {
    fn engine(&self) -> LlmEngine {
        LlmEngine::OpenAI
    }

    fn model(&self) -> &str {
        &self.config.model
    }

    fn format_tool(&self, tool: &Tool) -> Option<Value> {
        if !is_declarable(tool) {
            return None;
        }
        Some(json!({
            "name": tool.function_name(),
            "description": detailed_description(tool),
            "parameters": tool_parameters(tool),
        }))
    }

    async fn send(&self, messages: &[Message], declarations: &[Value], api_key: &str) -> LlmResult<SentRequest> {
        require_api_key(LlmEngine::OpenAI, api_key)?;
        let body = self.build_request_body(messages, declarations, api_key);
        let response = self.relay.post(LlmEngine::OpenAI, &body).await?;
        Ok(SentRequest {
            request: redact_api_key(body),
            response,
        })
    }

    fn decode_stream(&self, response: RawResponse) -> LlmStream {
        spawn_sse_stream(response, OpenAiDecoder::default())
    }
}
