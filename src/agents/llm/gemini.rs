//! Google Gemini adapter
//!
//! Gemini is requested non-streaming; the single JSON document is decoded
//! into the same event sequence the streaming adapters produce.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;

use super::declaration::{is_declarable, short_description, tool_parameters, uppercase_types};
use super::relay::RelayClient;
use super::stream::{RawResponse, StreamEvent};
use super::{redact_api_key, require_api_key, LlmProvider, LlmStream, SentRequest};
use crate::agents::config::{LlmEngine, ProviderConfig};
use crate::agents::domain::{FunctionCall, Message, Role};
use crate::agents::error::{LlmError, LlmResult};
use crate::domain::Tool;

const SAFETY_CATEGORIES: [&str; 4] = [
    "HARM_CATEGORY_HARASSMENT",
    "HARM_CATEGORY_HATE_SPEECH",
    "HARM_CATEGORY_SEXUALLY_EXPLICIT",
    "HARM_CATEGORY_DANGEROUS_CONTENT",
];

/// Google Gemini provider
pub struct GeminiProvider {
    relay: Arc<RelayClient>,
    config: ProviderConfig,
}

impl GeminiProvider {
    pub fn new(relay: Arc<RelayClient>, config: ProviderConfig) -> Self {
        Self { relay, config }
    }

    fn generation_config(&self) -> Value {
        json!({
            "temperature": self.config.temperature.unwrap_or(0.7),
            "topP": self.config.top_p.unwrap_or(0.8),
            "topK": self.config.top_k.unwrap_or(40),
            "maxOutputTokens": self.config.max_tokens.unwrap_or(4096),
            "candidateCount": 1,
        })
    }

    fn build_request_body(&self, messages: &[Message], declarations: &[Value], api_key: &str) -> Value {
        let safety_settings: Vec<Value> = SAFETY_CATEGORIES
            .iter()
            .map(|category| json!({"category": category, "threshold": "BLOCK_MEDIUM_AND_ABOVE"}))
            .collect();

        let mut body = json!({
            "engine": LlmEngine::Gemini.relay_name(),
            "apiKey": api_key,
            "model": self.config.model,
            "contents": convert_messages(messages),
            "generation_config": self.generation_config(),
            "safety_settings": safety_settings,
            "stream": false,
        });

        if !declarations.is_empty() {
            body["tools"] = json!([{ "functionDeclarations": declarations }]);
        }

        body
    }
}

/// Map messages to Gemini contents.
///
/// The system prompt becomes a leading user part, `assistant` becomes
/// `model`, and function traffic uses `functionCall`/`functionResponse` parts.
fn convert_messages(messages: &[Message]) -> Vec<Value> {
    let mut contents = Vec::new();

    if let Some(system) = messages.iter().find(|m| m.role == Role::System) {
        contents.push(json!({
            "role": "user",
            "parts": [{"text": format!("System Instructions: {}", system.content_str())}]
        }));
    }

    for msg in messages.iter().filter(|m| m.role != Role::System) {
        let content = match (msg.role, &msg.function_call) {
            (Role::Assistant, Some(call)) => json!({
                "role": "model",
                "parts": [{"functionCall": {
                    "name": call.name,
                    "args": call.parse_arguments().unwrap_or_else(|_| json!({})),
                }}]
            }),
            (Role::Function, _) => {
                let response = serde_json::from_str::<Value>(msg.content_str())
                    .unwrap_or_else(|_| json!({"content": msg.content_str()}));
                json!({
                    "role": "user",
                    "parts": [{"functionResponse": {
                        "name": msg.name.as_deref().unwrap_or_default(),
                        "response": response,
                    }}]
                })
            }
            (Role::Assistant, None) => json!({"role": "model", "parts": [{"text": msg.content_str()}]}),
            _ => json!({"role": "user", "parts": [{"text": msg.content_str()}]}),
        };
        contents.push(content);
    }

    contents
}

/// Turn a `generateContent` response document into events
pub fn decode_document(document: &Value) -> LlmResult<Vec<StreamEvent>> {
    if let Some(error) = document.get("error") {
        let status = error
            .get("code")
            .and_then(Value::as_u64)
            .and_then(|code| u16::try_from(code).ok())
            .unwrap_or(0);
        let message = error
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("Gemini returned an error")
            .to_string();
        return Err(LlmError::Api { status, message });
    }

    let parts = document
        .pointer("/candidates/0/content/parts")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();

    let mut events = Vec::new();
    for part in parts {
        if let Some(call) = part.get("functionCall") {
            let Some(name) = call.get("name").and_then(Value::as_str) else {
                tracing::warn!("Ignoring functionCall part without a name");
                continue;
            };
            let args = call.get("args").cloned().unwrap_or_else(|| json!({}));
            events.push(StreamEvent::FunctionCall(FunctionCall::new(name, args.to_string())));
        } else if let Some(text) = part.get("text").and_then(Value::as_str) {
            if !text.is_empty() {
                events.push(StreamEvent::Text(text.to_string()));
            }
        }
    }

    if events.is_empty() {
        tracing::warn!("No text content found in Gemini response");
    }
    Ok(events)
}

#[async_trait]
impl LlmProvider for GeminiProvider {
    fn engine(&self) -> LlmEngine {
        LlmEngine::Gemini
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
            "description": short_description(tool),
            "parameters": uppercase_types(&tool_parameters(tool)),
        }))
    }

    async fn send(&self, messages: &[Message], declarations: &[Value], api_key: &str) -> LlmResult<SentRequest> {
        require_api_key(LlmEngine::Gemini, api_key)?;
        let body = self.build_request_body(messages, declarations, api_key);
        let response = self.relay.post(LlmEngine::Gemini, &body).await?;
        Ok(SentRequest {
            request: redact_api_key(body),
            response,
        })
    }

    fn decode_stream(&self, response: RawResponse) -> LlmStream {
        LlmStream::spawn(16, |tx| async move {
            let body = match response.bytes().await {
                Ok(body) => body,
                Err(e) => {
                    tx.send_error(e).await;
                    return;
                }
            };
            let decoded = serde_json::from_slice::<Value>(&body)
                .map_err(|e| LlmError::Parse(format!("Invalid Gemini response: {}", e)))
                .and_then(|document| decode_document(&document));
            match decoded {
                Ok(events) => {
                    for event in events {
                        if !tx.send(event).await {
                            return;
                        }
                    }
                }
                Err(e) => {
                    tx.send_error(e).await;
                }
            }
        })
    }
}
