#![allow(dead_code)]

use agentry::agents::domain::{FunctionCall, Message};
use agentry::agents::llm::{LlmProvider, LlmStream, ProviderRegistry, RawResponse, SentRequest, StreamEvent};
use agentry::agents::{LlmEngine, LlmError, LlmResult, OrchestratorConfig, ToolRegistry};
use agentry::adapters::tool_handler::HttpToolHandler;
use agentry::agents::core::ChatOrchestrator;
use agentry::domain::{Agent, HttpMethod, Tool};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Provider that replays one scripted event list per pass and records what it was sent
pub struct ScriptedProvider {
    engine: LlmEngine,
    passes: Mutex<VecDeque<Vec<StreamEvent>>>,
    sent: Mutex<Vec<Vec<Message>>>,
    delay: Option<Duration>,
    stream_error: Option<String>,
}

impl ScriptedProvider {
    pub fn new(engine: LlmEngine, passes: Vec<Vec<StreamEvent>>) -> Self {
        Self {
            engine,
            passes: Mutex::new(passes.into()),
            sent: Mutex::new(Vec::new()),
            delay: None,
            stream_error: None,
        }
    }

    /// End every pass with a streaming error after its scripted events
    pub fn with_stream_error(mut self, message: &str) -> Self {
        self.stream_error = Some(message.to_string());
        self
    }

    /// Sleep inside `send` before answering
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn send_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }

    /// Messages of every send, in order
    pub fn sent(&self) -> Vec<Vec<Message>> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    fn engine(&self) -> LlmEngine {
        self.engine
    }

    fn model(&self) -> &str {
        "scripted"
    }

    fn format_tool(&self, tool: &Tool) -> Option<Value> {
        Some(json!({ "name": tool.function_name(), "description": tool.description }))
    }

    async fn send(&self, messages: &[Message], declarations: &[Value], _api_key: &str) -> LlmResult<SentRequest> {
        self.sent.lock().unwrap().push(messages.to_vec());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        Ok(SentRequest {
            request: json!({
                "engine": self.engine.relay_name(),
                "messages": messages,
                "functions": declarations,
            }),
            response: RawResponse::empty(),
        })
    }

    fn decode_stream(&self, _response: RawResponse) -> LlmStream {
        let events = self.passes.lock().unwrap().pop_front().unwrap_or_default();
        let Some(message) = self.stream_error.clone() else {
            return LlmStream::from_events(events);
        };
        LlmStream::spawn(events.len() + 1, |tx| async move {
            for event in events {
                if !tx.send(event).await {
                    return;
                }
            }
            tx.send_error(LlmError::Streaming(message)).await;
        })
    }
}

pub fn text(chunk: &str) -> StreamEvent {
    StreamEvent::Text(chunk.to_string())
}

pub fn call(name: &str, arguments: &str) -> StreamEvent {
    StreamEvent::FunctionCall(FunctionCall::new(name, arguments))
}

pub fn weather_tool(endpoint: String) -> Tool {
    let mut tool = Tool::new("Weather", HttpMethod::Get, endpoint);
    tool.id = "t-weather".to_string();
    tool.description = "Current weather for a city".to_string();
    tool.input.schema = json!({
        "type": "object",
        "properties": { "city": { "type": "string", "description": "City name" } },
        "required": ["city"]
    })
    .to_string();
    tool
}

pub fn guide_agent(engine: LlmEngine) -> Agent {
    Agent::new("a-guide", "Guide", engine)
        .with_character("A friendly travel guide")
        .with_actions("Answer questions about cities")
        .with_tool("t-weather")
}

pub fn orchestrator(provider: Arc<ScriptedProvider>, stream_timeout_secs: u64) -> ChatOrchestrator {
    let providers = Arc::new(ProviderRegistry::new().with(provider));
    let executor = Arc::new(HttpToolHandler::new(Duration::from_secs(5)));
    ChatOrchestrator::new(
        ToolRegistry::new(providers, executor),
        OrchestratorConfig {
            stream_timeout_secs,
            tool_timeout_secs: 5,
        },
    )
}
