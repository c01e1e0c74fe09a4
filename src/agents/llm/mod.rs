//! Provider adapters
//!
//! Each engine has one adapter that knows three things: how to declare a
//! tool, how to shape a request body for the relay, and how to decode the
//! response into [`StreamEvent`]s:
//! - OpenAI (SSE chat completion chunks)
//! - Claude (Anthropic stream events)
//! - Gemini (a single `generateContent` document)

pub mod declaration;
mod claude;
mod gemini;
mod openai;
mod relay;
mod stream;

pub use claude::{ClaudeDecoder, ClaudeProvider};
pub use gemini::GeminiProvider;
pub use openai::{OpenAiDecoder, OpenAiProvider};
pub use relay::RelayClient;
pub use stream::*;

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

use crate::agents::config::{LlmEngine, ProvidersConfig};
use crate::agents::domain::Message;
use crate::agents::error::{LlmError, LlmResult};
use crate::domain::Tool;

/// A request that was accepted by the relay
pub struct SentRequest {
    /// Body as sent, with the API key redacted
    pub request: Value,
    pub response: RawResponse,
}

/// Vendor adapter
#[async_trait]
pub trait LlmProvider: Send + Sync {
    fn engine(&self) -> LlmEngine;

    /// Get the model being used
    fn model(&self) -> &str;

    /// Vendor declaration for a tool; `None` when the tool cannot be declared
    fn format_tool(&self, tool: &Tool) -> Option<Value>;

    fn format_tools(&self, tools: &[Tool]) -> Vec<Value> {
        tools.iter().filter_map(|tool| self.format_tool(tool)).collect()
    }

    /// Send the conversation and declarations through the relay
    async fn send(&self, messages: &[Message], declarations: &[Value], api_key: &str) -> LlmResult<SentRequest>;

    /// Decode a response into text fragments and complete function calls
    fn decode_stream(&self, response: RawResponse) -> LlmStream;
}

pub(crate) fn require_api_key(engine: LlmEngine, api_key: &str) -> LlmResult<()> {
    if api_key.trim().is_empty() {
        return Err(LlmError::MissingApiKey(engine));
    }
    Ok(())
}

/// Copy of a request body that is safe to keep in a trace
pub(crate) fn redact_api_key(mut body: Value) -> Value {
    if let Some(key) = body.get_mut("apiKey") {
        *key = Value::String("[redacted]".to_string());
    }
    body
}

/// Static engine-to-adapter table
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    providers: HashMap<LlmEngine, Arc<dyn LlmProvider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register all built-in adapters against one relay
    pub fn with_relay(relay: Arc<RelayClient>, config: &ProvidersConfig) -> Self {
        Self::new()
            .with(Arc::new(OpenAiProvider::new(relay.clone(), config.openai.clone())))
            .with(Arc::new(ClaudeProvider::new(relay.clone(), config.claude.clone())))
            .with(Arc::new(GeminiProvider::new(relay, config.gemini.clone())))
    }

    /// Register an adapter, replacing any previous one for the same engine
    pub fn with(mut self, provider: Arc<dyn LlmProvider>) -> Self {
        self.providers.insert(provider.engine(), provider);
        self
    }

    pub fn get(&self, engine: LlmEngine) -> Option<Arc<dyn LlmProvider>> {
        self.providers.get(&engine).cloned()
    }
}
