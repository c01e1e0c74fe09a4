//! Bounded two-pass turn driver

use futures::StreamExt;
use serde_json::{json, Value};
use std::time::Duration;

use super::{build_messages, render_system_prompt};
use crate::agents::config::OrchestratorConfig;
use crate::agents::domain::{
    ChatOutcome, ConversationTurn, DebugTrace, FunctionCall, FunctionCallRecord, Message, TurnState,
};
use crate::agents::error::{AgentError, AgentResult, TurnFailure};
use crate::agents::llm::{LlmProvider, StreamEvent};
use crate::agents::registry::ToolRegistry;
use crate::domain::{Agent, Tool, ToolExecution};

/// Provider passes per turn: the first pass and one follow-up carrying a tool result
pub const MAX_PROVIDER_PASSES: usize = 2;

/// Everything one turn needs
pub struct TurnRequest<'a> {
    pub agent: &'a Agent,
    /// The agent's enabled tools
    pub tools: &'a [Tool],
    /// Prior turns, oldest first
    pub history: &'a [ConversationTurn],
    pub input: &'a str,
    pub api_key: &'a str,
}

struct PassOutcome {
    request: Value,
    text: String,
    call: Option<(FunctionCall, Tool)>,
    ignored: Vec<FunctionCall>,
}

impl PassOutcome {
    fn snapshot(&self) -> Value {
        json!({
            "text": self.text,
            "functionCall": self.call.as_ref().map(|(call, _)| call),
            "ignoredFunctionCalls": self.ignored,
        })
    }
}

/// Drives a turn through the provider and tools.
///
/// The number of provider passes is bounded by construction: only the first
/// pass can trigger a tool, and a function call on the follow-up pass is
/// recorded but not executed.
pub struct ChatOrchestrator {
    tools: ToolRegistry,
    config: OrchestratorConfig,
}

impl ChatOrchestrator {
    pub fn new(tools: ToolRegistry, config: OrchestratorConfig) -> Self {
        Self { tools, config }
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    /// Run one turn, forwarding text fragments to `on_text` as they arrive
    pub async fn handle(
        &self,
        request: TurnRequest<'_>,
        on_text: &mut (dyn FnMut(&str) + Send),
    ) -> Result<ChatOutcome, TurnFailure> {
        let engine = request.agent.llm_engine;
        let system_prompt = render_system_prompt(request.agent, request.tools);
        let mut messages = build_messages(&system_prompt, request.history, request.input);
        let mut debug = DebugTrace::new(messages.clone());

        let Some(provider) = self.tools.providers().get(engine) else {
            let error = AgentError::Configuration(format!("No provider registered for engine {}", engine));
            return Err(TurnFailure::new(error, debug));
        };

        let declarations = self.tools.declarations(request.tools, engine);
        debug.functions = Some(declarations.clone());

        let mut state = TurnState::AwaitFirstResponse;
        tracing::debug!(agent = %request.agent.name, engine = %engine, state = %state, "Starting turn");

        let mut response = String::new();
        let mut record = None;

        for pass in 0..MAX_PROVIDER_PASSES {
            // only the first pass may lead to another one
            let callable = if pass + 1 < MAX_PROVIDER_PASSES {
                Some(request.tools)
            } else {
                None
            };

            let outcome = match self
                .run_pass(provider.as_ref(), &messages, &declarations, request.api_key, callable, on_text)
                .await
            {
                Ok(outcome) => outcome,
                Err(error) => {
                    transition(&mut state, TurnState::Failed);
                    return Err(TurnFailure::new(error, debug));
                }
            };

            if !outcome.text.is_empty() {
                transition(&mut state, TurnState::StreamingText);
            }
            if pass == 0 {
                debug.initial_request = Some(outcome.request.clone());
                debug.initial_response = Some(outcome.snapshot());
            } else {
                debug.final_request = Some(outcome.request.clone());
                debug.final_response = Some(outcome.snapshot());
                if !outcome.ignored.is_empty() {
                    tracing::warn!(
                        calls = outcome.ignored.len(),
                        "Function call on the follow-up pass was not executed"
                    );
                }
            }
            response = outcome.text;

            let Some((call, tool)) = outcome.call else {
                break;
            };

            transition(&mut state, TurnState::ToolDetected);
            debug.function_call = Some(call.clone());

            transition(&mut state, TurnState::ExecutingTool);
            let (args, result) = match call.parse_arguments() {
                Ok(args) => {
                    let result = self.tools.execute(&tool, &args).await;
                    (args, result)
                }
                Err(e) => {
                    let message = format!("Invalid arguments for function {}: {}", call.name, e);
                    tracing::warn!("{}", message);
                    debug.error = Some(message.clone());
                    (Value::Null, ToolExecution::failure(&tool.name, message))
                }
            };
            debug.function_result = Some(result.clone());

            messages.push(Message::assistant_function_call(call.clone()));
            messages.push(Message::function_result(&call.name, &result));
            record = Some(FunctionCallRecord {
                name: call.name,
                args,
                result,
            });

            transition(&mut state, TurnState::AwaitSecondResponse);
        }

        transition(&mut state, TurnState::Done);
        Ok(ChatOutcome {
            response,
            function_call: record,
            debug,
        })
    }

    /// Send once and consume the stream, under the pass timeout.
    ///
    /// With `callable` set, the first function call naming one of those tools
    /// ends the pass; calls to unknown names are skipped.
    async fn run_pass(
        &self,
        provider: &dyn LlmProvider,
        messages: &[Message],
        declarations: &[Value],
        api_key: &str,
        callable: Option<&[Tool]>,
        on_text: &mut (dyn FnMut(&str) + Send),
    ) -> AgentResult<PassOutcome> {
        let secs = self.config.stream_timeout_secs;

        let pass = async {
            let sent = provider.send(messages, declarations, api_key).await?;
            let mut stream = provider.decode_stream(sent.response);

            let mut text = String::new();
            let mut call = None;
            let mut ignored = Vec::new();

            while let Some(event) = stream.next().await {
                match event? {
                    StreamEvent::Text(chunk) => {
                        on_text(&chunk);
                        text.push_str(&chunk);
                    }
                    StreamEvent::FunctionCall(function_call) => {
                        match callable.and_then(|tools| ToolRegistry::find(tools, &function_call.name)) {
                            Some(tool) => {
                                call = Some((function_call, tool.clone()));
                                break;
                            }
                            None => {
                                tracing::warn!(function = %function_call.name, "Ignoring function call");
                                ignored.push(function_call);
                            }
                        }
                    }
                }
            }

            Ok::<_, AgentError>(PassOutcome {
                request: sent.request,
                text,
                call,
                ignored,
            })
        };

        match tokio::time::timeout(Duration::from_secs(secs), pass).await {
            Ok(outcome) => outcome,
            Err(_) => {
                tracing::warn!("Provider pass exceeded {}s", secs);
                Err(AgentError::Timeout(secs))
            }
        }
    }
}

fn transition(state: &mut TurnState, next: TurnState) {
    tracing::debug!(from = %state, to = %next, "Turn state");
    *state = next;
}
