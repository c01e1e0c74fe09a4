//! Chat handler: the entry point for submitting user input to an agent

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::adapters::secrets::{keys, SharedSecretsStore};
use crate::adapters::tool_handler::HttpToolHandler;
use crate::adapters::voice::VoiceClient;
use crate::agents::config::ProvidersConfig;
use crate::agents::core::{ChatOrchestrator, TurnRequest};
use crate::agents::domain::{ChatOutcome, ConversationTurn, TurnClock};
use crate::agents::error::{AgentError, AgentResult, LlmError};
use crate::agents::llm::{ProviderRegistry, RelayClient};
use crate::agents::memory::{create_store, Catalog, ConversationStore};
use crate::agents::registry::ToolRegistry;
use crate::config::Settings;
use crate::domain::{Agent, ToolExecution};

/// Result of a resolved turn
#[derive(Debug, Clone)]
pub struct TurnReply {
    /// The persisted turn
    pub turn: ConversationTurn,
    pub outcome: ChatOutcome,
    /// Generated speech, when voice replies are enabled and synthesis worked
    pub audio_url: Option<String>,
}

/// Handles chat submissions for all agents.
///
/// At most one turn per agent is in flight; a second submission while the
/// first is unsettled is rejected rather than queued.
pub struct ChatHandler {
    catalog: Arc<Catalog>,
    store: Arc<dyn ConversationStore>,
    orchestrator: Arc<ChatOrchestrator>,
    secrets: SharedSecretsStore,
    providers: ProvidersConfig,
    voice: Arc<VoiceClient>,
    speak_replies: bool,
    max_turns: usize,
    clock: TurnClock,
    in_flight: Mutex<HashSet<String>>,
}

struct InFlightGuard<'a> {
    in_flight: &'a Mutex<HashSet<String>>,
    agent_id: String,
}

impl<'a> InFlightGuard<'a> {
    fn acquire(in_flight: &'a Mutex<HashSet<String>>, agent_id: &str) -> AgentResult<Self> {
        let mut active = in_flight.lock().unwrap_or_else(|e| e.into_inner());
        if !active.insert(agent_id.to_string()) {
            return Err(AgentError::TurnInFlight(agent_id.to_string()));
        }
        Ok(Self {
            in_flight,
            agent_id: agent_id.to_string(),
        })
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        let mut active = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());
        active.remove(&self.agent_id);
    }
}

impl ChatHandler {
    pub fn new(
        catalog: Arc<Catalog>,
        store: Arc<dyn ConversationStore>,
        orchestrator: Arc<ChatOrchestrator>,
        secrets: SharedSecretsStore,
        providers: ProvidersConfig,
        voice: Arc<VoiceClient>,
    ) -> Self {
        Self {
            catalog,
            store,
            orchestrator,
            secrets,
            providers,
            speak_replies: voice.settings().enabled,
            voice,
            max_turns: 50,
            clock: TurnClock::new(),
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    /// Wire relay, adapters, tool execution, storage and catalog from settings
    pub async fn from_settings(settings: &Settings, secrets: SharedSecretsStore) -> AgentResult<Self> {
        let relay_token = match &settings.relay.auth_token {
            Some(token) => Some(token.clone()),
            None => secrets.get_or_env(&settings.relay.auth_token_env).await,
        };
        let relay = RelayClient::new(
            settings.relay.url.clone(),
            relay_token,
            Duration::from_secs(settings.relay.connect_timeout_secs),
        )?;

        let providers = Arc::new(ProviderRegistry::with_relay(Arc::new(relay), &settings.providers));
        let executor = Arc::new(HttpToolHandler::new(Duration::from_secs(
            settings.orchestrator.tool_timeout_secs,
        )));
        let orchestrator = ChatOrchestrator::new(
            ToolRegistry::new(providers, executor),
            settings.orchestrator.clone(),
        );

        let catalog = Catalog::from_config(settings.agents.clone(), settings.tools.clone()).await?;
        let store = create_store(&settings.memory)?;

        tracing::info!(
            agents = settings.agents.len(),
            tools = settings.tools.len(),
            relay = %settings.relay.url,
            "Chat handler initialized"
        );

        Ok(Self::new(
            Arc::new(catalog),
            store,
            Arc::new(orchestrator),
            secrets,
            settings.providers.clone(),
            Arc::new(VoiceClient::new(settings.voice.clone())),
        )
        .with_max_turns(settings.memory.max_turns as usize))
    }

    /// Number of resolved turns sent as context
    pub fn with_max_turns(mut self, max_turns: usize) -> Self {
        self.max_turns = max_turns;
        self
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    pub fn tools(&self) -> &ToolRegistry {
        self.orchestrator.tools()
    }

    async fn resolve_agent(&self, agent_key: &str) -> AgentResult<Agent> {
        self.catalog
            .find_agent(agent_key)
            .await
            .ok_or_else(|| AgentError::NotFound(format!("Agent {}", agent_key)))
    }

    /// Submit user input to an agent and drive the turn to completion.
    ///
    /// Fails before any network call when the agent's engine has no API key.
    /// Text fragments are passed to `on_text` while the reply streams.
    pub async fn submit(
        &self,
        agent_key: &str,
        input: &str,
        on_text: &mut (dyn FnMut(&str) + Send),
    ) -> AgentResult<TurnReply> {
        let input = input.trim();
        if input.is_empty() {
            return Err(AgentError::Validation("No input provided".to_string()));
        }

        let agent = self.resolve_agent(agent_key).await?;
        let engine = agent.llm_engine;
        let api_key = self
            .secrets
            .get_or_env(self.providers.api_key_name(engine))
            .await
            .ok_or(LlmError::MissingApiKey(engine))?;

        let _guard = InFlightGuard::acquire(&self.in_flight, &agent.id)?;

        let stored = self.store.load(&agent.id).await?;
        if let Some(last) = stored.last() {
            self.clock.observe(last.timestamp);
        }
        let resolved: Vec<ConversationTurn> = stored.into_iter().filter(ConversationTurn::is_resolved).collect();
        let history = &resolved[resolved.len().saturating_sub(self.max_turns)..];

        let mut turn = ConversationTurn::new(self.clock.next(), agent.id.clone(), input);
        self.store.append(&turn).await?;

        let tools = self.catalog.enabled_tools(&agent).await;
        tracing::info!(
            agent = %agent.name,
            engine = %engine,
            tools = tools.len(),
            timestamp = turn.timestamp,
            "Processing turn"
        );

        let request = TurnRequest {
            agent: &agent,
            tools: &tools,
            history,
            input,
            api_key: &api_key,
        };

        match self.orchestrator.handle(request, on_text).await {
            Ok(outcome) => {
                turn.resolve(outcome.response.clone(), outcome.debug.clone());
                self.store.update(&turn).await?;

                let audio_url = if self.speak_replies {
                    self.speak_reply(&outcome.response).await
                } else {
                    None
                };

                Ok(TurnReply {
                    turn,
                    outcome,
                    audio_url,
                })
            }
            Err(failure) => {
                tracing::error!(agent = %agent.name, "Turn failed: {}", failure);
                turn.fail(failure.error.to_string(), *failure.debug);
                if let Err(e) = self.store.update(&turn).await {
                    tracing::warn!("Failed to record failed turn: {}", e);
                }
                Err(failure.error)
            }
        }
    }

    async fn speak_reply(&self, text: &str) -> Option<String> {
        match self.speak(text).await {
            Ok(url) => Some(url),
            Err(e) => {
                tracing::warn!("Speech generation failed: {}", e);
                None
            }
        }
    }

    /// Synthesize speech for arbitrary text
    pub async fn speak(&self, text: &str) -> AgentResult<String> {
        let token = self.secrets.get_or_env(keys::BOTNOI_TOKEN).await;
        self.voice.synthesize(text, token.as_deref()).await
    }

    /// Call a tool's endpoint directly with JSON arguments, outside any turn.
    ///
    /// Blank arguments mean `{}`. Endpoint failures come back as a failed
    /// [`ToolExecution`]; only an unknown tool or malformed arguments are errors.
    pub async fn test_tool(&self, tool_key: &str, arguments: &str) -> AgentResult<ToolExecution> {
        let tool = self
            .catalog
            .find_tool(tool_key)
            .await
            .ok_or_else(|| AgentError::NotFound(format!("Tool {}", tool_key)))?;

        let arguments = match arguments.trim() {
            "" => serde_json::json!({}),
            text => serde_json::from_str::<serde_json::Value>(text)
                .map_err(|e| AgentError::Validation(format!("Invalid tool arguments: {}", e)))?,
        };
        Ok(self.tools().execute(&tool, &arguments).await)
    }

    /// Full conversation history of an agent, oldest first
    pub async fn history(&self, agent_key: &str) -> AgentResult<Vec<ConversationTurn>> {
        let agent = self.resolve_agent(agent_key).await?;
        self.store.load(&agent.id).await
    }

    pub async fn clear_history(&self, agent_key: &str) -> AgentResult<()> {
        let agent = self.resolve_agent(agent_key).await?;
        let _guard = InFlightGuard::acquire(&self.in_flight, &agent.id)?;
        self.store.clear(&agent.id).await?;
        tracing::info!(agent = %agent.name, "Cleared conversation history");
        Ok(())
    }
}
