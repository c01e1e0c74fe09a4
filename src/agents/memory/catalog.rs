//! Agent and tool catalog

use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::agents::error::{AgentError, AgentResult};
use crate::domain::{Agent, Tool};

/// Keeps agents and tools by id.
///
/// Agents only ever reference tools that exist: removing a tool drops it
/// from every agent's enabled list.
#[derive(Debug, Default)]
pub struct Catalog {
    agents: RwLock<HashMap<String, Agent>>,
    tools: RwLock<HashMap<String, Tool>>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configured tools first so agents can reference them
    pub async fn from_config(agents: Vec<Agent>, tools: Vec<Tool>) -> AgentResult<Self> {
        let catalog = Self::new();
        for tool in tools {
            catalog.upsert_tool(tool).await?;
        }
        for agent in agents {
            catalog.upsert_agent(agent).await?;
        }
        Ok(catalog)
    }

    /// Insert or replace an agent. Names are trimmed, a missing id is
    /// generated, and tool references are de-duplicated.
    pub async fn upsert_agent(&self, mut agent: Agent) -> AgentResult<Agent> {
        agent.name = agent.name.trim().to_string();
        if agent.name.is_empty() {
            return Err(AgentError::Validation("Agent name is required".to_string()));
        }
        if agent.id.trim().is_empty() {
            agent.id = uuid::Uuid::new_v4().to_string();
        }

        let tools = self.tools.read().await;
        let mut seen = Vec::with_capacity(agent.enabled_tools.len());
        for tool_id in agent.enabled_tools.drain(..) {
            if seen.contains(&tool_id) {
                continue;
            }
            if !tools.contains_key(&tool_id) {
                return Err(AgentError::Validation(format!(
                    "Agent {} references unknown tool {}",
                    agent.name, tool_id
                )));
            }
            seen.push(tool_id);
        }
        agent.enabled_tools = seen;
        drop(tools);

        tracing::debug!(agent = %agent.name, id = %agent.id, "Saved agent");
        self.agents.write().await.insert(agent.id.clone(), agent.clone());
        Ok(agent)
    }

    /// Insert or replace a tool. Names are trimmed and a missing id is generated.
    pub async fn upsert_tool(&self, mut tool: Tool) -> AgentResult<Tool> {
        tool.name = tool.name.trim().to_string();
        tool.endpoint = tool.endpoint.trim().to_string();
        if tool.name.is_empty() {
            return Err(AgentError::Validation("Tool name is required".to_string()));
        }
        if tool.endpoint.is_empty() {
            return Err(AgentError::Validation(format!("Tool {} has no endpoint", tool.name)));
        }
        if tool.id.trim().is_empty() {
            tool.id = uuid::Uuid::new_v4().to_string();
        }

        tracing::debug!(tool = %tool.name, id = %tool.id, "Saved tool");
        self.tools.write().await.insert(tool.id.clone(), tool.clone());
        Ok(tool)
    }

    pub async fn remove_agent(&self, id: &str) -> bool {
        self.agents.write().await.remove(id).is_some()
    }

    pub async fn remove_tool(&self, id: &str) -> bool {
        let removed = self.tools.write().await.remove(id).is_some();
        if removed {
            let mut agents = self.agents.write().await;
            for agent in agents.values_mut() {
                agent.enabled_tools.retain(|tool_id| tool_id != id);
            }
        }
        removed
    }

    pub async fn agent(&self, id: &str) -> Option<Agent> {
        self.agents.read().await.get(id).cloned()
    }

    /// Look an agent up by id, then by case-insensitive name
    pub async fn find_agent(&self, key: &str) -> Option<Agent> {
        let agents = self.agents.read().await;
        agents.get(key).cloned().or_else(|| {
            agents
                .values()
                .find(|agent| agent.name.eq_ignore_ascii_case(key.trim()))
                .cloned()
        })
    }

    pub async fn tool(&self, id: &str) -> Option<Tool> {
        self.tools.read().await.get(id).cloned()
    }

    /// Look a tool up by id, then by name or function name
    pub async fn find_tool(&self, key: &str) -> Option<Tool> {
        let tools = self.tools.read().await;
        tools.get(key).cloned().or_else(|| {
            let key = key.trim();
            tools
                .values()
                .find(|tool| tool.name.eq_ignore_ascii_case(key) || tool.function_name() == key)
                .cloned()
        })
    }

    /// All agents sorted by name
    pub async fn agents(&self) -> Vec<Agent> {
        let mut agents: Vec<Agent> = self.agents.read().await.values().cloned().collect();
        agents.sort_by(|a, b| a.name.cmp(&b.name));
        agents
    }

    /// All tools sorted by name
    pub async fn tools(&self) -> Vec<Tool> {
        let mut tools: Vec<Tool> = self.tools.read().await.values().cloned().collect();
        tools.sort_by(|a, b| a.name.cmp(&b.name));
        tools
    }

    /// The agent's enabled tools, in the agent's order
    pub async fn enabled_tools(&self, agent: &Agent) -> Vec<Tool> {
        let tools = self.tools.read().await;
        agent
            .enabled_tools
            .iter()
            .filter_map(|id| {
                let tool = tools.get(id).cloned();
                if tool.is_none() {
                    tracing::warn!(agent = %agent.name, tool = %id, "Enabled tool no longer exists");
                }
                tool
            })
            .collect()
    }
}
