//! Persistence for conversation history and the agent/tool catalog
//!
//! Conversation storage backends:
//! - In-memory (default, lost on restart)
//! - File-based (one JSON document per agent)

mod catalog;
mod file;
mod in_memory;

pub use catalog::Catalog;
pub use file::FileStore;
pub use in_memory::InMemoryStore;

use async_trait::async_trait;
use std::sync::Arc;

use crate::agents::config::{MemoryBackend, MemoryConfig};
use crate::agents::domain::ConversationTurn;
use crate::agents::error::{AgentError, AgentResult};

/// Per-agent conversation history, ordered by turn timestamp
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Append a new turn; its timestamp must be later than every stored one
    async fn append(&self, turn: &ConversationTurn) -> AgentResult<()>;

    /// Replace the stored turn with the same timestamp
    async fn update(&self, turn: &ConversationTurn) -> AgentResult<()>;

    /// Full history of an agent, oldest first
    async fn load(&self, agent_id: &str) -> AgentResult<Vec<ConversationTurn>>;

    /// Remove every turn of an agent
    async fn clear(&self, agent_id: &str) -> AgentResult<()>;

    /// The most recent resolved turns, oldest first
    async fn recent_resolved(&self, agent_id: &str, limit: usize) -> AgentResult<Vec<ConversationTurn>> {
        let resolved: Vec<ConversationTurn> = self
            .load(agent_id)
            .await?
            .into_iter()
            .filter(ConversationTurn::is_resolved)
            .collect();
        let skip = resolved.len().saturating_sub(limit);
        Ok(resolved.into_iter().skip(skip).collect())
    }
}

fn push_turn(history: &mut Vec<ConversationTurn>, turn: &ConversationTurn) -> AgentResult<()> {
    if let Some(last) = history.last() {
        if turn.timestamp <= last.timestamp {
            return Err(AgentError::Validation(format!(
                "Turn timestamp {} is not after {}",
                turn.timestamp, last.timestamp
            )));
        }
    }
    history.push(turn.clone());
    Ok(())
}

fn replace_turn(history: &mut [ConversationTurn], turn: &ConversationTurn) -> AgentResult<()> {
    let stored = history
        .iter_mut()
        .find(|t| t.timestamp == turn.timestamp)
        .ok_or_else(|| {
            AgentError::NotFound(format!("Turn {} for agent {}", turn.timestamp, turn.agent_id))
        })?;
    *stored = turn.clone();
    Ok(())
}

/// Create a conversation store from configuration
pub fn create_store(config: &MemoryConfig) -> AgentResult<Arc<dyn ConversationStore>> {
    match config.backend {
        MemoryBackend::InMemory => Ok(Arc::new(InMemoryStore::new())),
        MemoryBackend::File => {
            let path = config.file_path.clone().unwrap_or_else(|| "data/conversations".to_string());
            Ok(Arc::new(FileStore::new(path)?))
        }
    }
}
