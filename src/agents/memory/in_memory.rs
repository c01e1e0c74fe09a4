//! In-memory conversation store

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::{push_turn, replace_turn, ConversationStore};
use crate::agents::domain::ConversationTurn;
use crate::agents::error::{AgentError, AgentResult};

/// In-memory conversation store
#[derive(Debug, Default)]
pub struct InMemoryStore {
    histories: RwLock<HashMap<String, Vec<ConversationTurn>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ConversationStore for InMemoryStore {
    async fn append(&self, turn: &ConversationTurn) -> AgentResult<()> {
        let mut histories = self.histories.write().await;
        push_turn(histories.entry(turn.agent_id.clone()).or_default(), turn)
    }

    async fn update(&self, turn: &ConversationTurn) -> AgentResult<()> {
        let mut histories = self.histories.write().await;
        let history = histories
            .get_mut(&turn.agent_id)
            .ok_or_else(|| AgentError::NotFound(format!("No history for agent {}", turn.agent_id)))?;
        replace_turn(history, turn)
    }

    async fn load(&self, agent_id: &str) -> AgentResult<Vec<ConversationTurn>> {
        let histories = self.histories.read().await;
        Ok(histories.get(agent_id).cloned().unwrap_or_default())
    }

    async fn clear(&self, agent_id: &str) -> AgentResult<()> {
        let mut histories = self.histories.write().await;
        histories.remove(agent_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::domain::DebugTrace;

    #[tokio::test]
    async fn test_append_update_and_clear() {
        let store = InMemoryStore::new();
        let mut turn = ConversationTurn::new(10, "a1", "hi");
        store.append(&turn).await.unwrap();

        turn.resolve("hello", DebugTrace::default());
        store.update(&turn).await.unwrap();

        let history = store.load("a1").await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].ai_response.as_deref(), Some("hello"));
        assert!(store.load("other").await.unwrap().is_empty());

        store.clear("a1").await.unwrap();
        assert!(store.load("a1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_timestamps_must_increase() {
        let store = InMemoryStore::new();
        store.append(&ConversationTurn::new(10, "a1", "one")).await.unwrap();
        assert!(store.append(&ConversationTurn::new(10, "a1", "two")).await.is_err());
        assert!(store.append(&ConversationTurn::new(5, "a1", "three")).await.is_err());
        // histories are independent per agent
        store.append(&ConversationTurn::new(5, "a2", "four")).await.unwrap();
    }

    #[tokio::test]
    async fn test_update_unknown_turn() {
        let store = InMemoryStore::new();
        store.append(&ConversationTurn::new(1, "a1", "one")).await.unwrap();
        let err = store.update(&ConversationTurn::new(2, "a1", "two")).await.err().unwrap();
        assert!(matches!(err, AgentError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_recent_resolved_window() {
        let store = InMemoryStore::new();
        for ts in 1..=5u64 {
            let mut turn = ConversationTurn::new(ts, "a1", format!("q{ts}"));
            store.append(&turn).await.unwrap();
            if ts != 4 {
                turn.resolve(format!("a{ts}"), DebugTrace::default());
                store.update(&turn).await.unwrap();
            }
        }

        let recent = store.recent_resolved("a1", 2).await.unwrap();
        let stamps: Vec<u64> = recent.iter().map(|t| t.timestamp).collect();
        assert_eq!(stamps, vec![3, 5]);
    }
}
