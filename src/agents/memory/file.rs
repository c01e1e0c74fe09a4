//! File-based conversation store

use async_trait::async_trait;
use std::path::PathBuf;
use tokio::fs;
use tokio::sync::Mutex;

use super::{push_turn, replace_turn, ConversationStore};
use crate::agents::domain::ConversationTurn;
use crate::agents::error::{AgentError, AgentResult};

/// Stores each agent's history as a JSON array in `<base>/<agent>.json`
pub struct FileStore {
    base_path: PathBuf,
    // serializes read-modify-write cycles
    lock: Mutex<()>,
}

impl FileStore {
    pub fn new(base_path: impl Into<PathBuf>) -> AgentResult<Self> {
        let base_path = base_path.into();

        std::fs::create_dir_all(&base_path)
            .map_err(|e| AgentError::Memory(format!("Failed to create directory: {}", e)))?;

        Ok(Self {
            base_path,
            lock: Mutex::new(()),
        })
    }

    fn history_path(&self, agent_id: &str) -> PathBuf {
        let file_name: String = agent_id
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.base_path.join(format!("{}.json", file_name))
    }

    async fn read(&self, agent_id: &str) -> AgentResult<Vec<ConversationTurn>> {
        let path = self.history_path(agent_id);
        if !path.exists() {
            return Ok(Vec::new());
        }
        let content = fs::read_to_string(&path)
            .await
            .map_err(|e| AgentError::Memory(format!("Failed to read history file: {}", e)))?;
        Ok(serde_json::from_str(&content)?)
    }

    async fn write(&self, agent_id: &str, history: &[ConversationTurn]) -> AgentResult<()> {
        let path = self.history_path(agent_id);
        let tmp = path.with_extension("json.tmp");
        let content = serde_json::to_string_pretty(history)?;

        fs::write(&tmp, content)
            .await
            .map_err(|e| AgentError::Memory(format!("Failed to write history file: {}", e)))?;
        fs::rename(&tmp, &path)
            .await
            .map_err(|e| AgentError::Memory(format!("Failed to replace history file: {}", e)))?;
        Ok(())
    }
}

#[async_trait]
impl ConversationStore for FileStore {
    async fn append(&self, turn: &ConversationTurn) -> AgentResult<()> {
        let _guard = self.lock.lock().await;
        let mut history = self.read(&turn.agent_id).await?;
        push_turn(&mut history, turn)?;
        self.write(&turn.agent_id, &history).await
    }

    async fn update(&self, turn: &ConversationTurn) -> AgentResult<()> {
        let _guard = self.lock.lock().await;
        let mut history = self.read(&turn.agent_id).await?;
        replace_turn(&mut history, turn)?;
        self.write(&turn.agent_id, &history).await
    }

    async fn load(&self, agent_id: &str) -> AgentResult<Vec<ConversationTurn>> {
        let _guard = self.lock.lock().await;
        self.read(agent_id).await
    }

    async fn clear(&self, agent_id: &str) -> AgentResult<()> {
        let _guard = self.lock.lock().await;
        let path = self.history_path(agent_id);
        if path.exists() {
            fs::remove_file(&path)
                .await
                .map_err(|e| AgentError::Memory(format!("Failed to delete history file: {}", e)))?;
        }
        Ok(())
    }
}
