//! Conversation turns and their ordering key

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

use super::DebugTrace;

/// One user-input-to-assistant-response cycle.
///
/// `timestamp` is the identity of the turn within an agent's history. A turn
/// is created when input is submitted and mutated exactly once when it
/// resolves or fails.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationTurn {
    pub timestamp: u64,
    pub agent_id: String,
    pub user_input: String,
    #[serde(default)]
    pub ai_response: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub debug: Option<DebugTrace>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ConversationTurn {
    pub fn new(timestamp: u64, agent_id: impl Into<String>, user_input: impl Into<String>) -> Self {
        Self {
            timestamp,
            agent_id: agent_id.into(),
            user_input: user_input.into(),
            ai_response: None,
            debug: None,
            error: None,
        }
    }

    pub fn resolve(&mut self, response: impl Into<String>, debug: DebugTrace) {
        self.ai_response = Some(response.into());
        self.debug = Some(debug);
        self.error = None;
    }

    pub fn fail(&mut self, error: impl Into<String>, debug: DebugTrace) {
        self.ai_response = None;
        self.error = Some(error.into());
        self.debug = Some(debug);
    }

    pub fn is_resolved(&self) -> bool {
        self.ai_response.is_some()
    }

    pub fn is_pending(&self) -> bool {
        self.ai_response.is_none() && self.error.is_none()
    }
}

/// Hands out strictly increasing millisecond timestamps.
///
/// Wall-clock based, but two turns submitted within the same millisecond (or
/// after a clock step backwards) still get distinct, ordered keys.
#[derive(Debug, Default)]
pub struct TurnClock {
    last: AtomicU64,
}

impl TurnClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next(&self) -> u64 {
        let now = chrono::Utc::now().timestamp_millis().max(0) as u64;
        let mut current = self.last.load(Ordering::SeqCst);
        loop {
            let candidate = now.max(current + 1);
            match self
                .last
                .compare_exchange(current, candidate, Ordering::SeqCst, Ordering::SeqCst)
            {
                Ok(_) => return candidate,
                Err(actual) => current = actual,
            }
        }
    }

    /// Make sure later timestamps sort after `timestamp`
    pub fn observe(&self, timestamp: u64) {
        self.last.fetch_max(timestamp, Ordering::SeqCst);
    }
}
