//! In-memory store for provider API keys and the voice token.
//!
//! Secrets live only for the lifetime of the process. Lookups fall back to
//! environment variables of the same name, so keys can be supplied either
//! through the config file or the environment.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Known secret key identifiers
pub mod keys {
    pub const OPENAI_API_KEY: &str = "OPENAI_API_KEY";
    pub const ANTHROPIC_API_KEY: &str = "ANTHROPIC_API_KEY";
    pub const GEMINI_API_KEY: &str = "GEMINI_API_KEY";
    pub const BOTNOI_TOKEN: &str = "BOTNOI_TOKEN";
    pub const RELAY_AUTH_TOKEN: &str = "RELAY_AUTH_TOKEN";
}

/// In-memory secrets store
#[derive(Debug, Default)]
pub struct SecretsStore {
    secrets: RwLock<HashMap<String, String>>,
}

impl SecretsStore {
    pub fn new() -> Self {
        Self {
            secrets: RwLock::new(HashMap::new()),
        }
    }

    /// Set a secret value; blank values remove the secret
    pub async fn set(&self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        let mut secrets = self.secrets.write().await;
        if value.trim().is_empty() {
            secrets.remove(&key);
        } else {
            secrets.insert(key, value);
        }
    }

    pub async fn get(&self, key: &str) -> Option<String> {
        let secrets = self.secrets.read().await;
        secrets.get(key).cloned()
    }

    pub async fn delete(&self, key: &str) -> bool {
        let mut secrets = self.secrets.write().await;
        secrets.remove(key).is_some()
    }

    /// List all secret keys (not values)
    pub async fn list_keys(&self) -> Vec<String> {
        let secrets = self.secrets.read().await;
        let mut keys: Vec<String> = secrets.keys().cloned().collect();
        keys.sort();
        keys
    }

    pub async fn exists(&self, key: &str) -> bool {
        let secrets = self.secrets.read().await;
        secrets.contains_key(key)
    }

    /// Get secret with fallback to environment variable; blank values count as missing
    pub async fn get_or_env(&self, key: &str) -> Option<String> {
        if let Some(value) = self.get(key).await {
            return Some(value);
        }
        std::env::var(key).ok().filter(|v| !v.trim().is_empty())
    }
}

/// Thread-safe shared secrets store
pub type SharedSecretsStore = Arc<SecretsStore>;

pub fn create_secrets_store() -> SharedSecretsStore {
    Arc::new(SecretsStore::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_and_get() {
        let store = SecretsStore::new();
        store.set(keys::OPENAI_API_KEY, "sk-test").await;
        assert_eq!(store.get(keys::OPENAI_API_KEY).await, Some("sk-test".to_string()));
    }

    #[tokio::test]
    async fn test_blank_value_removes_secret() {
        let store = SecretsStore::new();
        store.set("AGENTRY_TEST_KEY", "value").await;
        store.set("AGENTRY_TEST_KEY", "   ").await;
        assert!(!store.exists("AGENTRY_TEST_KEY").await);
    }

    #[tokio::test]
    async fn test_delete_and_list() {
        let store = SecretsStore::new();
        store.set("KEY2", "value2").await;
        store.set("KEY1", "value1").await;
        assert_eq!(store.list_keys().await, vec!["KEY1".to_string(), "KEY2".to_string()]);
        assert!(store.delete("KEY1").await);
        assert!(!store.delete("KEY1").await);
    }

    #[tokio::test]
    async fn test_get_or_env_prefers_store() {
        let store = SecretsStore::new();
        assert_eq!(store.get_or_env("AGENTRY_SECRET_THAT_IS_NOT_SET").await, None);
        store.set("AGENTRY_SECRET_THAT_IS_NOT_SET", "from-store").await;
        assert_eq!(
            store.get_or_env("AGENTRY_SECRET_THAT_IS_NOT_SET").await,
            Some("from-store".to_string())
        );
    }
}
