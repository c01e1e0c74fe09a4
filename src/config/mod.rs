use config::{Config, File};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub mod validator;

pub use crate::adapters::voice::VoiceSettings;

use crate::adapters::secrets::{keys, SecretsStore};
use crate::agents::config::{MemoryConfig, OrchestratorConfig, ProvidersConfig};
use crate::cli::Cli;
use crate::domain::{Agent, Tool};

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Settings {
    #[serde(default)]
    pub relay: RelaySettings,
    #[serde(default)]
    pub providers: ProvidersConfig,
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,
    #[serde(default)]
    pub voice: VoiceSettings,
    #[serde(default)]
    pub memory: MemoryConfig,
    #[serde(default)]
    pub agents: Vec<Agent>,
    #[serde(default)]
    pub tools: Vec<Tool>,
    /// Provider keys and tokens; environment variables of the same name are used when absent
    #[serde(default)]
    pub secrets: SecretsConfig,
}

/// Where provider requests are sent
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RelaySettings {
    #[serde(default = "default_relay_url")]
    pub url: String,
    /// Bearer token sent to the relay
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_token: Option<String>,
    /// Secret/environment name holding the relay token when `auth_token` is unset
    #[serde(default = "default_relay_token_env")]
    pub auth_token_env: String,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
}

impl Default for RelaySettings {
    fn default() -> Self {
        Self {
            url: default_relay_url(),
            auth_token: None,
            auth_token_env: default_relay_token_env(),
            connect_timeout_secs: default_connect_timeout(),
        }
    }
}

fn default_relay_url() -> String {
    "http://127.0.0.1:54321/functions/v1/llm-proxy".to_string()
}

fn default_relay_token_env() -> String {
    keys::RELAY_AUTH_TOKEN.to_string()
}

fn default_connect_timeout() -> u64 {
    10
}

/// Secrets that may be embedded in the config file
#[derive(Debug, Default, Deserialize, Serialize, Clone)]
pub struct SecretsConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub openai_api_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub anthropic_api_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gemini_api_key: Option<String>,
    /// Botnoi Voice token
    #[serde(skip_serializing_if = "Option::is_none")]
    pub botnoi_token: Option<String>,
}

impl SecretsConfig {
    /// Copy every configured value into the secrets store
    pub async fn apply(&self, store: &SecretsStore) {
        let entries = [
            (keys::OPENAI_API_KEY, &self.openai_api_key),
            (keys::ANTHROPIC_API_KEY, &self.anthropic_api_key),
            (keys::GEMINI_API_KEY, &self.gemini_api_key),
            (keys::BOTNOI_TOKEN, &self.botnoi_token),
        ];
        for (key, value) in entries {
            if let Some(value) = value {
                store.set(key, value.clone()).await;
            }
        }
    }
}

impl Settings {
    pub fn new() -> Result<Self, anyhow::Error> {
        Self::from_root(".")
    }

    /// Create settings from CLI arguments (includes config file and CLI overrides)
    pub fn new_with_cli(cli: &Cli) -> Result<Self, anyhow::Error> {
        let root = cli
            .config
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));

        let mut settings = Self::load_file(&cli.config)?;

        // CLI > env vars > config file
        settings.apply_cli_overrides(cli);
        settings.load_external_configs(root)?;
        settings.validate()?;

        Ok(settings)
    }

    /// Load `<root>/agentry.{toml,yaml,json}` plus `<root>/config/{agents,tools}`
    pub fn from_root(root: impl AsRef<Path>) -> Result<Self, anyhow::Error> {
        let root = root.as_ref();
        let mut settings = Self::load_file(&root.join("agentry"))?;
        settings.load_external_configs(root)?;
        settings.validate()?;
        Ok(settings)
    }

    fn load_file(path: &Path) -> Result<Self, anyhow::Error> {
        let s = Config::builder()
            .add_source(File::from(path).required(false))
            .set_default("relay.url", default_relay_url())?
            .set_default("orchestrator.stream_timeout_secs", 60)?
            .set_default("orchestrator.tool_timeout_secs", 10)?
            .build()?;

        Ok(s.try_deserialize()?)
    }

    fn apply_cli_overrides(&mut self, cli: &Cli) {
        if let Some(url) = &cli.relay_url {
            self.relay.url = url.clone();
        }
        if let Some(speak) = cli.speak {
            self.voice.enabled = speak;
        }
    }

    fn validate(&self) -> Result<(), anyhow::Error> {
        validator::ConfigValidator::validate(self).map_err(|errors| {
            let error_messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            anyhow::anyhow!("Configuration validation failed:\n{}", error_messages.join("\n"))
        })
    }

    fn load_external_configs(&mut self, root: &Path) -> Result<(), anyhow::Error> {
        let tools: Vec<Tool> = load_dir(&root.join("config").join("tools"))?;
        let agents: Vec<Agent> = load_dir(&root.join("config").join("agents"))?;
        Self::merge_vec_by_key(&mut self.tools, tools, |t| identity(&t.id, &t.name));
        Self::merge_vec_by_key(&mut self.agents, agents, |a| identity(&a.id, &a.name));
        Ok(())
    }

    /// Merge two vectors by a key function.
    /// Items from `other` override items in `base` with the same key.
    /// Items from `other` not in `base` are added.
    fn merge_vec_by_key<T, K, F>(base: &mut Vec<T>, other: Vec<T>, key_fn: F)
    where
        K: Eq + std::hash::Hash,
        F: Fn(&T) -> K,
    {
        use std::collections::HashMap;

        let mut key_to_index: HashMap<K, usize> = HashMap::new();
        for (i, item) in base.iter().enumerate() {
            key_to_index.insert(key_fn(item), i);
        }

        for item in other {
            let key = key_fn(&item);
            if let Some(&idx) = key_to_index.get(&key) {
                base[idx] = item;
            } else {
                key_to_index.insert(key, base.len());
                base.push(item);
            }
        }
    }
}

/// Id when present, otherwise the name
fn identity(id: &str, name: &str) -> String {
    if id.trim().is_empty() {
        name.trim().to_string()
    } else {
        id.trim().to_string()
    }
}

/// Parse every JSON, YAML or TOML file in a directory, in path order
fn load_dir<T: DeserializeOwned>(dir: &Path) -> Result<Vec<T>, anyhow::Error> {
    let pattern = format!("{}/*", dir.display());
    let mut items = Vec::new();
    for entry in glob::glob(&pattern)? {
        match entry {
            Ok(path) => {
                let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
                    continue;
                };
                let content = std::fs::read_to_string(&path)?;
                let item: T = match ext {
                    "json" => serde_json::from_str(&content)?,
                    "yaml" | "yml" => serde_yaml::from_str(&content)?,
                    "toml" => toml::from_str(&content)?,
                    _ => continue,
                };
                tracing::debug!("Loaded {}", path.display());
                items.push(item);
            }
            Err(e) => tracing::warn!("Failed to read glob entry: {}", e),
        }
    }
    Ok(items)
}
