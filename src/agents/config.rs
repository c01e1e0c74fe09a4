//! Configuration types for the chat orchestration core

use serde::{Deserialize, Serialize};

use crate::adapters::secrets::keys;

/// Supported LLM engines. The set is closed: every engine has exactly one
/// adapter registered in the provider registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LlmEngine {
    /// OpenAI-style chat completions
    #[default]
    #[serde(alias = "gpt-4", alias = "gpt4")]
    OpenAI,
    /// Anthropic Claude
    #[serde(alias = "anthropic")]
    Claude,
    /// Google Gemini
    #[serde(alias = "google")]
    Gemini,
}

impl LlmEngine {
    pub const ALL: [LlmEngine; 3] = [LlmEngine::OpenAI, LlmEngine::Claude, LlmEngine::Gemini];

    /// Engine identifier understood by the relay
    pub fn relay_name(&self) -> &'static str {
        match self {
            LlmEngine::OpenAI => "gpt-4",
            LlmEngine::Claude => "claude",
            LlmEngine::Gemini => "gemini",
        }
    }

    /// Secret holding this engine's API key
    pub fn api_key_name(&self) -> &'static str {
        match self {
            LlmEngine::OpenAI => keys::OPENAI_API_KEY,
            LlmEngine::Claude => keys::ANTHROPIC_API_KEY,
            LlmEngine::Gemini => keys::GEMINI_API_KEY,
        }
    }

    /// Human-readable vendor name
    pub fn label(&self) -> &'static str {
        match self {
            LlmEngine::OpenAI => "OpenAI",
            LlmEngine::Claude => "Claude",
            LlmEngine::Gemini => "Gemini",
        }
    }
}

impl std::fmt::Display for LlmEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LlmEngine::OpenAI => write!(f, "openai"),
            LlmEngine::Claude => write!(f, "claude"),
            LlmEngine::Gemini => write!(f, "gemini"),
        }
    }
}

/// Generation settings for one engine
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ProviderConfig {
    /// Model name/identifier
    pub model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_k: Option<u32>,
    /// Overrides the secret name the API key is looked up under
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key_env: Option<String>,
}

impl ProviderConfig {
    pub fn openai() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            temperature: Some(0.7),
            max_tokens: None,
            top_p: None,
            top_k: None,
            api_key_env: None,
        }
    }

    pub fn claude() -> Self {
        Self {
            model: "claude-3-haiku-20240307".to_string(),
            temperature: Some(0.7),
            max_tokens: Some(4096),
            top_p: None,
            top_k: None,
            api_key_env: None,
        }
    }

    pub fn gemini() -> Self {
        Self {
            model: "gemini-pro".to_string(),
            temperature: Some(0.7),
            max_tokens: Some(4096),
            top_p: Some(0.8),
            top_k: Some(40),
            api_key_env: None,
        }
    }
}

/// Per-engine provider settings
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ProvidersConfig {
    #[serde(default = "ProviderConfig::openai")]
    pub openai: ProviderConfig,
    #[serde(default = "ProviderConfig::claude")]
    pub claude: ProviderConfig,
    #[serde(default = "ProviderConfig::gemini")]
    pub gemini: ProviderConfig,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            openai: ProviderConfig::openai(),
            claude: ProviderConfig::claude(),
            gemini: ProviderConfig::gemini(),
        }
    }
}

impl ProvidersConfig {
    pub fn for_engine(&self, engine: LlmEngine) -> &ProviderConfig {
        match engine {
            LlmEngine::OpenAI => &self.openai,
            LlmEngine::Claude => &self.claude,
            LlmEngine::Gemini => &self.gemini,
        }
    }

    /// Secret name holding the API key for an engine
    pub fn api_key_name(&self, engine: LlmEngine) -> &str {
        self.for_engine(engine)
            .api_key_env
            .as_deref()
            .unwrap_or_else(|| engine.api_key_name())
    }
}

/// Bounds applied while driving a turn
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct OrchestratorConfig {
    /// Upper bound for one provider pass (send plus full stream decode)
    #[serde(default = "default_stream_timeout")]
    pub stream_timeout_secs: u64,
    /// Upper bound for one tool HTTP call
    #[serde(default = "default_tool_timeout")]
    pub tool_timeout_secs: u64,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            stream_timeout_secs: default_stream_timeout(),
            tool_timeout_secs: default_tool_timeout(),
        }
    }
}

fn default_stream_timeout() -> u64 {
    60
}

fn default_tool_timeout() -> u64 {
    10
}

/// Conversation history persistence configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct MemoryConfig {
    /// Storage backend type
    #[serde(default)]
    pub backend: MemoryBackend,
    /// Number of most recent resolved turns sent to the model as context
    #[serde(default = "default_max_turns")]
    pub max_turns: u32,
    /// Directory for file-based storage
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            backend: MemoryBackend::InMemory,
            max_turns: default_max_turns(),
            file_path: None,
        }
    }
}

fn default_max_turns() -> u32 {
    50
}

/// Memory storage backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MemoryBackend {
    /// Store in memory only (lost on restart)
    #[default]
    InMemory,
    /// One JSON document per agent
    File,
}
