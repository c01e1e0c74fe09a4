//! Text-to-speech through the Botnoi Voice API

use reqwest::header::CONTENT_TYPE;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;

use crate::agents::error::{AgentError, AgentResult};

/// Voice synthesis settings
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct VoiceSettings {
    /// Speak every resolved reply
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_speaker")]
    pub speaker: String,
    #[serde(default = "default_unit")]
    pub volume: f32,
    #[serde(default = "default_unit")]
    pub speed: f32,
    #[serde(default = "default_media")]
    pub type_media: String,
    #[serde(default = "default_save_file")]
    pub save_file: bool,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl Default for VoiceSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: default_endpoint(),
            speaker: default_speaker(),
            volume: default_unit(),
            speed: default_unit(),
            type_media: default_media(),
            save_file: default_save_file(),
            language: default_language(),
            timeout_secs: default_timeout(),
        }
    }
}

fn default_endpoint() -> String {
    "https://api-voice.botnoi.ai/openapi/v1/generate_audio".to_string()
}

fn default_speaker() -> String {
    "1".to_string()
}

fn default_unit() -> f32 {
    1.0
}

fn default_media() -> String {
    "mp3".to_string()
}

fn default_save_file() -> bool {
    true
}

fn default_language() -> String {
    "th".to_string()
}

fn default_timeout() -> u64 {
    30
}

/// Client for the voice generation endpoint
pub struct VoiceClient {
    client: reqwest::Client,
    settings: VoiceSettings,
}

impl VoiceClient {
    pub fn new(settings: VoiceSettings) -> Self {
        Self {
            client: reqwest::Client::new(),
            settings,
        }
    }

    pub fn settings(&self) -> &VoiceSettings {
        &self.settings
    }

    /// Generate audio for `text` and return its URL
    pub async fn synthesize(&self, text: &str, token: Option<&str>) -> AgentResult<String> {
        let token = token
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| AgentError::Configuration("Botnoi Voice token is missing".to_string()))?;
        let text = text.trim();
        if text.is_empty() {
            return Err(AgentError::Validation("Text cannot be empty".to_string()));
        }

        let body = json!({
            "text": text,
            "speaker": self.settings.speaker,
            "volume": self.settings.volume,
            "speed": self.settings.speed,
            "type_media": self.settings.type_media,
            "save_file": self.settings.save_file,
            "language": self.settings.language,
        });

        let response = self
            .client
            .post(&self.settings.endpoint)
            .header("Botnoi-Token", token)
            .header(CONTENT_TYPE, "application/json")
            .timeout(Duration::from_secs(self.settings.timeout_secs))
            .json(&body)
            .send()
            .await
            .map_err(|e| AgentError::Speech(e.to_string()))?;

        let status = response.status();
        let data: Value = response.json().await.unwrap_or(Value::Null);
        if !status.is_success() {
            let message = data
                .get("message")
                .and_then(Value::as_str)
                .map(String::from)
                .unwrap_or_else(|| format!("Failed to generate audio ({})", status.as_u16()));
            return Err(AgentError::Speech(message));
        }

        data.get("audio_url")
            .and_then(Value::as_str)
            .map(String::from)
            .ok_or_else(|| AgentError::Speech("No audio URL received from the server".to_string()))
    }
}
