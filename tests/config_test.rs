use agentry::agents::{LlmEngine, MemoryBackend};
use agentry::cli::Cli;
use agentry::config::Settings;
use agentry::domain::HttpMethod;
use clap::Parser;
use serde_json::json;
use std::fs;
use tempfile::TempDir;

const AGENTRY_TOML: &str = r#"
[relay]
url = "http://localhost:8787/llm-proxy"
connect_timeout_secs = 5

[orchestrator]
stream_timeout_secs = 30

[providers.claude]
model = "claude-3-5-sonnet-20240620"
max_tokens = 1024

[memory]
backend = "file"
file_path = "data/history"
max_turns = 10

[[tools]]
id = "weather"
name = "Weather"
method = "GET"
endpoint = "https://inline.example.com/weather"

[[agents]]
id = "guide"
name = "Guide"
llm_engine = "claude"
character = "A travel guide"
enabled_tools = ["weather"]
"#;

#[test]
fn test_load_external_configs() -> anyhow::Result<()> {
    // Create a temporary directory
    let temp_dir = TempDir::new()?;
    let root = temp_dir.path();

    fs::create_dir_all(root.join("config/tools"))?;
    fs::create_dir_all(root.join("config/agents"))?;
    fs::write(root.join("agentry.toml"), AGENTRY_TOML)?;

    // Replaces the inline tool with the same id
    let tool_json = json!({
        "id": "weather",
        "name": "Weather",
        "description": "Current weather for a city",
        "method": "GET",
        "endpoint": "https://api.example.com/weather",
        "headers": { "X-Api-Key": "abc" },
        "input": {
            "description": "City to look up",
            "schema": {
                "type": "object",
                "properties": { "city": { "type": "string" } },
                "required": ["city"]
            }
        }
    });
    fs::write(root.join("config/tools/weather.json"), tool_json.to_string())?;

    let tool_yaml = r#"
id: translate
name: Translate
method: post
endpoint: https://api.example.com/translate
body: '{"text": "{{text}}", "to": "{{language}}"}'
"#;
    fs::write(root.join("config/tools/translate.yaml"), tool_yaml)?;

    let agent_yaml = r#"
id: translator
name: Translator
llm_engine: gemini
character: A careful translator
enabled_tools:
  - translate
faqs:
  - question: Which languages?
    answer: Thai and English.
"#;
    fs::write(root.join("config/agents/translator.yaml"), agent_yaml)?;

    // Ignored: unknown extension
    fs::write(root.join("config/agents/notes.txt"), "not an agent")?;

    // Load settings
    let settings = Settings::from_root(root)?;

    assert_eq!(settings.relay.url, "http://localhost:8787/llm-proxy");
    assert_eq!(settings.relay.connect_timeout_secs, 5);
    assert_eq!(settings.orchestrator.stream_timeout_secs, 30);
    assert_eq!(settings.orchestrator.tool_timeout_secs, 10);
    assert_eq!(settings.providers.claude.model, "claude-3-5-sonnet-20240620");
    assert_eq!(settings.providers.claude.max_tokens, Some(1024));
    assert_eq!(settings.providers.openai.model, "gpt-4o-mini");
    assert_eq!(settings.memory.backend, MemoryBackend::File);
    assert_eq!(settings.memory.max_turns, 10);

    // Verify tools
    assert_eq!(settings.tools.len(), 2);
    let weather = settings.tools.iter().find(|t| t.id == "weather").unwrap();
    assert_eq!(weather.endpoint, "https://api.example.com/weather");
    assert_eq!(weather.input_schema()?["required"], json!(["city"]));
    assert_eq!(weather.header_map()?["X-Api-Key"], "abc");
    let translate = settings.tools.iter().find(|t| t.id == "translate").unwrap();
    assert_eq!(translate.method, HttpMethod::Post);
    assert!(translate.body.as_deref().unwrap().contains("{{language}}"));

    // Verify agents
    assert_eq!(settings.agents.len(), 2);
    assert_eq!(settings.agents[0].llm_engine, LlmEngine::Claude);
    let translator = settings.agents.iter().find(|a| a.id == "translator").unwrap();
    assert_eq!(translator.llm_engine, LlmEngine::Gemini);
    assert_eq!(translator.faqs[0].answer, "Thai and English.");

    Ok(())
}

#[test]
fn test_missing_config_uses_defaults() -> anyhow::Result<()> {
    let temp_dir = TempDir::new()?;

    let settings = Settings::from_root(temp_dir.path())?;

    assert!(settings.agents.is_empty());
    assert!(settings.tools.is_empty());
    assert_eq!(settings.orchestrator.stream_timeout_secs, 60);
    assert_eq!(settings.memory.backend, MemoryBackend::InMemory);
    assert!(!settings.voice.enabled);
    assert_eq!(settings.voice.language, "th");
    Ok(())
}

#[test]
fn test_unknown_tool_reference_is_rejected() -> anyhow::Result<()> {
    let temp_dir = TempDir::new()?;
    let root = temp_dir.path();
    fs::create_dir_all(root.join("config/agents"))?;
    fs::write(
        root.join("config/agents/broken.json"),
        r#"{"id": "broken", "name": "Broken", "enabled_tools": ["nope"]}"#,
    )?;

    let err = Settings::from_root(root).unwrap_err().to_string();
    assert!(err.contains("Configuration validation failed"));
    assert!(err.contains("unknown tool 'nope'"));
    Ok(())
}

#[test]
fn test_cli_overrides() -> anyhow::Result<()> {
    let temp_dir = TempDir::new()?;
    let path = temp_dir.path().join("custom.toml");
    fs::write(&path, AGENTRY_TOML)?;

    let cli = Cli::parse_from([
        "agentry",
        "--config",
        path.to_str().unwrap(),
        "--relay-url",
        "http://relay.test/llm",
        "--speak",
        "agents",
    ]);
    let settings = Settings::new_with_cli(&cli)?;

    assert_eq!(settings.relay.url, "http://relay.test/llm");
    assert!(settings.voice.enabled);
    assert_eq!(settings.agents[0].name, "Guide");
    Ok(())
}
