use agentry::adapters::secrets::create_secrets_store;
use agentry::agents::{ChatHandler, LlmEngine};
use agentry::cli::{Cli, Command, SchemaFormat};
use agentry::config::Settings;
use agentry::domain::openapi::export_tool;
use clap::Parser;
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let settings = Settings::new_with_cli(&cli)?;

    let secrets = create_secrets_store();
    settings.secrets.apply(&secrets).await;

    let handler = ChatHandler::from_settings(&settings, secrets).await?;

    match cli.command {
        Command::Chat { agent } => chat(&handler, &agent).await?,
        Command::Ask { agent, message, debug } => {
            let reply = handler.submit(&agent, &message, &mut print_chunk).await?;
            println!();
            if let Some(url) = &reply.audio_url {
                println!("audio: {}", url);
            }
            if debug {
                println!("{}", serde_json::to_string_pretty(&reply.outcome.debug)?);
            }
        }
        Command::Agents => {
            for agent in handler.catalog().agents().await {
                println!(
                    "{}\t{}\t{}\t{} tools",
                    agent.id,
                    agent.name,
                    agent.llm_engine,
                    agent.enabled_tools.len()
                );
            }
        }
        Command::Tools => {
            for tool in handler.catalog().tools().await {
                println!(
                    "{}\t{}\t{}\t{} {}",
                    tool.id,
                    tool.function_name(),
                    tool.name,
                    tool.method.as_str(),
                    tool.endpoint
                );
            }
        }
        Command::Schema { tool, format } => {
            let tool = handler
                .catalog()
                .find_tool(&tool)
                .await
                .ok_or_else(|| anyhow::anyhow!("Tool {} not found", tool))?;
            let document = match format {
                SchemaFormat::Openapi => export_tool(&tool)?,
                SchemaFormat::Openai => declaration(&handler, &tool, LlmEngine::OpenAI)?,
                SchemaFormat::Claude => declaration(&handler, &tool, LlmEngine::Claude)?,
                SchemaFormat::Gemini => declaration(&handler, &tool, LlmEngine::Gemini)?,
            };
            println!("{}", serde_json::to_string_pretty(&document)?);
        }
        Command::TestTool { tool, args } => {
            let execution = handler.test_tool(&tool, &args).await?;
            println!("{}", serde_json::to_string_pretty(&execution)?);
            if !execution.success {
                anyhow::bail!("Tool {} failed", execution.tool_name);
            }
        }
        Command::History { agent } => {
            for turn in handler.history(&agent).await? {
                println!("[{}] you: {}", turn.timestamp, turn.user_input);
                match (&turn.ai_response, &turn.error) {
                    (Some(response), _) => println!("[{}] agent: {}", turn.timestamp, response),
                    (None, Some(error)) => println!("[{}] failed: {}", turn.timestamp, error),
                    (None, None) => println!("[{}] (pending)", turn.timestamp),
                }
            }
        }
        Command::Clear { agent } => {
            handler.clear_history(&agent).await?;
            println!("History cleared");
        }
        Command::Speak { text } => {
            println!("{}", handler.speak(&text).await?);
        }
    }

    Ok(())
}

fn print_chunk(chunk: &str) {
    print!("{}", chunk);
    let _ = std::io::stdout().flush();
}

fn declaration(
    handler: &ChatHandler,
    tool: &agentry::domain::Tool,
    engine: LlmEngine,
) -> anyhow::Result<serde_json::Value> {
    handler
        .tools()
        .to_declaration(tool, engine)
        .ok_or_else(|| anyhow::anyhow!("Tool {} cannot be declared to {}", tool.name, engine))
}

async fn chat(handler: &ChatHandler, agent_key: &str) -> anyhow::Result<()> {
    let agent = handler
        .catalog()
        .find_agent(agent_key)
        .await
        .ok_or_else(|| anyhow::anyhow!("Agent {} not found", agent_key))?;

    info!(agent = %agent.name, engine = %agent.llm_engine, "Starting chat");
    if let Some(greeting) = &agent.greeting {
        println!("{}: {}", agent.name, greeting);
    }
    println!("Type /clear to reset the conversation, /exit to quit.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        match line.trim() {
            "" => continue,
            "/exit" | "/quit" => break,
            "/clear" => {
                handler.clear_history(&agent.id).await?;
                println!("History cleared");
            }
            input => {
                print!("{}: ", agent.name);
                match handler.submit(&agent.id, input, &mut print_chunk).await {
                    Ok(reply) => {
                        println!();
                        if let Some(url) = reply.audio_url {
                            println!("audio: {}", url);
                        }
                    }
                    Err(e) => println!("\nerror: {}", e),
                }
            }
        }
    }

    Ok(())
}
