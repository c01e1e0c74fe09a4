//! # Agentry - multi-provider LLM orchestration and tool calling
//!
//! Agentry lets user-defined agents talk to OpenAI, Claude or Gemini models
//! through a relay, declares the agent's HTTP tools to the model in each
//! vendor's format, executes at most one requested tool call per turn and
//! streams the model's reply back to the caller.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use agentry::adapters::secrets::create_secrets_store;
//! use agentry::agents::ChatHandler;
//! use agentry::config::Settings;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::new()?;
//!     let secrets = create_secrets_store();
//!     settings.secrets.apply(&secrets).await;
//!
//!     let handler = ChatHandler::from_settings(&settings, secrets).await?;
//!     let reply = handler
//!         .submit("Guide", "What is the weather in Bangkok?", &mut |chunk: &str| print!("{}", chunk))
//!         .await?;
//!     println!("\n{}", reply.outcome.response);
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! - **Domain**: Agents, tools and the tool execution port
//! - **Agents**: Provider adapters, tool registry, orchestrator, history
//! - **Adapters**: HTTP tool execution, voice synthesis, secrets
//! - **Config**: Configuration loading and validation

pub mod adapters;
pub mod agents;
pub mod cli;
pub mod config;
pub mod domain;
