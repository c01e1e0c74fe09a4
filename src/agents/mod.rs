//! Chat orchestration core
//!
//! Takes user input for an agent, sends it with the agent's tool
//! declarations to the agent's LLM engine, executes at most one requested
//! tool call, and returns the model's final reply.
//!
//! ## Architecture
//!
//! - `domain/` - Turn, message, function call and trace types
//! - `llm/` - Vendor adapters, relay client and stream decoding
//! - `registry` - Tool declarations and execution
//! - `core/` - System prompt and the two-pass turn driver
//! - `memory/` - Conversation history and the agent/tool catalog
//! - `handler` - Submission entry point with per-agent turn serialization

pub mod config;
pub mod core;
pub mod domain;
pub mod error;
pub mod handler;
pub mod llm;
pub mod memory;
pub mod registry;

pub use config::*;
pub use domain::*;
pub use error::*;
pub use handler::{ChatHandler, TurnReply};
pub use registry::ToolRegistry;
