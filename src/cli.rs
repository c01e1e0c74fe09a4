use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Agentry - chat with tool-calling agents across OpenAI, Claude and Gemini
#[derive(Parser, Debug, Clone)]
#[command(name = "agentry", version, about, long_about = None)]
pub struct Cli {
    /// Path to the configuration file
    #[arg(short, long, env = "AGENTRY_CONFIG", default_value = "agentry.toml")]
    pub config: PathBuf,

    /// LLM relay endpoint
    #[arg(long, env = "AGENTRY_RELAY_URL")]
    pub relay_url: Option<String>,

    /// Speak every reply through the voice service
    #[arg(long, env = "AGENTRY_SPEAK", num_args = 0..=1, require_equals = true, default_missing_value = "true")]
    pub speak: Option<bool>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Interactive chat with an agent
    Chat {
        /// Agent id or name
        agent: String,
    },
    /// Send one message and print the reply
    Ask {
        /// Agent id or name
        agent: String,
        message: String,
        /// Print the debug trace as JSON after the reply
        #[arg(long)]
        debug: bool,
    },
    /// List configured agents
    Agents,
    /// List configured tools
    Tools,
    /// Print a tool's declaration
    Schema {
        /// Tool id, name or function name
        tool: String,
        #[arg(long, value_enum, default_value_t = SchemaFormat::Openapi)]
        format: SchemaFormat,
    },
    /// Call a tool's endpoint with sample arguments and print the result
    TestTool {
        /// Tool id, name or function name
        tool: String,
        /// Arguments as JSON, e.g. '{"params":{"city":"Bangkok"}}'
        #[arg(long, default_value = "{}")]
        args: String,
    },
    /// Print an agent's conversation history
    History { agent: String },
    /// Delete an agent's conversation history
    Clear { agent: String },
    /// Synthesize speech and print the audio URL
    Speak { text: String },
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaFormat {
    Openapi,
    Openai,
    Claude,
    Gemini,
}
