//! Chat turn orchestration
//!
//! A turn is driven by [`ChatOrchestrator`]: one provider pass, an optional
//! tool execution, and at most one follow-up pass carrying the tool result.

mod orchestrator;

pub use orchestrator::{ChatOrchestrator, TurnRequest, MAX_PROVIDER_PASSES};

use serde::Serialize;
use tera::{Context, Tera};

use crate::agents::domain::{ConversationTurn, Message};
use crate::domain::{Agent, Tool};

/// Standing instructions about function calling appended to every agent
pub const TOOL_INSTRUCTIONS: &str = "You have access to external tools/APIs through function calling. \
When a user's request requires using these tools:
1. Analyze if any available function can help fulfill the request
2. Call the appropriate function with the required parameters
3. Use the function's response to provide a natural, conversational response
4. If no function is needed, respond directly to the user's request";

const SYSTEM_PROMPT_TEMPLATE: &str = "{{ character }}\n{{ actions }}\n\n{{ instructions }}\
{% if faqs %}\n\nFrequently asked questions. Answer these consistently:\n\
{% for faq in faqs %}Q: {{ faq.question }}\nA: {{ faq.answer }}\n{% endfor %}{% endif %}\
{% if tools %}\n\nAvailable tools:\n\
{% for tool in tools %}{{ loop.index }}. {{ tool.function }} ({{ tool.name }}): {{ tool.description }}\n{% endfor %}{% endif %}";

#[derive(Serialize)]
struct ToolSummary<'a> {
    function: String,
    name: &'a str,
    description: &'a str,
}

/// Render the system prompt for an agent and its enabled tools
///
/// Falls back to character, actions and the tool instructions if the
/// template cannot be rendered.
pub fn render_system_prompt(agent: &Agent, tools: &[Tool]) -> String {
    let summaries: Vec<ToolSummary<'_>> = tools
        .iter()
        .map(|tool| ToolSummary {
            function: tool.function_name(),
            name: &tool.name,
            description: &tool.description,
        })
        .collect();

    let mut context = Context::new();
    context.insert("character", &agent.character);
    context.insert("actions", &agent.actions);
    context.insert("instructions", TOOL_INSTRUCTIONS);
    context.insert("faqs", &agent.faqs);
    context.insert("tools", &summaries);

    match Tera::one_off(SYSTEM_PROMPT_TEMPLATE, &context, false) {
        Ok(rendered) => rendered.trim_end().to_string(),
        Err(e) => {
            tracing::warn!("Failed to render system prompt template: {}", e);
            format!("{}\n{}\n\n{}", agent.character, agent.actions, TOOL_INSTRUCTIONS)
        }
    }
}

/// System prompt, then prior resolved turns as user/assistant pairs, then the new input
pub fn build_messages(system_prompt: &str, history: &[ConversationTurn], input: &str) -> Vec<Message> {
    let mut messages = vec![Message::system(system_prompt)];
    for turn in history {
        if let Some(response) = &turn.ai_response {
            messages.push(Message::user(turn.user_input.clone()));
            messages.push(Message::assistant(response.clone()));
        }
    }
    messages.push(Message::user(input));
    messages
}
