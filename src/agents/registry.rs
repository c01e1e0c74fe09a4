//! Tool registry: declarations per engine and execution

use serde_json::Value;
use std::sync::Arc;

use super::config::LlmEngine;
use super::llm::ProviderRegistry;
use crate::domain::{Tool, ToolExecution, ToolPort};

/// Bridges user-authored tools to provider declarations and HTTP execution
#[derive(Clone)]
pub struct ToolRegistry {
    providers: Arc<ProviderRegistry>,
    executor: Arc<dyn ToolPort>,
}

impl ToolRegistry {
    pub fn new(providers: Arc<ProviderRegistry>, executor: Arc<dyn ToolPort>) -> Self {
        Self { providers, executor }
    }

    pub fn providers(&self) -> &Arc<ProviderRegistry> {
        &self.providers
    }

    /// Vendor declaration of a tool for one engine
    pub fn to_declaration(&self, tool: &Tool, engine: LlmEngine) -> Option<Value> {
        let provider = self.providers.get(engine)?;
        provider.format_tool(tool)
    }

    /// Declarations for every declarable tool, in order
    pub fn declarations(&self, tools: &[Tool], engine: LlmEngine) -> Vec<Value> {
        match self.providers.get(engine) {
            Some(provider) => provider.format_tools(tools),
            None => {
                tracing::warn!(engine = %engine, "No provider registered");
                Vec::new()
            }
        }
    }

    /// Find the tool a function call refers to by its sanitized name
    pub fn find<'a>(tools: &'a [Tool], function_name: &str) -> Option<&'a Tool> {
        tools.iter().find(|tool| tool.function_name() == function_name)
    }

    pub async fn execute(&self, tool: &Tool, parameters: &Value) -> ToolExecution {
        tracing::info!(tool = %tool.name, method = %tool.method, "Executing tool");
        let result = self.executor.execute_tool(tool, parameters).await;
        if result.success {
            tracing::debug!(tool = %tool.name, "Tool succeeded");
        }
        result
    }
}
