//! Tool schemas and definitions.

mod types;

pub use types::{
    ChatInput, ChatOutput, CodeInput, CodeOutput, ListModelsInput, ListModelsOutput,
    ModelDescriptor, ModelInfoInput, ModelInfoOutput, PullModelInput, PullModelOutput, PullStatus,
};

use mcp::Tool;
use schemars::{JsonSchema, schema_for};
use serde_json::Value;

use crate::config::Config;
use crate::dispatch::ToolName;

/// Definitions of every tool, as advertised by `tools/list`.
///
/// The chat and code descriptions name the configured default model.
pub fn definitions(config: &Config) -> Vec<Tool> {
    ToolName::ALL
        .into_iter()
        .map(|tool| match tool {
            ToolName::Code => {
                define::<CodeInput, CodeOutput>(tool, format!("code with {}", config.code_model))
            }
            ToolName::Chat => {
                define::<ChatInput, ChatOutput>(tool, format!("chat with {}", config.chat_model))
            }
            ToolName::ListModels => {
                define::<ListModelsInput, ListModelsOutput>(tool, "list available Ollama models")
            }
            ToolName::ModelInfo => define::<ModelInfoInput, ModelInfoOutput>(
                tool,
                "get information about a specific Ollama model",
            ),
            ToolName::PullModel => {
                define::<PullModelInput, PullModelOutput>(tool, "pull a model from the Ollama library")
            }
        })
        .collect()
}

fn define<I: JsonSchema, O: JsonSchema>(tool: ToolName, description: impl Into<String>) -> Tool {
    Tool {
        name: tool.to_string(),
        description: Some(description.into()),
        input_schema: Value::from(schema_for!(I)),
        output_schema: Some(Value::from(schema_for!(O))),
    }
}
