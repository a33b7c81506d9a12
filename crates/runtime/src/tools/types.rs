//! Tool input and output records.
//!
//! Field docs double as the JSON Schema descriptions advertised to callers.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::backend::Options;

/// Input of the `chat` tool.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ChatInput {
    /// The message to send to the model.
    pub message: String,
    /// The Ollama model to use for chat (optional).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Maximum context size in tokens (optional).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_size: Option<i64>,
    /// Controls randomness, 0.0 to 2.0 (optional).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    /// Controls diversity via nucleus sampling, 0.0 to 1.0 (optional).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
    /// Controls diversity via top-k sampling (optional).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_k: Option<i64>,
    /// System prompt to use (optional).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
    /// Additional model options (optional).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Options>,
    /// Name of the tool being used; `code` selects the code model (optional).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,
    /// Duration to keep the model loaded in memory (optional).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keep_alive: Option<String>,
}

/// Input of the `code` tool.
///
/// Always runs against the configured code model; `model` is accepted but
/// ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CodeInput {
    /// The message to send to the model.
    pub message: String,
    /// Ignored; the configured code model is always used.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Maximum context size in tokens (optional).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_size: Option<i64>,
    /// Controls randomness, 0.0 to 2.0 (optional).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    /// Controls diversity via nucleus sampling, 0.0 to 1.0 (optional).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
    /// Controls diversity via top-k sampling (optional).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_k: Option<i64>,
    /// System prompt to use (optional).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
    /// Additional model options (optional).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Options>,
    /// Duration to keep the model loaded in memory (optional).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keep_alive: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ListModelsInput {}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ModelInfoInput {
    /// Name of the model to get information about.
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PullModelInput {
    /// Name of the model to pull.
    pub name: String,
    /// Allow insecure connections to the model library.
    #[serde(default)]
    pub insecure: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ChatOutput {
    /// The response from the model.
    pub response: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct CodeOutput {
    /// The response from the model.
    pub response: String,
}

/// A locally available model.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ModelDescriptor {
    /// Name of the model.
    pub name: String,
    /// Size of the model in bytes.
    pub size: i64,
    /// RFC 3339 timestamp of the last modification.
    pub modified_at: String,
    /// Digest of the model.
    pub digest: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ListModelsOutput {
    /// List of available models.
    pub models: Vec<ModelDescriptor>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ModelInfoOutput {
    /// Name of the model.
    pub name: String,
    /// License of the model.
    pub license: String,
    /// Modelfile content.
    pub modelfile: String,
    /// Model parameters.
    pub parameters: String,
    /// Model template.
    pub template: String,
    /// System prompt.
    pub system: String,
    /// RFC 3339 timestamp of the last modification.
    pub modified_at: String,
}

/// Outcome of a model pull.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum PullStatus {
    #[default]
    Success,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct PullModelOutput {
    /// Status of the pull operation.
    pub status: PullStatus,
    /// Message from the pull operation.
    pub message: String,
}
