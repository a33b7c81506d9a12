//! Translation of tool inputs into backend chat requests.

use crate::backend::{ChatRequest, Message, Options};
use crate::config::Config;
use crate::tools::{ChatInput, CodeInput};
use crate::validate::validate_model_name;
use crate::Result;

/// System prompt used by the `code` tool when the caller gives none.
pub const CODE_SYSTEM_PROMPT: &str =
    "You are a helpful coding assistant. Provide clear, concise, and well-commented code solutions.";

/// Which configured default model applies when no model is named.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Family {
    Chat,
    Code,
}

impl Family {
    /// Resolve a tool-name hint. Only `code` (any case) selects the code
    /// family; everything else, including no hint, is chat.
    pub fn from_hint(hint: Option<&str>) -> Self {
        match hint {
            Some(hint) if hint.eq_ignore_ascii_case("code") => Self::Code,
            _ => Self::Chat,
        }
    }
}

/// The explicit model if non-empty, else the family default.
pub fn resolve_model(explicit: Option<&str>, family: Family, config: &Config) -> String {
    match explicit {
        Some(model) if !model.is_empty() => model.to_string(),
        _ => config.model_for(family).to_string(),
    }
}

/// Build the backend request for a chat input.
///
/// Options are layered lowest to highest: configured context size, explicit
/// per-call overrides, then the caller's free-form options. The resolved
/// model name is validated here since it may come from configuration.
pub fn build_chat_request(input: &ChatInput, config: &Config) -> Result<ChatRequest> {
    let family = Family::from_hint(input.tool_name.as_deref());
    let model = resolve_model(input.model.as_deref(), family, config);
    validate_model_name(&model)?;

    let mut messages = Vec::with_capacity(2);
    if let Some(system) = input.system_prompt.as_deref().filter(|s| !s.is_empty()) {
        messages.push(Message::system(system));
    }
    messages.push(Message::user(&input.message));

    let keep_alive = input
        .keep_alive
        .as_deref()
        .filter(|k| !k.is_empty())
        .unwrap_or(config.keep_alive.as_str())
        .to_string();

    Ok(ChatRequest {
        model,
        messages,
        stream: false,
        options: build_options(input, config),
        keep_alive: Some(keep_alive),
    })
}

fn build_options(input: &ChatInput, config: &Config) -> Options {
    let mut options = Options::new();
    options.insert("num_ctx".into(), config.context_size.into());

    if let Some(context_size) = input.context_size {
        options.insert("num_ctx".into(), context_size.into());
    }
    if let Some(temperature) = input.temperature {
        options.insert("temperature".into(), temperature.into());
    }
    if let Some(top_p) = input.top_p {
        options.insert("top_p".into(), top_p.into());
    }
    if let Some(top_k) = input.top_k {
        options.insert("top_k".into(), top_k.into());
    }

    if let Some(extra) = &input.options {
        options.extend(extra.iter().map(|(k, v)| (k.clone(), v.clone())));
    }
    options
}

impl From<CodeInput> for ChatInput {
    /// A code call is a chat call pinned to the code family. Any explicit
    /// model is dropped.
    fn from(input: CodeInput) -> Self {
        let system_prompt = match input.system_prompt {
            Some(prompt) if !prompt.is_empty() => prompt,
            _ => CODE_SYSTEM_PROMPT.to_string(),
        };

        Self {
            message: input.message,
            model: None,
            context_size: input.context_size,
            temperature: input.temperature,
            top_p: input.top_p,
            top_k: input.top_k,
            system_prompt: Some(system_prompt),
            options: input.options,
            tool_name: Some("code".to_string()),
            keep_alive: input.keep_alive,
        }
    }
}
