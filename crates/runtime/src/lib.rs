//! Ollama tool runtime: tool dispatch and request translation.
//!
//! This crate turns typed tool calls into calls against an Ollama server
//! and shapes the results back into each tool's output record.
//!
//! # Overview
//!
//! - **Config**: an immutable snapshot of endpoint, default models, context
//!   size and keep-alive, resolved once from [`Settings`].
//! - **Dispatcher**: one entry point per tool. Validates input, builds the
//!   backend request, bounds the call with the tool's timeout and the
//!   caller's cancellation, then normalizes the response.
//! - **Backend**: a trait over the Ollama HTTP API, implemented by
//!   [`OllamaClient`].
//!
//! `Dispatcher` implements [`mcp::ToolHandler`], so it can be served
//! directly by [`mcp::Server`].
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use runtime::{ChatInput, Config, Dispatcher, OllamaClient};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Arc::new(Config::from_env()?);
//! let client = OllamaClient::from_config(&config)?;
//! let dispatcher = Dispatcher::new(config, client);
//!
//! let input = ChatInput {
//!     message: "Hello!".into(),
//!     ..ChatInput::default()
//! };
//! let output = dispatcher.chat(input, &CancellationToken::new()).await?;
//! println!("{}", output.response);
//! # Ok(())
//! # }
//! ```

pub mod backend;
pub mod config;
mod dispatch;
mod error;
mod host;
pub mod normalize;
pub mod request;
pub mod tools;
pub mod validate;

pub use backend::{Backend, ClientError, OllamaClient};
pub use config::{Config, HttpProfile, Settings};
pub use dispatch::{Dispatcher, ToolInput, ToolName, ToolOutput};
pub use error::{Error, Result};
pub use request::Family;
pub use tools::{
    ChatInput, ChatOutput, CodeInput, CodeOutput, ListModelsInput, ListModelsOutput,
    ModelDescriptor, ModelInfoInput, ModelInfoOutput, PullModelInput, PullModelOutput, PullStatus,
};
