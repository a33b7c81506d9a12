//! Inference backend abstraction.
//!
//! The dispatcher talks to the backend only through [`Backend`], so tests
//! can swap the HTTP client for an in-memory fake.

mod errors;
mod ollama;
mod types;

pub use errors::ClientError;
pub use ollama::OllamaClient;
pub use types::{
    ChatRequest, ChatResponse, ListResponse, Message, ModelSummary, OptionValue, Options,
    ProgressResponse, PullRequest, ResponseMessage, Role, ShowResponse,
};

use std::future::Future;

/// Trait for inference backends.
///
/// Streaming callbacks are invoked on the calling task, in the order the
/// backend produced the objects, and all of them before the returned future
/// resolves.
pub trait Backend: Send + Sync {
    /// Run a chat completion, handing every response object to `on_chunk`.
    fn chat<F>(
        &self,
        request: &ChatRequest,
        on_chunk: F,
    ) -> impl Future<Output = Result<(), ClientError>> + Send
    where
        F: FnMut(ChatResponse) + Send;

    /// List the models available locally.
    fn list(&self) -> impl Future<Output = Result<ListResponse, ClientError>> + Send;

    /// Describe a single model.
    fn show(&self, name: &str) -> impl Future<Output = Result<ShowResponse, ClientError>> + Send;

    /// Pull a model, handing every progress update to `on_progress`.
    fn pull<F>(
        &self,
        request: &PullRequest,
        on_progress: F,
    ) -> impl Future<Output = Result<(), ClientError>> + Send
    where
        F: FnMut(ProgressResponse) + Send;
}
