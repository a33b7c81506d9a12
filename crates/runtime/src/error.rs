use thiserror::Error;

use crate::dispatch::ToolName;

/// Errors surfaced by tool calls.
///
/// Every variant reaches the MCP caller as a failed tool result carrying
/// the display string.
#[derive(Debug, Error)]
pub enum Error {
    /// Caller-supplied data failed validation. The backend was not contacted.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Configuration or backend client missing or unusable.
    #[error("configuration unavailable: {0}")]
    ConfigurationUnavailable(String),

    /// The backend call failed, timed out, or was cancelled.
    #[error("{tool}: {message}")]
    Backend { tool: ToolName, message: String },
}

impl Error {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    pub(crate) fn backend(tool: ToolName, message: impl Into<String>) -> Self {
        Self::Backend {
            tool,
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
