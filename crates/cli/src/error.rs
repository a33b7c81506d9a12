//! CLI error types.

use thiserror::Error;

use crate::config::ConfigError;

/// CLI errors.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The settings file could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Configuration could not be resolved.
    #[error(transparent)]
    Runtime(#[from] runtime::Error),

    /// The backend client could not be constructed.
    #[error("backend client: {0}")]
    Client(#[from] runtime::ClientError),

    /// The MCP transport failed.
    #[error(transparent)]
    Transport(#[from] mcp::Error),

    /// The log filter could not be installed.
    #[error("logging: {0}")]
    Logging(String),
}

pub type Result<T> = std::result::Result<T, Error>;
