//! Settings file loading.
//!
//! The file is optional and uses the same knobs as the environment:
//!
//! ```toml
//! host = "http://gpu-box:11434"
//! context_size = 16000
//! code_model = "qwen3-coder:30b"
//! chat_model = "gpt-oss:20b"
//! keep_alive = "5m"
//! custom_client = true
//! ```

use runtime::Settings;
use serde::Deserialize;
use std::path::Path;

/// Contents of a settings file.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub host: Option<String>,
    pub context_size: Option<i64>,
    pub code_model: Option<String>,
    pub chat_model: Option<String>,
    pub keep_alive: Option<String>,
    pub custom_client: Option<bool>,
}

impl FileConfig {
    /// Load a settings file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::parse(&content)
    }

    /// Parse settings from a TOML string.
    pub fn parse(toml: &str) -> Result<Self, ConfigError> {
        toml::from_str(toml).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Raw settings, validated later by the resolver like any other source.
    pub fn into_settings(self) -> Settings {
        Settings {
            host: self.host,
            context_size: self.context_size.map(|n| n.to_string()),
            code_model: self.code_model,
            chat_model: self.chat_model,
            keep_alive: self.keep_alive,
            custom_client: self.custom_client,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(String),
}
