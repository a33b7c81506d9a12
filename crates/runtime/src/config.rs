//! Configuration resolution.
//!
//! Raw knobs arrive as [`Settings`] (environment, flags, a settings file)
//! and are resolved once into an immutable [`Config`]. Nothing here fails
//! on bad numbers; only an unusable backend endpoint is an error.

use std::sync::{Arc, OnceLock};

use reqwest::Url;
use tracing::warn;

use crate::request::Family;
use crate::{Error, Result};

pub const DEFAULT_CONTEXT_SIZE: i64 = 32000;
pub const DEFAULT_CODE_MODEL: &str = "qwen3-coder:30b";
pub const DEFAULT_CHAT_MODEL: &str = "gpt-oss:20b";
pub const DEFAULT_KEEP_ALIVE: &str = "1m";

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 11434;

pub const ENV_HOST: &str = "OLLAMA_HOST";
pub const ENV_CONTEXT_SIZE: &str = "OLLAMA_CONTEXT_SIZE";
pub const ENV_CODE_MODEL: &str = "OLLAMA_CODE_MODEL";
pub const ENV_CHAT_MODEL: &str = "OLLAMA_CHAT_MODEL";
pub const ENV_KEEP_ALIVE: &str = "OLLAMA_KEEP_ALIVE";
pub const ENV_CUSTOM_CLIENT: &str = "OLLAMA_CUSTOM_CLIENT";

/// Unresolved configuration knobs. Empty strings count as unset.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Settings {
    pub host: Option<String>,
    pub context_size: Option<String>,
    pub code_model: Option<String>,
    pub chat_model: Option<String>,
    pub keep_alive: Option<String>,
    pub custom_client: Option<bool>,
}

impl Settings {
    /// Read settings from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read settings through an arbitrary key lookup, using the same keys as
    /// [`Settings::from_env`].
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());
        Self {
            host: get(ENV_HOST),
            context_size: get(ENV_CONTEXT_SIZE),
            code_model: get(ENV_CODE_MODEL),
            chat_model: get(ENV_CHAT_MODEL),
            keep_alive: get(ENV_KEEP_ALIVE),
            custom_client: get(ENV_CUSTOM_CLIENT).map(|v| v == "true"),
        }
    }

    /// Fill every unset knob from `fallback`.
    pub fn or(self, fallback: Settings) -> Self {
        fn pick(primary: Option<String>, fallback: Option<String>) -> Option<String> {
            primary.filter(|v| !v.is_empty()).or(fallback)
        }

        Self {
            host: pick(self.host, fallback.host),
            context_size: pick(self.context_size, fallback.context_size),
            code_model: pick(self.code_model, fallback.code_model),
            chat_model: pick(self.chat_model, fallback.chat_model),
            keep_alive: pick(self.keep_alive, fallback.keep_alive),
            custom_client: self.custom_client.or(fallback.custom_client),
        }
    }
}

/// Outbound HTTP client profile.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum HttpProfile {
    /// Library defaults.
    #[default]
    Standard,
    /// Bounded idle pool and generous timeouts for long inference calls.
    LongRunning,
}

/// Resolved, immutable configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub endpoint: Url,
    pub http_profile: HttpProfile,
    pub context_size: i64,
    pub code_model: String,
    pub chat_model: String,
    pub keep_alive: String,
}

impl Config {
    /// Resolve settings into a configuration, applying defaults.
    ///
    /// Fails only when the endpoint cannot be parsed.
    pub fn resolve(settings: Settings) -> Result<Self> {
        let endpoint = parse_endpoint(settings.host.as_deref().unwrap_or_default())?;

        let http_profile = if settings.custom_client.unwrap_or(false) {
            HttpProfile::LongRunning
        } else {
            HttpProfile::Standard
        };

        Ok(Self {
            endpoint,
            http_profile,
            context_size: parse_context_size(settings.context_size.as_deref()),
            code_model: non_empty_or(settings.code_model, DEFAULT_CODE_MODEL),
            chat_model: non_empty_or(settings.chat_model, DEFAULT_CHAT_MODEL),
            keep_alive: non_empty_or(settings.keep_alive, DEFAULT_KEEP_ALIVE),
        })
    }

    /// Resolve from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::resolve(Settings::from_env())
    }

    /// Default model for a tool family.
    pub fn model_for(&self, family: Family) -> &str {
        match family {
            Family::Code => &self.code_model,
            Family::Chat => &self.chat_model,
        }
    }
}

fn non_empty_or(value: Option<String>, default: &str) -> String {
    value
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}

/// Parse a context size, falling back to the default for anything that is
/// not a positive integer.
pub fn parse_context_size(raw: Option<&str>) -> i64 {
    raw.and_then(|s| s.trim().parse::<i64>().ok())
        .filter(|n| *n > 0)
        .unwrap_or(DEFAULT_CONTEXT_SIZE)
}

/// Parse a backend endpoint using the `OLLAMA_HOST` conventions.
///
/// `host`, `host:port`, `scheme://host[:port][/path]` are accepted. Without
/// a scheme the port defaults to 11434; with an explicit `http`/`https`
/// scheme it defaults to 80/443. An empty host means 127.0.0.1.
pub fn parse_endpoint(raw: &str) -> Result<Url> {
    let raw = match raw.trim().trim_end_matches('/') {
        "" => DEFAULT_HOST,
        raw => raw,
    };

    let (scheme, rest, default_port) = match raw.split_once("://") {
        Some(("http", rest)) => ("http", rest, 80),
        Some(("https", rest)) => ("https", rest, 443),
        Some((other, _)) => {
            return Err(Error::ConfigurationUnavailable(format!(
                "unsupported scheme '{other}' in backend endpoint '{raw}'"
            )));
        }
        None => ("http", raw, DEFAULT_PORT),
    };

    let (authority, path) = match rest.find('/') {
        Some(idx) => rest.split_at(idx),
        None => (rest, ""),
    };

    let (host, port) = split_host_port(authority);
    let host = if host.is_empty() { DEFAULT_HOST } else { host };
    let port = match port {
        Some(p) => p.parse::<u16>().map_err(|_| {
            Error::ConfigurationUnavailable(format!("invalid port '{p}' in backend endpoint '{raw}'"))
        })?,
        None => default_port,
    };

    Url::parse(&format!("{scheme}://{host}:{port}{path}")).map_err(|e| {
        Error::ConfigurationUnavailable(format!("invalid backend endpoint '{raw}': {e}"))
    })
}

fn split_host_port(authority: &str) -> (&str, Option<&str>) {
    if authority.starts_with('[') {
        // [v6addr]:port
        return match authority.rsplit_once("]:") {
            Some((host, port)) => (&authority[..host.len() + 1], Some(port)),
            None => (authority, None),
        };
    }
    match authority.rsplit_once(':') {
        Some((host, port)) if !host.contains(':') => (host, Some(port)),
        _ => (authority, None),
    }
}

static INSTALLED: OnceLock<Arc<Config>> = OnceLock::new();

/// Publish the process-wide configuration.
///
/// The first call wins; later calls leave the published value untouched and
/// return it.
pub fn install(config: Config) -> Arc<Config> {
    install_into(&INSTALLED, config)
}

/// The process-wide configuration, if bootstrap installed one.
pub fn installed() -> Result<Arc<Config>> {
    installed_from(&INSTALLED)
}

fn install_into(cell: &OnceLock<Arc<Config>>, config: Config) -> Arc<Config> {
    let mut published = false;
    let installed = cell.get_or_init(|| {
        published = true;
        Arc::new(config)
    });
    if !published {
        warn!("configuration already installed, ignoring replacement");
    }
    Arc::clone(installed)
}

fn installed_from(cell: &OnceLock<Arc<Config>>) -> Result<Arc<Config>> {
    cell.get().cloned().ok_or_else(|| {
        Error::ConfigurationUnavailable("configuration has not been initialized".to_string())
    })
}
