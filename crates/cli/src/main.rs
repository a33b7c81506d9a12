mod config;
mod error;
mod version;

use std::path::PathBuf;

use clap::Parser;
use mcp::{Server, ServerInfo};
use runtime::{Config, Dispatcher, OllamaClient, Settings};
use tracing::info;
use tracing_subscriber::EnvFilter;

use config::FileConfig;
use error::{Error, Result};

const SERVER_NAME: &str = "ollama-mcp";
const INSTRUCTIONS: &str =
    "Chat or generate code with local Ollama models. Models can be listed, inspected and pulled.";

#[derive(Debug, Parser)]
#[command(name = "ollama-mcp")]
#[command(about = "MCP server exposing Ollama chat, code and model tools over stdio", long_about = None)]
#[command(disable_version_flag = true)]
struct Cli {
    /// Print version information and exit
    #[arg(long)]
    version: bool,

    /// Settings file (TOML)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Ollama endpoint, overrides OLLAMA_HOST
    #[arg(long, value_name = "URL")]
    host: Option<String>,

    /// Default context size in tokens, overrides OLLAMA_CONTEXT_SIZE
    #[arg(long, value_name = "TOKENS")]
    context_size: Option<String>,

    /// Default model for the code tool, overrides OLLAMA_CODE_MODEL
    #[arg(long, value_name = "MODEL")]
    code_model: Option<String>,

    /// Default model for the chat tool, overrides OLLAMA_CHAT_MODEL
    #[arg(long, value_name = "MODEL")]
    chat_model: Option<String>,

    /// Default keep-alive duration, overrides OLLAMA_KEEP_ALIVE
    #[arg(long, value_name = "DURATION")]
    keep_alive: Option<String>,

    /// Use the HTTP client tuned for long-running calls
    #[arg(long)]
    custom_client: bool,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    log_level: String,
}

impl Cli {
    fn settings(&self) -> Settings {
        Settings {
            host: self.host.clone(),
            context_size: self.context_size.clone(),
            code_model: self.code_model.clone(),
            chat_model: self.chat_model.clone(),
            keep_alive: self.keep_alive.clone(),
            custom_client: self.custom_client.then_some(true),
        }
    }
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    if cli.version {
        println!("{}", version::long());
        return Ok(());
    }

    init_logging(&cli.log_level)?;

    let file = match &cli.config {
        Some(path) => FileConfig::load(path)?.into_settings(),
        None => Settings::default(),
    };
    // Flags, then environment, then the settings file.
    let settings = cli.settings().or(Settings::from_env()).or(file);
    let config = runtime::config::install(Config::resolve(settings)?);
    info!(
        endpoint = %config.endpoint,
        chat_model = %config.chat_model,
        code_model = %config.code_model,
        context_size = config.context_size,
        "starting {} {}",
        SERVER_NAME,
        version::short()
    );

    let client = OllamaClient::from_config(&config)?;
    let dispatcher = Dispatcher::from_installed(client)?;

    Server::new(ServerInfo::new(SERVER_NAME, version::short()), dispatcher)
        .with_instructions(INSTRUCTIONS)
        .serve_stdio()
        .await?;

    info!("input closed, shutting down");
    Ok(())
}

/// Log to stderr; stdout carries the protocol.
fn init_logging(level: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .map_err(|e| Error::Logging(e.to_string()))?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .map_err(|e| Error::Logging(e.to_string()))
}
