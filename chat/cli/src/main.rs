//! Weather Chat - Terminal client for the weather agent
//!
//! Chat with the hosted weather agent from a terminal, with any number of
//! in-memory threads for the lifetime of the process.
//!
//! # Usage
//!
//! ```bash
//! # Interactive session (default)
//! weather-chat
//!
//! # One-shot question
//! weather-chat ask "Will it rain in Bergen tomorrow?"
//!
//! # Show the resolved configuration
//! weather-chat config
//!
//! # Custom endpoint and config file
//! weather-chat --endpoint http://localhost:4111/api/agents/weatherAgent/stream \
//!     --config ./weather-chat.toml
//!
//! # Verbose logging (written to stderr)
//! RUST_LOG=debug weather-chat
//! ```

mod commands;
mod session;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use weather_chat_core::{
    default_config_path, load_config_from_path, ChatConfig, ConfigOverrides, ConversationStore,
    HttpTransport, WeatherRequestBuilder,
};

use session::ChatSession;

/// Weather Chat - terminal client for the weather agent
#[derive(Parser, Debug)]
#[command(name = "weather-chat")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Configuration file path
    #[arg(short = 'c', long, env = "WEATHER_CHAT_CONFIG", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Agent streaming endpoint URL
    #[arg(short = 'e', long, value_name = "URL")]
    endpoint: Option<String>,

    /// Request timeout in seconds (0 = no timeout)
    #[arg(short = 't', long, value_name = "SECS")]
    timeout_secs: Option<u64>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short = 'l', long, env = "WEATHER_CHAT_LOG_LEVEL", default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Option<Mode>,
}

/// What to do
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    /// Interactive session (default)
    Chat,
    /// Send one message and print the reply
    Ask {
        /// The message
        #[arg(required = true, num_args = 1..)]
        message: Vec<String>,
    },
    /// Print the resolved configuration
    Config,
}

/// Initialize logging with the specified level
///
/// Logs go to stderr so stdout carries only the conversation.
fn init_logging(level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(format!(
            "weather_chat={level},weather_chat_core={level}"
        ))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .init();
}

/// Load configuration and apply command-line overrides
fn resolve_config(args: &Args) -> Result<ChatConfig> {
    let path = args.config.clone().or_else(default_config_path);
    let mut config = load_config_from_path(path).context("Failed to load configuration")?;

    let mut overrides = ConfigOverrides::new();
    if let Some(ref url) = args.endpoint {
        overrides = overrides.with_endpoint_url(url.clone());
    }
    if let Some(secs) = args.timeout_secs {
        overrides = overrides.with_timeout_secs(secs);
    }
    overrides
        .apply(&mut config)
        .context("Invalid command-line override")?;

    Ok(config)
}

fn build_store(config: &ChatConfig) -> Result<ConversationStore<HttpTransport>> {
    let transport =
        HttpTransport::from_config(config).context("Failed to create HTTP transport")?;
    let builder = WeatherRequestBuilder::new(config.request.clone());
    Ok(ConversationStore::new(
        Arc::new(transport),
        Arc::new(builder),
        config.store.clone(),
    ))
}

fn print_config(config: &ChatConfig) {
    let file = config
        .config_file_path
        .as_ref()
        .map_or_else(|| "(none)".to_string(), |p| p.display().to_string());
    let timeout = config
        .endpoint
        .timeout
        .map_or_else(|| "none".to_string(), |t| format!("{}s", t.as_secs()));

    println!("source:            {}", config.source());
    println!("config file:       {file}");
    println!("endpoint:          {}", config.endpoint.url);
    println!("timeout:           {timeout}");
    println!("playground header: {}", config.endpoint.playground_header);
    println!("run id:            {}", config.request.run_id);
    println!("resource id:       {}", config.request.resource_id);
    println!("thread id:         {}", config.request.thread_id);
    println!("max retries:       {}", config.request.max_retries);
    println!("max steps:         {}", config.request.max_steps);
    println!("temperature:       {}", config.request.temperature);
    println!("top p:             {}", config.request.top_p);
    println!("title max chars:   {}", config.store.title_max_chars);
    println!("default title:     {}", config.store.default_thread_title);
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args.log_level);

    let config = resolve_config(&args)?;
    info!(endpoint = %config.endpoint.url, source = %config.source(), "Configuration loaded");

    match args.command.clone().unwrap_or(Mode::Chat) {
        Mode::Config => print_config(&config),
        Mode::Chat => {
            let mut session = ChatSession::new(build_store(&config)?, tokio::io::stdout());
            session.run().await?;
        }
        Mode::Ask { message } => {
            let mut session = ChatSession::new(build_store(&config)?, tokio::io::stdout());
            session.send(&message.join(" ")).await?;
            if let Some(error) = session.store().state().error() {
                anyhow::bail!("{error}");
            }
        }
    }

    Ok(())
}
