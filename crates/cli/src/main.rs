//! Radar Assistant CLI
//!
//! Main entry point for the `radar` command-line tool. Runs the semantic
//! index service over live aviation telemetry and offers one-shot
//! queries against the persisted snapshot.

mod commands;
mod server;

use clap::{Parser, Subcommand};
use commands::{AskCommand, ChatCommand, RebuildCommand, ServeCommand, StatusCommand};
use radar_core::{config::AppConfig, logging, AppResult};
use std::path::PathBuf;

/// Radar Assistant - semantic search and chat over aviation telemetry
#[derive(Parser, Debug)]
#[command(name = "radar")]
#[command(about = "Semantic search and chat over aviation telemetry", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to workspace directory (default: current directory)
    #[arg(short, long, global = true, env = "RADAR_WORKSPACE")]
    workspace: Option<PathBuf>,

    /// Path to config file
    #[arg(short, long, global = true, env = "RADAR_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, env = "RUST_LOG")]
    log_level: Option<String>,

    /// Enable verbose output (sets log level to debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    no_color: bool,

    /// Ollama base URL for embeddings and chat
    #[arg(long, global = true, env = "RADAR_OLLAMA_URL")]
    ollama_url: Option<String>,

    /// Chat model identifier
    #[arg(short, long, global = true, env = "RADAR_CHAT_MODEL")]
    model: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the rebuild loop and the HTTP query interface
    Serve(ServeCommand),

    /// Run one rebuild cycle and persist the snapshot
    Rebuild(RebuildCommand),

    /// Search the persisted snapshot
    Ask(AskCommand),

    /// Ask the chat model, grounded in the persisted snapshot
    Chat(ChatCommand),

    /// Show snapshot and source file status
    Status(StatusCommand),
}

#[tokio::main]
async fn main() -> AppResult<()> {
    // Parse command-line arguments first (needed for logging config)
    let cli = Cli::parse();

    // Defaults, config file and environment
    let config = AppConfig::load_from(cli.workspace, cli.config)?;

    // Apply CLI overrides
    let config = config.with_overrides(
        cli.ollama_url,
        cli.model,
        cli.log_level,
        cli.verbose,
        cli.no_color,
    );

    logging::init_logging(
        config.log_level.as_deref(),
        config.no_color,
        config.log_format(),
    )?;

    config.validate()?;

    tracing::debug!("Workspace: {:?}", config.workspace);
    tracing::debug!(
        "Embedding: {} ({}) at {}",
        config.embedding.provider,
        config.embedding.model,
        config.embedding.endpoint
    );
    tracing::debug!("Chat model: {}", config.chat.model);

    config.ensure_radar_dir()?;

    let command_name = match &cli.command {
        Commands::Serve(_) => "serve",
        Commands::Rebuild(_) => "rebuild",
        Commands::Ask(_) => "ask",
        Commands::Chat(_) => "chat",
        Commands::Status(_) => "status",
    };
    let _span = tracing::info_span!("command", name = command_name).entered();

    let result = match cli.command {
        Commands::Serve(cmd) => cmd.execute(&config).await,
        Commands::Rebuild(cmd) => cmd.execute(&config).await,
        Commands::Ask(cmd) => cmd.execute(&config).await,
        Commands::Chat(cmd) => cmd.execute(&config).await,
        Commands::Status(cmd) => cmd.execute(&config).await,
    };

    match &result {
        Ok(_) => tracing::debug!("Command completed successfully"),
        Err(e) => tracing::error!("Command failed: {}", e),
    }

    result
}
