//! SafeChat CLI
//!
//! Main entry point for the safechat command-line tool.
//! Provides commands for ingesting a knowledge base and running guarded
//! RAG queries through the moderation gateway.

mod commands;

use clap::{Parser, Subcommand};
use commands::{AskCommand, CleanCommand, IngestCommand, StatsCommand, ValidateCommand};
use safechat_core::{config::AppConfig, logging, AppResult};
use std::path::PathBuf;

/// SafeChat CLI - guarded RAG over a curated knowledge base
#[derive(Parser, Debug)]
#[command(name = "safechat")]
#[command(about = "Guarded RAG queries over a curated knowledge base", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to workspace directory (default: current directory)
    #[arg(short, long, global = true, env = "SAFECHAT_WORKSPACE")]
    workspace: Option<PathBuf>,

    /// Path to config file
    #[arg(short, long, global = true, env = "SAFECHAT_CONFIG")]
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

    /// Completion provider (e.g., ollama)
    #[arg(short, long, global = true, env = "SAFECHAT_PROVIDER")]
    provider: Option<String>,

    /// Completion model identifier
    #[arg(short, long, global = true, env = "SAFECHAT_MODEL")]
    model: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Ingest a knowledge base directory into the index
    Ingest(IngestCommand),

    /// Ask a question through the guarded pipeline
    Ask(AskCommand),

    /// Batch-run adversarial vectors through the pipeline
    Validate(ValidateCommand),

    /// Show knowledge index statistics
    Stats(StatsCommand),

    /// Reset the knowledge index
    Clean(CleanCommand),
}

#[tokio::main]
async fn main() -> AppResult<()> {
    // Parse command-line arguments first (needed for logging config)
    let cli = Cli::parse();

    // Load base configuration from environment
    let config = AppConfig::load()?;

    // Apply CLI overrides
    let config = config.with_overrides(
        cli.workspace,
        cli.config,
        cli.provider,
        cli.model,
        cli.log_level,
        cli.verbose,
        cli.no_color,
    );

    // Initialize logging with final configuration
    logging::init_logging(config.log_level.as_deref(), config.no_color)?;

    tracing::info!("SafeChat CLI starting");
    tracing::debug!("Workspace: {:?}", config.workspace);
    tracing::debug!("Provider: {}", config.provider);
    tracing::debug!("Model: {}", config.model);

    // Ensure .safechat directory exists
    config.ensure_safechat_dir()?;

    let command_name = match &cli.command {
        Commands::Ingest(_) => "ingest",
        Commands::Ask(_) => "ask",
        Commands::Validate(_) => "validate",
        Commands::Stats(_) => "stats",
        Commands::Clean(_) => "clean",
    };
    let _span = tracing::info_span!("command", name = command_name).entered();

    // Route to command handlers
    let result = match cli.command {
        Commands::Ingest(cmd) => cmd.execute(&config).await,
        Commands::Ask(cmd) => cmd.execute(&config).await,
        Commands::Validate(cmd) => cmd.execute(&config).await,
        Commands::Stats(cmd) => cmd.execute(&config).await,
        Commands::Clean(cmd) => cmd.execute(&config).await,
    };

    match &result {
        Ok(_) => tracing::info!("Command completed successfully"),
        Err(e) => tracing::error!("Command failed: {}", e),
    }

    result
}
