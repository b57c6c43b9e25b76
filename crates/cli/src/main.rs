//! Librarian CLI
//!
//! Main entry point for the librarian command-line tool.
//! Answers questions over a partitioned document corpus with streamed,
//! cited responses.

mod commands;

use clap::{Parser, Subcommand};
use commands::{AskCommand, CheckCommand, IndexCommand};
use librarian_core::{logging, AppResult};

/// Librarian CLI - cited question answering over document libraries
#[derive(Parser, Debug)]
#[command(name = "librarian")]
#[command(about = "Cited question answering over document libraries", long_about = None)]
#[command(version)]
struct Cli {
    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, env = "RUST_LOG")]
    log_level: Option<String>,

    /// Enable verbose output (sets log level to debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    no_color: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Ask a question and stream the cited answer
    Ask(AskCommand),

    /// Load passages from a JSONL file into a store
    Index(IndexCommand),

    /// Validate a site configuration file
    Check(CheckCommand),
}

#[tokio::main]
async fn main() -> AppResult<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose && cli.log_level.is_none() {
        Some("debug".to_string())
    } else {
        cli.log_level.clone()
    };

    logging::init_logging(log_level.as_deref(), cli.no_color)?;

    let command_name = match &cli.command {
        Commands::Ask(_) => "ask",
        Commands::Index(_) => "index",
        Commands::Check(_) => "check",
    };
    let _span = tracing::info_span!("command", name = command_name).entered();

    let result = match cli.command {
        Commands::Ask(cmd) => cmd.execute().await,
        Commands::Index(cmd) => cmd.execute().await,
        Commands::Check(cmd) => cmd.execute().await,
    };

    match &result {
        Ok(_) => tracing::info!("Command completed successfully"),
        Err(e) => tracing::error!("Command failed: {}", e),
    }

    result
}
