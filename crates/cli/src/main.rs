//! PostApply CLI
//!
//! Main entry point for the postapply command-line tool.
//! Builds the local knowledge index and answers follow-up questions over it.

mod commands;

use anyhow::Context;
use clap::{Parser, Subcommand};
use commands::{AskCommand, EvalCommand, IndexCommand, RouteCommand};
use postapply_core::{config::AppConfig, logging};
use std::path::PathBuf;

/// PostApply - job application follow-up advice grounded in a local corpus
#[derive(Parser, Debug)]
#[command(name = "postapply")]
#[command(about = "Job application follow-up advice grounded in a local corpus", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to workspace directory (default: current directory)
    #[arg(short, long, global = true, env = "POSTAPPLY_WORKSPACE")]
    workspace: Option<PathBuf>,

    /// Path to config file
    #[arg(short, long, global = true, env = "POSTAPPLY_CONFIG")]
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

    /// Generation provider (ollama, echo)
    #[arg(short, long, global = true, env = "POSTAPPLY_PROVIDER")]
    provider: Option<String>,

    /// Generation model identifier
    #[arg(short, long, global = true, env = "POSTAPPLY_MODEL")]
    model: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Build or inspect the vector index
    Index(IndexCommand),

    /// Ask a free-form question against the corpus
    Ask(AskCommand),

    /// Send a typed request through the query router
    Route(RouteCommand),

    /// Measure retrieval quality against labelled cases
    Eval(EvalCommand),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = AppConfig::load()
        .context("Failed to load configuration")?
        .with_overrides(
            cli.workspace,
            cli.config,
            cli.provider,
            cli.model,
            cli.log_level,
            cli.verbose,
            cli.no_color,
        );

    logging::init_logging(config.log_level.as_deref(), config.no_color)?;
    config.validate()?;

    tracing::info!("PostApply CLI starting");
    tracing::debug!("Workspace: {:?}", config.workspace);
    tracing::debug!("Provider: {} ({})", config.llm.provider, config.llm.model);
    tracing::debug!("Embeddings: {} ({})", config.embedding.provider, config.embedding.model);

    config.ensure_postapply_dir()?;

    let command_name = match &cli.command {
        Commands::Index(_) => "index",
        Commands::Ask(_) => "ask",
        Commands::Route(_) => "route",
        Commands::Eval(_) => "eval",
    };
    let _span = tracing::info_span!("command", name = command_name).entered();

    let result = match cli.command {
        Commands::Index(cmd) => cmd.execute(&config).await,
        Commands::Ask(cmd) => cmd.execute(&config).await,
        Commands::Route(cmd) => cmd.execute(&config).await,
        Commands::Eval(cmd) => cmd.execute(&config).await,
    };

    match &result {
        Ok(_) => tracing::info!("Command completed successfully"),
        Err(e) => tracing::error!("Command failed: {}", e),
    }

    result.with_context(|| format!("postapply {} failed", command_name))
}
