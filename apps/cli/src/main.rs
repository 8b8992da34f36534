//! Montage CLI - command-line front end for the video generation orchestrator
//!
//! This CLI provides a `montage` command that drives the orchestration facade
//! against simulated engines configured from a TOML file.

mod commands;
mod config;

use clap::{CommandFactory, Parser, Subcommand};
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use commands::{EnginesCommand, GenerateArgs, engines, generate, stats};

/// Montage - multi-engine video generation
///
/// Routes generation requests across a pool of video engines with bounded
/// concurrency, retries and per-engine performance tracking.
#[derive(Parser, Debug)]
#[command(
    name = "montage",
    author,
    version,
    about = "Montage - multi-engine video generation orchestration"
)]
struct Args {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "warn", global = true)]
    log_level: String,

    /// Configuration file (overrides MONTAGE_CONFIG and ./montage.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate a video
    ///
    /// Selects an engine according to the routing strategy (or the engines
    /// given with --engine), retries failed attempts and prints the result.
    Generate(GenerateArgs),

    /// Engine management commands
    ///
    /// List, inspect and test the configured video engines.
    #[command(subcommand)]
    Engines(EnginesCommand),

    /// Show orchestrator statistics
    Stats {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let level = match args.log_level.as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "error" => Level::ERROR,
        _ => Level::WARN,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .without_time()
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let Some(command) = args.command else {
        Args::command().print_help()?;
        return Ok(());
    };

    let config = config::load_config(args.config.as_deref())?;

    match command {
        Command::Generate(generate_args) => generate::execute(&config, generate_args).await?,
        Command::Engines(cmd) => engines::execute(&config, cmd).await?,
        Command::Stats { json } => stats::execute(&config, json).await?,
    }

    Ok(())
}
