use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// `hotel-revenue-crew` - multi-agent hotel revenue optimization.
#[derive(Parser, Debug)]
#[command(name = "hotel-revenue-crew")]
#[command(version)]
#[command(
    about = "Runs a crew of LLM agents that produce a hotel revenue optimization plan.",
    long_about = None
)]
pub struct Cli {
    /// Config file (default: ~/.hotel-revenue-crew/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Provider to use (amazon, anthropic, hybrid, or a custom provider)
    #[arg(long, global = true)]
    pub provider: Option<String>,

    /// Log at debug level
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the crew and print the revenue optimization plan
    Run(RunArgs),

    /// Validate the task graph and show execution layers and model chains
    Plan,

    /// Show the tier table of a provider
    Tiers,
}

#[derive(Args, Debug, Default)]
pub struct RunArgs {
    /// JSON payload file, or `-` for stdin
    #[arg(long, conflicts_with = "prompt")]
    pub payload: Option<PathBuf>,

    /// Natural-language request, e.g. "Optimize revenue for Seaside Resort in Miami, FL"
    #[arg(long)]
    pub prompt: Option<String>,

    /// Directory to write the plan (markdown) and the full result (JSON) to
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Print the full result as JSON instead of the plan
    #[arg(long)]
    pub json: bool,

    /// Use an offline echo model instead of the remote service
    #[arg(long)]
    pub dry_run: bool,
}
