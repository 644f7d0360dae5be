use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;
mod config;
mod oracle;

#[derive(Parser)]
#[command(name = "psp", about = "Parameter-space partitioning for external models")]
#[command(version, propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Explore a model's parameter space
    Run(commands::run::RunArgs),
    /// Validate a run file and show the resolved configuration
    Check(commands::check::CheckArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::Run(args) => commands::run::run(args).await,
        Commands::Check(args) => commands::check::run(args),
    }
}
