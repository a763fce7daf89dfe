//! xover CLI - run and inspect the crossover control plane.

mod commands;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "xover")]
#[command(author, version, about = "Multi-channel crossover control plane", long_about = None)]
struct Cli {
    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the control plane against the simulated engine
    Run(commands::run::RunArgs),

    /// Print the graph planned for a mode and feature flags
    Plan(commands::plan::PlanArgs),

    /// List the parameter keys understood in the parameter file
    Keys(commands::keys::KeysArgs),

    /// Write a rig file holding the default settings
    Init(commands::init::InitArgs),
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| default_level.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Run(args) => commands::run::run(args),
        Commands::Plan(args) => commands::plan::run(args),
        Commands::Keys(args) => commands::keys::run(args),
        Commands::Init(args) => commands::init::run(args),
    }
}
