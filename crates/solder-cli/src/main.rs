//! Solder CLI - check, draw and simulate wiring topologies.

mod commands;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "solder")]
#[command(author, version, about = "Solder wiring model CLI", long_about = None)]
struct Cli {
    /// Log filter used when RUST_LOG is not set (e.g. "debug", "solder_core=trace")
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the topology checks over a topology file
    Check(commands::check::CheckArgs),

    /// Render a topology file as a Mermaid flowchart
    Diagram(commands::diagram::DiagramArgs),

    /// Summarize the vertices and edges of a topology file
    Info(commands::info::InfoArgs),

    /// Drive a topology file through a deterministic model
    Simulate(commands::simulate::SimulateArgs),
}

fn init_logging(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into());
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    match cli.command {
        Commands::Check(args) => commands::check::run(args),
        Commands::Diagram(args) => commands::diagram::run(args),
        Commands::Info(args) => commands::info::run(args),
        Commands::Simulate(args) => commands::simulate::run(args),
    }
}
