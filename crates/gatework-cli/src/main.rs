//! Gatework CLI - build, inspect and run compiled logic circuits.

mod commands;
mod demos;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "gatework")]
#[command(author, version, about = "Gatework logic simulator CLI", long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a demo circuit and save its arena
    Demo(commands::demo::DemoArgs),

    /// Print the record structure of an arena
    Dump(commands::dump::DumpArgs),

    /// Show arena size and record counts
    Info(commands::info::InfoArgs),

    /// Step an arena and print its displays
    Run(commands::run::RunArgs),
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Demo(args) => commands::demo::run(args),
        Commands::Dump(args) => commands::dump::run(args),
        Commands::Info(args) => commands::info::run(args),
        Commands::Run(args) => commands::run::run(args),
    }
}
