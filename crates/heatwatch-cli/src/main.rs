use clap::{Parser, Subcommand};

mod commands;
mod common;

#[derive(Parser)]
#[command(name = "heatwatch-cli", version, about = "Heatwatch CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Worker registration and undo
    Worker {
        #[command(subcommand)]
        action: commands::worker::WorkerAction,
    },
    /// Zone assignment
    Zone {
        #[command(subcommand)]
        action: commands::zone::ZoneAction,
    },
    /// Rest cycle control
    Rest {
        #[command(subcommand)]
        action: commands::rest::RestAction,
    },
    /// Organization-wide cutoff control
    Cutoff {
        #[command(subcommand)]
        action: commands::cutoff::CutoffAction,
    },
    /// Activity log
    Log {
        #[command(subcommand)]
        action: commands::log::LogAction,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
    /// Print the full engine state as JSON
    Status,
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    init_tracing();
    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Worker { action } => commands::worker::run(action),
        Commands::Zone { action } => commands::zone::run(action),
        Commands::Rest { action } => commands::rest::run(action),
        Commands::Cutoff { action } => commands::cutoff::run(action),
        Commands::Log { action } => commands::log::run(action),
        Commands::Config { action } => commands::config::run(action),
        Commands::Status => commands::status::run(),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
