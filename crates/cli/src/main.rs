//! Chat-Mate CLI — the main entry point.
//!
//! Commands:
//! - `chat`    — Interactive conversation on stdin
//! - `ask`     — Answer a single question
//! - `tools`   — List the registered knowledge tools
//! - `config`  — Show the effective configuration or write the default file

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(
    name = "chatmate",
    about = "Chat-Mate — a conversational search assistant",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Read configuration from this file instead of ~/.chatmate/config.toml
    #[arg(short, long, global = true, env = "CHATMATE_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Chat with the search assistant
    Chat {
        /// Show model output and tool activity as it happens
        #[arg(short, long)]
        stream: bool,
    },

    /// Ask a single question and print the answer
    Ask {
        /// The question
        #[arg(short, long)]
        message: String,

        /// Show model output and tool activity as it happens
        #[arg(short, long)]
        stream: bool,
    },

    /// List the knowledge tools available to the agent
    Tools,

    /// Show the effective configuration (API keys redacted)
    Config {
        /// Write the default configuration file
        #[arg(long)]
        init: bool,

        /// Overwrite an existing file with --init
        #[arg(long, requires = "init")]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config_path = cli.config.as_deref();
    match cli.command {
        Commands::Chat { stream } => commands::chat::run(config_path, stream).await?,
        Commands::Ask { message, stream } => {
            commands::ask::run(config_path, &message, stream).await?
        }
        Commands::Tools => commands::tools::run(config_path)?,
        Commands::Config { init, force } => commands::config_cmd::run(config_path, init, force)?,
    }

    Ok(())
}
