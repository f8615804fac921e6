//! VaultMind CLI — the main entry point.
//!
//! Commands:
//! - `chat`    — Ask about your notes, one message or interactively
//! - `index`   — Split and embed the notes directory, report what was found
//! - `config`  — Show, locate or initialize the configuration file

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use vaultmind_config::ChatMode;

mod commands;

#[derive(Parser)]
#[command(
    name = "vaultmind",
    about = "VaultMind — chat with your Markdown notes through a local LLM",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Chat about your notes
    Chat {
        /// Send a single message instead of entering interactive mode
        #[arg(short, long)]
        message: Option<String>,

        /// Chat mode: agent, rag or simple (defaults to the configured mode)
        #[arg(long)]
        mode: Option<ChatMode>,

        /// Notes directory (defaults to `notes_dir` in the config)
        #[arg(short, long)]
        notes: Option<PathBuf>,

        /// Attach an image to the message
        #[arg(long)]
        image: Vec<PathBuf>,
    },

    /// Index the notes directory
    Index {
        /// Notes directory (defaults to `notes_dir` in the config)
        #[arg(short, long)]
        notes: Option<PathBuf>,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration
    Show,
    /// Print the configuration file path
    Path,
    /// Write a default configuration file if none exists
    Init,
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

    match cli.command {
        Commands::Chat {
            message,
            mode,
            notes,
            image,
        } => commands::chat::run(message, mode, notes, image).await?,
        Commands::Index { notes } => commands::index::run(notes).await?,
        Commands::Config { action } => match action {
            ConfigAction::Show => commands::config_cmd::show().await?,
            ConfigAction::Path => commands::config_cmd::path().await?,
            ConfigAction::Init => commands::config_cmd::init().await?,
        },
    }

    Ok(())
}
