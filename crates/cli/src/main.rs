//! QuotaRelay CLI: the main entry point.
//!
//! Commands:
//! - `chat`     Interactive or single-message chat
//! - `usage`    Show today's and lifetime token usage
//! - `serve`    Start the dashboard / webhook server
//! - `memory`   Manage long-term repository notes
//! - `onboard`  Write a default config file

use clap::{Parser, Subcommand};

mod commands;
mod logging;
mod services;

#[derive(Parser)]
#[command(
    name = "quotarelay",
    about = "QuotaRelay — chat relay with a shared daily token budget",
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
    /// Chat through the relay
    Chat {
        /// User id the session is kept under
        #[arg(short, long, default_value = "local")]
        user: String,

        /// Send a single message instead of entering interactive mode
        #[arg(short, long)]
        message: Option<String>,

        /// Print the token usage block after each reply
        #[arg(long)]
        show_usage: bool,
    },

    /// Show token usage against the daily budget
    Usage,

    /// Start the HTTP dashboard and webhook server
    Serve {
        /// Override the port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Manage long-term repository memory
    Memory {
        #[command(subcommand)]
        action: MemoryAction,
    },

    /// Initialize configuration
    Onboard,
}

#[derive(Subcommand)]
enum MemoryAction {
    /// Store a note
    Add {
        /// The note text
        note: Vec<String>,
    },
    /// Show the latest notes
    List {
        #[arg(short, long, default_value_t = 3)]
        limit: usize,
    },
    /// Remove the newest note
    Forget,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    logging::init(cli.verbose);

    match cli.command {
        Commands::Chat {
            user,
            message,
            show_usage,
        } => commands::chat::run(user, message, show_usage).await?,
        Commands::Usage => commands::usage::run().await?,
        Commands::Serve { port } => commands::serve::run(port).await?,
        Commands::Memory { action } => match action {
            MemoryAction::Add { note } => commands::memory::add(&note.join(" ")).await?,
            MemoryAction::List { limit } => commands::memory::list(limit).await?,
            MemoryAction::Forget => commands::memory::forget().await?,
        },
        Commands::Onboard => commands::onboard::run().await?,
    }

    Ok(())
}
