//! CLI argument parsing for the answer daemon.
//!
//! CLI flags override all other config sources.

use clap::{Parser, Subcommand};

/// Answer Relay Daemon
///
/// Resolves questions through chat providers with retries and live fallbacks.
#[derive(Parser, Debug)]
#[command(name = "answer-daemon")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to config file (overrides default ~/.config/answer-relay/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Set log level (trace, debug, info, warn, error)
    #[arg(short, long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Daemon commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the HTTP server
    Serve {
        /// Override bind host
        #[arg(long)]
        host: Option<String>,

        /// Override HTTP port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Resolve a single query and print the response payload
    Ask {
        /// The question to resolve
        query: String,

        /// Conversation identity (history is kept only for this process)
        #[arg(long)]
        conversation: Option<String>,
    },

    /// Print the effective configuration as TOML
    Config,
}
