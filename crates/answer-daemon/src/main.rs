//! Answer Relay Daemon
//!
//! Resolves questions through chat providers, falling back to live lookups
//! when providers fail or answer with stale knowledge.
//!
//! # Usage
//!
//! ```bash
//! answer-daemon serve [--host HOST] [--port PORT]
//! answer-daemon ask "Who won the last election?" [--conversation ID]
//! answer-daemon config
//! ```
//!
//! # Configuration
//!
//! Configuration is loaded in order (later sources override earlier):
//! 1. Built-in defaults
//! 2. Config file (~/.config/answer-relay/config.toml)
//! 3. CLI-specified config file (--config)
//! 4. Environment variables (ANSWER__*)
//! 5. CLI flags

use anyhow::Result;
use clap::Parser;

use answer_daemon::{ask, show_config, start_server, Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { host, port } => {
            start_server(
                cli.config.as_deref(),
                host.as_deref(),
                port,
                cli.log_level.as_deref(),
            )
            .await?;
        }
        Commands::Ask {
            query,
            conversation,
        } => {
            ask(
                cli.config.as_deref(),
                &query,
                conversation.as_deref(),
                cli.log_level.as_deref(),
            )
            .await?;
        }
        Commands::Config => {
            show_config(cli.config.as_deref(), cli.log_level.as_deref())?;
        }
    }

    Ok(())
}
