//! Answer daemon library exports.
//!
//! This crate provides the HTTP service and CLI for answer-relay.
//!
//! # Modules
//!
//! - `cli`: Command-line argument parsing with clap
//! - `commands`: Command implementations (serve, ask, config)
//! - `routes`: HTTP handlers
//! - `server`: Router assembly and server lifecycle

pub mod cli;
pub mod commands;
pub mod routes;
pub mod server;

pub use cli::{Cli, Commands};
pub use commands::{ask, load_settings, show_config, start_server};
pub use server::{router, run_server_with_shutdown, serve_with_shutdown, AppState};
