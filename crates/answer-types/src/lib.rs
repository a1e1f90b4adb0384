//! # answer-types
//!
//! Shared domain types for the answer-relay system.
//!
//! This crate defines the core data structures used throughout the system:
//! - Turns and queries: the conversation vocabulary
//! - Answers: what a resolution hands back, and the fixed response payload
//! - Settings: layered configuration
//!
//! ## Usage
//!
//! ```rust
//! use answer_types::{Query, Turn};
//!
//! let query = Query::parse("  who wrote Dune?  ").unwrap();
//! assert_eq!(query.to_turn(), Turn::user("who wrote Dune?"));
//! ```

pub mod answer;
pub mod config;
pub mod error;
pub mod turn;

pub use answer::{Answer, AnswerResponse, SourceUsed};
pub use config::{
    default_stale_phrases, AugmentationSettings, ConversationSettings, EncyclopediaSettings,
    ProviderKind, ProviderSettings, RetrySettings, Settings, StalenessSettings,
    WebSearchSettings,
};
pub use error::AnswerError;
pub use turn::{Query, Turn, TurnRole};
