//! Error types for the answer-relay system.

use thiserror::Error;

/// Unified error type for shared answer-relay operations.
#[derive(Debug, Error)]
pub enum AnswerError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid input error
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}
