//! Error types for source adapter construction.

use thiserror::Error;

/// Errors that can occur while building a source adapter.
///
/// Invocation failures are not errors: they are reported through
/// [`SourceResult`](crate::SourceResult) so the retry controller can classify them.
#[derive(Error, Debug)]
pub enum SourceError {
    /// Invalid adapter configuration.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// HTTP client could not be built.
    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),
}

impl SourceError {
    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }
}
