//! Error types for answer resolution.

use thiserror::Error;

use answer_sources::SourceError;

/// Errors raised while wiring up a resolver.
///
/// Resolution itself never fails with an error: every path ends in an
/// [`AnswerResponse`](answer_types::AnswerResponse).
#[derive(Error, Debug)]
pub enum ResolveError {
    /// Primary provider could not be built.
    #[error("Source error: {0}")]
    Source(#[from] SourceError),

    /// Invalid resolver configuration.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// HTTP client could not be built.
    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),
}

/// Failure of a single augmentation lookup.
///
/// The augmentation chain treats every variant as "no result".
#[derive(Error, Debug)]
pub enum LookupError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Unexpected status: {0}")]
    Status(u16),

    #[error("Malformed response: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid lookup URL: {0}")]
    Url(String),
}
