//! Source adapter trait and the request/result vocabulary.
//!
//! A `SourceAdapter` wraps exactly one external answer provider. Each call
//! to [`SourceAdapter::invoke`] makes a single outbound request with no
//! internal retry, enforces its own timeout, and classifies the outcome so
//! the retry controller can decide what to do next.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;

use answer_types::Turn;

/// One attempt's worth of input for a source adapter.
///
/// Built fresh for every attempt from the conversation snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceRequest {
    /// Ordered conversation context, ending with the new user turn
    pub messages: Vec<Turn>,

    /// Model name or character the provider should answer as
    pub model: String,

    /// Budget for this single attempt
    pub timeout: Duration,
}

impl SourceRequest {
    pub fn new(messages: Vec<Turn>, model: impl Into<String>, timeout: Duration) -> Self {
        Self {
            messages,
            model: model.into(),
            timeout,
        }
    }

    /// Content of the last turn (the question being asked).
    pub fn last_content(&self) -> Option<&str> {
        self.messages.last().map(|t| t.content.as_str())
    }
}

/// Classified outcome of a single adapter invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceResult {
    /// Provider returned a usable answer
    Success { text: String },

    /// Transient failure (rate limited, timed out, connection error)
    RetryableFailure { reason: String },

    /// This provider binding's response is unusable
    FatalFailure { reason: String },
}

impl SourceResult {
    pub fn success(text: impl Into<String>) -> Self {
        Self::Success { text: text.into() }
    }

    pub fn retryable(reason: impl Into<String>) -> Self {
        Self::RetryableFailure {
            reason: reason.into(),
        }
    }

    pub fn fatal(reason: impl Into<String>) -> Self {
        Self::FatalFailure {
            reason: reason.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RetryableFailure { .. })
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::FatalFailure { .. })
    }

    /// Answer text, if this is a success.
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Success { text } => Some(text),
            _ => None,
        }
    }

    /// Failure reason, if this is a failure.
    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::Success { .. } => None,
            Self::RetryableFailure { reason } | Self::FatalFailure { reason } => Some(reason),
        }
    }
}

/// Trait for primary answer providers.
///
/// Implement this trait to add a new chat backend. Implementations must be
/// stateless with respect to callers: the same adapter instance is shared by
/// every concurrent resolution.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    /// Display name used in logs and `/models`.
    fn name(&self) -> &str;

    /// Backend protocol identifier (e.g. "chat_sandbox").
    fn kind(&self) -> &str;

    /// Model or character this binding answers as.
    fn model(&self) -> &str;

    /// Per-attempt timeout this adapter enforces.
    fn timeout(&self) -> Duration;

    /// Perform exactly one outbound call and classify the outcome.
    async fn invoke(&self, request: &SourceRequest) -> SourceResult;

    /// Build a request bound to this adapter's model and timeout.
    fn build_request(&self, messages: Vec<Turn>) -> SourceRequest {
        SourceRequest::new(messages, self.model(), self.timeout())
    }
}

/// Classify a non-success HTTP status.
///
/// Returns `None` for 200. Rate limiting and bot detection (403/429) are
/// retryable; every other status is fatal for this binding.
pub fn classify_status(status: StatusCode) -> Option<SourceResult> {
    match status {
        StatusCode::OK => None,
        StatusCode::FORBIDDEN | StatusCode::TOO_MANY_REQUESTS => Some(SourceResult::retryable(
            format!("HTTP {} (rate limited)", status.as_u16()),
        )),
        other => Some(SourceResult::fatal(format!("HTTP {}", other.as_u16()))),
    }
}

/// Classify a transport-level failure. All of these are worth retrying.
pub fn classify_transport_error(err: &reqwest::Error) -> SourceResult {
    if err.is_timeout() {
        SourceResult::retryable("request timed out")
    } else if err.is_connect() {
        SourceResult::retryable(format!("connection failed: {}", err))
    } else {
        SourceResult::retryable(format!("request failed: {}", err))
    }
}
