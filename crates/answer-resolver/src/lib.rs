//! # answer-resolver
//!
//! Resilient query resolution for answer-relay.
//!
//! A query goes to the primary provider rotation under a retry policy. A
//! successful answer is checked for staleness; stale or failed answers are
//! handed to the augmentation chain (web search, then encyclopedia, then a
//! fixed fallback message). Identified conversations keep their history
//! between calls.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use answer_resolver::Resolver;
//! use answer_types::Settings;
//!
//! let settings = Settings::load(None)?;
//! let resolver = Resolver::from_settings(&settings)?;
//! let response = resolver.resolve("Who won the last election?", Some("session-1")).await;
//! println!("{} ({:?})", response.message, response.source_used);
//! ```
//!
//! ## Modules
//!
//! - [`retry`]: linear backoff, retry controller, provider rotation
//! - [`staleness`]: stale-answer detection
//! - [`augment`]: lookup sources and the augmentation chain
//! - [`conversation`]: bounded per-conversation history
//! - [`orchestrator`]: the resolution state machine

pub mod augment;
pub mod conversation;
pub mod error;
pub mod orchestrator;
pub mod retry;
pub mod staleness;

pub use augment::{
    fallback_message, AugmentationResolver, EncyclopediaLookup, LookupSource, MockLookup,
    WebSearchLookup,
};
pub use conversation::ConversationStore;
pub use error::{LookupError, ResolveError};
pub use orchestrator::{
    Resolution, ResolutionState, Resolver, INTERNAL_ERROR_MESSAGE, SERVICE_BUSY_MESSAGE,
    VALIDATION_MESSAGE,
};
pub use retry::{LinearBackoff, ProviderRotation, RetryController, RetryPolicy};
pub use staleness::{
    detector_from_settings, NeverStale, PhraseStalenessClassifier, StalenessDetector,
    StalenessVerdict,
};
