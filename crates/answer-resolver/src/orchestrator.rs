//! Resolution orchestrator.
//!
//! One call to [`Resolver::resolve`] walks a fixed state sequence:
//!
//! ```text
//! Received -> Validating -> PrimaryAttempt -> StalenessCheck -> Finalizing -> Done
//!                 |               |                 |
//!                 |               +-> Augmenting ---+-> Finalizing
//!                 +-> Done (400)
//! ```
//!
//! Every path ends in an [`AnswerResponse`]; nothing is surfaced as an error.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::FutureExt;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, info_span, warn, Instrument};
use ulid::Ulid;

use answer_sources::{build_sources, SourceAdapter, SourceResult};
use answer_types::{Answer, AnswerResponse, Query, Settings, SourceUsed, Turn};

use crate::augment::AugmentationResolver;
use crate::conversation::ConversationStore;
use crate::error::ResolveError;
use crate::retry::{ProviderRotation, RetryController, RetryPolicy};
use crate::staleness::{detector_from_settings, PhraseStalenessClassifier, StalenessDetector};

/// Returned with status 400 when the query is missing or blank.
pub const VALIDATION_MESSAGE: &str = "The text parameter is required";

/// Returned with status 503 when the primary path fails and augmentation is off.
pub const SERVICE_BUSY_MESSAGE: &str = "The service is busy right now. Please try again shortly.";

/// Returned with status 500 when resolution panics.
pub const INTERNAL_ERROR_MESSAGE: &str = "An internal error occurred while resolving your query.";

/// Steps of a single resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionState {
    Received,
    Validating,
    PrimaryAttempt,
    StalenessCheck,
    Augmenting,
    Finalizing,
    Done,
}

impl ResolutionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResolutionState::Received => "received",
            ResolutionState::Validating => "validating",
            ResolutionState::PrimaryAttempt => "primary_attempt",
            ResolutionState::StalenessCheck => "staleness_check",
            ResolutionState::Augmenting => "augmenting",
            ResolutionState::Finalizing => "finalizing",
            ResolutionState::Done => "done",
        }
    }
}

/// A response plus the path taken to produce it.
#[derive(Debug, Clone)]
pub struct Resolution {
    pub request_id: String,
    pub response: AnswerResponse,
    pub path: Vec<ResolutionState>,
}

#[derive(Debug, Default)]
struct Trace {
    path: Vec<ResolutionState>,
}

impl Trace {
    fn enter(&mut self, state: ResolutionState) {
        debug!(state = state.as_str(), "Entering state");
        self.path.push(state);
    }
}

/// Resolves queries against the primary rotation with augmentation fallbacks.
pub struct Resolver {
    rotation: ProviderRotation,
    controller: RetryController,
    staleness: Box<dyn StalenessDetector>,
    augmentation: AugmentationResolver,
    conversations: Arc<ConversationStore>,
    deadline: Duration,
    augmentation_enabled: bool,
    conversation_enabled: bool,
}

impl Resolver {
    /// Resolver with default retry policy, phrase staleness and a default store.
    pub fn new(providers: Vec<Arc<dyn SourceAdapter>>, augmentation: AugmentationResolver) -> Self {
        Self {
            rotation: ProviderRotation::new(providers),
            controller: RetryController::default(),
            staleness: Box::new(PhraseStalenessClassifier::default()),
            augmentation,
            conversations: Arc::new(ConversationStore::default()),
            deadline: Duration::from_secs(60),
            augmentation_enabled: true,
            conversation_enabled: true,
        }
    }

    /// Build the full resolver from loaded settings.
    pub fn from_settings(settings: &Settings) -> Result<Self, ResolveError> {
        settings.validate().map_err(ResolveError::Config)?;

        let providers = build_sources(&settings.providers)?;
        let augmentation = AugmentationResolver::from_settings(&settings.augmentation)?;

        Ok(Self::new(providers, augmentation)
            .with_retry_policy(RetryPolicy::from_settings(&settings.retry))
            .with_staleness(detector_from_settings(&settings.staleness))
            .with_conversations(Arc::new(ConversationStore::from_settings(
                &settings.conversation,
            )))
            .with_deadline(settings.retry.deadline())
            .with_augmentation_enabled(settings.augmentation.enabled)
            .with_conversation_enabled(settings.conversation.enabled))
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.controller = RetryController::new(policy);
        self
    }

    pub fn with_staleness(mut self, detector: Box<dyn StalenessDetector>) -> Self {
        self.staleness = detector;
        self
    }

    pub fn with_conversations(mut self, store: Arc<ConversationStore>) -> Self {
        self.conversations = store;
        self
    }

    /// Upper bound on the whole primary path, backoff included.
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    pub fn with_augmentation_enabled(mut self, enabled: bool) -> Self {
        self.augmentation_enabled = enabled;
        self
    }

    pub fn with_conversation_enabled(mut self, enabled: bool) -> Self {
        self.conversation_enabled = enabled;
        self
    }

    pub fn providers(&self) -> &[Arc<dyn SourceAdapter>] {
        self.rotation.providers()
    }

    pub fn conversations(&self) -> &Arc<ConversationStore> {
        &self.conversations
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        self.controller.policy()
    }

    pub fn lookup_names(&self) -> Vec<&str> {
        self.augmentation.lookup_names()
    }

    /// Resolve a query. Never fails; errors become status codes.
    ///
    /// `conversation_id = None` is a stateless single-turn request.
    pub async fn resolve(&self, query: &str, conversation_id: Option<&str>) -> AnswerResponse {
        self.resolve_traced(query, conversation_id).await.response
    }

    /// Like [`resolve`](Self::resolve), also reporting the state path.
    pub async fn resolve_traced(&self, query: &str, conversation_id: Option<&str>) -> Resolution {
        let request_id = Ulid::new().to_string();
        let conversation_id = conversation_id
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(str::to_string);
        let span = info_span!(
            "resolve",
            request_id = %request_id,
            conversation = conversation_id.as_deref().unwrap_or("-")
        );

        let start = Instant::now();
        let mut trace = Trace::default();

        let outcome = AssertUnwindSafe(self.run(query, conversation_id.as_deref(), &mut trace))
            .catch_unwind()
            .instrument(span.clone())
            .await;

        let response = match outcome {
            Ok(response) => response,
            Err(_) => {
                span.in_scope(|| error!("Resolution panicked"));
                AnswerResponse::failure(500, INTERNAL_ERROR_MESSAGE)
            }
        }
        .with_conversation(conversation_id);

        trace.path.push(ResolutionState::Done);
        span.in_scope(|| {
            info!(
                status = response.status_code,
                source_used = response.source_used.map(|s| s.as_str()).unwrap_or("none"),
                stale = response.stale,
                elapsed_ms = start.elapsed().as_millis() as u64,
                "Resolution complete"
            )
        });

        Resolution {
            request_id,
            response,
            path: trace.path,
        }
    }

    async fn run(
        &self,
        raw_query: &str,
        conversation_id: Option<&str>,
        trace: &mut Trace,
    ) -> AnswerResponse {
        trace.enter(ResolutionState::Received);

        trace.enter(ResolutionState::Validating);
        let query = match Query::parse(raw_query) {
            Ok(query) => query,
            Err(e) => {
                debug!(error = %e, "Rejected query");
                return AnswerResponse::failure(400, VALIDATION_MESSAGE);
            }
        };

        let stored_id = conversation_id.filter(|_| self.conversation_enabled);
        let mut messages = stored_id
            .map(|id| self.conversations.snapshot(id))
            .unwrap_or_default();
        messages.push(query.to_turn());

        trace.enter(ResolutionState::PrimaryAttempt);
        let answer = match self.run_primary(&messages).await {
            SourceResult::Success { text } => {
                trace.enter(ResolutionState::StalenessCheck);
                if self.staleness.is_stale(&text) {
                    self.refresh_stale(&query, text, trace).await
                } else {
                    Answer::new(text, SourceUsed::Primary, false)
                }
            }
            failure => {
                warn!(reason = failure.reason().unwrap_or("unknown"), "Primary path failed");
                if !self.augmentation_enabled {
                    return AnswerResponse::failure(503, SERVICE_BUSY_MESSAGE);
                }
                trace.enter(ResolutionState::Augmenting);
                self.augmentation.augment(&query).await
            }
        };

        trace.enter(ResolutionState::Finalizing);
        if let Some(id) = stored_id {
            if answer.source_used != SourceUsed::FallbackMessage {
                self.conversations
                    .append(id, [query.to_turn(), Turn::assistant(answer.text.clone())]);
            }
        }

        AnswerResponse::ok(answer)
    }

    async fn run_primary(&self, messages: &[Turn]) -> SourceResult {
        let attempt = self.controller.run_rotating(&self.rotation, messages);
        match tokio::time::timeout(self.deadline, attempt).await {
            Ok(result) => result,
            Err(_) => {
                warn!(
                    deadline_ms = self.deadline.as_millis() as u64,
                    "Primary path exceeded its deadline"
                );
                SourceResult::retryable("deadline exceeded")
            }
        }
    }

    /// Try to replace a stale primary answer; keep it if no lookup answers.
    async fn refresh_stale(&self, query: &Query, primary: String, trace: &mut Trace) -> Answer {
        if !self.augmentation_enabled {
            return Answer::new(primary, SourceUsed::Primary, true);
        }

        trace.enter(ResolutionState::Augmenting);
        match self.augmentation.lookup(query).await {
            Some(fresh) => Answer::new(fresh.text, fresh.source_used, true),
            None => {
                debug!("No fresher answer found, keeping stale primary");
                Answer::new(primary, SourceUsed::Primary, true)
            }
        }
    }
}
