//! Retry/backoff controller and provider rotation.
//!
//! Two independent axes drive the primary path:
//!
//! - **Retry count**: how many attempt slots a resolution gets, separated by
//!   a linear backoff (`unit * attempt_index`).
//! - **Provider rotation**: within one slot, a fatal failure from one
//!   provider binding moves on to the next binding immediately.
//!
//! The controller never panics and never returns an error type: it always
//! hands back the last [`SourceResult`] it observed.

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use backoff::backoff::Backoff;
use tracing::{debug, error, warn};

use answer_sources::{SourceAdapter, SourceResult};
use answer_types::{RetrySettings, Turn};

/// Linear backoff: the delay before attempt `n` is `unit * n`.
///
/// Yields `max_attempts - 1` delays, then `None`.
#[derive(Debug, Clone)]
pub struct LinearBackoff {
    unit: Duration,
    max_attempts: u32,
    attempt: u32,
}

impl LinearBackoff {
    pub fn new(unit: Duration, max_attempts: u32) -> Self {
        Self {
            unit,
            max_attempts,
            attempt: 0,
        }
    }
}

impl Backoff for LinearBackoff {
    fn reset(&mut self) {
        self.attempt = 0;
    }

    fn next_backoff(&mut self) -> Option<Duration> {
        self.attempt += 1;
        if self.attempt >= self.max_attempts {
            return None;
        }
        Some(self.unit * self.attempt)
    }
}

/// Retry policy for the primary path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempt slots, first try included
    pub max_attempts: u32,

    /// Linear backoff unit
    pub backoff_unit: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_unit: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff_unit: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff_unit,
        }
    }

    pub fn from_settings(settings: &RetrySettings) -> Self {
        Self::new(settings.max_attempts, settings.backoff_unit())
    }

    pub fn backoff(&self) -> LinearBackoff {
        LinearBackoff::new(self.backoff_unit, self.max_attempts)
    }

    /// Total time spent sleeping when every attempt fails retryably.
    pub fn worst_case_backoff(&self) -> Duration {
        let mut backoff = self.backoff();
        std::iter::from_fn(|| backoff.next_backoff()).sum()
    }
}

/// Drives attempt functions through the retry policy.
#[derive(Debug, Clone, Default)]
pub struct RetryController {
    policy: RetryPolicy,
}

impl RetryController {
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Run `attempt_fn` until it succeeds or attempts run out.
    ///
    /// - `Success` returns immediately.
    /// - `RetryableFailure` sleeps for the next backoff and tries again.
    /// - `FatalFailure` returns immediately: the attempt function has already
    ///   tried every binding it had for this slot.
    pub async fn run_with_retries<F, Fut>(&self, mut attempt_fn: F) -> SourceResult
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = SourceResult>,
    {
        let mut backoff = self.policy.backoff();
        let mut attempt = 0u32;

        loop {
            debug!(attempt, "Starting attempt");
            let result = attempt_fn(attempt).await;

            match &result {
                SourceResult::Success { .. } => return result,
                SourceResult::FatalFailure { reason } => {
                    error!(attempt, reason = %reason, "No provider binding left, giving up");
                    return result;
                }
                SourceResult::RetryableFailure { reason } => match backoff.next_backoff() {
                    Some(delay) => {
                        warn!(
                            attempt,
                            reason = %reason,
                            retry_in_ms = delay.as_millis() as u64,
                            "Attempt failed, retrying"
                        );
                        tokio::time::sleep(delay).await;
                        attempt += 1;
                    }
                    None => {
                        error!(attempt, reason = %reason, "Max attempts exceeded");
                        return result;
                    }
                },
            }
        }
    }

    /// Run the retry loop over a provider rotation.
    pub async fn run_rotating(&self, rotation: &ProviderRotation, messages: &[Turn]) -> SourceResult {
        let cursor = rotation.cursor();
        let cursor = &cursor;
        self.run_with_retries(|attempt| cursor.invoke_slot(attempt, messages))
            .await
    }
}

/// Ordered list of interchangeable primary providers.
#[derive(Clone)]
pub struct ProviderRotation {
    providers: Vec<Arc<dyn SourceAdapter>>,
}

impl ProviderRotation {
    pub fn new(providers: Vec<Arc<dyn SourceAdapter>>) -> Self {
        Self { providers }
    }

    pub fn providers(&self) -> &[Arc<dyn SourceAdapter>] {
        &self.providers
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Fresh cursor for one resolution.
    pub fn cursor(&self) -> RotationCursor<'_> {
        RotationCursor {
            providers: &self.providers,
            position: AtomicUsize::new(0),
        }
    }
}

impl std::fmt::Debug for ProviderRotation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.providers.iter().map(|p| p.name()))
            .finish()
    }
}

/// Per-resolution position in a [`ProviderRotation`].
///
/// A binding that fails fatally is skipped for the rest of the resolution.
pub struct RotationCursor<'a> {
    providers: &'a [Arc<dyn SourceAdapter>],
    position: AtomicUsize,
}

impl RotationCursor<'_> {
    /// Binding the next attempt will start from, if any remain.
    pub fn current(&self) -> Option<&Arc<dyn SourceAdapter>> {
        self.providers.get(self.position.load(Ordering::SeqCst))
    }

    /// Fill one attempt slot.
    ///
    /// Builds a fresh request per binding. Fatal failures advance the cursor
    /// and try the next binding without sleeping; anything else ends the slot.
    pub async fn invoke_slot(&self, attempt: u32, messages: &[Turn]) -> SourceResult {
        let mut last_fatal = None;

        while let Some(provider) = self.current() {
            let request = provider.build_request(messages.to_vec());
            let result = provider.invoke(&request).await;

            if result.is_fatal() {
                warn!(
                    attempt,
                    provider = provider.name(),
                    reason = result.reason().unwrap_or("unknown"),
                    "Provider failed fatally, rotating"
                );
                self.position.fetch_add(1, Ordering::SeqCst);
                last_fatal = Some(result);
                continue;
            }

            if result.is_success() {
                debug!(attempt, provider = provider.name(), "Provider answered");
            } else {
                debug!(
                    attempt,
                    provider = provider.name(),
                    reason = result.reason().unwrap_or("unknown"),
                    "Retryable failure"
                );
            }
            return result;
        }

        last_fatal.unwrap_or_else(|| SourceResult::fatal("No provider bindings remain"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use answer_sources::MockSource;
    use std::sync::atomic::AtomicU32;
    use tokio::time::Instant;

    fn controller(max_attempts: u32) -> RetryController {
        RetryController::new(RetryPolicy::new(max_attempts, Duration::from_secs(2)))
    }

    #[test]
    fn test_linear_backoff_sequence() {
        let mut backoff = LinearBackoff::new(Duration::from_secs(2), 4);
        assert_eq!(backoff.next_backoff(), Some(Duration::from_secs(2)));
        assert_eq!(backoff.next_backoff(), Some(Duration::from_secs(4)));
        assert_eq!(backoff.next_backoff(), Some(Duration::from_secs(6)));
        assert_eq!(backoff.next_backoff(), None);

        backoff.reset();
        assert_eq!(backoff.next_backoff(), Some(Duration::from_secs(2)));
    }

    #[test]
    fn test_worst_case_backoff() {
        let policy = RetryPolicy::new(3, Duration::from_secs(2));
        assert_eq!(policy.worst_case_backoff(), Duration::from_secs(6));

        let single = RetryPolicy::new(1, Duration::from_secs(2));
        assert_eq!(single.worst_case_backoff(), Duration::ZERO);
    }

    #[test]
    fn test_policy_clamps_zero_attempts() {
        assert_eq!(RetryPolicy::new(0, Duration::from_secs(1)).max_attempts, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retryable_then_success() {
        let calls = AtomicU32::new(0);
        let start = Instant::now();

        let result = controller(5)
            .run_with_retries(|_attempt| {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < 2 {
                        SourceResult::retryable("HTTP 429")
                    } else {
                        SourceResult::success("answer")
                    }
                }
            })
            .await;

        assert_eq!(result, SourceResult::success("answer"));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        // 2s before attempt 1, 4s before attempt 2
        assert_eq!(start.elapsed(), Duration::from_secs(6));
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausts_after_max_attempts() {
        let calls = AtomicU32::new(0);
        let start = Instant::now();

        let result = controller(4)
            .run_with_retries(|_attempt| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { SourceResult::retryable("HTTP 429") }
            })
            .await;

        assert!(result.is_retryable());
        assert_eq!(calls.load(Ordering::SeqCst), 4);
        // 2 * (1 + 2 + 3)
        assert_eq!(start.elapsed(), Duration::from_secs(12));
    }

    #[tokio::test(start_paused = true)]
    async fn test_attempt_indices_are_sequential() {
        let seen = std::sync::Mutex::new(Vec::new());

        controller(3)
            .run_with_retries(|attempt| {
                seen.lock().unwrap().push(attempt);
                async { SourceResult::retryable("timeout") }
            })
            .await;

        assert_eq!(*seen.lock().unwrap(), vec![0, 1, 2]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fatal_stops_without_sleeping() {
        let calls = AtomicU32::new(0);
        let start = Instant::now();

        let result = controller(3)
            .run_with_retries(|_attempt| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { SourceResult::fatal("HTTP 500") }
            })
            .await;

        assert!(result.is_fatal());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rotation_moves_past_fatal_binding() {
        let broken = Arc::new(
            MockSource::new("broken").with_fallback(SourceResult::fatal("empty body")),
        );
        let healthy = Arc::new(MockSource::new("healthy").with_model("gpt-4o"));
        let rotation = ProviderRotation::new(vec![broken.clone(), healthy.clone()]);
        let start = Instant::now();

        let result = controller(3)
            .run_rotating(&rotation, &[Turn::user("hi")])
            .await;

        assert_eq!(result, SourceResult::success("mock answer"));
        assert_eq!(broken.calls(), 1);
        assert_eq!(healthy.calls(), 1);
        assert_eq!(healthy.requests()[0].model, "gpt-4o");
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rotation_skips_fatal_binding_on_later_attempts() {
        let flaky = Arc::new(MockSource::new("flaky").with_script(vec![
            SourceResult::retryable("HTTP 403"),
            SourceResult::fatal("HTTP 500"),
        ]));
        let backup = Arc::new(MockSource::new("backup").with_script(vec![
            SourceResult::retryable("HTTP 429"),
            SourceResult::success("from backup"),
        ]));
        let rotation = ProviderRotation::new(vec![flaky.clone(), backup.clone()]);

        let result = controller(3)
            .run_rotating(&rotation, &[Turn::user("hi")])
            .await;

        // slot 0: flaky 403; slot 1: flaky 500 -> backup 429; slot 2: backup ok
        assert_eq!(result, SourceResult::success("from backup"));
        assert_eq!(flaky.calls(), 2);
        assert_eq!(backup.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rotation_all_fatal_is_exhausted() {
        let a = Arc::new(MockSource::new("a").with_fallback(SourceResult::fatal("HTTP 404")));
        let b = Arc::new(MockSource::new("b").with_fallback(SourceResult::fatal("HTTP 500")));
        let rotation = ProviderRotation::new(vec![a.clone(), b.clone()]);

        let result = controller(3)
            .run_rotating(&rotation, &[Turn::user("hi")])
            .await;

        assert_eq!(result, SourceResult::fatal("HTTP 500"));
        assert_eq!(a.calls(), 1);
        assert_eq!(b.calls(), 1);
    }

    #[tokio::test]
    async fn test_empty_rotation_is_fatal() {
        let rotation = ProviderRotation::new(vec![]);
        let result = controller(3)
            .run_rotating(&rotation, &[Turn::user("hi")])
            .await;
        assert!(result.is_fatal());
    }
}
