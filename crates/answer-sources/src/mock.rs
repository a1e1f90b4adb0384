//! Mock source for testing.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::source::{SourceAdapter, SourceRequest, SourceResult};

/// Mock source that replays a scripted sequence of results.
///
/// Once the script runs out, every further call returns the fallback result.
/// Each invocation is counted and its request recorded, so tests can assert
/// how many network calls a code path would have made and what it sent.
pub struct MockSource {
    name: String,
    model: String,
    timeout: Duration,
    delay: Option<Duration>,
    script: Mutex<VecDeque<SourceResult>>,
    fallback: SourceResult,
    calls: AtomicUsize,
    requests: Mutex<Vec<SourceRequest>>,
}

impl MockSource {
    /// Create a mock that always answers with `"mock answer"`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            model: "mock-model".to_string(),
            timeout: Duration::from_secs(60),
            delay: None,
            script: Mutex::new(VecDeque::new()),
            fallback: SourceResult::success("mock answer"),
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Queue results returned in order, one per call.
    pub fn with_script(mut self, results: Vec<SourceResult>) -> Self {
        self.script = Mutex::new(results.into());
        self
    }

    /// Result returned once the script is exhausted.
    pub fn with_fallback(mut self, result: SourceResult) -> Self {
        self.fallback = result;
        self
    }

    /// Simulated latency per call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Number of invocations so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Requests received so far, in order.
    pub fn requests(&self) -> Vec<SourceRequest> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

#[async_trait]
impl SourceAdapter for MockSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> &str {
        "mock"
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn invoke(&self, request: &SourceRequest) -> SourceResult {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(request.clone());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let next = self
            .script
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front();
        next.unwrap_or_else(|| self.fallback.clone())
    }
}
