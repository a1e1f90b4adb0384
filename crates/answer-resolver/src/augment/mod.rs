//! Augmentation: fresher answers from public lookup sources.
//!
//! Lookups are tried in order (web search, then encyclopedia). The first
//! non-empty result wins and later lookups are never called. Errors and
//! timeouts count as "no result".

mod encyclopedia;
mod web_search;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use answer_types::{Answer, AugmentationSettings, Query, SourceUsed};

use crate::error::{LookupError, ResolveError};

pub use encyclopedia::{topic_title, EncyclopediaLookup};
pub use web_search::{select_instant_answer, InstantAnswer, WebSearchLookup};

/// A public information source consulted for fresh answers.
#[async_trait]
pub trait LookupSource: Send + Sync {
    /// Display name for logs.
    fn name(&self) -> &str;

    /// How an answer from this source is reported.
    fn source_used(&self) -> SourceUsed;

    /// Look up `query`. `Ok(None)` means the source had nothing usable.
    async fn lookup(&self, query: &Query) -> Result<Option<String>, LookupError>;
}

/// Text shown when neither the primary provider nor any lookup produced an answer.
pub fn fallback_message(query: &Query) -> String {
    format!(
        "I couldn't find up-to-date information about \"{}\". \
         Please check official sources or recent news for the latest details.",
        query
    )
}

/// Ordered chain of lookup sources.
pub struct AugmentationResolver {
    lookups: Vec<Arc<dyn LookupSource>>,
    timeout: Duration,
}

impl AugmentationResolver {
    pub fn new(lookups: Vec<Arc<dyn LookupSource>>, timeout: Duration) -> Self {
        Self { lookups, timeout }
    }

    /// Build the configured chain: web search first, then encyclopedia.
    pub fn from_settings(settings: &AugmentationSettings) -> Result<Self, ResolveError> {
        let mut lookups: Vec<Arc<dyn LookupSource>> = Vec::new();

        if settings.enabled && settings.web_search.enabled {
            lookups.push(Arc::new(WebSearchLookup::new(
                settings.web_search.clone(),
                settings.timeout(),
            )?));
        }
        if settings.enabled && settings.encyclopedia.enabled {
            lookups.push(Arc::new(EncyclopediaLookup::new(
                settings.encyclopedia.clone(),
                settings.timeout(),
            )?));
        }

        Ok(Self::new(lookups, settings.timeout()))
    }

    pub fn lookup_names(&self) -> Vec<&str> {
        self.lookups.iter().map(|l| l.name()).collect()
    }

    /// First lookup result, or `None` when every source came up empty.
    ///
    /// The returned answer has `stale = false`; callers decide staleness.
    pub async fn lookup(&self, query: &Query) -> Option<Answer> {
        for source in &self.lookups {
            match tokio::time::timeout(self.timeout, source.lookup(query)).await {
                Ok(Ok(Some(text))) => {
                    info!(source = source.name(), "Augmentation lookup answered");
                    return Some(Answer::new(text, source.source_used(), false));
                }
                Ok(Ok(None)) => {
                    debug!(source = source.name(), "Lookup returned nothing usable");
                }
                Ok(Err(e)) => {
                    warn!(source = source.name(), error = %e, "Lookup failed");
                }
                Err(_) => {
                    warn!(
                        source = source.name(),
                        timeout_ms = self.timeout.as_millis() as u64,
                        "Lookup timed out"
                    );
                }
            }
        }
        None
    }

    /// Lookup chain ending in the terminal fallback message. Never fails.
    pub async fn augment(&self, query: &Query) -> Answer {
        match self.lookup(query).await {
            Some(answer) => answer,
            None => {
                info!("All lookups exhausted, returning fallback message");
                Answer::new(fallback_message(query), SourceUsed::FallbackMessage, false)
            }
        }
    }
}

/// Lookup source with a fixed result, for tests.
pub struct MockLookup {
    name: String,
    source_used: SourceUsed,
    result: Option<String>,
    fail: bool,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl MockLookup {
    /// Mock that finds nothing.
    pub fn new(name: impl Into<String>, source_used: SourceUsed) -> Self {
        Self {
            name: name.into(),
            source_used,
            result: None,
            fail: false,
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_result(mut self, text: impl Into<String>) -> Self {
        self.result = Some(text.into());
        self
    }

    pub fn with_failure(mut self) -> Self {
        self.fail = true;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LookupSource for MockLookup {
    fn name(&self) -> &str {
        &self.name
    }

    fn source_used(&self) -> SourceUsed {
        self.source_used
    }

    async fn lookup(&self, _query: &Query) -> Result<Option<String>, LookupError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail {
            return Err(LookupError::Status(500));
        }
        Ok(self.result.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(text: &str) -> Query {
        Query::parse(text).unwrap()
    }

    fn chain(web: &Arc<MockLookup>, wiki: &Arc<MockLookup>) -> AugmentationResolver {
        AugmentationResolver::new(
            vec![web.clone(), wiki.clone()],
            Duration::from_secs(10),
        )
    }

    #[tokio::test]
    async fn test_web_search_short_circuits_encyclopedia() {
        let web = Arc::new(
            MockLookup::new("web", SourceUsed::WebSearch)
                .with_result("Tokyo is the capital of Japan."),
        );
        let wiki = Arc::new(MockLookup::new("wiki", SourceUsed::Encyclopedia).with_result("unused"));

        let answer = chain(&web, &wiki).augment(&query("capital of Japan")).await;

        assert_eq!(answer.source_used, SourceUsed::WebSearch);
        assert_eq!(answer.text, "Tokyo is the capital of Japan.");
        assert!(!answer.stale);
        assert_eq!(wiki.calls(), 0);
    }

    #[tokio::test]
    async fn test_failed_web_search_falls_through() {
        let web = Arc::new(MockLookup::new("web", SourceUsed::WebSearch).with_failure());
        let wiki = Arc::new(
            MockLookup::new("wiki", SourceUsed::Encyclopedia).with_result("Ada Lovelace was..."),
        );

        let answer = chain(&web, &wiki).augment(&query("who is Ada Lovelace")).await;

        assert_eq!(answer.source_used, SourceUsed::Encyclopedia);
        assert_eq!(web.calls(), 1);
        assert_eq!(wiki.calls(), 1);
    }

    #[tokio::test]
    async fn test_exhausted_chain_returns_fallback_message() {
        let web = Arc::new(MockLookup::new("web", SourceUsed::WebSearch));
        let wiki = Arc::new(MockLookup::new("wiki", SourceUsed::Encyclopedia).with_failure());
        let q = query("latest news on X");

        let resolver = chain(&web, &wiki);
        assert!(resolver.lookup(&q).await.is_none());

        let answer = resolver.augment(&q).await;
        assert_eq!(answer.source_used, SourceUsed::FallbackMessage);
        assert!(answer.text.contains("latest news on X"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_lookup_times_out() {
        let web = Arc::new(
            MockLookup::new("web", SourceUsed::WebSearch)
                .with_result("too late")
                .with_delay(Duration::from_secs(30)),
        );
        let wiki = Arc::new(MockLookup::new("wiki", SourceUsed::Encyclopedia).with_result("in time"));

        let answer = chain(&web, &wiki).augment(&query("anything")).await;
        assert_eq!(answer.source_used, SourceUsed::Encyclopedia);
        assert_eq!(answer.text, "in time");
    }

    #[tokio::test]
    async fn test_empty_chain_falls_back() {
        let resolver = AugmentationResolver::new(vec![], Duration::from_secs(1));
        let answer = resolver.augment(&query("q")).await;
        assert_eq!(answer.source_used, SourceUsed::FallbackMessage);
    }

    #[test]
    fn test_disabled_settings_build_empty_chain() {
        let mut settings = AugmentationSettings::default();
        settings.enabled = false;
        let resolver = AugmentationResolver::from_settings(&settings).unwrap();
        assert!(resolver.lookup_names().is_empty());
    }

    #[test]
    fn test_default_settings_order() {
        let resolver = AugmentationResolver::from_settings(&AugmentationSettings::default()).unwrap();
        assert_eq!(resolver.lookup_names(), vec!["web_search", "encyclopedia"]);
    }
}
