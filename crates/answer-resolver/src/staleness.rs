//! Staleness detection for primary answers.
//!
//! A primary answer is stale when the provider admits its knowledge may be
//! out of date ("As of my last update in 2023..."). Detection is a
//! case-insensitive substring match against a configurable phrase list.

use serde::{Deserialize, Serialize};
use tracing::debug;

use answer_types::{default_stale_phrases, StalenessSettings};

/// Decides whether a primary answer needs fresher information.
pub trait StalenessDetector: Send + Sync {
    /// Returns `true` if the text signals out-of-date knowledge.
    fn is_stale(&self, text: &str) -> bool;
}

/// Result of a staleness check, with the phrase that triggered it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StalenessVerdict {
    pub stale: bool,
    pub matched_phrase: Option<String>,
}

/// Phrase-list staleness classifier.
#[derive(Debug, Clone)]
pub struct PhraseStalenessClassifier {
    /// Lowercased, non-empty phrases
    phrases: Vec<String>,
}

impl Default for PhraseStalenessClassifier {
    fn default() -> Self {
        Self::new(default_stale_phrases())
    }
}

impl PhraseStalenessClassifier {
    pub fn new(phrases: Vec<String>) -> Self {
        let phrases = phrases
            .into_iter()
            .map(|p| p.trim().to_lowercase())
            .filter(|p| !p.is_empty())
            .collect();
        Self { phrases }
    }

    pub fn phrases(&self) -> &[String] {
        &self.phrases
    }

    /// Classify `text`, reporting the first phrase found.
    pub fn classify(&self, text: &str) -> StalenessVerdict {
        let lower = text.to_lowercase();
        let matched = self.phrases.iter().find(|p| lower.contains(p.as_str()));

        if let Some(phrase) = matched {
            debug!(phrase = %phrase, "Answer flagged as stale");
        }

        StalenessVerdict {
            stale: matched.is_some(),
            matched_phrase: matched.cloned(),
        }
    }
}

impl StalenessDetector for PhraseStalenessClassifier {
    fn is_stale(&self, text: &str) -> bool {
        self.classify(text).stale
    }
}

/// Detector that never flags anything. Used when staleness checks are disabled.
#[derive(Debug, Clone, Copy, Default)]
pub struct NeverStale;

impl StalenessDetector for NeverStale {
    fn is_stale(&self, _text: &str) -> bool {
        false
    }
}

/// Build the configured detector.
pub fn detector_from_settings(settings: &StalenessSettings) -> Box<dyn StalenessDetector> {
    if settings.enabled {
        Box::new(PhraseStalenessClassifier::new(settings.phrases.clone()))
    } else {
        Box::new(NeverStale)
    }
}
