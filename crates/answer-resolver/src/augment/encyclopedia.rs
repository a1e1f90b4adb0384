//! Encyclopedia topic-summary lookup (Wikipedia REST API).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;
use tracing::debug;

use answer_types::{EncyclopediaSettings, Query, SourceUsed};

use super::LookupSource;
use crate::error::{LookupError, ResolveError};

#[derive(Debug, Deserialize)]
struct Summary {
    #[serde(default)]
    extract: String,
}

/// Derive a topic title from a question.
///
/// Leading prefixes are stripped case-insensitively (repeatedly, so
/// "what is current inflation" loses both), as is trailing punctuation.
/// Spaces become underscores. Returns `None` if nothing is left.
pub fn topic_title(query: &str, prefixes: &[String]) -> Option<String> {
    let mut rest = query.trim();

    loop {
        let lower = rest.to_lowercase();
        let stripped = prefixes
            .iter()
            .map(|p| p.trim().to_lowercase())
            .filter(|p| !p.is_empty())
            .find(|p| {
                lower.starts_with(p.as_str())
                    && lower[p.len()..]
                        .chars()
                        .next()
                        .map_or(true, |c| !c.is_alphanumeric())
            });

        match stripped {
            // lowercasing can change byte lengths outside ASCII
            Some(prefix) if rest.is_char_boundary(prefix.len()) => {
                rest = rest[prefix.len()..].trim_start();
            }
            _ => break,
        }
    }

    let rest = rest.trim_end_matches(['?', '!', '.']).trim();
    if rest.is_empty() {
        return None;
    }

    Some(rest.split_whitespace().collect::<Vec<_>>().join("_"))
}

/// Encyclopedia lookup source.
pub struct EncyclopediaLookup {
    client: Client,
    base_url: Url,
    settings: EncyclopediaSettings,
}

impl EncyclopediaLookup {
    pub fn new(settings: EncyclopediaSettings, timeout: Duration) -> Result<Self, ResolveError> {
        let base_url = Url::parse(&settings.base_url).map_err(|e| {
            ResolveError::Config(format!("encyclopedia.base_url {}: {}", settings.base_url, e))
        })?;
        if base_url.cannot_be_a_base() {
            return Err(ResolveError::Config(format!(
                "encyclopedia.base_url {} cannot take a path",
                settings.base_url
            )));
        }
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url,
            settings,
        })
    }

    fn summary_url(&self, title: &str) -> Result<Url, LookupError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| LookupError::Url(self.settings.base_url.clone()))?
            .pop_if_empty()
            .push(title);
        Ok(url)
    }
}

#[async_trait]
impl LookupSource for EncyclopediaLookup {
    fn name(&self) -> &str {
        "encyclopedia"
    }

    fn source_used(&self) -> SourceUsed {
        SourceUsed::Encyclopedia
    }

    async fn lookup(&self, query: &Query) -> Result<Option<String>, LookupError> {
        let Some(title) = topic_title(query.as_str(), &self.settings.strip_prefixes) else {
            debug!("No topic title left after stripping prefixes");
            return Ok(None);
        };

        let url = self.summary_url(&title)?;
        debug!(url = %url, "Querying encyclopedia");

        let response = self.client.get(url).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(LookupError::Status(response.status().as_u16()));
        }

        let summary: Summary = serde_json::from_slice(&response.bytes().await?)?;
        let extract = summary.extract.trim();
        if extract.chars().count() > self.settings.min_extract_len {
            Ok(Some(extract.to_string()))
        } else {
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn prefixes() -> Vec<String> {
        EncyclopediaSettings::default().strip_prefixes
    }

    fn lookup_for(server: &MockServer) -> EncyclopediaLookup {
        let settings = EncyclopediaSettings {
            base_url: format!("{}/api/rest_v1/page/summary/", server.uri()),
            ..Default::default()
        };
        EncyclopediaLookup::new(settings, Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_title_strips_question_prefix() {
        assert_eq!(
            topic_title("Who is Ada Lovelace?", &prefixes()).as_deref(),
            Some("Ada_Lovelace")
        );
    }

    #[test]
    fn test_title_strips_repeated_prefixes() {
        assert_eq!(
            topic_title("what is current inflation rate", &prefixes()).as_deref(),
            Some("inflation_rate")
        );
    }

    #[test]
    fn test_title_requires_word_boundary() {
        assert_eq!(
            topic_title("Currently popular languages", &prefixes()).as_deref(),
            Some("Currently_popular_languages")
        );
    }

    #[test]
    fn test_title_empty_after_stripping() {
        assert_eq!(topic_title("What is?", &prefixes()), None);
        assert_eq!(topic_title("   ", &prefixes()), None);
    }

    #[test]
    fn test_summary_url_encodes_title() {
        let lookup = EncyclopediaLookup::new(EncyclopediaSettings::default(), Duration::from_secs(1))
            .unwrap();
        let url = lookup.summary_url("C++/CLI").unwrap();
        assert_eq!(
            url.as_str(),
            "https://en.wikipedia.org/api/rest_v1/page/summary/C++%2FCLI"
        );
    }

    #[tokio::test]
    async fn test_lookup_returns_extract() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/rest_v1/page/summary/Ada_Lovelace"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "title": "Ada Lovelace",
                "extract": "Augusta Ada King, Countess of Lovelace, was an English mathematician."
            })))
            .expect(1)
            .mount(&server)
            .await;

        let result = lookup_for(&server)
            .lookup(&Query::parse("who is Ada Lovelace?").unwrap())
            .await
            .unwrap();

        assert_eq!(
            result.as_deref(),
            Some("Augusta Ada King, Countess of Lovelace, was an English mathematician.")
        );
    }

    #[tokio::test]
    async fn test_short_extract_is_no_result() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "extract": "Stub."
            })))
            .mount(&server)
            .await;

        let result = lookup_for(&server)
            .lookup(&Query::parse("obscure thing").unwrap())
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_missing_page_is_no_result() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let result = lookup_for(&server)
            .lookup(&Query::parse("nonexistent topic").unwrap())
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_blank_title_skips_request() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let result = lookup_for(&server)
            .lookup(&Query::parse("what is?").unwrap())
            .await
            .unwrap();
        assert!(result.is_none());
    }
}
