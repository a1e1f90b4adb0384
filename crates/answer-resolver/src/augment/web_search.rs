//! Instant-answer web search lookup (DuckDuckGo JSON API).

use std::time::Duration;

use async_trait::async_trait;
use chrono::Datelike;
use reqwest::{Client, Url};
use serde::Deserialize;
use tracing::debug;

use answer_types::{Query, SourceUsed, WebSearchSettings};

use super::LookupSource;
use crate::error::{LookupError, ResolveError};

/// The subset of the instant-answer payload we read.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct InstantAnswer {
    #[serde(default)]
    pub abstract_text: String,

    /// Usually a string, occasionally an object for widget answers
    #[serde(default)]
    pub answer: serde_json::Value,

    #[serde(default)]
    pub related_topics: Vec<serde_json::Value>,
}

impl InstantAnswer {
    fn answer_text(&self) -> &str {
        self.answer.as_str().unwrap_or_default()
    }

    fn first_related_text(&self) -> &str {
        self.related_topics
            .first()
            .and_then(|topic| topic.get("Text"))
            .and_then(|text| text.as_str())
            .unwrap_or_default()
    }
}

fn longer_than(text: &str, min_chars: usize) -> Option<String> {
    let text = text.trim();
    (text.chars().count() > min_chars).then(|| text.to_string())
}

/// Pick the abstract, then the direct answer, then the first related topic,
/// each only if it clears its length threshold.
pub fn select_instant_answer(payload: &InstantAnswer, settings: &WebSearchSettings) -> Option<String> {
    longer_than(&payload.abstract_text, settings.min_abstract_len)
        .or_else(|| longer_than(payload.answer_text(), settings.min_answer_len))
        .or_else(|| longer_than(payload.first_related_text(), settings.min_related_len))
}

/// Web search lookup source.
pub struct WebSearchLookup {
    client: Client,
    settings: WebSearchSettings,
    year: Option<i32>,
}

impl WebSearchLookup {
    pub fn new(settings: WebSearchSettings, timeout: Duration) -> Result<Self, ResolveError> {
        Url::parse(&settings.base_url).map_err(|e| {
            ResolveError::Config(format!("web_search.base_url {}: {}", settings.base_url, e))
        })?;
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            settings,
            year: None,
        })
    }

    /// Pin the year appended to queries instead of using the current one.
    pub fn with_year(mut self, year: i32) -> Self {
        self.year = Some(year);
        self
    }

    fn search_terms(&self, query: &Query) -> String {
        if !self.settings.append_year {
            return query.as_str().to_string();
        }
        let year = self.year.unwrap_or_else(|| chrono::Utc::now().year());
        format!("{} {}", query, year)
    }

    fn request_url(&self, query: &Query) -> Result<Url, LookupError> {
        let terms = self.search_terms(query);
        Url::parse_with_params(
            &self.settings.base_url,
            &[
                ("q", terms.as_str()),
                ("format", "json"),
                ("no_html", "1"),
                ("skip_disambig", "1"),
            ],
        )
        .map_err(|e| LookupError::Url(e.to_string()))
    }
}

#[async_trait]
impl LookupSource for WebSearchLookup {
    fn name(&self) -> &str {
        "web_search"
    }

    fn source_used(&self) -> SourceUsed {
        SourceUsed::WebSearch
    }

    async fn lookup(&self, query: &Query) -> Result<Option<String>, LookupError> {
        let url = self.request_url(query)?;
        debug!(url = %url, "Querying web search");

        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(LookupError::Status(response.status().as_u16()));
        }

        // The endpoint labels JSON as javascript, so parse the bytes directly
        let bytes = response.bytes().await?;
        let payload: InstantAnswer = serde_json::from_slice(&bytes)?;

        Ok(select_instant_answer(&payload, &self.settings))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn payload(json: serde_json::Value) -> InstantAnswer {
        serde_json::from_value(json).unwrap()
    }

    fn lookup_for(server: &MockServer) -> WebSearchLookup {
        let settings = WebSearchSettings {
            base_url: format!("{}/", server.uri()),
            ..Default::default()
        };
        WebSearchLookup::new(settings, Duration::from_secs(5))
            .unwrap()
            .with_year(2026)
    }

    #[test]
    fn test_prefers_abstract() {
        let p = payload(serde_json::json!({
            "AbstractText": "Rust is a general-purpose programming language.",
            "Answer": "a language",
        }));
        assert_eq!(
            select_instant_answer(&p, &WebSearchSettings::default()).as_deref(),
            Some("Rust is a general-purpose programming language.")
        );
    }

    #[test]
    fn test_short_abstract_falls_to_answer() {
        let p = payload(serde_json::json!({
            "AbstractText": "Too short.",
            "Answer": "42 degrees Celsius",
        }));
        assert_eq!(
            select_instant_answer(&p, &WebSearchSettings::default()).as_deref(),
            Some("42 degrees Celsius")
        );
    }

    #[test]
    fn test_related_topic_is_last_resort() {
        let p = payload(serde_json::json!({
            "AbstractText": "",
            "Answer": {"type": "calculator"},
            "RelatedTopics": [
                {"Text": "Ferris the crab is the unofficial Rust mascot.", "FirstURL": "x"},
                {"Text": "ignored"}
            ]
        }));
        assert_eq!(
            select_instant_answer(&p, &WebSearchSettings::default()).as_deref(),
            Some("Ferris the crab is the unofficial Rust mascot.")
        );
    }

    #[test]
    fn test_nothing_long_enough() {
        let p = payload(serde_json::json!({
            "AbstractText": "short",
            "Answer": "tiny",
            "RelatedTopics": [{"Text": "also short"}]
        }));
        assert!(select_instant_answer(&p, &WebSearchSettings::default()).is_none());
        assert!(select_instant_answer(&InstantAnswer::default(), &WebSearchSettings::default()).is_none());
    }

    #[test]
    fn test_invalid_base_url_rejected() {
        let settings = WebSearchSettings {
            base_url: "not a url".to_string(),
            ..Default::default()
        };
        assert!(WebSearchLookup::new(settings, Duration::from_secs(1)).is_err());
    }

    #[tokio::test]
    async fn test_lookup_appends_year_and_flags() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("q", "who won the election 2026"))
            .and(query_param("format", "json"))
            .and(query_param("no_html", "1"))
            .and(query_param("skip_disambig", "1"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "application/x-javascript")
                    .set_body_string(
                        r#"{"AbstractText": "The 2026 election was won by the incumbent party."}"#,
                    ),
            )
            .expect(1)
            .mount(&server)
            .await;

        let lookup = lookup_for(&server);
        let result = lookup
            .lookup(&Query::parse("who won the election").unwrap())
            .await
            .unwrap();

        assert_eq!(
            result.as_deref(),
            Some("The 2026 election was won by the incumbent party.")
        );
    }

    #[tokio::test]
    async fn test_lookup_without_year() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("q", "rust language"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "Answer": "A systems programming language"
            })))
            .mount(&server)
            .await;

        let settings = WebSearchSettings {
            base_url: format!("{}/", server.uri()),
            append_year: false,
            ..Default::default()
        };
        let lookup = WebSearchLookup::new(settings, Duration::from_secs(5)).unwrap();

        let result = lookup.lookup(&Query::parse("rust language").unwrap()).await.unwrap();
        assert_eq!(result.as_deref(), Some("A systems programming language"));
    }

    #[tokio::test]
    async fn test_server_error_is_lookup_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let result = lookup_for(&server).lookup(&Query::parse("x").unwrap()).await;
        assert!(matches!(result, Err(LookupError::Status(500))));
    }

    #[tokio::test]
    async fn test_malformed_body_is_lookup_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html></html>"))
            .mount(&server)
            .await;

        let result = lookup_for(&server).lookup(&Query::parse("x").unwrap()).await;
        assert!(matches!(result, Err(LookupError::Parse(_))));
    }
}
