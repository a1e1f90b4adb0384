//! ChatSandbox-style chat backend.
//!
//! Wire format: `POST {url}` with `{"messages": ["..."], "character": "..."}`.
//! The answer is the raw response body.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::debug;

use crate::error::SourceError;
use crate::headers::{BrowserHeaders, HeaderStrategy, PlainHeaders};
use crate::source::{
    classify_status, classify_transport_error, SourceAdapter, SourceRequest, SourceResult,
};

/// Configuration for a ChatSandbox binding.
#[derive(Debug, Clone)]
pub struct ChatSandboxConfig {
    /// Display name
    pub name: String,

    /// Full chat endpoint URL
    pub url: String,

    /// Character (model) to answer as
    pub character: String,

    /// Request timeout
    pub timeout: Duration,

    /// Site used for Referer/Origin when randomizing headers
    pub site_url: Option<String>,

    /// Rotate browser-like headers per call
    pub randomize_headers: bool,
}

impl ChatSandboxConfig {
    /// Create config for the public ChatSandbox endpoint.
    pub fn public(character: impl Into<String>) -> Self {
        let character = character.into();
        Self {
            name: format!("chatsandbox-{}", character),
            url: "https://chatsandbox.com/api/chat".to_string(),
            character,
            timeout: Duration::from_secs(60),
            site_url: Some("https://chatsandbox.com".to_string()),
            randomize_headers: true,
        }
    }
}

#[derive(Serialize)]
struct ChatSandboxRequest<'a> {
    messages: Vec<&'a str>,
    character: &'a str,
}

/// ChatSandbox source adapter.
pub struct ChatSandboxSource {
    client: Client,
    config: ChatSandboxConfig,
    headers: Box<dyn HeaderStrategy>,
}

impl ChatSandboxSource {
    pub fn new(config: ChatSandboxConfig) -> Result<Self, SourceError> {
        if config.url.trim().is_empty() {
            return Err(SourceError::config(format!("{}: url is empty", config.name)));
        }

        let client = Client::builder().timeout(config.timeout).build()?;

        let headers: Box<dyn HeaderStrategy> = if config.randomize_headers {
            let mut browser = BrowserHeaders::new();
            if let Some(site) = &config.site_url {
                let site = site.trim_end_matches('/');
                browser = browser
                    .with_referer(format!("{}/chat/{}", site, config.character))
                    .with_origin(site);
            }
            Box::new(browser)
        } else {
            Box::new(PlainHeaders)
        };

        Ok(Self {
            client,
            config,
            headers,
        })
    }

    /// Swap the header strategy.
    pub fn with_header_strategy(mut self, strategy: Box<dyn HeaderStrategy>) -> Self {
        self.headers = strategy;
        self
    }
}

#[async_trait]
impl SourceAdapter for ChatSandboxSource {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn kind(&self) -> &str {
        "chat_sandbox"
    }

    fn model(&self) -> &str {
        &self.config.character
    }

    fn timeout(&self) -> Duration {
        self.config.timeout
    }

    async fn invoke(&self, request: &SourceRequest) -> SourceResult {
        let body = ChatSandboxRequest {
            messages: request.messages.iter().map(|t| t.content.as_str()).collect(),
            character: &request.model,
        };

        debug!(
            source = %self.config.name,
            messages = body.messages.len(),
            "Calling ChatSandbox"
        );

        let response = match self
            .client
            .post(&self.config.url)
            .headers(self.headers.headers())
            .timeout(request.timeout)
            .json(&body)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => return classify_transport_error(&e),
        };

        if let Some(failure) = classify_status(response.status()) {
            return failure;
        }

        let text = match response.text().await {
            Ok(text) => text,
            Err(e) => return classify_transport_error(&e),
        };

        let cleaned = text.trim();
        if cleaned.is_empty() {
            return SourceResult::fatal("Empty response");
        }
        SourceResult::success(cleaned)
    }
}
