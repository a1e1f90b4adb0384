//! OpenAI-compatible chat-completions backend.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::SourceError;
use crate::headers::{BrowserHeaders, HeaderStrategy, PlainHeaders};
use crate::source::{
    classify_status, classify_transport_error, SourceAdapter, SourceRequest, SourceResult,
};

/// Configuration for an OpenAI-compatible binding.
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    /// Display name
    pub name: String,

    /// API base URL (e.g., "https://api.openai.com/v1")
    pub base_url: String,

    /// Model to use (e.g., "gpt-4o-mini")
    pub model: String,

    /// API key, if the endpoint needs one
    pub api_key: Option<SecretString>,

    /// Request timeout
    pub timeout: Duration,

    /// Rotate browser-like headers per call
    pub randomize_headers: bool,
}

impl OpenAiConfig {
    /// Create config for the OpenAI API.
    pub fn openai(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        let model = model.into();
        Self {
            name: format!("openai-{}", model),
            base_url: "https://api.openai.com/v1".to_string(),
            model,
            api_key: Some(SecretString::from(api_key.into())),
            timeout: Duration::from_secs(60),
            randomize_headers: false,
        }
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessageResponse,
}

#[derive(Deserialize)]
struct ChatMessageResponse {
    #[serde(default)]
    content: Option<String>,
}

/// OpenAI-compatible source adapter.
pub struct OpenAiSource {
    client: Client,
    config: OpenAiConfig,
    headers: Box<dyn HeaderStrategy>,
}

impl OpenAiSource {
    pub fn new(config: OpenAiConfig) -> Result<Self, SourceError> {
        if config.base_url.trim().is_empty() {
            return Err(SourceError::config(format!(
                "{}: base_url is empty",
                config.name
            )));
        }

        let client = Client::builder().timeout(config.timeout).build()?;
        let headers: Box<dyn HeaderStrategy> = if config.randomize_headers {
            Box::new(BrowserHeaders::new())
        } else {
            Box::new(PlainHeaders)
        };

        Ok(Self {
            client,
            config,
            headers,
        })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/chat/completions",
            self.config.base_url.trim_end_matches('/')
        )
    }
}

#[async_trait]
impl SourceAdapter for OpenAiSource {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn kind(&self) -> &str {
        "openai_compatible"
    }

    fn model(&self) -> &str {
        &self.config.model
    }

    fn timeout(&self) -> Duration {
        self.config.timeout
    }

    async fn invoke(&self, request: &SourceRequest) -> SourceResult {
        let body = ChatRequest {
            model: &request.model,
            messages: request
                .messages
                .iter()
                .map(|t| ChatMessage {
                    role: t.role.as_str(),
                    content: &t.content,
                })
                .collect(),
        };

        debug!(source = %self.config.name, model = %request.model, "Calling chat completions");

        let mut builder = self
            .client
            .post(self.endpoint())
            .headers(self.headers.headers())
            .timeout(request.timeout)
            .json(&body);

        if let Some(key) = &self.config.api_key {
            builder = builder.bearer_auth(key.expose_secret());
        }

        let response = match builder.send().await {
            Ok(response) => response,
            Err(e) => return classify_transport_error(&e),
        };

        if let Some(failure) = classify_status(response.status()) {
            return failure;
        }

        let bytes = match response.bytes().await {
            Ok(bytes) => bytes,
            Err(e) => return classify_transport_error(&e),
        };

        let parsed: ChatResponse = match serde_json::from_slice(&bytes) {
            Ok(parsed) => parsed,
            Err(e) => return SourceResult::fatal(format!("Failed to parse response: {}", e)),
        };

        match parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|c| c.trim().to_string())
        {
            Some(content) if !content.is_empty() => SourceResult::success(content),
            _ => SourceResult::fatal("No content in response"),
        }
    }
}
