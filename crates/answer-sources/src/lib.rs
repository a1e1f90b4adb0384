//! # answer-sources
//!
//! Primary answer providers for answer-relay.
//!
//! Every provider implements [`SourceAdapter`]: one call, one outbound
//! request, one classified [`SourceResult`]. Retrying and rotating between
//! providers is the resolver's job, not the adapter's.
//!
//! ## Adapters
//!
//! - [`ChatSandboxSource`]: `{messages, character}` endpoints answering in plain text
//! - [`OpenAiSource`]: OpenAI-compatible `/chat/completions`
//! - [`MockSource`]: scripted results for tests

mod chat_sandbox;
mod error;
mod headers;
mod mock;
mod openai;
mod source;

use std::sync::Arc;

use secrecy::SecretString;

use answer_types::{ProviderKind, ProviderSettings};

pub use chat_sandbox::{ChatSandboxConfig, ChatSandboxSource};
pub use error::SourceError;
pub use headers::{BrowserHeaders, HeaderStrategy, PlainHeaders, DEFAULT_USER_AGENTS};
pub use mock::MockSource;
pub use openai::{OpenAiConfig, OpenAiSource};
pub use source::{
    classify_status, classify_transport_error, SourceAdapter, SourceRequest, SourceResult,
};

/// Build one adapter from a provider settings entry.
pub fn build_source(settings: &ProviderSettings) -> Result<Arc<dyn SourceAdapter>, SourceError> {
    let source: Arc<dyn SourceAdapter> = match settings.kind {
        ProviderKind::ChatSandbox => Arc::new(ChatSandboxSource::new(ChatSandboxConfig {
            name: settings.name.clone(),
            url: settings.base_url.clone(),
            character: settings.model.clone(),
            timeout: settings.timeout(),
            site_url: settings.site_url.clone(),
            randomize_headers: settings.randomize_headers,
        })?),
        ProviderKind::OpenaiCompatible => Arc::new(OpenAiSource::new(OpenAiConfig {
            name: settings.name.clone(),
            base_url: settings.base_url.clone(),
            model: settings.model.clone(),
            api_key: settings.api_key.clone().map(SecretString::from),
            timeout: settings.timeout(),
            randomize_headers: settings.randomize_headers,
        })?),
    };
    Ok(source)
}

/// Build the primary rotation, in configured order.
pub fn build_sources(
    providers: &[ProviderSettings],
) -> Result<Vec<Arc<dyn SourceAdapter>>, SourceError> {
    if providers.is_empty() {
        return Err(SourceError::config("no providers configured"));
    }
    providers.iter().map(build_source).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use answer_types::Settings;

    #[test]
    fn test_build_default_sources() {
        let settings = Settings::default();
        let sources = build_sources(&settings.providers).unwrap();

        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].kind(), "chat_sandbox");
        assert_eq!(sources[0].model(), "openai-gpt-4o");
        assert_eq!(sources[0].timeout(), std::time::Duration::from_secs(60));
    }

    #[test]
    fn test_build_openai_source() {
        let provider = ProviderSettings {
            name: "local".to_string(),
            kind: ProviderKind::OpenaiCompatible,
            base_url: "http://localhost:11434/v1".to_string(),
            model: "llama3".to_string(),
            timeout_ms: 30_000,
            api_key: None,
            randomize_headers: false,
            site_url: None,
        };

        let source = build_source(&provider).unwrap();
        assert_eq!(source.name(), "local");
        assert_eq!(source.kind(), "openai_compatible");
    }

    #[test]
    fn test_build_sources_rejects_empty() {
        assert!(build_sources(&[]).is_err());
    }
}
