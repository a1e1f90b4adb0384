//! Configuration loading for answer-relay.
//!
//! Layered config: defaults -> config file -> env vars -> CLI flags.
//! The default config file lives at ~/.config/answer-relay/config.toml and
//! environment overrides use the `ANSWER__` prefix with `__` between
//! nesting levels (e.g. `ANSWER__RETRY__MAX_ATTEMPTS=5`).

use config::{Config, Environment, File};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::error::AnswerError;

/// Kind of chat backend a provider entry talks to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    /// ChatSandbox-style endpoint: `{messages: [string], character}` in, plain text out
    #[default]
    ChatSandbox,
    /// OpenAI-compatible `/chat/completions`
    OpenaiCompatible,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::ChatSandbox => "chat_sandbox",
            ProviderKind::OpenaiCompatible => "openai_compatible",
        }
    }
}

/// One primary chat provider binding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderSettings {
    /// Display name used in logs and `/models`
    pub name: String,

    /// Backend protocol
    #[serde(default)]
    pub kind: ProviderKind,

    /// Endpoint URL (full URL for chat_sandbox, API base for openai_compatible)
    pub base_url: String,

    /// Model name or ChatSandbox character
    pub model: String,

    /// Per-request timeout (ms)
    #[serde(default = "default_chat_timeout")]
    pub timeout_ms: u64,

    /// API key, set in a config file (provider entries cannot come from env vars)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Rotate browser-like request headers on every call
    #[serde(default = "default_true")]
    pub randomize_headers: bool,

    /// Site used for Referer/Origin headers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub site_url: Option<String>,
}

fn default_chat_timeout() -> u64 {
    60_000
}

fn default_true() -> bool {
    true
}

impl ProviderSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

fn default_providers() -> Vec<ProviderSettings> {
    vec![ProviderSettings {
        name: "chatsandbox-gpt-4o".to_string(),
        kind: ProviderKind::ChatSandbox,
        base_url: "https://chatsandbox.com/api/chat".to_string(),
        model: "openai-gpt-4o".to_string(),
        timeout_ms: default_chat_timeout(),
        api_key: None,
        randomize_headers: true,
        site_url: Some("https://chatsandbox.com".to_string()),
    }]
}

/// Retry and deadline settings for the primary path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrySettings {
    /// Maximum attempts per resolution (first try included)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Linear backoff unit (ms); attempt `n` waits `n * unit`
    #[serde(default = "default_backoff_unit")]
    pub backoff_unit_ms: u64,

    /// End-to-end budget for the primary path, sleeps included (ms)
    #[serde(default = "default_deadline")]
    pub deadline_ms: u64,
}

fn default_max_attempts() -> u32 {
    3
}

fn default_backoff_unit() -> u64 {
    2_000
}

fn default_deadline() -> u64 {
    60_000
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            backoff_unit_ms: default_backoff_unit(),
            deadline_ms: default_deadline(),
        }
    }
}

impl RetrySettings {
    pub fn backoff_unit(&self) -> Duration {
        Duration::from_millis(self.backoff_unit_ms)
    }

    pub fn deadline(&self) -> Duration {
        Duration::from_millis(self.deadline_ms)
    }
}

/// Phrase list for the staleness heuristic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StalenessSettings {
    /// When false, primary answers are never flagged stale
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Case-insensitive phrases that mark an answer as stale
    #[serde(default = "default_stale_phrases")]
    pub phrases: Vec<String>,
}

/// Phrases that signal a knowledge cutoff or lack of real-time data.
pub fn default_stale_phrases() -> Vec<String> {
    [
        "as of 2023",
        "as of my last update",
        "as of my knowledge",
        "knowledge cutoff",
        "knowledge cut-off",
        "real-time information",
        "real-time data",
        "my training data",
        "last update",
        "i don't have access to current",
        "i do not have access to current",
        "i cannot browse",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

impl Default for StalenessSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            phrases: default_stale_phrases(),
        }
    }
}

/// Web search (instant answer) lookup settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebSearchSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Instant-answer JSON endpoint
    #[serde(default = "default_web_search_url")]
    pub base_url: String,

    /// Append the current year to the query
    #[serde(default = "default_true")]
    pub append_year: bool,

    /// `AbstractText` must be longer than this
    #[serde(default = "default_min_long_text")]
    pub min_abstract_len: usize,

    /// `Answer` must be longer than this
    #[serde(default = "default_min_answer_len")]
    pub min_answer_len: usize,

    /// First related topic text must be longer than this
    #[serde(default = "default_min_long_text")]
    pub min_related_len: usize,
}

fn default_web_search_url() -> String {
    "https://api.duckduckgo.com/".to_string()
}

fn default_min_long_text() -> usize {
    30
}

fn default_min_answer_len() -> usize {
    10
}

impl Default for WebSearchSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: default_web_search_url(),
            append_year: true,
            min_abstract_len: default_min_long_text(),
            min_answer_len: default_min_answer_len(),
            min_related_len: default_min_long_text(),
        }
    }
}

/// Encyclopedia summary lookup settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncyclopediaSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Summary endpoint; the topic title is appended as a path segment
    #[serde(default = "default_encyclopedia_url")]
    pub base_url: String,

    /// `extract` must be longer than this
    #[serde(default = "default_min_long_text")]
    pub min_extract_len: usize,

    /// Leading phrases stripped from the query before the title lookup
    #[serde(default = "default_strip_prefixes")]
    pub strip_prefixes: Vec<String>,
}

fn default_encyclopedia_url() -> String {
    "https://en.wikipedia.org/api/rest_v1/page/summary/".to_string()
}

fn default_strip_prefixes() -> Vec<String> {
    ["who is", "what is", "current"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

impl Default for EncyclopediaSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: default_encyclopedia_url(),
            min_extract_len: default_min_long_text(),
            strip_prefixes: default_strip_prefixes(),
        }
    }
}

/// Augmentation chain settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AugmentationSettings {
    /// When false, a failed primary path yields the "service busy" answer
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Per-lookup timeout (ms)
    #[serde(default = "default_lookup_timeout")]
    pub timeout_ms: u64,

    #[serde(default)]
    pub web_search: WebSearchSettings,

    #[serde(default)]
    pub encyclopedia: EncyclopediaSettings,
}

fn default_lookup_timeout() -> u64 {
    10_000
}

impl Default for AugmentationSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            timeout_ms: default_lookup_timeout(),
            web_search: WebSearchSettings::default(),
            encyclopedia: EncyclopediaSettings::default(),
        }
    }
}

impl AugmentationSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// In-memory conversation store limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationSettings {
    /// When false, nothing is recorded and requests carry only the new turn
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Turns kept per conversation; oldest are dropped first
    #[serde(default = "default_max_turns")]
    pub max_turns: usize,

    /// Conversations kept; least recently used is evicted first
    #[serde(default = "default_max_conversations")]
    pub max_conversations: usize,
}

fn default_max_turns() -> usize {
    20
}

fn default_max_conversations() -> usize {
    1024
}

impl Default for ConversationSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            max_turns: default_max_turns(),
            max_conversations: default_max_conversations(),
        }
    }
}

/// Main application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// HTTP server host
    #[serde(default = "default_http_host")]
    pub http_host: String,

    /// HTTP server port
    #[serde(default = "default_http_port")]
    pub http_port: u16,

    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub retry: RetrySettings,

    /// Primary chat providers, in rotation order
    #[serde(default = "default_providers")]
    pub providers: Vec<ProviderSettings>,

    #[serde(default)]
    pub staleness: StalenessSettings,

    #[serde(default)]
    pub augmentation: AugmentationSettings,

    #[serde(default)]
    pub conversation: ConversationSettings,
}

fn default_http_host() -> String {
    "0.0.0.0".to_string()
}

fn default_http_port() -> u16 {
    8000
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            http_host: default_http_host(),
            http_port: default_http_port(),
            log_level: default_log_level(),
            retry: RetrySettings::default(),
            providers: default_providers(),
            staleness: StalenessSettings::default(),
            augmentation: AugmentationSettings::default(),
            conversation: ConversationSettings::default(),
        }
    }
}

impl Settings {
    /// Load settings with layered precedence:
    /// 1. Built-in defaults
    /// 2. Config file (~/.config/answer-relay/config.toml)
    /// 3. CLI-specified config file (optional)
    /// 4. Environment variables (ANSWER__*)
    ///
    /// CLI flags should be applied by the caller after this returns.
    pub fn load(cli_config_path: Option<&str>) -> Result<Self, AnswerError> {
        let config_dir = ProjectDirs::from("", "", "answer-relay")
            .map(|p| p.config_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."));

        let default_config_path = config_dir.join("config");

        let mut builder = Config::builder()
            .set_default("http_host", default_http_host())
            .map_err(|e| AnswerError::Config(e.to_string()))?
            .set_default("http_port", default_http_port() as i64)
            .map_err(|e| AnswerError::Config(e.to_string()))?
            .set_default("log_level", default_log_level())
            .map_err(|e| AnswerError::Config(e.to_string()))?
            .set_default("retry.max_attempts", default_max_attempts() as i64)
            .map_err(|e| AnswerError::Config(e.to_string()))?
            .set_default("retry.backoff_unit_ms", default_backoff_unit() as i64)
            .map_err(|e| AnswerError::Config(e.to_string()))?
            .set_default("retry.deadline_ms", default_deadline() as i64)
            .map_err(|e| AnswerError::Config(e.to_string()))?
            .add_source(File::with_name(&default_config_path.to_string_lossy()).required(false));

        if let Some(path) = cli_config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        // Format: ANSWER__HTTP_PORT, ANSWER__RETRY__MAX_ATTEMPTS, ...
        builder = builder.add_source(
            Environment::with_prefix("ANSWER")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder
            .build()
            .map_err(|e| AnswerError::Config(e.to_string()))?;

        let settings: Settings = config
            .try_deserialize()
            .map_err(|e| AnswerError::Config(e.to_string()))?;

        settings.validate().map_err(AnswerError::Config)?;
        Ok(settings)
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if self.retry.max_attempts == 0 {
            return Err("retry.max_attempts must be > 0".to_string());
        }
        if self.retry.deadline_ms == 0 {
            return Err("retry.deadline_ms must be > 0".to_string());
        }
        if self.providers.is_empty() {
            return Err("at least one provider must be configured".to_string());
        }
        for provider in &self.providers {
            if provider.timeout_ms == 0 {
                return Err(format!("provider {}: timeout_ms must be > 0", provider.name));
            }
            if provider.base_url.trim().is_empty() {
                return Err(format!("provider {}: base_url is empty", provider.name));
            }
        }
        if self.augmentation.timeout_ms == 0 {
            return Err("augmentation.timeout_ms must be > 0".to_string());
        }
        if self.conversation.max_turns < 2 || self.conversation.max_turns % 2 != 0 {
            return Err("conversation.max_turns must be an even number >= 2".to_string());
        }
        if self.conversation.max_conversations == 0 {
            return Err("conversation.max_conversations must be > 0".to_string());
        }
        Ok(())
    }

    /// Get the socket address for the HTTP server
    pub fn http_addr(&self) -> String {
        format!("{}:{}", self.http_host, self.http_port)
    }

    /// Copy of these settings with provider API keys masked.
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        for provider in &mut copy.providers {
            if provider.api_key.is_some() {
                provider.api_key = Some("***".to_string());
            }
        }
        copy
    }

    /// Render as TOML (secrets masked).
    pub fn to_toml(&self) -> Result<String, AnswerError> {
        toml::to_string_pretty(&self.redacted()).map_err(|e| AnswerError::Config(e.to_string()))
    }
}
