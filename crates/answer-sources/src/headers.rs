//! Request header strategies.
//!
//! Some upstream providers block clients that look automated. Adapters ask a
//! `HeaderStrategy` for a fresh header set on every call, so a retry after a
//! 403/429 goes out looking like a different browser. Deployments that don't
//! need this plug in [`PlainHeaders`].

use rand::Rng;
use reqwest::header::{
    HeaderMap, HeaderName, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, ORIGIN, REFERER, USER_AGENT,
};
use tracing::warn;

/// User agents rotated by [`BrowserHeaders`].
pub const DEFAULT_USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
];

/// Produces the extra headers attached to each outbound request.
pub trait HeaderStrategy: Send + Sync {
    fn headers(&self) -> HeaderMap;
}

/// Browser-like headers with a randomly chosen user agent per call.
#[derive(Debug, Clone)]
pub struct BrowserHeaders {
    user_agents: Vec<String>,
    referer: Option<String>,
    origin: Option<String>,
}

impl BrowserHeaders {
    pub fn new() -> Self {
        Self {
            user_agents: DEFAULT_USER_AGENTS.iter().map(|s| s.to_string()).collect(),
            referer: None,
            origin: None,
        }
    }

    /// Replace the user agent pool.
    pub fn with_user_agents(mut self, user_agents: Vec<String>) -> Self {
        self.user_agents = user_agents;
        self
    }

    pub fn with_referer(mut self, referer: impl Into<String>) -> Self {
        self.referer = Some(referer.into());
        self
    }

    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = Some(origin.into());
        self
    }

    fn pick_user_agent(&self) -> Option<&str> {
        if self.user_agents.is_empty() {
            return None;
        }
        let idx = rand::rng().random_range(0..self.user_agents.len());
        Some(self.user_agents[idx].as_str())
    }
}

impl Default for BrowserHeaders {
    fn default() -> Self {
        Self::new()
    }
}

impl HeaderStrategy for BrowserHeaders {
    fn headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("*/*"));
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));

        if let Some(agent) = self.pick_user_agent() {
            insert_checked(&mut headers, USER_AGENT, agent);
        }
        if let Some(referer) = &self.referer {
            insert_checked(&mut headers, REFERER, referer);
        }
        if let Some(origin) = &self.origin {
            insert_checked(&mut headers, ORIGIN, origin);
        }
        headers
    }
}

/// No extra headers; the client's defaults go out unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainHeaders;

impl HeaderStrategy for PlainHeaders {
    fn headers(&self) -> HeaderMap {
        HeaderMap::new()
    }
}

fn insert_checked(headers: &mut HeaderMap, name: HeaderName, value: &str) {
    match HeaderValue::from_str(value) {
        Ok(v) => {
            headers.insert(name, v);
        }
        Err(_) => warn!(header = %name, "Skipping header with invalid value"),
    }
}
