//! End-to-end test infrastructure for answer-relay.
//!
//! Provides a shared TestHarness that stands up mock HTTP servers for the
//! primary provider, the web search endpoint and the encyclopedia endpoint,
//! and builds real resolvers and daemons pointed at them.

use std::net::SocketAddr;

use tokio::net::TcpListener;
use wiremock::matchers::{method, path, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

use answer_daemon::{serve_with_shutdown, AppState};
use answer_resolver::Resolver;
use answer_types::{ProviderKind, ProviderSettings, Settings};

/// Character sent to the mock primary.
pub const CHARACTER: &str = "openai-gpt-4o";

/// Path the mock primary answers on.
pub const CHAT_PATH: &str = "/api/chat";

/// Shared test harness for E2E tests.
pub struct TestHarness {
    /// Primary chat provider
    pub primary: MockServer,
    /// Instant-answer web search
    pub web_search: MockServer,
    /// Encyclopedia summaries
    pub encyclopedia: MockServer,
}

impl TestHarness {
    /// Start the three mock servers. Nothing is mounted yet.
    pub async fn new() -> Self {
        Self {
            primary: MockServer::start().await,
            web_search: MockServer::start().await,
            encyclopedia: MockServer::start().await,
        }
    }

    /// Provider settings for a ChatSandbox binding on `server`.
    pub fn provider_for(name: &str, server: &MockServer) -> ProviderSettings {
        ProviderSettings {
            name: name.to_string(),
            kind: ProviderKind::ChatSandbox,
            base_url: format!("{}{}", server.uri(), CHAT_PATH),
            model: CHARACTER.to_string(),
            timeout_ms: 2_000,
            api_key: None,
            randomize_headers: true,
            site_url: Some(server.uri()),
        }
    }

    /// Settings pointing every outbound call at the mock servers.
    ///
    /// Backoff is shortened to 10ms and the year suffix is disabled so web
    /// search queries are deterministic.
    pub fn settings(&self) -> Settings {
        let mut settings = Settings::default();
        settings.providers = vec![Self::provider_for("mock-primary", &self.primary)];
        settings.retry.backoff_unit_ms = 10;
        settings.retry.deadline_ms = 10_000;
        settings.augmentation.timeout_ms = 2_000;
        settings.augmentation.web_search.base_url = format!("{}/", self.web_search.uri());
        settings.augmentation.web_search.append_year = false;
        settings.augmentation.encyclopedia.base_url =
            format!("{}/page/summary/", self.encyclopedia.uri());
        settings
    }

    /// Resolver built from [`settings`](Self::settings).
    pub fn resolver(&self) -> Resolver {
        Resolver::from_settings(&self.settings()).expect("Failed to build resolver")
    }

    /// Primary answers every request with `text`.
    pub async fn primary_answers(&self, text: &str) {
        Mock::given(method("POST"))
            .and(path(CHAT_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_string(text))
            .mount(&self.primary)
            .await;
    }

    /// Web search returns `abstract_text` as its abstract.
    pub async fn web_search_answers(&self, abstract_text: &str) {
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "AbstractText": abstract_text,
                "Answer": "",
                "RelatedTopics": []
            })))
            .mount(&self.web_search)
            .await;
    }

    /// Web search returns an empty instant answer.
    pub async fn web_search_empty(&self) {
        self.web_search_answers("").await;
    }

    /// Encyclopedia has no page for anything.
    pub async fn encyclopedia_missing(&self) {
        Mock::given(method("GET"))
            .and(path_regex(r"^/page/summary/.+$"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&self.encyclopedia)
            .await;
    }

    /// Start a daemon on an ephemeral port.
    pub async fn spawn_daemon(&self) -> DaemonHandle {
        spawn_daemon(self.resolver()).await
    }
}

/// A running daemon. Shut down on drop.
pub struct DaemonHandle {
    pub addr: SocketAddr,
    shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
}

impl DaemonHandle {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

impl Drop for DaemonHandle {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

/// Serve `resolver` on 127.0.0.1 with an ephemeral port.
pub async fn spawn_daemon(resolver: Resolver) -> DaemonHandle {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test listener");
    let addr = listener.local_addr().expect("Listener has no address");
    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

    tokio::spawn(serve_with_shutdown(listener, AppState::new(resolver), async {
        shutdown_rx.await.ok();
    }));

    DaemonHandle {
        addr,
        shutdown_tx: Some(shutdown_tx),
    }
}

/// Parse the JSON bodies of every request `server` received.
pub async fn received_json(server: &MockServer) -> Vec<serde_json::Value> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .map(|r| serde_json::from_slice(&r.body).expect("Request body is not JSON"))
        .collect()
}
