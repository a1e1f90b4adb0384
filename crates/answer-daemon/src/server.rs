//! HTTP server for the answer daemon.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use answer_resolver::Resolver;

use crate::routes;

/// Application state shared across handlers
pub struct AppState {
    pub resolver: Resolver,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(resolver: Resolver) -> Self {
        Self {
            resolver,
            start_time: Instant::now(),
        }
    }
}

/// Build the application router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(routes::chat_routes())
        .merge(routes::health_routes())
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Serve on an already bound listener until `shutdown` resolves.
pub async fn serve_with_shutdown<F>(listener: TcpListener, state: AppState, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = router(Arc::new(state));
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .context("HTTP server error")
}

/// Bind `addr` and serve until `shutdown` resolves.
pub async fn run_server_with_shutdown<F>(addr: SocketAddr, state: AppState, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Listening on http://{}", listener.local_addr()?);

    serve_with_shutdown(listener, state, shutdown).await
}
