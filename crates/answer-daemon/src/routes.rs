//! HTTP routes for the answer daemon.
//!
//! - `GET /`: usage hint (always 400)
//! - `GET /chat?text=...` and `POST /chat`: resolve a query
//! - `GET /health`: liveness and configured providers
//! - `GET /models`: primary provider rotation

use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use answer_resolver::VALIDATION_MESSAGE;
use answer_types::AnswerResponse;

use crate::server::AppState;

type AppStateArc = Arc<AppState>;

/// Service name reported by `/health`.
pub const SERVICE_NAME: &str = "answer-relay";

/// Parameters accepted by `/chat`, as query string or JSON body.
#[derive(Debug, Default, Deserialize)]
pub struct ChatParams {
    #[serde(default, alias = "message")]
    pub text: Option<String>,

    #[serde(default)]
    pub conversation_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UsageResponse {
    pub status_code: u16,
    pub message: String,
    pub usage: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub providers: Vec<String>,
    pub uptime_secs: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ModelInfo {
    pub name: String,
    pub kind: String,
    pub model: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ModelsResponse {
    pub providers: Vec<ModelInfo>,
}

// ============================================================================
// Chat Routes
// ============================================================================

pub fn chat_routes() -> Router<AppStateArc> {
    Router::new()
        .route("/", get(usage))
        .route("/chat", get(chat_get).post(chat_post))
}

async fn usage() -> (StatusCode, Json<UsageResponse>) {
    (
        StatusCode::BAD_REQUEST,
        Json(UsageResponse {
            status_code: 400,
            message: VALIDATION_MESSAGE.to_string(),
            usage: "Use /chat?text=your_question".to_string(),
        }),
    )
}

async fn chat_get(
    State(state): State<AppStateArc>,
    params: Result<Query<ChatParams>, QueryRejection>,
) -> (StatusCode, Json<AnswerResponse>) {
    match params {
        Ok(Query(params)) => resolve(&state, params).await,
        Err(rejection) => {
            debug!(error = %rejection.body_text(), "Rejected chat query string");
            respond(AnswerResponse::failure(400, VALIDATION_MESSAGE))
        }
    }
}

async fn chat_post(
    State(state): State<AppStateArc>,
    body: Result<Json<ChatParams>, JsonRejection>,
) -> (StatusCode, Json<AnswerResponse>) {
    match body {
        Ok(Json(params)) => resolve(&state, params).await,
        Err(rejection) => {
            debug!(error = %rejection.body_text(), "Rejected chat body");
            respond(AnswerResponse::failure(400, VALIDATION_MESSAGE))
        }
    }
}

async fn resolve(state: &AppState, params: ChatParams) -> (StatusCode, Json<AnswerResponse>) {
    let query = params.text.unwrap_or_default();
    let response = state
        .resolver
        .resolve(&query, params.conversation_id.as_deref())
        .await;
    respond(response)
}

/// HTTP status mirrors the payload's `status_code`.
fn respond(response: AnswerResponse) -> (StatusCode, Json<AnswerResponse>) {
    let status =
        StatusCode::from_u16(response.status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(response))
}

// ============================================================================
// Health Routes
// ============================================================================

pub fn health_routes() -> Router<AppStateArc> {
    Router::new()
        .route("/health", get(health))
        .route("/models", get(models))
}

async fn health(State(state): State<AppStateArc>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        service: SERVICE_NAME.to_string(),
        providers: state
            .resolver
            .providers()
            .iter()
            .map(|p| p.name().to_string())
            .collect(),
        uptime_secs: state.start_time.elapsed().as_secs(),
    })
}

async fn models(State(state): State<AppStateArc>) -> Json<ModelsResponse> {
    Json(ModelsResponse {
        providers: state
            .resolver
            .providers()
            .iter()
            .map(|p| ModelInfo {
                name: p.name().to_string(),
                kind: p.kind().to_string(),
                model: p.model().to_string(),
            })
            .collect(),
    })
}
