//! # HTTP Interface
//!
//! Routes for the chat page, the chat endpoint and the health/version probes.

use axum::extract::State;
use axum::http::header;
use axum::response::{Html, IntoResponse};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::application::orchestrator::Orchestrator;
use crate::strings::templates;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(orchestrator: Arc<Orchestrator>) -> Self {
        Self {
            orchestrator,
            started_at: Utc::now(),
        }
    }
}

fn default_session_id() -> String {
    "default".to_string()
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub message: String,
    #[serde(default = "default_session_id")]
    pub session_id: String,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct ChatResponse {
    pub reply: String,
}

#[derive(Debug, Deserialize)]
pub struct ResetRequest {
    #[serde(default = "default_session_id")]
    pub session_id: String,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/static/js/chat.js", get(chat_js))
        .route("/health", get(health))
        .route("/version", get(version))
        .route("/chat", post(chat))
        .route("/reset", post(reset))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn index() -> Html<&'static str> {
    Html(templates::INDEX_HTML)
}

async fn chat_js() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "application/javascript; charset=utf-8")],
        templates::CHAT_JS,
    )
}

async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "version": VERSION,
        "started_at": state.started_at.to_rfc3339(),
        "sessions": state.orchestrator.store().len(),
    }))
}

async fn version() -> Json<Value> {
    Json(json!({ "version": VERSION }))
}

async fn chat(State(state): State<AppState>, Json(request): Json<ChatRequest>) -> Json<ChatResponse> {
    tracing::info!(session = %request.session_id, "Received chat message");
    let reply = state
        .orchestrator
        .handle_message(&request.session_id, &request.message)
        .await;
    Json(ChatResponse { reply })
}

async fn reset(State(state): State<AppState>, Json(request): Json<ResetRequest>) -> Json<Value> {
    let reset = state.orchestrator.store().reset(&request.session_id);
    tracing::info!(session = %request.session_id, reset, "Session reset requested");
    Json(json!({ "reset": reset }))
}
