//! HTTP boundary
//!
//! - `POST /ai/chat`   `{message}` -> `{agent, text}`
//! - `POST /ai/stream` `{message}` -> server-sent progress events
//! - `GET  /ai/health` -> `{tool_layer: status}`

pub mod stream;

use std::sync::Arc;
use std::time::Duration;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::{header, HeaderName, HeaderValue, StatusCode};
use axum::response::sse::{KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use tokio::net::TcpListener;
use tracing::{error, info};

use crate::agent::{HealthReport, Orchestrator};
use crate::core::{AgentReply, Result, StewardError};

pub use stream::ProgressStream;

pub const CHAT_PATH: &str = "/ai/chat";
pub const STREAM_PATH: &str = "/ai/stream";
pub const HEALTH_PATH: &str = "/ai/health";

const X_ACCEL_BUFFERING: HeaderName = HeaderName::from_static("x-accel-buffering");

#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub message: Option<String>,
}

impl ChatRequest {
    fn into_message(self) -> std::result::Result<String, ApiError> {
        match self.message {
            Some(message) if !message.trim().is_empty() => Ok(message),
            _ => Err(ApiError::BadRequest("Message is required".to_string())),
        }
    }
}

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (code, msg) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };
        (code, Json(serde_json::json!({ "error": msg }))).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

pub fn router(orchestrator: Arc<Orchestrator>) -> Router {
    Router::new()
        .route(CHAT_PATH, post(chat))
        .route(STREAM_PATH, post(stream_chat))
        .route(HEALTH_PATH, get(health))
        .with_state(AppState { orchestrator })
}

async fn chat(
    State(state): State<AppState>,
    body: std::result::Result<Json<ChatRequest>, JsonRejection>,
) -> std::result::Result<Json<AgentReply>, ApiError> {
    let Json(request) = body?;
    let message = request.into_message()?;

    let orchestrator = Arc::clone(&state.orchestrator);
    let reply = tokio::spawn(async move { orchestrator.run(&message).await })
        .await
        .map_err(|e| {
            error!(error = %e, "Chat request failed");
            ApiError::Internal(e.to_string())
        })?;

    Ok(Json(reply))
}

async fn stream_chat(
    State(state): State<AppState>,
    body: std::result::Result<Json<ChatRequest>, JsonRejection>,
) -> std::result::Result<Response, ApiError> {
    let Json(request) = body?;
    let message = request.into_message()?;

    let events = ProgressStream::open_sse(Arc::clone(&state.orchestrator), message);
    let sse = Sse::new(events).keep_alive(KeepAlive::new().interval(Duration::from_secs(15)));

    Ok((
        [
            (header::CACHE_CONTROL, HeaderValue::from_static("no-cache")),
            (X_ACCEL_BUFFERING, HeaderValue::from_static("no")),
        ],
        sse,
    )
        .into_response())
}

async fn health(State(state): State<AppState>) -> Json<HealthReport> {
    Json(state.orchestrator.health().await)
}

/// Serve the HTTP boundary on `addr` until Ctrl-C
pub async fn serve(orchestrator: Arc<Orchestrator>, addr: &str) -> Result<()> {
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| StewardError::config(format!("Failed to bind {}: {}", addr, e)))?;
    info!(addr = %listener.local_addr()?, "Listening");

    axum::serve(listener, router(Arc::clone(&orchestrator)))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    info!("Shutting down");
    orchestrator.shutdown().await;
    Ok(())
}
