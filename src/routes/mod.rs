//! API routes

use axum::{
    body::Body,
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};

use crate::conversation::Turn;
use crate::providers::ProviderError;
use crate::relay;
use crate::AppState;

/// `text/html` keeps intermediaries from buffering the body; it is not HTML.
const STREAM_CONTENT_TYPE: &str = "text/html; charset=utf-8";

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub messages: Vec<Turn>,
}

/// Errors surfaced to the client before the stream starts.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Upstream(#[from] ProviderError),
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::Upstream(_) => StatusCode::BAD_GATEWAY,
        };
        let body = ErrorBody {
            error: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn chat(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Response, ApiError> {
    let turns = relay::upstream_turns(&state.instruction, &request.messages);
    tracing::info!(turns = request.messages.len(), "relaying chat request");

    let upstream = state.provider.stream_chat(&turns).await.map_err(|err| {
        tracing::error!(%err, "upstream request failed");
        err
    })?;

    let body = Body::from_stream(relay::relay(upstream));

    Ok((
        [
            (header::CONTENT_TYPE, STREAM_CONTENT_TYPE),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        body,
    )
        .into_response())
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/api/chat", post(chat))
}
