//! HTTP endpoint handlers. Quiz play itself happens over the WebSocket.

use std::sync::Arc;
use axum::{extract::State, Json, response::IntoResponse};
use tracing::instrument;

use crate::protocol::{HealthOut, QuizInfoOut};
use crate::state::AppState;

#[instrument(level = "info")]
pub async fn http_health() -> impl IntoResponse { Json(HealthOut { ok: true }) }

/// Welcome-screen metadata; no questions are fetched here.
#[instrument(level = "info", skip(state))]
pub async fn http_get_quiz_info(State(state): State<Arc<AppState>>) -> impl IntoResponse {
  Json(QuizInfoOut::new(&state.config.quiz, state.config.source.batch_size))
}
