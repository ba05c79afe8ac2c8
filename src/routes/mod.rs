//! Router assembly: HTTP endpoints, WebSocket upgrade, static files, CORS, and HTTP tracing.

use std::sync::Arc;

use axum::{routing::get, Router};
use tower_http::{
    cors::{Any, CorsLayer},
    services::{ServeDir, ServeFile},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::state::AppState;

pub mod http;
pub mod ws;

/// Build the application router with:
/// - WebSocket at `/ws` (quiz play)
/// - REST-ish API under `/api/v1/...`
/// - Static quiz frontend from `./static` with index fallback
/// - CORS (allow any origin/method/headers)
/// - HTTP trace layer (per-request spans w/ method, path, status, latency)
pub fn build_router(state: Arc<AppState>) -> Router {
    let static_service = ServeDir::new("./static")
        .append_index_html_on_directories(true)
        .not_found_service(ServeFile::new("./static/index.html"));

    Router::new()
        .route("/ws", get(ws::ws_upgrade))
        .route("/api/v1/health", get(http::http_health))
        .route("/api/v1/quiz", get(http::http_get_quiz_info))
        .with_state(state)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .fallback_service(static_service)
}

#[cfg(test)]
mod tests {
    use super::*;

    use async_trait::async_trait;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use tokio_util::sync::CancellationToken;
    use tower::ServiceExt;

    use crate::config::QuizConfig;
    use crate::domain::QuizBatch;
    use crate::error::FetchError;
    use crate::trivia::QuestionSource;

    struct NeverCalled;

    #[async_trait]
    impl QuestionSource for NeverCalled {
        async fn fetch_batch(&self, _size: usize, _cancel: &CancellationToken) -> Result<QuizBatch, FetchError> {
            Err(FetchError::Cancelled)
        }
    }

    fn router() -> Router {
        let mut config = QuizConfig::default();
        config.quiz.topic = "Film".into();
        build_router(Arc::new(AppState::with_source(config, Arc::new(NeverCalled))))
    }

    async fn get_json(uri: &str) -> (StatusCode, serde_json::Value) {
        let res = router()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).expect("request"))
            .await
            .expect("response");
        let status = res.status();
        let bytes = to_bytes(res.into_body(), usize::MAX).await.expect("body");
        (status, serde_json::from_slice(&bytes).expect("json"))
    }

    #[tokio::test]
    async fn health_is_ok() {
        let (status, body) = get_json("/api/v1/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ok"], true);
    }

    #[tokio::test]
    async fn quiz_info_reflects_config() {
        let (status, body) = get_json("/api/v1/quiz").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["topic"], "Film");
        assert_eq!(body["questionCount"], 20);
        assert_eq!(body["durationMinutes"], 15);
        assert_eq!(body["lives"], 3);
    }
}
