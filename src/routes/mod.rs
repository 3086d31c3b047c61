//! Router assembly: HTTP endpoints, cron endpoints, image files, CORS, and HTTP tracing.

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::state::AppState;

pub mod http;

/// Build the application router with:
/// - user-facing API under `/api/v1/...`
/// - scheduler endpoints under `/cron/...` (cron header required)
/// - rendered images from the blob directory under `/images` when one is configured
/// - CORS (allow any origin/method/headers)
/// - HTTP trace layer (per-request spans w/ method, path, status, latency)
pub fn build_router(state: Arc<AppState>) -> Router {
    let mut router = Router::new()
        .route("/api/v1/health", get(http::http_health))
        .route("/api/v1/problem", get(http::http_get_problem))
        .route("/api/v1/problem/:id", get(http::http_get_problem_by_id))
        .route("/api/v1/answer/:id", get(http::http_get_answer))
        .route("/cron/generate", post(http::cron_generate))
        .route("/cron/delete", post(http::cron_delete));

    if let Some(dir) = &state.blob_dir {
        router = router.nest_service("/images", ServeDir::new(dir));
    }

    router
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
}
