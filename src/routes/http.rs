//! HTTP endpoint handlers. These are thin wrappers that forward to the pool manager.
//! Each handler is instrumented; internal error detail is logged, never returned.

use std::sync::Arc;
use axum::{
  extract::{Path, Query, State},
  http::{HeaderMap, StatusCode},
  response::{IntoResponse, Response},
  Json,
};
use tokio::time::Instant;
use tracing::{error, info, instrument, warn};

use crate::domain::{DifficultyClass, RecordId};
use crate::error::{PoolError, StoreError};
use crate::protocol::*;
use crate::state::AppState;
use crate::util::fill_template;

fn caption(state: &AppState, class: DifficultyClass) -> String {
  fill_template(&state.config().caption_template, &[("moves", &class.to_string())])
}

fn error_response(status: StatusCode, message: &str) -> Response {
  (status, Json(ErrorOut { error: message.to_string() })).into_response()
}

/// Map pool failures to user-visible responses: exhaustion is "try again later",
/// an unknown id is 404, everything else is a generic 500.
fn pool_error_response(e: &PoolError) -> Response {
  match e {
    PoolError::Exhausted { .. } => error_response(StatusCode::SERVICE_UNAVAILABLE, "no problem available"),
    PoolError::Store(StoreError::NotFound { .. }) => error_response(StatusCode::NOT_FOUND, "not found"),
    _ => error_response(StatusCode::INTERNAL_SERVER_ERROR, "internal server error"),
  }
}

fn is_cron_request(state: &AppState, headers: &HeaderMap) -> bool {
  let h = &state.config().cron_header;
  headers
    .get(h.name.as_str())
    .and_then(|v| v.to_str().ok())
    .map_or(false, |v| v == h.value)
}

#[instrument(level = "info")]
pub async fn http_health() -> impl IntoResponse { Json(HealthOut { ok: true }) }

#[instrument(level = "info", skip(state), fields(class = ?q.class))]
pub async fn http_get_problem(
  State(state): State<Arc<AppState>>,
  Query(q): Query<ProblemQuery>,
) -> Response {
  let class = match q.class.map(DifficultyClass) {
    Some(c) if state.config().serves(c) => c,
    _ => {
      warn!(target: "tsume_pool", class = ?q.class, "Invalid problem type requested");
      return error_response(StatusCode::NOT_FOUND, "unknown problem type");
    }
  };
  let deadline = Instant::now() + state.config().request_timeout();
  match state.pool.select(class, deadline).await {
    Ok(sel) => {
      info!(target: "pool", %class, id = %sel.record.id, origin = sel.origin.as_str(), "HTTP problem served");
      Json(to_out(&sel.record, caption(&state, class), Some(sel.origin))).into_response()
    }
    Err(e) if e.is_exhausted() => {
      warn!(target: "pool", %class, "No problem available");
      error_response(StatusCode::SERVICE_UNAVAILABLE, "no problem available")
    }
    Err(e) => {
      error!(target: "pool", %class, error = %e, "Failed to fetch problem");
      error_response(StatusCode::INTERNAL_SERVER_ERROR, "internal server error")
    }
  }
}

#[instrument(level = "info", skip(state), fields(%id))]
pub async fn http_get_problem_by_id(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
) -> Response {
  let deadline = Instant::now() + state.config().request_timeout();
  let id = RecordId(id);
  match state.pool.get(&id, deadline).await {
    Ok(rec) => {
      let cap = caption(&state, rec.difficulty_class);
      Json(to_out(&rec, cap, None)).into_response()
    }
    Err(e) => {
      info!(target: "tsume_pool", %id, error = %e, "Problem lookup failed");
      pool_error_response(&e)
    }
  }
}

#[instrument(level = "info", skip(state), fields(%id))]
pub async fn http_get_answer(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
) -> Response {
  let deadline = Instant::now() + state.config().request_timeout();
  let id = RecordId(id);
  let rec = match state.pool.get(&id, deadline).await {
    Ok(rec) => rec,
    Err(e) => {
      info!(target: "tsume_pool", %id, error = %e, "Answer lookup failed");
      return pool_error_response(&e);
    }
  };
  let encoder = state.pool.encoder();
  let (puzzle, moves) = match encoder.decode(&rec.encoded_state) {
    Ok(decoded) => decoded,
    Err(e) => {
      error!(target: "tsume_pool", %id, error = %e, "Failed to decode stored problem");
      return error_response(StatusCode::INTERNAL_SERVER_ERROR, "internal server error");
    }
  };
  let moves = encoder.move_strings(&puzzle, &moves);
  let text = format!("Answer: {}", moves.join(" "));
  Json(AnswerOut {
    id: rec.id.0.clone(),
    class: rec.difficulty_class,
    caption: caption(&state, rec.difficulty_class),
    moves,
    text,
    answer_image: rec.answer_image.clone(),
  }).into_response()
}

/// Replenish every configured class once. Stops at the first failing class.
#[instrument(level = "info", skip(state, headers))]
pub async fn cron_generate(
  State(state): State<Arc<AppState>>,
  headers: HeaderMap,
) -> Response {
  if !is_cron_request(&state, &headers) {
    return error_response(StatusCode::BAD_REQUEST, "cron request only");
  }
  info!(target: "tsume_pool", "generate...");
  let deadline = Instant::now() + state.config().job_timeout();
  let mut results = Vec::new();
  for &class in &state.config().classes {
    match state.pool.replenish(class, deadline).await {
      Ok(outcome) => results.push(ClassResult { class, outcome: outcome.into() }),
      Err(e) => {
        error!(target: "pool", %class, error = %e, "Failed to generate");
        return pool_error_response(&e);
      }
    }
  }
  Json(GenerateOut { results }).into_response()
}

#[instrument(level = "info", skip(state, headers))]
pub async fn cron_delete(
  State(state): State<Arc<AppState>>,
  headers: HeaderMap,
) -> Response {
  if !is_cron_request(&state, &headers) {
    return error_response(StatusCode::BAD_REQUEST, "cron request only");
  }
  info!(target: "tsume_pool", "delete...");
  let deadline = Instant::now() + state.config().job_timeout();
  match state.pool.evict_stale(state.config().retention(), deadline).await {
    Ok(report) => {
      let status = if report.failures.is_empty() { StatusCode::OK } else { StatusCode::INTERNAL_SERVER_ERROR };
      info!(target: "pool", deleted = report.deleted, failed = report.failures.len(), "Stale sweep finished");
      let body = DeleteOut { deleted: report.deleted, failed: report.failures.len(), failures: report.failures };
      (status, Json(body)).into_response()
    }
    Err(e) => {
      error!(target: "pool", error = %e, "Stale sweep failed");
      pool_error_response(&e)
    }
  }
}
