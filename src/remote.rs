//! HTTP client for an external generator/solver service.
//!
//! Endpoints (JSON in, JSON out):
//!   POST {base}/generate  {"moves": 3}          -> {"position": "...", "score": 81}
//!   POST {base}/solve     {"position": "..."}   -> {"moves": ["S*3c", ...]}
//!
//! A 422 from `/solve` means the position has no forced mate.
//!
//! Calls log latencies and status codes, never positions.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, USER_AGENT};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument};

use crate::domain::{DifficultyClass, Move, Puzzle};
use crate::engine::{Generator, Solver};
use crate::error::EngineError;

#[derive(Clone)]
pub struct RemoteEngine {
  pub client: reqwest::Client,
  pub base_url: String,
}

#[derive(Serialize)]
struct GenerateReq { moves: u32 }

#[derive(Deserialize)]
struct GenerateRes { position: String, score: i64 }

#[derive(Serialize)]
struct SolveReq<'a> { position: &'a str }

#[derive(Deserialize)]
struct SolveRes { moves: Vec<String> }

impl RemoteEngine {
  /// Construct the client if ENGINE_BASE_URL is set; otherwise return None.
  pub fn from_env() -> Option<Self> {
    let base_url = std::env::var("ENGINE_BASE_URL").ok()?;
    Self::new(base_url).ok()
  }

  pub fn new(base_url: impl Into<String>) -> Result<Self, EngineError> {
    let client = reqwest::Client::builder()
      .timeout(Duration::from_secs(20))
      .build()
      .map_err(|e| EngineError::Transport(e.to_string()))?;
    Ok(Self { client, base_url: base_url.into().trim_end_matches('/').to_string() })
  }

  async fn post_json<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<reqwest::Response, EngineError> {
    let url = format!("{}/{}", self.base_url, path);
    let start = std::time::Instant::now();
    let res = self.client.post(&url)
      .header(USER_AGENT, "tsume-pool/0.1")
      .header(CONTENT_TYPE, "application/json")
      .json(body).send().await
      .map_err(|e| EngineError::Transport(e.to_string()))?;
    info!(target: "tsume_pool", %path, status = %res.status(), elapsed = ?start.elapsed(), "Engine call completed");
    Ok(res)
  }
}

async fn error_body(res: reqwest::Response) -> String {
  let status = res.status();
  let body = res.text().await.unwrap_or_default();
  format!("engine HTTP {}: {}", status, body.trim())
}

#[async_trait]
impl Generator for RemoteEngine {
  #[instrument(level = "info", skip(self), fields(%class))]
  async fn generate(&self, class: DifficultyClass) -> Result<(Puzzle, i64), EngineError> {
    let res = self.post_json("generate", &GenerateReq { moves: class.0 }).await?;
    if !res.status().is_success() {
      let msg = error_body(res).await;
      error!(target: "tsume_pool", %class, error = %msg, "Remote generation failed");
      return Err(EngineError::Generation(msg));
    }
    let body: GenerateRes = res.json().await.map_err(|e| EngineError::Transport(e.to_string()))?;
    Ok((Puzzle { position: body.position }, body.score))
  }
}

#[async_trait]
impl Solver for RemoteEngine {
  #[instrument(level = "info", skip(self, puzzle))]
  async fn solve(&self, puzzle: &Puzzle) -> Result<Vec<Move>, EngineError> {
    let res = self.post_json("solve", &SolveReq { position: &puzzle.position }).await?;
    if res.status() == StatusCode::UNPROCESSABLE_ENTITY {
      return Err(EngineError::Unsolvable);
    }
    if !res.status().is_success() {
      return Err(EngineError::Transport(error_body(res).await));
    }
    let body: SolveRes = res.json().await.map_err(|e| EngineError::Transport(e.to_string()))?;
    if body.moves.is_empty() {
      return Err(EngineError::Unsolvable);
    }
    Ok(body.moves.into_iter().map(Move).collect())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn base_url_trailing_slash_is_trimmed() {
    let engine = RemoteEngine::new("http://localhost:9000/").unwrap();
    assert_eq!(engine.base_url, "http://localhost:9000");
  }

  #[tokio::test]
  async fn unreachable_engine_is_a_transport_error() {
    // Port 9 (discard) on localhost is not expected to serve HTTP.
    let engine = RemoteEngine::new("http://127.0.0.1:9").unwrap();
    let err = engine.generate(DifficultyClass(1)).await.unwrap_err();
    assert!(matches!(err, EngineError::Transport(_)));
  }
}
