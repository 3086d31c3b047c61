//! Collaborator seams for producing puzzles: generator, solver and image renderer.

use async_trait::async_trait;

use crate::domain::{DifficultyClass, Move, Puzzle};
use crate::error::EngineError;

/// Produces a candidate puzzle and its quality score for a class.
#[async_trait]
pub trait Generator: Send + Sync + 'static {
  async fn generate(&self, class: DifficultyClass) -> Result<(Puzzle, i64), EngineError>;
}

/// Finds the forced-mate move sequence for a puzzle.
/// `Err(EngineError::Unsolvable)` marks a defective generation.
#[async_trait]
pub trait Solver: Send + Sync + 'static {
  async fn solve(&self, puzzle: &Puzzle) -> Result<Vec<Move>, EngineError>;
}

/// A rendered board image plus the identity used to name its blob.
#[derive(Clone, Debug)]
pub struct Rendered {
  /// Serialized board state the image depicts.
  pub state_key: String,
  /// Highlighted square, if any.
  pub highlight: Option<String>,
  pub png: Vec<u8>,
}

/// Draws the board after `applied` moves from the puzzle's initial position.
#[async_trait]
pub trait Renderer: Send + Sync + 'static {
  async fn render(&self, puzzle: &Puzzle, applied: &[Move]) -> Result<Rendered, String>;
}
