//! Record encoding: puzzle position plus recorded solution as portable text,
//! and human-readable move strings for answers.
//!
//! Layout of an encoded record:
//!
//! ```text
//! <position line(s)>
//! %MOVES
//! <move>
//! <move>
//! ```

use crate::domain::{Move, Puzzle};
use crate::error::CodecError;

const MOVES_MARKER: &str = "%MOVES";

pub trait RecordEncoder: Send + Sync + 'static {
  fn encode(&self, puzzle: &Puzzle, moves: &[Move]) -> String;
  fn decode(&self, encoded: &str) -> Result<(Puzzle, Vec<Move>), CodecError>;
  fn move_strings(&self, puzzle: &Puzzle, moves: &[Move]) -> Vec<String>;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct TextRecordEncoder;

impl RecordEncoder for TextRecordEncoder {
  fn encode(&self, puzzle: &Puzzle, moves: &[Move]) -> String {
    let mut out = String::with_capacity(puzzle.position.len() + moves.len() * 8 + 16);
    out.push_str(puzzle.position.trim_end());
    out.push('\n');
    out.push_str(MOVES_MARKER);
    out.push('\n');
    for m in moves {
      out.push_str(&m.0);
      out.push('\n');
    }
    out
  }

  fn decode(&self, encoded: &str) -> Result<(Puzzle, Vec<Move>), CodecError> {
    let (position, moves) = encoded
      .split_once(&format!("\n{MOVES_MARKER}"))
      .ok_or_else(|| CodecError::Malformed("missing move section".into()))?;
    let position = position.trim();
    if position.is_empty() {
      return Err(CodecError::Malformed("empty position".into()));
    }
    let moves = moves
      .lines()
      .map(str::trim)
      .filter(|l| !l.is_empty())
      .map(|l| Move(l.to_string()))
      .collect();
    Ok((Puzzle { position: position.to_string() }, moves))
  }

  /// Attacker (sente) moves are marked ▲, defender moves △.
  fn move_strings(&self, _puzzle: &Puzzle, moves: &[Move]) -> Vec<String> {
    moves
      .iter()
      .enumerate()
      .map(|(i, m)| {
        let side = if i % 2 == 0 { '▲' } else { '△' };
        format!("{side}{}", m.0)
      })
      .collect()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn sample() -> (Puzzle, Vec<Move>) {
    (
      Puzzle { position: "4k4/9/4P4/9/9/9/9/9/9 b G2r2b3g4s4n4l17p 1".into() },
      vec![Move("G*5b".into())],
    )
  }

  #[test]
  fn decode_recovers_encoded_puzzle() {
    let (p, m) = sample();
    let enc = TextRecordEncoder;
    let text = enc.encode(&p, &m);
    assert!(text.contains("%MOVES\nG*5b\n"));
    assert_eq!(enc.decode(&text).unwrap(), (p, m));
  }

  #[test]
  fn decode_rejects_missing_moves_section() {
    let err = TextRecordEncoder.decode("4k4/9/9 b - 1").unwrap_err();
    assert_eq!(err.to_string(), "malformed record: missing move section");
    assert!(TextRecordEncoder.decode("\n%MOVES\nG*5b").is_err());
  }

  #[test]
  fn move_strings_alternate_sides() {
    let moves = vec![Move("S*2b".into()), Move("1a2b".into()), Move("G*1b".into())];
    let p = Puzzle { position: String::new() };
    assert_eq!(TextRecordEncoder.move_strings(&p, &moves), vec!["▲S*2b", "△1a2b", "▲G*1b"]);
  }
}
