//! Domain models: difficulty classes, puzzle records and the opaque puzzle/move values
//! exchanged with the generator, solver and encoder.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Number of moves to the forced mate. Open-ended: any class the generator
/// understands can be pooled without code changes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DifficultyClass(pub u32);

impl DifficultyClass {
  pub fn moves(self) -> usize { self.0 as usize }
}

impl fmt::Display for DifficultyClass {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.0)
  }
}

/// Store-assigned record key.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(pub String);

impl fmt::Display for RecordId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

impl From<&str> for RecordId {
  fn from(s: &str) -> Self { RecordId(s.to_string()) }
}

/// Initial position of a generated puzzle (SFEN text for the built-in engines).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Puzzle {
  pub position: String,
}

/// One move of a solution, in engine notation (USI for the built-in engines).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Move(pub String);

impl Move {
  /// Destination square of the move, e.g. "5b" for both "G*5b" and "5c5b+".
  pub fn destination(&self) -> Option<&str> {
    let s = self.0.trim_end_matches('+');
    if s.len() < 2 || !s.is_char_boundary(s.len() - 2) { return None; }
    Some(&s[s.len() - 2..])
  }
}

/// A puzzle record as persisted in the record store.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProblemRecord {
  pub id: RecordId,
  pub encoded_state: String,
  pub difficulty_class: DifficultyClass,
  pub used: bool,
  pub score: i64,
  #[serde(default)] pub question_image: Option<String>,
  #[serde(default)] pub answer_image: Option<String>,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

impl ProblemRecord {
  /// Image blob references attached to this record, question first.
  pub fn image_refs(&self) -> impl Iterator<Item = &str> {
    self.question_image.iter()
      .chain(self.answer_image.iter())
      .map(String::as_str)
      .filter(|s| !s.is_empty())
  }
}

/// A record before the store has assigned it a key.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NewProblem {
  pub encoded_state: String,
  pub difficulty_class: DifficultyClass,
  pub used: bool,
  pub score: i64,
  pub question_image: Option<String>,
  pub answer_image: Option<String>,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

impl NewProblem {
  pub fn with_id(self, id: RecordId) -> ProblemRecord {
    ProblemRecord {
      id,
      encoded_state: self.encoded_state,
      difficulty_class: self.difficulty_class,
      used: self.used,
      score: self.score,
      question_image: self.question_image,
      answer_image: self.answer_image,
      created_at: self.created_at,
      updated_at: self.updated_at,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn move_destination_handles_drops_and_promotions() {
    assert_eq!(Move("G*5b".into()).destination(), Some("5b"));
    assert_eq!(Move("2c2b+".into()).destination(), Some("2b"));
    assert_eq!(Move("x".into()).destination(), None);
  }

  #[test]
  fn image_refs_skips_missing_and_empty() {
    let now = Utc::now();
    let rec = NewProblem {
      encoded_state: String::new(),
      difficulty_class: DifficultyClass(1),
      used: false,
      score: 0,
      question_image: Some("https://host/a.png".into()),
      answer_image: Some(String::new()),
      created_at: now,
      updated_at: now,
    }.with_id(RecordId::from("r1"));
    assert_eq!(rec.image_refs().collect::<Vec<_>>(), vec!["https://host/a.png"]);
  }
}
