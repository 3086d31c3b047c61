//! Public protocol structs for the HTTP endpoints (serde ready).

use serde::{Deserialize, Serialize};

use crate::domain::{DifficultyClass, ProblemRecord};
use crate::pool::{ReplenishOutcome, SelectOrigin, StaleFailure};

/// DTO for problem delivery.
#[derive(Debug, Serialize)]
pub struct ProblemOut {
    pub id: String,
    #[serde(rename = "type")]
    pub class: DifficultyClass,
    pub caption: String,
    pub state: String,
    pub score: i64,
    pub used: bool,
    pub question_image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin: Option<SelectOrigin>,
}

pub fn to_out(r: &ProblemRecord, caption: String, origin: Option<SelectOrigin>) -> ProblemOut {
    ProblemOut {
        id: r.id.0.clone(),
        class: r.difficulty_class,
        caption,
        state: r.encoded_state.clone(),
        score: r.score,
        used: r.used,
        question_image: r.question_image.clone(),
        origin,
    }
}

#[derive(Debug, Deserialize)]
pub struct ProblemQuery {
    #[serde(rename = "type")]
    pub class: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct AnswerOut {
    pub id: String,
    #[serde(rename = "type")]
    pub class: DifficultyClass,
    pub caption: String,
    pub moves: Vec<String>,
    pub text: String,
    pub answer_image: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum ReplenishOut {
    Created { id: String, score: i64 },
    Evicted { deleted: usize },
    AtTarget,
}

impl From<ReplenishOutcome> for ReplenishOut {
    fn from(o: ReplenishOutcome) -> Self {
        match o {
            ReplenishOutcome::Created { id, score } => ReplenishOut::Created { id: id.0, score },
            ReplenishOutcome::Evicted { deleted } => ReplenishOut::Evicted { deleted },
            ReplenishOutcome::AtTarget => ReplenishOut::AtTarget,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct GenerateOut {
    pub results: Vec<ClassResult>,
}

#[derive(Debug, Serialize)]
pub struct ClassResult {
    #[serde(rename = "type")]
    pub class: DifficultyClass,
    #[serde(flatten)]
    pub outcome: ReplenishOut,
}

#[derive(Debug, Serialize)]
pub struct DeleteOut {
    pub deleted: usize,
    pub failed: usize,
    pub failures: Vec<StaleFailure>,
}

#[derive(Serialize)]
pub struct ErrorOut {
    pub error: String,
}

#[derive(Serialize)]
pub struct HealthOut {
    pub ok: bool,
}
