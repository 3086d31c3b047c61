use chrono::Utc;
use rand::Rng;
use serde::Serialize;
use tokio::time::Instant;
use tracing::{info, instrument, warn};

use super::{with_deadline, PoolManager};
use crate::domain::{DifficultyClass, ProblemRecord};
use crate::error::{PoolError, StoreError};
use crate::store::{Claim, Order, Query};

/// Which tier of the selection policy produced the record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectOrigin {
    /// Best-scoring unused record, claimed by this call.
    Fresh,
    /// Random pick from the top-by-score window once unused stock ran out.
    Reused,
}

impl SelectOrigin {
    pub fn as_str(self) -> &'static str {
        match self {
            SelectOrigin::Fresh => "fresh",
            SelectOrigin::Reused => "reused",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Selection {
    pub record: ProblemRecord,
    pub origin: SelectOrigin,
}

impl PoolManager {
    /// Selection policy:
    /// 1) the highest-scoring unused record, claimed with a conditional update;
    /// 2) otherwise a uniform pick from the top `candidate_window` records by score,
    ///    claimed if it happens to be unused and returned as-is otherwise;
    /// 3) an empty class is `PoolError::Exhausted`.
    ///
    /// A candidate deleted between read and claim (a concurrent eviction) is skipped.
    #[instrument(level = "info", skip(self, deadline), fields(%class))]
    pub async fn select(
        &self,
        class: DifficultyClass,
        deadline: Instant,
    ) -> Result<Selection, PoolError> {
        let best_unused = Query::new()
            .class(class)
            .used(false)
            .order(Order::ScoreDesc);

        let attempts = self.config.claim_attempts.max(1);
        for attempt in 0..attempts {
            let Some(candidate) =
                with_deadline(deadline, "query", self.store.first(&best_unused)).await?
            else {
                break;
            };
            match with_deadline(deadline, "claim", self.store.claim(&candidate.id, Utc::now())).await
            {
                Ok(Claim::Claimed(record)) => {
                    info!(target: "pool", %class, id = %record.id, score = record.score, origin = "fresh", "Problem selected");
                    return Ok(Selection { record, origin: SelectOrigin::Fresh });
                }
                Ok(Claim::AlreadyUsed(_)) => {
                    warn!(target: "pool", %class, id = %candidate.id, attempt, "Lost claim race; retrying");
                }
                Err(PoolError::Store(StoreError::NotFound { .. })) => {
                    warn!(target: "pool", %class, id = %candidate.id, attempt, "Candidate deleted before claim; retrying");
                }
                Err(e) => return Err(e),
            }
        }

        let window = Query::new()
            .class(class)
            .order(Order::ScoreDesc)
            .limit(self.config.candidate_window.max(1));
        let mut candidates = with_deadline(deadline, "query", self.store.query(&window)).await?;
        while !candidates.is_empty() {
            let pick = rand::thread_rng().gen_range(0..candidates.len());
            let picked = candidates.swap_remove(pick);
            let record = if picked.used {
                picked
            } else {
                // Unused but missed by tier 1: a replenish landed or a claim race moved on.
                match with_deadline(deadline, "claim", self.store.claim(&picked.id, Utc::now())).await {
                    Ok(Claim::Claimed(r) | Claim::AlreadyUsed(r)) => r,
                    Err(PoolError::Store(StoreError::NotFound { .. })) => {
                        warn!(target: "pool", %class, id = %picked.id, "Pick deleted before claim; picking again");
                        continue;
                    }
                    Err(e) => return Err(e),
                }
            };
            info!(target: "pool", %class, id = %record.id, score = record.score, origin = "reused", "Problem selected");
            return Ok(Selection { record, origin: SelectOrigin::Reused });
        }

        warn!(target: "pool", %class, "No problems in pool");
        Err(PoolError::Exhausted { class })
    }
}
