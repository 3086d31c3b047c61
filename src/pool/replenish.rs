use chrono::Utc;
use tokio::time::Instant;
use tracing::{error, info, instrument};

use super::{with_deadline, PoolManager};
use crate::blob::object_name;
use crate::domain::{DifficultyClass, Move, NewProblem, Puzzle, RecordId};
use crate::error::{EngineError, PoolError};
use crate::store::Query;

/// What a replenish call did to the class.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReplenishOutcome {
    /// One new unused record was persisted.
    Created { id: RecordId, score: i64 },
    /// The class was at target; the lowest-scoring tail was pruned.
    Evicted { deleted: usize },
    /// The class was at target and eviction is disabled.
    AtTarget,
}

impl PoolManager {
    /// Top up `class` by one record when its unused stock is below the target level.
    #[instrument(level = "info", skip(self, deadline), fields(%class))]
    pub async fn replenish(
        &self,
        class: DifficultyClass,
        deadline: Instant,
    ) -> Result<ReplenishOutcome, PoolError> {
        let unused = Query::new().class(class).used(false);
        let count = with_deadline(deadline, "count", self.store.count(&unused)).await?;
        info!(target: "pool", %class, count, target = self.config.stock_level, "Unused stock");

        if count >= self.config.stock_level {
            if !self.config.evict_when_full {
                return Ok(ReplenishOutcome::AtTarget);
            }
            let deleted = self.evict_low_score(class, deadline).await?;
            return Ok(ReplenishOutcome::Evicted { deleted });
        }

        let (puzzle, score) =
            with_deadline(deadline, "generate", self.generator.generate(class)).await?;
        let moves = with_deadline(deadline, "solve", self.solver.solve(&puzzle)).await?;
        if moves.is_empty() {
            error!(target: "pool", %class, "Solver returned an empty solution");
            return Err(EngineError::Unsolvable.into());
        }
        if moves.len() != class.moves() {
            error!(target: "pool", %class, solution_len = moves.len(), "Solution length does not match class");
            return Err(EngineError::Generation(format!(
                "expected a {}-move solution, got {}",
                class.moves(),
                moves.len()
            ))
            .into());
        }

        let (question_image, answer_image) = match &self.renderer {
            Some(_) => {
                let (q, a) = self.upload_images(&puzzle, &moves, deadline).await?;
                (Some(q), Some(a))
            }
            None => (None, None),
        };

        let now = Utc::now();
        let draft = NewProblem {
            encoded_state: self.encoder.encode(&puzzle, &moves),
            difficulty_class: class,
            used: false,
            score,
            question_image,
            answer_image,
            created_at: now,
            updated_at: now,
        };
        let record = with_deadline(deadline, "insert", self.store.insert(draft)).await?;
        info!(target: "pool", %class, id = %record.id, score, "Problem saved");
        Ok(ReplenishOutcome::Created { id: record.id, score })
    }

    /// Render the initial and solved positions and upload them. Returns (question, answer) URLs.
    async fn upload_images(
        &self,
        puzzle: &Puzzle,
        moves: &[Move],
        deadline: Instant,
    ) -> Result<(String, String), PoolError> {
        let Some(renderer) = &self.renderer else {
            return Err(PoolError::Render("no renderer configured".into()));
        };

        let mut urls = Vec::with_capacity(2);
        for applied in [&moves[..0], moves] {
            let rendered = with_deadline(deadline, "render", async {
                renderer.render(puzzle, applied).await.map_err(PoolError::Render)
            })
            .await?;
            let name = object_name(&rendered.state_key, rendered.highlight.as_deref());
            let url = with_deadline(
                deadline,
                "blob_put",
                self.blobs.put(&name, rendered.png, "image/png"),
            )
            .await?;
            urls.push(url);
        }
        let answer = urls.pop().unwrap_or_default();
        let question = urls.pop().unwrap_or_default();
        Ok((question, answer))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;
    use std::sync::Arc;

    use super::super::testing::*;
    use super::*;
    use crate::blob::object_name_from_url;
    use crate::store::{tests::draft, RecordStore};

    async fn fill(h: &Harness, class: u32, n: usize) {
        for i in 0..n {
            h.store.insert(draft(class, i as i64, false)).await.unwrap();
        }
    }

    #[tokio::test]
    async fn below_target_adds_exactly_one_unused_record() {
        let h = harness(config(50));
        fill(&h, 3, 49).await;
        h.store.insert(draft(3, 999, true)).await.unwrap();

        let out = h.pool.replenish(DifficultyClass(3), deadline()).await.unwrap();
        let ReplenishOutcome::Created { id, score } = out else {
            panic!("expected Created, got {out:?}");
        };
        let unused = Query::new().class(DifficultyClass(3)).used(false);
        assert_eq!(h.store.count(&unused).await.unwrap(), 50);

        let rec = h.store.get(&id).await.unwrap();
        assert!(!rec.used);
        assert_eq!(rec.difficulty_class, DifficultyClass(3));
        assert_eq!(rec.score, score);
        assert_eq!(rec.created_at, rec.updated_at);
        assert!(rec.question_image.is_none());

        let (puzzle, moves) = h.pool.encoder().decode(&rec.encoded_state).unwrap();
        assert_eq!(puzzle.position, "position-3-0");
        assert_eq!(moves.len(), 3);
    }

    #[tokio::test]
    async fn at_target_without_eviction_is_a_no_op() {
        let mut cfg = config(5);
        cfg.evict_when_full = false;
        let h = harness(cfg);
        fill(&h, 1, 5).await;

        let out = h.pool.replenish(DifficultyClass(1), deadline()).await.unwrap();
        assert_eq!(out, ReplenishOutcome::AtTarget);
        assert_eq!(h.store.count(&Query::new()).await.unwrap(), 5);
        assert_eq!(h.engine.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn at_target_prunes_lowest_scores() {
        let h = harness(config(20));
        fill(&h, 1, 20).await;

        let out = h.pool.replenish(DifficultyClass(1), deadline()).await.unwrap();
        assert_eq!(out, ReplenishOutcome::Evicted { deleted: 2 });
        let left = h.store.query(&Query::new().class(DifficultyClass(1))).await.unwrap();
        assert_eq!(left.len(), 18);
        assert!(left.iter().all(|r| r.score >= 2));
        assert_eq!(h.engine.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn other_classes_do_not_count_toward_stock() {
        let h = harness(config(2));
        fill(&h, 1, 5).await;
        let out = h.pool.replenish(DifficultyClass(5), deadline()).await.unwrap();
        assert!(matches!(out, ReplenishOutcome::Created { .. }));
    }

    #[tokio::test]
    async fn unsolvable_generation_persists_nothing() {
        let h = harness_with(config(5), ScriptedEngine { unsolvable: true, ..Default::default() });
        let err = h.pool.replenish(DifficultyClass(1), deadline()).await.unwrap_err();
        assert!(matches!(err, PoolError::Engine(EngineError::Unsolvable)));
        assert_eq!(h.store.count(&Query::new()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn solution_length_mismatch_is_a_generation_defect() {
        let h = harness_with(config(5), ScriptedEngine { wrong_length: true, ..Default::default() });
        let err = h.pool.replenish(DifficultyClass(3), deadline()).await.unwrap_err();
        assert!(matches!(err, PoolError::Engine(EngineError::Generation(_))));
        assert_eq!(h.store.count(&Query::new()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn renderer_attaches_content_addressed_images() {
        let h = harness(config(5));
        let pool = h.pool.clone().with_renderer(Arc::new(FakeRenderer));

        let out = pool.replenish(DifficultyClass(3), deadline()).await.unwrap();
        let ReplenishOutcome::Created { id, .. } = out else { panic!("expected Created") };
        let rec = h.store.get(&id).await.unwrap();

        let q = rec.question_image.clone().unwrap();
        let a = rec.answer_image.clone().unwrap();
        assert_eq!(object_name_from_url(&q), object_name("position-3-0+0", None));
        assert_eq!(object_name_from_url(&a), object_name("position-3-0+3", Some("5b")));
        assert!(h.blobs.contains(object_name_from_url(&q)).await);
        assert!(h.blobs.contains(object_name_from_url(&a)).await);
    }

    #[tokio::test]
    async fn expired_deadline_times_out_without_writing() {
        let h = harness(config(5));
        let past = Instant::now() - std::time::Duration::from_millis(1);
        let err = h.pool.replenish(DifficultyClass(1), past).await.unwrap_err();
        assert!(matches!(err, PoolError::Timeout { .. }));
        assert_eq!(h.store.count(&Query::new()).await.unwrap(), 0);
    }
}
