//! Problem pool manager.
//!
//! Owns no record state of its own: every operation reads and mutates the injected
//! [`RecordStore`], so any number of manager instances (one per process) can share
//! one backend. Each operation is a short unit of work bounded by a caller deadline.
//!
//! - [`PoolManager::replenish`]: add one record to a class below its stock level
//! - [`PoolManager::select`]: hand out the best unused record, else reuse from the top window
//! - [`PoolManager::evict_low_score`]: prune the weakest unused records of a full class
//! - [`PoolManager::evict_stale`]: delete records past the retention window

use std::future::Future;
use std::sync::Arc;

use tokio::time::Instant;

use crate::blob::BlobStore;
use crate::codec::RecordEncoder;
use crate::config::PoolConfig;
use crate::domain::{ProblemRecord, RecordId};
use crate::engine::{Generator, Renderer, Solver};
use crate::error::PoolError;
use crate::store::RecordStore;

mod evict;
mod replenish;
mod select;

pub use evict::{StaleFailure, StaleReport};
pub use replenish::ReplenishOutcome;
pub use select::{SelectOrigin, Selection};

#[derive(Clone)]
pub struct PoolManager {
    pub(crate) store: Arc<dyn RecordStore>,
    pub(crate) blobs: Arc<dyn BlobStore>,
    pub(crate) generator: Arc<dyn Generator>,
    pub(crate) solver: Arc<dyn Solver>,
    pub(crate) encoder: Arc<dyn RecordEncoder>,
    pub(crate) renderer: Option<Arc<dyn Renderer>>,
    pub(crate) config: PoolConfig,
}

impl PoolManager {
    pub fn new(
        store: Arc<dyn RecordStore>,
        blobs: Arc<dyn BlobStore>,
        generator: Arc<dyn Generator>,
        solver: Arc<dyn Solver>,
        encoder: Arc<dyn RecordEncoder>,
        config: PoolConfig,
    ) -> Self {
        Self { store, blobs, generator, solver, encoder, renderer: None, config }
    }

    /// Render question/answer images on replenish and attach their blob URLs.
    pub fn with_renderer(mut self, renderer: Arc<dyn Renderer>) -> Self {
        self.renderer = Some(renderer);
        self
    }

    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    pub fn encoder(&self) -> &Arc<dyn RecordEncoder> {
        &self.encoder
    }

    /// Fetch one record by id without touching its usage state.
    pub async fn get(&self, id: &RecordId, deadline: Instant) -> Result<ProblemRecord, PoolError> {
        with_deadline(deadline, "get", self.store.get(id)).await
    }
}

/// Run `fut` until `deadline`, mapping expiry to `PoolError::Timeout`.
pub(crate) async fn with_deadline<T, E, F>(
    deadline: Instant,
    operation: &'static str,
    fut: F,
) -> Result<T, PoolError>
where
    F: Future<Output = Result<T, E>>,
    E: Into<PoolError>,
{
    // timeout_at polls the inner future before the timer, so an already-expired
    // deadline would not stop a call that completes immediately.
    if Instant::now() >= deadline {
        return Err(PoolError::Timeout { operation });
    }
    match tokio::time::timeout_at(deadline, fut).await {
        Ok(res) => res.map_err(Into::into),
        Err(_) => Err(PoolError::Timeout { operation }),
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Fakes shared by the pool operation tests.

    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;

    use super::*;
    use crate::blob::MemoryBlobStore;
    use crate::codec::TextRecordEncoder;
    use crate::domain::{DifficultyClass, Move, Puzzle};
    use crate::engine::Rendered;
    use crate::error::{BlobError, EngineError};
    use crate::store::MemoryStore;

    /// Emits `position-N` puzzles with a scripted sequence of scores.
    #[derive(Default)]
    pub struct ScriptedEngine {
        pub scores: Mutex<Vec<i64>>,
        pub calls: AtomicUsize,
        pub unsolvable: bool,
        pub wrong_length: bool,
    }

    #[async_trait]
    impl Generator for ScriptedEngine {
        async fn generate(&self, class: DifficultyClass) -> Result<(Puzzle, i64), EngineError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            let score = self.scores.lock().unwrap().pop().unwrap_or(50);
            Ok((Puzzle { position: format!("position-{class}-{n}") }, score))
        }
    }

    #[async_trait]
    impl Solver for ScriptedEngine {
        async fn solve(&self, puzzle: &Puzzle) -> Result<Vec<Move>, EngineError> {
            if self.unsolvable {
                return Err(EngineError::Unsolvable);
            }
            let class: usize = puzzle
                .position
                .split('-')
                .nth(1)
                .and_then(|s| s.parse().ok())
                .unwrap_or(1);
            let len = if self.wrong_length { class + 1 } else { class };
            Ok((0..len).map(|i| Move(format!("m{i}-5b"))).collect())
        }
    }

    pub struct FakeRenderer;

    #[async_trait]
    impl Renderer for FakeRenderer {
        async fn render(&self, puzzle: &Puzzle, applied: &[Move]) -> Result<Rendered, String> {
            Ok(Rendered {
                state_key: format!("{}+{}", puzzle.position, applied.len()),
                highlight: applied.last().and_then(|m| m.destination()).map(str::to_string),
                png: vec![0x89, b'P', b'N', b'G'],
            })
        }
    }

    /// Blob store that fails every delete with a backend error.
    pub struct BrokenBlobs;

    #[async_trait]
    impl BlobStore for BrokenBlobs {
        async fn put(&self, name: &str, _bytes: Vec<u8>, _ct: &str) -> Result<String, BlobError> {
            Ok(format!("https://blobs/{name}"))
        }

        async fn delete(&self, _name: &str) -> Result<(), BlobError> {
            Err(BlobError::Backend("bucket unavailable".into()))
        }
    }

    pub fn config(stock_level: usize) -> PoolConfig {
        PoolConfig { stock_level, ..PoolConfig::default() }
    }

    pub fn deadline() -> Instant {
        Instant::now() + Duration::from_secs(5)
    }

    pub struct Harness {
        pub pool: PoolManager,
        pub store: Arc<MemoryStore>,
        pub blobs: Arc<MemoryBlobStore>,
        pub engine: Arc<ScriptedEngine>,
    }

    pub fn harness_with(config: PoolConfig, engine: ScriptedEngine) -> Harness {
        let store = Arc::new(MemoryStore::new());
        let blobs = Arc::new(MemoryBlobStore::new("https://blobs"));
        let engine = Arc::new(engine);
        let pool = PoolManager::new(
            store.clone(),
            blobs.clone(),
            engine.clone(),
            engine.clone(),
            Arc::new(TextRecordEncoder),
            config,
        );
        Harness { pool, store, blobs, engine }
    }

    pub fn harness(config: PoolConfig) -> Harness {
        harness_with(config, ScriptedEngine::default())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::error::StoreError;

    #[tokio::test]
    async fn with_deadline_maps_expiry_to_timeout() {
        let deadline = Instant::now() + Duration::from_millis(10);
        let res: Result<(), PoolError> = with_deadline(deadline, "query", async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok::<(), StoreError>(())
        })
        .await;
        assert!(matches!(res, Err(PoolError::Timeout { operation: "query" })));
    }

    #[tokio::test]
    async fn get_reads_without_claiming() {
        let h = testing::harness(testing::config(5));
        let rec = h.store.insert(crate::store::tests::draft(3, 40, false)).await.unwrap();
        let got = h.pool.get(&rec.id, testing::deadline()).await.unwrap();
        assert_eq!(got.id, rec.id);
        assert!(!got.used);
        let missing = h.pool.get(&RecordId::from("nope"), testing::deadline()).await;
        assert!(matches!(missing, Err(PoolError::Store(StoreError::NotFound { .. }))));
    }

    #[tokio::test]
    async fn with_deadline_passes_errors_through() {
        let res: Result<(), PoolError> = with_deadline(testing::deadline(), "get", async {
            Err(StoreError::Backend("down".into()))
        })
        .await;
        assert!(matches!(res, Err(PoolError::Store(StoreError::Backend(_)))));
    }
}
