//! Record store adapter: the query contract the pool algorithms rely on, and an
//! in-memory backend implementing it.
//!
//! ## Query semantics
//!
//! A [`Query`] combines equality filters on difficulty class and usage flag, an
//! upper bound on `created_at`, one ordering and an offset/limit window. Records
//! that compare equal under the ordering come back in insertion order, so repeated
//! queries over unchanged data are deterministic.
//!
//! ## Conditional claim
//!
//! [`RecordStore::claim`] flips `used` only when it is currently `false`. Selectors
//! use it instead of read-then-put so two concurrent requests cannot both take the
//! same fresh record.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::{DifficultyClass, NewProblem, ProblemRecord, RecordId};
use crate::error::StoreError;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Order {
    /// Insertion order.
    #[default]
    Natural,
    ScoreAsc,
    ScoreDesc,
    CreatedAtAsc,
}

/// Filtered, ordered, windowed record query.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Query {
    pub class: Option<DifficultyClass>,
    pub used: Option<bool>,
    /// Inclusive upper bound on `created_at`.
    pub created_at_or_before: Option<DateTime<Utc>>,
    pub order: Order,
    pub offset: usize,
    pub limit: Option<usize>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn class(mut self, class: DifficultyClass) -> Self {
        self.class = Some(class);
        self
    }

    pub fn used(mut self, used: bool) -> Self {
        self.used = Some(used);
        self
    }

    pub fn created_at_or_before(mut self, cutoff: DateTime<Utc>) -> Self {
        self.created_at_or_before = Some(cutoff);
        self
    }

    pub fn order(mut self, order: Order) -> Self {
        self.order = order;
        self
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn matches(&self, record: &ProblemRecord) -> bool {
        self.class.map_or(true, |c| record.difficulty_class == c)
            && self.used.map_or(true, |u| record.used == u)
            && self
                .created_at_or_before
                .map_or(true, |cutoff| record.created_at <= cutoff)
    }
}

/// Outcome of a conditional `used=false -> true` update.
#[derive(Clone, Debug, PartialEq)]
pub enum Claim {
    /// This call flipped the flag. Carries the updated record.
    Claimed(ProblemRecord),
    /// The record was already used; it is returned unchanged.
    AlreadyUsed(ProblemRecord),
}

/// Persistent backend for puzzle records.
///
/// Implementations must be `Send + Sync + 'static` to be shared through axum
/// application state.
#[async_trait]
pub trait RecordStore: Send + Sync + 'static {
    /// Returns `Err(StoreError::NotFound)` if no record has this key.
    async fn get(&self, id: &RecordId) -> Result<ProblemRecord, StoreError>;

    /// Persist a new record and assign it a key.
    async fn insert(&self, record: NewProblem) -> Result<ProblemRecord, StoreError>;

    /// Overwrite an existing record by key. Changing class or score, or marking a
    /// used record unused, is rejected with `StoreError::Backend`.
    async fn put(&self, record: &ProblemRecord) -> Result<(), StoreError>;

    async fn delete(&self, id: &RecordId) -> Result<(), StoreError>;

    async fn query(&self, query: &Query) -> Result<Vec<ProblemRecord>, StoreError>;

    /// Exact size of the filtered set, ignoring offset and limit.
    async fn count(&self, query: &Query) -> Result<usize, StoreError>;

    /// Conditionally mark a record used, stamping `updated_at = now` when it flips.
    async fn claim(&self, id: &RecordId, now: DateTime<Utc>) -> Result<Claim, StoreError>;

    /// First result of `query`, or `None` when the query is exhausted.
    async fn first(&self, query: &Query) -> Result<Option<ProblemRecord>, StoreError> {
        let q = query.clone().limit(1);
        Ok(self.query(&q).await?.into_iter().next())
    }
}

#[derive(Default)]
struct Inner {
    seq: u64,
    by_seq: BTreeMap<u64, ProblemRecord>,
    seq_by_id: HashMap<RecordId, u64>,
}

/// Class and score never change, and `used` never goes back to false.
fn check_immutable(current: &ProblemRecord, next: &ProblemRecord) -> Result<(), StoreError> {
    if current.difficulty_class != next.difficulty_class || current.score != next.score {
        return Err(StoreError::Backend(format!(
            "record {} class and score are immutable",
            current.id
        )));
    }
    if current.used && !next.used {
        return Err(StoreError::Backend(format!("record {} cannot be marked unused", current.id)));
    }
    Ok(())
}

/// In-process record store. Keys are random UUIDs.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn get(&self, id: &RecordId) -> Result<ProblemRecord, StoreError> {
        let inner = self.inner.read().await;
        inner
            .seq_by_id
            .get(id)
            .and_then(|seq| inner.by_seq.get(seq))
            .cloned()
            .ok_or_else(|| StoreError::NotFound { id: id.clone() })
    }

    async fn insert(&self, record: NewProblem) -> Result<ProblemRecord, StoreError> {
        let mut inner = self.inner.write().await;
        let id = RecordId(Uuid::new_v4().to_string());
        let record = record.with_id(id.clone());
        inner.seq += 1;
        let seq = inner.seq;
        inner.by_seq.insert(seq, record.clone());
        inner.seq_by_id.insert(id, seq);
        Ok(record)
    }

    async fn put(&self, record: &ProblemRecord) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        let seq = *inner
            .seq_by_id
            .get(&record.id)
            .ok_or_else(|| StoreError::NotFound { id: record.id.clone() })?;
        if let Some(current) = inner.by_seq.get(&seq) {
            check_immutable(current, record)?;
        }
        inner.by_seq.insert(seq, record.clone());
        Ok(())
    }

    async fn delete(&self, id: &RecordId) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        let seq = inner
            .seq_by_id
            .remove(id)
            .ok_or_else(|| StoreError::NotFound { id: id.clone() })?;
        inner.by_seq.remove(&seq);
        Ok(())
    }

    async fn query(&self, query: &Query) -> Result<Vec<ProblemRecord>, StoreError> {
        let inner = self.inner.read().await;
        let mut hits: Vec<&ProblemRecord> =
            inner.by_seq.values().filter(|r| query.matches(r)).collect();

        // Stable sorts keep insertion order among equal keys.
        match query.order {
            Order::Natural => {}
            Order::ScoreAsc => hits.sort_by_key(|r| r.score),
            Order::ScoreDesc => hits.sort_by(|a, b| b.score.cmp(&a.score)),
            Order::CreatedAtAsc => hits.sort_by_key(|r| r.created_at),
        }

        let window = hits.into_iter().skip(query.offset);
        let out = match query.limit {
            Some(n) => window.take(n).cloned().collect(),
            None => window.cloned().collect(),
        };
        Ok(out)
    }

    async fn count(&self, query: &Query) -> Result<usize, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner.by_seq.values().filter(|r| query.matches(r)).count())
    }

    async fn claim(&self, id: &RecordId, now: DateTime<Utc>) -> Result<Claim, StoreError> {
        let mut inner = self.inner.write().await;
        let seq = *inner
            .seq_by_id
            .get(id)
            .ok_or_else(|| StoreError::NotFound { id: id.clone() })?;
        let record = inner
            .by_seq
            .get_mut(&seq)
            .ok_or_else(|| StoreError::NotFound { id: id.clone() })?;
        if record.used {
            return Ok(Claim::AlreadyUsed(record.clone()));
        }
        record.used = true;
        record.updated_at = now;
        Ok(Claim::Claimed(record.clone()))
    }
}
