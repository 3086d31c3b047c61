use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::time::Instant;
use tracing::{error, info, instrument, warn};

use super::{with_deadline, PoolManager};
use crate::blob::object_name_from_url;
use crate::domain::{DifficultyClass, ProblemRecord, RecordId};
use crate::error::{BlobError, PoolError};
use crate::store::{Order, Query};

/// A record the stale sweep could not delete.
#[derive(Clone, Debug, Serialize)]
pub struct StaleFailure {
    pub id: RecordId,
    pub error: String,
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct StaleReport {
    pub deleted: usize,
    pub failures: Vec<StaleFailure>,
}

impl PoolManager {
    /// Delete the `floor(stock_level * eviction_fraction)` lowest-scoring unused
    /// records of `class`. Returns how many were deleted.
    #[instrument(level = "info", skip(self, deadline), fields(%class))]
    pub async fn evict_low_score(
        &self,
        class: DifficultyClass,
        deadline: Instant,
    ) -> Result<usize, PoolError> {
        let n = self.config.eviction_count();
        if n == 0 {
            return Ok(0);
        }
        let tail = Query::new()
            .class(class)
            .used(false)
            .order(Order::ScoreAsc)
            .limit(n);
        let victims = with_deadline(deadline, "query", self.store.query(&tail)).await?;

        let mut deleted = 0;
        for record in &victims {
            self.delete_record(record, deadline).await?;
            info!(target: "pool", %class, id = %record.id, score = record.score, "Low-score problem deleted");
            deleted += 1;
        }
        Ok(deleted)
    }

    /// Delete every record with `now - created_at >= retention`, images first.
    ///
    /// Records are independent units: a failure is recorded in the report and the
    /// sweep moves on to the next record. Deadline expiry ends the sweep with
    /// `PoolError::Timeout`; records deleted before that stay deleted.
    #[instrument(level = "info", skip(self, deadline), fields(retention_days = retention.num_days()))]
    pub async fn evict_stale(
        &self,
        retention: chrono::Duration,
        deadline: Instant,
    ) -> Result<StaleReport, PoolError> {
        self.evict_created_before(Utc::now() - retention, deadline).await
    }

    /// Stale sweep against a fixed cutoff. `created_at == cutoff` is stale.
    pub(crate) async fn evict_created_before(
        &self,
        cutoff: DateTime<Utc>,
        deadline: Instant,
    ) -> Result<StaleReport, PoolError> {
        let stale = Query::new()
            .created_at_or_before(cutoff)
            .order(Order::CreatedAtAsc);
        let records = with_deadline(deadline, "query", self.store.query(&stale)).await?;
        info!(target: "pool", %cutoff, candidates = records.len(), "Stale sweep started");

        let pause = Duration::from_millis(self.config.stale_delete_pause_ms);
        let mut report = StaleReport::default();
        for (i, record) in records.iter().enumerate() {
            if i > 0 && !pause.is_zero() {
                tokio::time::sleep_until((Instant::now() + pause).min(deadline)).await;
            }
            match self.delete_record(record, deadline).await {
                Ok(()) => {
                    info!(target: "pool", id = %record.id, created_at = %record.created_at, "Stale problem deleted");
                    report.deleted += 1;
                }
                Err(e @ PoolError::Timeout { .. }) => {
                    error!(
                        target: "pool",
                        deleted = report.deleted,
                        remaining = records.len() - i,
                        "Stale sweep ran out of time"
                    );
                    return Err(e);
                }
                Err(e) => {
                    error!(target: "pool", id = %record.id, error = %e, "Failed to delete stale problem");
                    report.failures.push(StaleFailure { id: record.id.clone(), error: e.to_string() });
                }
            }
        }
        Ok(report)
    }

    /// Release a record's image blobs, then the record itself.
    /// A missing blob counts as released; any other blob error leaves the record in place.
    pub(crate) async fn delete_record(
        &self,
        record: &ProblemRecord,
        deadline: Instant,
    ) -> Result<(), PoolError> {
        for url in record.image_refs() {
            let name = object_name_from_url(url);
            match with_deadline(deadline, "blob_delete", self.blobs.delete(name)).await {
                Ok(()) => {}
                Err(PoolError::Blob(BlobError::NotFound { .. })) => {
                    warn!(target: "pool", id = %record.id, %name, "Image already gone");
                }
                Err(e) => return Err(e),
            }
        }
        with_deadline(deadline, "delete", self.store.delete(&record.id)).await
    }
}
