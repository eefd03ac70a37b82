//! Upsert orchestrator: the only path by which pins enter the canonical store.

use chrono::{SubsecRound, TimeDelta, Utc};

use super::store::{CanonicalStore, StoreEvent, WriteGuard};
use crate::db::{LibSqlPinRepository, PinRepository};
use crate::error::{Error, Result};
use crate::merge::merge;
use crate::models::{MergeDiff, Pin, StoredRecord};

/// Number of merge diffs kept in the audit trail
pub const MAX_MERGE_DIFFS: usize = 1000;

/// What happened to a single incoming pin
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// No record had this identity; one was created
    Inserted,
    /// The record existed and the merge changed it
    Merged,
    /// The record existed and already reflected the incoming pin
    Unchanged,
}

/// Per-batch counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpsertReport {
    pub inserted: usize,
    pub merged: usize,
    pub unchanged: usize,
    /// Invalid pins that never reached the store
    pub skipped: usize,
    /// Pins whose transaction was rolled back
    pub failed: usize,
}

impl UpsertReport {
    /// Records created or modified by the batch
    pub const fn changed(&self) -> usize {
        self.inserted + self.merged
    }

    fn record(&mut self, outcome: UpsertOutcome) {
        match outcome {
            UpsertOutcome::Inserted => self.inserted += 1,
            UpsertOutcome::Merged => self.merged += 1,
            UpsertOutcome::Unchanged => self.unchanged += 1,
        }
    }
}

/// Applies batches of pins to the canonical store through the merge engine
#[derive(Clone)]
pub struct UpsertOrchestrator {
    store: CanonicalStore,
}

impl UpsertOrchestrator {
    pub const fn new(store: CanonicalStore) -> Self {
        Self { store }
    }

    pub const fn store(&self) -> &CanonicalStore {
        &self.store
    }

    /// Apply a full-refresh batch, one transaction per pin
    ///
    /// A pin that fails to commit is rolled back and counted; the rest of the
    /// batch still applies.
    pub async fn upsert_batch(&self, pins: Vec<Pin>) -> Result<UpsertReport> {
        let guard = self.store.lock_writes().await;
        self.apply_batch(&guard, pins).await
    }

    /// Apply a batch while already holding the writer slot
    pub(crate) async fn apply_batch(
        &self,
        _writer: &WriteGuard<'_>,
        pins: Vec<Pin>,
    ) -> Result<UpsertReport> {
        let total = pins.len();
        let mut report = UpsertReport::default();

        for pin in pins {
            if let Err(e) = pin.validate() {
                tracing::warn!("Skipping invalid pin: {e}");
                report.skipped += 1;
                continue;
            }
            match self.upsert_one(pin.with_millisecond_precision()).await {
                Ok(outcome) => report.record(outcome),
                Err(e) => {
                    tracing::warn!("Upsert rolled back: {e}");
                    report.failed += 1;
                }
            }
        }

        if report.merged > 0 {
            let db = self.store.database().await;
            match LibSqlPinRepository::new(db.connection())
                .prune_merge_diffs(MAX_MERGE_DIFFS)
                .await
            {
                Ok(0) => {}
                Ok(pruned) => tracing::debug!("Pruned {pruned} merge diffs"),
                Err(e) => tracing::warn!("Failed to prune merge diffs: {e}"),
            }
        }

        tracing::info!(
            "Upserted batch: pins[{total}], inserted[{}], merged[{}], unchanged[{}], skipped[{}], failed[{}]",
            report.inserted,
            report.merged,
            report.unchanged,
            report.skipped,
            report.failed
        );
        if report.changed() > 0 {
            self.store.notify(StoreEvent::Changed {
                records: report.changed(),
            });
        }
        Ok(report)
    }

    /// Apply a user edit to a stored pin
    ///
    /// The edit is stamped with the current time so it wins against older
    /// source data, then goes through the same merge path as any batch.
    pub async fn edit<F>(&self, url: &str, apply: F) -> Result<Pin>
    where
        F: FnOnce(&mut Pin),
    {
        let guard = self.store.lock_writes().await;
        let mut pin = self
            .store
            .get(url)
            .await?
            .ok_or_else(|| Error::NotFound(format!("no pin for {url}")))?;

        let was_read = pin.is_read;
        apply(&mut pin);
        // Strictly newer than the stored pin, even with a lagging clock
        let now = Utc::now().trunc_subsecs(3);
        pin.modified_at = now.max(pin.modified_at + TimeDelta::milliseconds(1));
        if pin.is_read && !was_read {
            pin.accessed_at = pin.modified_at;
        }

        let report = self.apply_batch(&guard, vec![pin]).await?;
        if report.failed > 0 || report.skipped > 0 {
            return Err(Error::PersistenceFailure(format!("edit of {url} was not applied")));
        }
        self.store
            .get(url)
            .await?
            .ok_or_else(|| Error::NotFound(format!("no pin for {url}")))
    }

    async fn upsert_one(&self, incoming: Pin) -> Result<UpsertOutcome> {
        let db = self.store.database().await;
        let repo = LibSqlPinRepository::new(db.connection());

        repo.begin().await?;
        match Self::fetch_merge_write(&repo, incoming).await {
            Ok(outcome) => match repo.commit().await {
                Ok(()) => Ok(outcome),
                Err(e) => {
                    repo.rollback().await.ok();
                    Err(e)
                }
            },
            Err(e) => {
                repo.rollback().await.ok();
                Err(e)
            }
        }
    }

    async fn fetch_merge_write(
        repo: &LibSqlPinRepository<'_>,
        incoming: Pin,
    ) -> Result<UpsertOutcome> {
        let pin_id = incoming.id();
        let Some(mut record) = repo.find(&pin_id).await? else {
            repo.insert(&StoredRecord::from_pin(&incoming)).await?;
            tracing::debug!("Inserted pin {pin_id} for {}", incoming.url);
            return Ok(UpsertOutcome::Inserted);
        };

        let existing = record.to_pin();
        let merged = merge(&existing, &incoming)?;
        if merged == existing {
            return Ok(UpsertOutcome::Unchanged);
        }

        record.assign(&merged);
        repo.update(&record).await?;
        repo.record_merge_diff(&pin_id, &MergeDiff::new(existing, incoming, merged))
            .await?;
        tracing::debug!("Merged pin {pin_id}");
        Ok(UpsertOutcome::Merged)
    }
}
