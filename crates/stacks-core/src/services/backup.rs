//! Snapshot save, restore and wipe against the canonical store.

use std::path::{Path, PathBuf};

use super::store::{CanonicalStore, WriteGuard};
use super::upsert::{UpsertOrchestrator, UpsertReport};
use crate::backup;
use crate::Result;

/// Result of saving a snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupOutcome {
    /// The store had not changed since this snapshot was written
    pub already_exists: bool,
    pub backup_dir: PathBuf,
}

/// Result of restoring a snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestoreReport {
    /// Snapshot of the store taken before the restore
    pub autosave: BackupOutcome,
    pub upsert: UpsertReport,
}

/// Result of wiping the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WipeReport {
    /// Snapshot of the store taken before the wipe
    pub autosave: BackupOutcome,
    pub removed: usize,
}

#[derive(Clone)]
pub struct BackupService {
    orchestrator: UpsertOrchestrator,
    backups_dir: PathBuf,
}

impl BackupService {
    pub fn new(orchestrator: UpsertOrchestrator, backups_dir: impl Into<PathBuf>) -> Self {
        Self {
            orchestrator,
            backups_dir: backups_dir.into(),
        }
    }

    pub fn backups_dir(&self) -> &Path {
        &self.backups_dir
    }

    fn store(&self) -> &CanonicalStore {
        self.orchestrator.store()
    }

    /// Save the store to its deterministically named snapshot
    ///
    /// Skips the write when that snapshot already exists.
    pub async fn save_to_backup(&self) -> Result<BackupOutcome> {
        let _guard = self.store().lock_writes().await;
        self.save_locked().await
    }

    // Callers hold the writer slot so the snapshot matches what they act on
    async fn save_locked(&self) -> Result<BackupOutcome> {
        let pins = self.store().pins().await?;
        let backup_dir = self.backups_dir.join(backup::snapshot_name_for(&pins));

        if backup_dir.join(backup::PINS_FILE).exists() {
            tracing::info!("Skipping, no changes since last save: backup_dir[{}]", backup_dir.display());
            return Ok(BackupOutcome {
                already_exists: true,
                backup_dir,
            });
        }

        tracing::info!("Saving (has changes): backup_dir[{}]", backup_dir.display());
        backup::save(&backup_dir, &pins)?;
        Ok(BackupOutcome {
            already_exists: false,
            backup_dir,
        })
    }

    /// Merge a snapshot into the store
    ///
    /// Additive: pins absent from the snapshot are kept. The current state is
    /// autosaved first, so a bad restore can be undone.
    pub async fn upsert_from_backup(&self, backup_dir: &Path) -> Result<RestoreReport> {
        let guard = self.store().lock_writes().await;
        let autosave = self.autosave(&guard).await?;

        let pins = backup::load(backup_dir)?;
        tracing::info!(
            "Upserting: pins[{}] from backup_dir[{}]",
            pins.len(),
            backup_dir.display()
        );
        let upsert = self.orchestrator.apply_batch(&guard, pins).await?;
        Ok(RestoreReport { autosave, upsert })
    }

    /// Autosave, then physically remove every record
    ///
    /// A failed autosave leaves the store untouched.
    pub async fn delete_all_state(&self) -> Result<WipeReport> {
        let guard = self.store().lock_writes().await;
        let autosave = self.autosave(&guard).await?;
        let removed = self.store().delete_all(&guard).await?;
        Ok(WipeReport { autosave, removed })
    }

    /// Snapshot directories, newest name first
    pub fn list_backups(&self) -> Result<Vec<PathBuf>> {
        backup::list_snapshots(&self.backups_dir)
    }

    async fn autosave(&self, _writer: &WriteGuard<'_>) -> Result<BackupOutcome> {
        let outcome = self.save_locked().await?;
        tracing::info!(
            "Autosave: already_exists[{}], backup_dir[{}]",
            outcome.already_exists,
            outcome.backup_dir.display()
        );
        Ok(outcome)
    }
}
