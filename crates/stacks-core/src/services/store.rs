//! Canonical store: the single durable collection of reconciled pins.
//!
//! Reads are open to anyone holding a handle and return owned copies. Writes
//! are crate-private and require the store's write lock, which the upsert
//! orchestrator and the backup service take; nothing else mutates records.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{broadcast, Mutex, MutexGuard};

use crate::db::{Database, LibSqlPinRepository, PinRepository, SyncConfig};
use crate::identity::PinId;
use crate::models::{Pin, RecordedMergeDiff};
use crate::Result;

/// Capacity of the change event channel; slow subscribers see `Lagged`
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Change notification published after every committed mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreEvent {
    /// Records were inserted or updated
    Changed { records: usize },
    /// All records were removed
    Cleared { removed: usize },
    /// The replica pulled remote changes
    Synced,
}

/// Aggregate facts about the store, used to name snapshots
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreSummary {
    pub pin_count: usize,
    pub max_modified_at: Option<DateTime<Utc>>,
}

/// Proof that the holder owns the store's single writer slot
pub struct WriteGuard<'a> {
    _guard: MutexGuard<'a, ()>,
}

/// Handle to the canonical store, cheap to clone and share across tasks
#[derive(Clone)]
pub struct CanonicalStore {
    db: Arc<Mutex<Database>>,
    writer: Arc<Mutex<()>>,
    events: broadcast::Sender<StoreEvent>,
    db_path: Option<PathBuf>,
}

impl CanonicalStore {
    /// Open the store at a filesystem path, optionally as a synced replica
    pub async fn open_path(db_path: impl Into<PathBuf>, sync_config: Option<SyncConfig>) -> Result<Self> {
        let db_path = db_path.into();
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let db = match sync_config {
            Some(config) => {
                tracing::info!(
                    "Opening pin store with sync: {}",
                    config.url.as_deref().unwrap_or("unknown")
                );
                Database::open_with_sync(&db_path, config).await?
            }
            None => {
                tracing::info!("Opening local-only pin store at {}", db_path.display());
                Database::open(&db_path).await?
            }
        };
        Ok(Self::with_database(db, Some(db_path)))
    }

    /// Open an in-memory store (primarily for tests)
    pub async fn open_in_memory() -> Result<Self> {
        let db = Database::open_in_memory().await?;
        Ok(Self::with_database(db, None))
    }

    fn with_database(db: Database, db_path: Option<PathBuf>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            db: Arc::new(Mutex::new(db)),
            writer: Arc::new(Mutex::new(())),
            events,
            db_path,
        }
    }

    /// Location of the database file, if not in memory
    pub fn db_path(&self) -> Option<&PathBuf> {
        self.db_path.as_ref()
    }

    /// All pins, newest created first, then by url
    pub async fn pins(&self) -> Result<Vec<Pin>> {
        let db = self.db.lock().await;
        let repo = LibSqlPinRepository::new(db.connection());
        let records = repo.list().await?;
        Ok(records.iter().map(|record| record.to_pin()).collect())
    }

    /// Look up a pin by url (any scheme variant)
    pub async fn get(&self, url: &str) -> Result<Option<Pin>> {
        let db = self.db.lock().await;
        let repo = LibSqlPinRepository::new(db.connection());
        let record = repo.find(&PinId::from_url(url)).await?;
        Ok(record.map(|record| record.to_pin()))
    }

    /// Pin count and latest modification time
    pub async fn summary(&self) -> Result<StoreSummary> {
        let db = self.db.lock().await;
        let repo = LibSqlPinRepository::new(db.connection());
        Ok(StoreSummary {
            pin_count: repo.count().await?,
            max_modified_at: repo.max_modified_at().await?,
        })
    }

    /// Most recent merge diffs, newest first
    pub async fn recent_merge_diffs(&self, limit: usize) -> Result<Vec<RecordedMergeDiff>> {
        let db = self.db.lock().await;
        let repo = LibSqlPinRepository::new(db.connection());
        repo.list_merge_diffs(limit).await
    }

    /// Subscribe to change events
    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }

    /// Pull remote changes into the local replica, when sync is configured
    pub async fn sync(&self) -> Result<()> {
        let synced = {
            let db = self.db.lock().await;
            db.sync().await?;
            db.is_sync_enabled()
        };
        if synced {
            self.notify(StoreEvent::Synced);
        }
        Ok(())
    }

    /// Take the single writer slot
    pub(crate) async fn lock_writes(&self) -> WriteGuard<'_> {
        WriteGuard {
            _guard: self.writer.lock().await,
        }
    }

    pub(crate) async fn database(&self) -> MutexGuard<'_, Database> {
        self.db.lock().await
    }

    /// Physically remove every record
    pub(crate) async fn delete_all(&self, _writer: &WriteGuard<'_>) -> Result<usize> {
        let removed = {
            let db = self.db.lock().await;
            LibSqlPinRepository::new(db.connection()).delete_all().await?
        };
        tracing::info!("Removed all records: removed[{removed}]");
        self.notify(StoreEvent::Cleared { removed });
        Ok(removed)
    }

    pub(crate) fn notify(&self, event: StoreEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }
}
