//! Persistence engine connection management

use std::path::Path;
use std::time::Duration;

use libsql::{Builder, Connection, Database as LibSqlDatabase};

use super::migrations;
use crate::error::{Error, Result};

/// Default interval between background replica syncs
pub const DEFAULT_SYNC_INTERVAL: Duration = Duration::from_secs(60);

/// Cloud replication settings for the pin database
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncConfig {
    /// Remote database URL (e.g., `libsql://stacks-user.example.io`)
    pub url: Option<String>,
    /// Authentication token for the remote database
    pub auth_token: Option<String>,
    /// Background sync interval; `None` means manual sync only
    pub sync_interval: Option<Duration>,
}

impl SyncConfig {
    pub fn new(url: impl Into<String>, auth_token: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            auth_token: Some(auth_token.into()),
            sync_interval: Some(DEFAULT_SYNC_INTERVAL),
        }
    }

    #[must_use]
    pub const fn with_sync_interval(mut self, interval: Duration) -> Self {
        self.sync_interval = Some(interval);
        self
    }

    #[must_use]
    pub const fn without_auto_sync(mut self) -> Self {
        self.sync_interval = None;
        self
    }

    pub const fn is_configured(&self) -> bool {
        self.url.is_some() && self.auth_token.is_some()
    }
}

/// Persistence engine behind the canonical store
///
/// A local libSQL file, optionally an embedded replica of a remote database.
/// Replication is opaque to the rest of the crate: it only sees a connection
/// whose contents eventually reflect remote writes.
pub struct Database {
    db: LibSqlDatabase,
    conn: Connection,
    replicated: bool,
}

impl Database {
    /// Open a local-only database at the given path, creating it if needed
    ///
    /// Runs migrations automatically.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_string_lossy().to_string();
        let db = Builder::new_local(&path).build().await?;
        Self::prepare(db, false).await
    }

    /// Open an in-memory database (useful for testing)
    pub async fn open_in_memory() -> Result<Self> {
        let db = Builder::new_local(":memory:").build().await?;
        Self::prepare(db, false).await
    }

    /// Open a local embedded replica of a remote database
    ///
    /// Reads are served from the local file; the replica pulls remote changes
    /// on every sync.
    pub async fn open_with_sync(local_path: impl AsRef<Path>, config: SyncConfig) -> Result<Self> {
        let path = local_path.as_ref().to_string_lossy().to_string();
        let (Some(url), Some(token)) = (config.url, config.auth_token) else {
            return Err(Error::Config(
                "sync requires both a url and an auth token".into(),
            ));
        };

        let mut builder = Builder::new_remote_replica(&path, url, token);
        if let Some(interval) = config.sync_interval {
            builder = builder.sync_interval(interval);
            tracing::debug!("Replica sync interval set to {:?}", interval);
        }
        let db = builder.build().await?;

        // Pull the remote schema before migrating so we never race it
        db.sync().await?;
        Self::prepare(db, true).await
    }

    async fn prepare(db: LibSqlDatabase, replicated: bool) -> Result<Self> {
        let conn = db.connect()?;
        let database = Self {
            db,
            conn,
            replicated,
        };
        database.configure().await?;
        migrations::run(&database.conn).await?;
        Ok(database)
    }

    async fn configure(&self) -> Result<()> {
        // Replicas reject some pragmas; those are best effort
        self.conn
            .execute("PRAGMA journal_mode = WAL;", ())
            .await
            .ok();
        self.conn
            .execute("PRAGMA synchronous = NORMAL;", ())
            .await
            .ok();
        self.conn.execute("PRAGMA foreign_keys = ON;", ()).await?;
        Ok(())
    }

    /// Pull remote changes into the local replica (no-op for local databases)
    pub async fn sync(&self) -> Result<()> {
        if self.replicated {
            self.db.sync().await?;
            tracing::debug!("Pin database synced with remote");
        }
        Ok(())
    }

    pub const fn is_sync_enabled(&self) -> bool {
        self.replicated
    }

    pub const fn connection(&self) -> &Connection {
        &self.conn
    }
}
