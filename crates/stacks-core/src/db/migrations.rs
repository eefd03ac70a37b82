//! Database migrations

use crate::error::Result;
use libsql::Connection;

/// Current schema version
const CURRENT_VERSION: i32 = 2;

/// Run all pending migrations
pub async fn run(conn: &Connection) -> Result<()> {
    let version = get_version(conn).await?;

    if version < 1 {
        apply(conn, 1, V1_PINS).await?;
    }
    if version < 2 {
        apply(conn, 2, V2_MERGE_DIFFS).await?;
    }

    Ok(())
}

/// Get the current schema version
async fn get_version(conn: &Connection) -> Result<i32> {
    let mut rows = conn
        .query(
            "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version')",
            (),
        )
        .await?;

    let exists = match rows.next().await? {
        Some(row) => row.get::<i32>(0)? != 0,
        None => false,
    };
    if !exists {
        return Ok(0);
    }

    let mut rows = conn
        .query("SELECT COALESCE(MAX(version), 0) FROM schema_version", ())
        .await?;
    match rows.next().await? {
        Some(row) => Ok(row.get(0)?),
        None => Ok(0),
    }
}

/// Version 1: pins keyed by record id, unique by content identity
///
/// Pin columns are nullable; readers default absent values.
const V1_PINS: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS schema_version (
        version INTEGER PRIMARY KEY
    )",
    "CREATE TABLE IF NOT EXISTS pins (
        record_id TEXT PRIMARY KEY,
        pin_id TEXT NOT NULL UNIQUE,
        url TEXT NOT NULL,
        tombstone INTEGER,
        title TEXT,
        tags TEXT,
        notes TEXT,
        created_at INTEGER,
        modified_at INTEGER,
        accessed_at INTEGER,
        is_read INTEGER,
        progress_page_scroll INTEGER,
        progress_page_scroll_max INTEGER,
        progress_pdf_page INTEGER,
        progress_pdf_page_max INTEGER
    )",
    "CREATE INDEX IF NOT EXISTS idx_pins_created ON pins(created_at DESC, url ASC)",
    "CREATE INDEX IF NOT EXISTS idx_pins_modified ON pins(modified_at DESC)",
];

/// Version 2: merge diff audit trail
const V2_MERGE_DIFFS: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS merge_diffs (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        pin_id TEXT NOT NULL,
        before_json TEXT NOT NULL,
        after_json TEXT NOT NULL,
        recorded_at INTEGER NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS idx_merge_diffs_pin_id ON merge_diffs(pin_id)",
    "CREATE INDEX IF NOT EXISTS idx_merge_diffs_recorded_at ON merge_diffs(recorded_at DESC)",
];

/// Apply one migration's statements atomically and record its version
async fn apply(conn: &Connection, version: i32, statements: &[&str]) -> Result<()> {
    conn.execute("BEGIN TRANSACTION", ()).await?;

    for stmt in statements {
        if let Err(e) = conn.execute(stmt, ()).await {
            conn.execute("ROLLBACK", ()).await.ok();
            return Err(e.into());
        }
    }

    let recorded = conn
        .execute("INSERT INTO schema_version (version) VALUES (?)", [version])
        .await;
    if let Err(e) = recorded {
        conn.execute("ROLLBACK", ()).await.ok();
        return Err(e.into());
    }

    if let Err(e) = conn.execute("COMMIT", ()).await {
        conn.execute("ROLLBACK", ()).await.ok();
        return Err(e.into());
    }

    tracing::info!("Migrated pin database to version {version}");
    Ok(())
}
