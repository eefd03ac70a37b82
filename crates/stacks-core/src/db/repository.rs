//! Pin repository implementation

#![allow(clippy::cast_possible_wrap)] // SQLite uses i64 for LIMIT

use chrono::{DateTime, Utc};
use libsql::{params, Connection, Row, Value};

use crate::error::{Error, Result};
use crate::identity::PinId;
use crate::models::timestamp::from_millis;
use crate::models::{MergeDiff, Pin, RecordId, RecordedMergeDiff, StoredRecord, Tags};

/// Column list shared by every pin query, in `parse_record` order
const PIN_COLUMNS: &str = "record_id, pin_id, url, tombstone, title, tags, notes, \
    created_at, modified_at, accessed_at, is_read, \
    progress_page_scroll, progress_page_scroll_max, progress_pdf_page, progress_pdf_page_max";

/// Trait for canonical store persistence operations (async)
///
/// Lookups are by content identity ([`PinId`]), never by raw URL.
#[allow(async_fn_in_trait)]
pub trait PinRepository {
    /// Start a write transaction
    async fn begin(&self) -> Result<()>;

    /// Commit the current transaction
    async fn commit(&self) -> Result<()>;

    /// Roll back the current transaction
    async fn rollback(&self) -> Result<()>;

    /// Find the record for a pin identity
    async fn find(&self, pin_id: &PinId) -> Result<Option<StoredRecord>>;

    /// Insert a new record
    async fn insert(&self, record: &StoredRecord) -> Result<()>;

    /// Overwrite every pin field of an existing record
    async fn update(&self, record: &StoredRecord) -> Result<()>;

    /// List all records, newest created first, then by url
    async fn list(&self) -> Result<Vec<StoredRecord>>;

    /// Number of records
    async fn count(&self) -> Result<usize>;

    /// Latest `modified_at` over all records
    async fn max_modified_at(&self) -> Result<Option<DateTime<Utc>>>;

    /// Physically remove every record
    async fn delete_all(&self) -> Result<usize>;

    /// Append a merge diff to the audit trail
    async fn record_merge_diff(&self, pin_id: &PinId, diff: &MergeDiff) -> Result<()>;

    /// Most recent merge diffs, newest first
    async fn list_merge_diffs(&self, limit: usize) -> Result<Vec<RecordedMergeDiff>>;

    /// Drop all but the `keep` most recent merge diffs
    async fn prune_merge_diffs(&self, keep: usize) -> Result<usize>;
}

/// libSQL implementation of `PinRepository`
pub struct LibSqlPinRepository<'a> {
    conn: &'a Connection,
}

impl<'a> LibSqlPinRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    fn parse_record(row: &Row) -> Result<StoredRecord> {
        let record_id: String = row.get(0)?;
        let pin_id: String = row.get(1)?;
        Ok(StoredRecord {
            record_id: record_id
                .parse::<RecordId>()
                .map_err(|e| Error::ParseFailure(format!("invalid record id {record_id}: {e}")))?,
            pin_id: pin_id.parse()?,
            url: row.get(2)?,
            tombstone: opt_i64(row, 3)?.map(|v| v != 0),
            title: opt_text(row, 4)?,
            tags: opt_text(row, 5)?.map(|raw| decode_tags(&raw)),
            notes: opt_text(row, 6)?,
            created_at: opt_i64(row, 7)?.map(from_millis),
            modified_at: opt_i64(row, 8)?.map(from_millis),
            accessed_at: opt_i64(row, 9)?.map(from_millis),
            is_read: opt_i64(row, 10)?.map(|v| v != 0),
            progress_page_scroll: opt_i64(row, 11)?.map(counter),
            progress_page_scroll_max: opt_i64(row, 12)?.map(counter),
            progress_pdf_page: opt_i64(row, 13)?.map(counter),
            progress_pdf_page_max: opt_i64(row, 14)?.map(counter),
        })
    }

    fn parse_merge_diff(row: &Row) -> Result<RecordedMergeDiff> {
        let before_json: String = row.get(2)?;
        let after_json: String = row.get(3)?;
        let before: [Pin; 2] = serde_json::from_str(&before_json)?;
        let after: Pin = serde_json::from_str(&after_json)?;
        Ok(RecordedMergeDiff {
            id: row.get(0)?,
            pin_id: row.get(1)?,
            recorded_at: row.get(4)?,
            diff: MergeDiff { before, after },
        })
    }
}

impl PinRepository for LibSqlPinRepository<'_> {
    async fn begin(&self) -> Result<()> {
        self.conn.execute("BEGIN IMMEDIATE", ()).await?;
        Ok(())
    }

    async fn commit(&self) -> Result<()> {
        self.conn
            .execute("COMMIT", ())
            .await
            .map_err(|e| Error::PersistenceFailure(e.to_string()))?;
        Ok(())
    }

    async fn rollback(&self) -> Result<()> {
        self.conn.execute("ROLLBACK", ()).await?;
        Ok(())
    }

    async fn find(&self, pin_id: &PinId) -> Result<Option<StoredRecord>> {
        let sql = format!("SELECT {PIN_COLUMNS} FROM pins WHERE pin_id = ?");
        let mut rows = self.conn.query(&sql, [pin_id.as_str()]).await?;
        match rows.next().await? {
            Some(row) => Ok(Some(Self::parse_record(&row)?)),
            None => Ok(None),
        }
    }

    async fn insert(&self, record: &StoredRecord) -> Result<()> {
        let sql = format!(
            "INSERT INTO pins ({PIN_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
        );
        self.conn
            .execute(
                &sql,
                params![
                    record.record_id.as_str(),
                    record.pin_id.as_str(),
                    record.url.as_str(),
                    opt_flag(record.tombstone),
                    opt_string(record.title.as_ref()),
                    opt_string(record.tags.as_ref().map(encode_tags).as_ref()),
                    opt_string(record.notes.as_ref()),
                    opt_millis(record.created_at),
                    opt_millis(record.modified_at),
                    opt_millis(record.accessed_at),
                    opt_flag(record.is_read),
                    opt_counter(record.progress_page_scroll),
                    opt_counter(record.progress_page_scroll_max),
                    opt_counter(record.progress_pdf_page),
                    opt_counter(record.progress_pdf_page_max),
                ],
            )
            .await
            .map_err(|e| Error::PersistenceFailure(e.to_string()))?;
        Ok(())
    }

    async fn update(&self, record: &StoredRecord) -> Result<()> {
        let rows = self
            .conn
            .execute(
                "UPDATE pins SET
                    url = ?, tombstone = ?, title = ?, tags = ?, notes = ?,
                    created_at = ?, modified_at = ?, accessed_at = ?, is_read = ?,
                    progress_page_scroll = ?, progress_page_scroll_max = ?,
                    progress_pdf_page = ?, progress_pdf_page_max = ?
                 WHERE record_id = ?",
                params![
                    record.url.as_str(),
                    opt_flag(record.tombstone),
                    opt_string(record.title.as_ref()),
                    opt_string(record.tags.as_ref().map(encode_tags).as_ref()),
                    opt_string(record.notes.as_ref()),
                    opt_millis(record.created_at),
                    opt_millis(record.modified_at),
                    opt_millis(record.accessed_at),
                    opt_flag(record.is_read),
                    opt_counter(record.progress_page_scroll),
                    opt_counter(record.progress_page_scroll_max),
                    opt_counter(record.progress_pdf_page),
                    opt_counter(record.progress_pdf_page_max),
                    record.record_id.as_str(),
                ],
            )
            .await
            .map_err(|e| Error::PersistenceFailure(e.to_string()))?;

        if rows == 0 {
            return Err(Error::PersistenceFailure(format!(
                "record {} vanished during update",
                record.record_id
            )));
        }
        Ok(())
    }

    async fn list(&self) -> Result<Vec<StoredRecord>> {
        let sql = format!("SELECT {PIN_COLUMNS} FROM pins ORDER BY created_at DESC, url ASC");
        let mut rows = self.conn.query(&sql, ()).await?;
        let mut records = Vec::new();
        while let Some(row) = rows.next().await? {
            records.push(Self::parse_record(&row)?);
        }
        Ok(records)
    }

    async fn count(&self) -> Result<usize> {
        let mut rows = self.conn.query("SELECT COUNT(*) FROM pins", ()).await?;
        let count = match rows.next().await? {
            Some(row) => row.get::<i64>(0)?,
            None => 0,
        };
        Ok(usize::try_from(count).unwrap_or(0))
    }

    async fn max_modified_at(&self) -> Result<Option<DateTime<Utc>>> {
        // Absent timestamps read back as the epoch, so they count as epoch here too
        let mut rows = self
            .conn
            .query(
                "SELECT MAX(COALESCE(modified_at, 0)) FROM pins",
                (),
            )
            .await?;
        match rows.next().await? {
            Some(row) => Ok(opt_i64(&row, 0)?.map(from_millis)),
            None => Ok(None),
        }
    }

    async fn delete_all(&self) -> Result<usize> {
        let rows = self
            .conn
            .execute("DELETE FROM pins", ())
            .await
            .map_err(|e| Error::PersistenceFailure(e.to_string()))?;
        Ok(usize::try_from(rows).unwrap_or(usize::MAX))
    }

    async fn record_merge_diff(&self, pin_id: &PinId, diff: &MergeDiff) -> Result<()> {
        let before_json = serde_json::to_string(&diff.before)?;
        let after_json = serde_json::to_string(&diff.after)?;
        self.conn
            .execute(
                "INSERT INTO merge_diffs (pin_id, before_json, after_json, recorded_at) VALUES (?, ?, ?, ?)",
                params![
                    pin_id.as_str(),
                    before_json,
                    after_json,
                    Utc::now().timestamp_millis(),
                ],
            )
            .await
            .map_err(|e| Error::PersistenceFailure(e.to_string()))?;
        Ok(())
    }

    async fn list_merge_diffs(&self, limit: usize) -> Result<Vec<RecordedMergeDiff>> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, pin_id, before_json, after_json, recorded_at
                 FROM merge_diffs
                 ORDER BY id DESC
                 LIMIT ?",
                [limit as i64],
            )
            .await?;
        let mut diffs = Vec::new();
        while let Some(row) = rows.next().await? {
            diffs.push(Self::parse_merge_diff(&row)?);
        }
        Ok(diffs)
    }

    async fn prune_merge_diffs(&self, keep: usize) -> Result<usize> {
        let rows = self
            .conn
            .execute(
                "DELETE FROM merge_diffs
                 WHERE id NOT IN (SELECT id FROM merge_diffs ORDER BY id DESC LIMIT ?)",
                [keep as i64],
            )
            .await?;
        Ok(usize::try_from(rows).unwrap_or(usize::MAX))
    }
}

/// Tags are stored as a JSON array; rows from older clients hold a
/// comma-joined list instead.
fn encode_tags(tags: &Tags) -> String {
    serde_json::to_string(tags.as_slice()).unwrap_or_else(|_| "[]".to_string())
}

fn decode_tags(raw: &str) -> Tags {
    if let Ok(tags) = serde_json::from_str::<Vec<String>>(raw) {
        return tags.into();
    }
    raw.split(',').collect()
}

fn counter(value: i64) -> u32 {
    u32::try_from(value).unwrap_or(0)
}

fn opt_i64(row: &Row, idx: i32) -> Result<Option<i64>> {
    match row.get_value(idx)? {
        Value::Null => Ok(None),
        Value::Integer(v) => Ok(Some(v)),
        other => Err(Error::ParseFailure(format!(
            "expected integer in column {idx}, found {other:?}"
        ))),
    }
}

fn opt_text(row: &Row, idx: i32) -> Result<Option<String>> {
    match row.get_value(idx)? {
        Value::Null => Ok(None),
        Value::Text(v) => Ok(Some(v)),
        other => Err(Error::ParseFailure(format!(
            "expected text in column {idx}, found {other:?}"
        ))),
    }
}

fn opt_flag(value: Option<bool>) -> Value {
    value.map_or(Value::Null, |v| Value::Integer(i64::from(v)))
}

fn opt_counter(value: Option<u32>) -> Value {
    value.map_or(Value::Null, |v| Value::Integer(i64::from(v)))
}

fn opt_millis(value: Option<DateTime<Utc>>) -> Value {
    value.map_or(Value::Null, |v| Value::Integer(v.timestamp_millis()))
}

fn opt_string(value: Option<&String>) -> Value {
    value.map_or(Value::Null, |v| Value::Text(v.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    async fn setup() -> Database {
        Database::open_in_memory().await.unwrap()
    }

    fn sample_pin(url: &str, created_ms: i64) -> Pin {
        let at = Utc.timestamp_millis_opt(created_ms).unwrap();
        let mut pin = Pin::new(url, format!("title of {url}"));
        pin.tags = ["rust", "reading"].into_iter().collect();
        pin.created_at = at;
        pin.modified_at = at;
        pin.accessed_at = at;
        pin.progress_page_scroll = 12;
        pin
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_insert_and_find_by_identity() {
        let db = setup().await;
        let repo = LibSqlPinRepository::new(db.connection());

        let record = StoredRecord::from_pin(&sample_pin("http://a.com", 1_000));
        repo.insert(&record).await.unwrap();

        let found = repo
            .find(&PinId::from_url("https://a.com"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found, record);
        assert!(repo
            .find(&PinId::from_url("https://b.com"))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_update_overwrites_fields() {
        let db = setup().await;
        let repo = LibSqlPinRepository::new(db.connection());

        let mut record = StoredRecord::from_pin(&sample_pin("https://a.com", 1_000));
        repo.insert(&record).await.unwrap();

        let mut edited = record.to_pin();
        edited.title = "edited".to_string();
        edited.is_read = true;
        record.assign(&edited);
        repo.update(&record).await.unwrap();

        let found = repo.find(&record.pin_id).await.unwrap().unwrap();
        assert_eq!(found.to_pin(), edited);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_update_missing_record_fails() {
        let db = setup().await;
        let repo = LibSqlPinRepository::new(db.connection());

        let record = StoredRecord::from_pin(&sample_pin("https://a.com", 1_000));
        assert!(matches!(
            repo.update(&record).await,
            Err(Error::PersistenceFailure(_))
        ));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_list_order_count_and_max_modified() {
        let db = setup().await;
        let repo = LibSqlPinRepository::new(db.connection());

        assert_eq!(repo.count().await.unwrap(), 0);
        assert_eq!(repo.max_modified_at().await.unwrap(), None);

        for (url, created) in [("https://b.com", 1_000), ("https://a.com", 1_000), ("https://c.com", 3_000)] {
            repo.insert(&StoredRecord::from_pin(&sample_pin(url, created)))
                .await
                .unwrap();
        }

        let urls: Vec<String> = repo
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|record| record.url)
            .collect();
        assert_eq!(urls, vec!["https://c.com", "https://a.com", "https://b.com"]);
        assert_eq!(repo.count().await.unwrap(), 3);
        assert_eq!(
            repo.max_modified_at().await.unwrap(),
            Some(Utc.timestamp_millis_opt(3_000).unwrap())
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_absent_columns_default() {
        let db = setup().await;
        db.connection()
            .execute(
                "INSERT INTO pins (record_id, pin_id, url, tags) VALUES (?, ?, ?, ?)",
                [
                    RecordId::new().as_str(),
                    PinId::from_url("https://a.com").to_string(),
                    "https://a.com".to_string(),
                    "x,y,x".to_string(),
                ],
            )
            .await
            .unwrap();

        let repo = LibSqlPinRepository::new(db.connection());
        let pin = repo
            .find(&PinId::from_url("https://a.com"))
            .await
            .unwrap()
            .unwrap()
            .to_pin();
        assert_eq!(pin.tags.as_slice(), ["x", "y"]);
        assert_eq!(pin.progress_pdf_page_max, 0);
        assert_eq!(pin.modified_at, DateTime::<Utc>::default());
        assert!(!pin.tombstone);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_delete_all() {
        let db = setup().await;
        let repo = LibSqlPinRepository::new(db.connection());
        repo.insert(&StoredRecord::from_pin(&sample_pin("https://a.com", 1)))
            .await
            .unwrap();
        repo.insert(&StoredRecord::from_pin(&sample_pin("https://b.com", 2)))
            .await
            .unwrap();

        assert_eq!(repo.delete_all().await.unwrap(), 2);
        assert_eq!(repo.count().await.unwrap(), 0);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_rollback_discards_insert() {
        let db = setup().await;
        let repo = LibSqlPinRepository::new(db.connection());

        repo.begin().await.unwrap();
        repo.insert(&StoredRecord::from_pin(&sample_pin("https://a.com", 1)))
            .await
            .unwrap();
        repo.rollback().await.unwrap();

        assert_eq!(repo.count().await.unwrap(), 0);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_merge_diffs_recorded_and_pruned() {
        let db = setup().await;
        let repo = LibSqlPinRepository::new(db.connection());

        let x = sample_pin("https://a.com", 1_000);
        let y = sample_pin("https://a.com", 2_000);
        let diff = MergeDiff::new(x.clone(), y.clone(), y.clone());
        for _ in 0..3 {
            repo.record_merge_diff(&x.id(), &diff).await.unwrap();
        }

        let diffs = repo.list_merge_diffs(10).await.unwrap();
        assert_eq!(diffs.len(), 3);
        assert_eq!(diffs[0].diff, diff);
        assert!(diffs[0].id > diffs[1].id);

        assert_eq!(repo.prune_merge_diffs(1).await.unwrap(), 2);
        assert_eq!(repo.list_merge_diffs(10).await.unwrap().len(), 1);
    }
}
