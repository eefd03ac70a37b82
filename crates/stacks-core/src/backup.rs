//! Snapshot files: one directory per snapshot holding `pins.json`.
//!
//! Snapshot names are deterministic in the store's content, so saving twice
//! without changes lands on the same directory.

use std::fs;
use std::io::{ErrorKind, Write as _};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use crate::error::{Error, Result};
use crate::models::Pin;
use crate::services::StoreSummary;

/// File holding the pin collection inside a snapshot directory
pub const PINS_FILE: &str = "pins.json";

/// Placeholder name cloud drives leave until a file is downloaded
const PENDING_PINS_FILE: &str = ".pins.json.icloud";

/// Timestamp format for snapshot names (no ':' so names are valid everywhere)
const NAME_TIMESTAMP_FORMAT: &str = "%Y%m%d %H%M%S%.3f";

/// Name of the snapshot for a store in the given state
///
/// e.g. `20220709 051243.123 (1093 pins)`, or `Empty (0 pins)`.
#[must_use]
pub fn snapshot_name(summary: &StoreSummary) -> String {
    let stamp = summary
        .max_modified_at
        .filter(|at| *at != DateTime::<Utc>::default())
        .map_or_else(
            || "Empty".to_string(),
            |at| at.format(NAME_TIMESTAMP_FORMAT).to_string(),
        );
    format!("{stamp} ({} pins)", summary.pin_count)
}

/// Snapshot name for an in-memory collection
#[must_use]
pub fn snapshot_name_for(pins: &[Pin]) -> String {
    snapshot_name(&StoreSummary {
        pin_count: pins.len(),
        max_modified_at: pins.iter().map(|pin| pin.modified_at).max(),
    })
}

/// Write the full collection to `dir/pins.json`, replacing any previous file
pub fn save(dir: &Path, pins: &[Pin]) -> Result<PathBuf> {
    tracing::info!("Saving snapshot: dir[{}], pins[{}]", dir.display(), pins.len());
    fs::create_dir_all(dir)?;

    let json = serde_json::to_string_pretty(pins)?;
    let path = dir.join(PINS_FILE);
    let mut file = tempfile::NamedTempFile::new_in(dir)?;
    file.write_all(json.as_bytes())?;
    file.as_file().sync_all()?;
    file.persist(&path).map_err(|e| e.error)?;

    tracing::info!("Saved snapshot: dir[{}]", dir.display());
    Ok(path)
}

/// Read the collection saved in a snapshot directory
///
/// Returns [`Error::SnapshotIncomplete`] while the file has not been
/// materialized locally yet; retry later rather than treating it as corrupt.
pub fn load(dir: &Path) -> Result<Vec<Pin>> {
    tracing::info!("Loading snapshot: dir[{}]", dir.display());
    let path = dir.join(PINS_FILE);

    let json = match fs::read_to_string(&path) {
        Ok(json) => json,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            if dir.join(PENDING_PINS_FILE).exists() {
                tracing::warn!("Snapshot still downloading: {}", path.display());
            }
            return Err(Error::SnapshotIncomplete(path));
        }
        Err(e) => return Err(e.into()),
    };
    if json.trim().is_empty() {
        return Err(Error::SnapshotIncomplete(path));
    }

    let pins: Vec<Pin> = serde_json::from_str(&json)
        .map_err(|e| Error::ParseFailure(format!("{}: {e}", path.display())))?;
    tracing::info!("Loaded snapshot: dir[{}], pins[{}]", dir.display(), pins.len());
    Ok(pins)
}

/// Snapshot directories under `backups_dir`, newest name first
///
/// A missing backups directory has no snapshots.
pub fn list_snapshots(backups_dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = match fs::read_dir(backups_dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let mut snapshots = Vec::new();
    for entry in entries {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            snapshots.push(entry.path());
        }
    }
    snapshots.sort_by(|a, b| b.file_name().cmp(&a.file_name()));
    Ok(snapshots)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn pin(url: &str, modified_ms: i64) -> Pin {
        let at = Utc.timestamp_millis_opt(modified_ms).unwrap();
        let mut pin = Pin::new(url, "title");
        pin.created_at = at;
        pin.modified_at = at;
        pin.accessed_at = at;
        pin
    }

    #[test]
    fn test_snapshot_name() {
        let pins = vec![pin("https://a.com", 1_657_343_563_123), pin("https://b.com", 1_000)];
        assert_eq!(snapshot_name_for(&pins), "20220709 051243.123 (2 pins)");
    }

    #[test]
    fn test_snapshot_name_empty() {
        assert_eq!(snapshot_name_for(&[]), "Empty (0 pins)");
        assert_eq!(snapshot_name_for(&[pin("https://a.com", 0)]), "Empty (1 pins)");
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let snapshot = dir.path().join("Backups").join("snap");
        let pins = vec![pin("https://a.com", 1_000), pin("http://b.com", 2_000)];

        let path = save(&snapshot, &pins).unwrap();
        assert!(path.ends_with(PINS_FILE));
        assert_eq!(load(&snapshot).unwrap(), pins);

        // Saving again replaces the file
        save(&snapshot, &pins[..1]).unwrap();
        assert_eq!(load(&snapshot).unwrap(), pins[..1].to_vec());
    }

    #[test]
    fn test_saved_json_shape() {
        let dir = tempfile::tempdir().unwrap();
        save(dir.path(), &[pin("https://a.com", 1_000)]).unwrap();

        let raw = fs::read_to_string(dir.path().join(PINS_FILE)).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value[0]["url"], "https://a.com");
        assert_eq!(value[0]["modified_at"], "1970-01-01T00:00:01.000+0000");
        assert!(raw.contains('\n'));
    }

    #[test]
    fn test_load_incomplete() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(load(dir.path()), Err(Error::SnapshotIncomplete(_))));

        fs::write(dir.path().join(PENDING_PINS_FILE), b"").unwrap();
        assert!(matches!(load(dir.path()), Err(Error::SnapshotIncomplete(_))));

        fs::write(dir.path().join(PINS_FILE), b"").unwrap();
        assert!(matches!(load(dir.path()), Err(Error::SnapshotIncomplete(_))));
    }

    #[test]
    fn test_load_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(PINS_FILE), b"[{\"url\": ").unwrap();
        assert!(matches!(load(dir.path()), Err(Error::ParseFailure(_))));
    }

    #[test]
    fn test_load_ignores_unknown_fields_and_defaults_progress() {
        let dir = tempfile::tempdir().unwrap();
        let json = r#"[{
            "schema_version": 3,
            "url": "https://a.com",
            "title": "A",
            "tags": ["x"],
            "notes": "",
            "created_at": "2022-07-09T05:12:43.123+0000",
            "modified_at": "2022-07-09T05:12:43.123+0000",
            "accessed_at": "2022-07-09T05:12:43.123+0000",
            "is_read": false
        }]"#;
        fs::write(dir.path().join(PINS_FILE), json).unwrap();

        let pins = load(dir.path()).unwrap();
        assert_eq!(pins.len(), 1);
        assert_eq!(pins[0].progress_pdf_page_max, 0);
        assert!(!pins[0].tombstone);
    }

    #[test]
    fn test_list_snapshots_newest_first() {
        let dir = tempfile::tempdir().unwrap();
        assert!(list_snapshots(&dir.path().join("missing")).unwrap().is_empty());

        for name in ["20220101 000000.000 (1 pins)", "Empty (0 pins)", "20230101 000000.000 (2 pins)"] {
            fs::create_dir_all(dir.path().join(name)).unwrap();
        }
        fs::write(dir.path().join("stray.txt"), b"x").unwrap();

        let names: Vec<String> = list_snapshots(dir.path())
            .unwrap()
            .iter()
            .map(|path| path.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(
            names,
            vec!["Empty (0 pins)", "20230101 000000.000 (2 pins)", "20220101 000000.000 (1 pins)"]
        );
    }
}
