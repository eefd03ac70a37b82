use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use stacks_core::config::StacksConfig;
use stacks_core::db::SyncConfig;
use stacks_core::models::timestamp::format_timestamp;
use stacks_core::models::RecordedMergeDiff;
use stacks_core::services::{BackupService, CanonicalStore, UpsertOrchestrator, UpsertReport};
use stacks_core::Pin;

use crate::error::CliError;

/// Resolved locations and sync settings for one invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Runtime {
    pub db_path: PathBuf,
    pub backups_dir: PathBuf,
    pub sync: Option<SyncConfig>,
}

/// Merge the config file, environment and command-line flags
///
/// Flags win over the environment, which wins over the file.
pub fn resolve_runtime(
    config: StacksConfig,
    cli_db_path: Option<PathBuf>,
    cli_backups_dir: Option<PathBuf>,
) -> Result<Runtime, CliError> {
    let sync = config.sync_config()?;
    let data_dir = default_data_dir();
    Ok(Runtime {
        db_path: cli_db_path
            .or(config.db_path)
            .unwrap_or_else(|| data_dir.join("stacks.db")),
        backups_dir: cli_backups_dir
            .or(config.backups_dir)
            .unwrap_or_else(|| data_dir.join("Backups")),
        sync,
    })
}

pub fn load_config(path: Option<&Path>) -> Result<StacksConfig, CliError> {
    let path = path.map_or_else(default_config_path, Path::to_path_buf);
    Ok(StacksConfig::load(&path)?.with_process_env()?)
}

pub fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("stacks")
}

pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("stacks")
        .join("config.json")
}

pub async fn open_store(runtime: &Runtime) -> Result<CanonicalStore, CliError> {
    Ok(CanonicalStore::open_path(&runtime.db_path, runtime.sync.clone()).await?)
}

pub fn backup_service(store: CanonicalStore, runtime: &Runtime) -> BackupService {
    BackupService::new(UpsertOrchestrator::new(store), &runtime.backups_dir)
}

#[derive(Debug, Serialize)]
pub struct PinListItem {
    pub id: String,
    pub url: String,
    pub title: String,
    pub tags: Vec<String>,
    pub notes: String,
    pub is_read: bool,
    pub tombstone: bool,
    pub created_at: String,
    pub modified_at: String,
    pub relative_time: String,
}

#[derive(Debug, Serialize)]
pub struct MergeDiffItem {
    pub id: i64,
    pub pin_id: String,
    pub url: String,
    pub recorded_at: String,
    pub changed_fields: Vec<&'static str>,
}

/// Pins to show: live pins unless `include_deleted`, optionally by tag
pub fn filter_pins(pins: Vec<Pin>, tag: Option<&str>, include_deleted: bool, limit: usize) -> Vec<Pin> {
    pins.into_iter()
        .filter(|pin| include_deleted || !pin.tombstone)
        .filter(|pin| tag.is_none_or(|tag| pin.tags.contains(tag)))
        .take(limit)
        .collect()
}

pub fn format_pin_lines(pins: &[Pin]) -> Vec<String> {
    let now_ms = Utc::now().timestamp_millis();
    pins.iter()
        .map(|pin| {
            let read = if pin.is_read { ' ' } else { '*' };
            let preview = pin_preview(pin, 40);
            let relative_time = format_relative_time(pin.modified_at.timestamp_millis(), now_ms);
            let tags = render_tags(pin);
            if tags.is_empty() {
                format!("{read} {preview:<40}  {relative_time:<10}  {}", pin.url)
            } else {
                format!("{read} {preview:<40}  {relative_time:<10}  {}  {tags}", pin.url)
            }
        })
        .collect()
}

pub fn pin_to_list_item(pin: &Pin) -> PinListItem {
    let now_ms = Utc::now().timestamp_millis();
    PinListItem {
        id: pin.id().to_string(),
        url: pin.url.clone(),
        title: pin.title.clone(),
        tags: pin.tags.as_slice().to_vec(),
        notes: pin.notes.clone(),
        is_read: pin.is_read,
        tombstone: pin.tombstone,
        created_at: format_timestamp(&pin.created_at),
        modified_at: format_timestamp(&pin.modified_at),
        relative_time: format_relative_time(pin.modified_at.timestamp_millis(), now_ms),
    }
}

pub fn merge_diff_to_item(recorded: &RecordedMergeDiff) -> MergeDiffItem {
    MergeDiffItem {
        id: recorded.id,
        pin_id: recorded.pin_id.clone(),
        url: recorded.diff.after.url.clone(),
        recorded_at: format_time_label(recorded.recorded_at),
        changed_fields: changed_fields(&recorded.diff.before[0], &recorded.diff.after),
    }
}

pub fn format_merge_diff_lines(diffs: &[RecordedMergeDiff]) -> Vec<String> {
    diffs
        .iter()
        .map(|recorded| {
            let fields = changed_fields(&recorded.diff.before[0], &recorded.diff.after);
            format!(
                "{}  {}  changed={}",
                format_time_label(recorded.recorded_at),
                recorded.diff.after.url,
                if fields.is_empty() {
                    "-".to_string()
                } else {
                    fields.join(",")
                }
            )
        })
        .collect()
}

/// Fields of the stored pin that the merge changed
pub fn changed_fields(before: &Pin, after: &Pin) -> Vec<&'static str> {
    let checks = [
        ("url", before.url != after.url),
        ("tombstone", before.tombstone != after.tombstone),
        ("title", before.title != after.title),
        ("tags", before.tags.as_slice() != after.tags.as_slice()),
        ("notes", before.notes != after.notes),
        ("created_at", before.created_at != after.created_at),
        ("modified_at", before.modified_at != after.modified_at),
        ("accessed_at", before.accessed_at != after.accessed_at),
        ("is_read", before.is_read != after.is_read),
        (
            "progress",
            before.progress_page_scroll != after.progress_page_scroll
                || before.progress_page_scroll_max != after.progress_page_scroll_max
                || before.progress_pdf_page != after.progress_pdf_page
                || before.progress_pdf_page_max != after.progress_pdf_page_max,
        ),
    ];
    checks
        .into_iter()
        .filter_map(|(name, changed)| changed.then_some(name))
        .collect()
}

pub fn format_report(report: &UpsertReport) -> String {
    format!(
        "inserted={} merged={} unchanged={} skipped={} failed={}",
        report.inserted, report.merged, report.unchanged, report.skipped, report.failed
    )
}

pub fn pin_preview(pin: &Pin, max_chars: usize) -> String {
    let text = if pin.title.trim().is_empty() {
        pin.url.as_str()
    } else {
        pin.title.as_str()
    };
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.chars().count() <= max_chars {
        collapsed
    } else {
        let take_len = max_chars.saturating_sub(3);
        let mut truncated = collapsed.chars().take(take_len).collect::<String>();
        truncated.push_str("...");
        truncated
    }
}

pub fn render_tags(pin: &Pin) -> String {
    pin.tags
        .iter()
        .map(|tag| format!("#{tag}"))
        .collect::<Vec<String>>()
        .join(" ")
}

pub fn format_time_label(timestamp_ms: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(timestamp_ms).map_or_else(
        || timestamp_ms.to_string(),
        |date_time| date_time.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
    )
}

pub fn format_relative_time(timestamp_ms: i64, now_ms: i64) -> String {
    let diff = now_ms.saturating_sub(timestamp_ms);
    let minute = 60_000;
    let hour = 60 * minute;
    let day = 24 * hour;
    let week = 7 * day;
    let month = 30 * day;
    let year = 365 * day;

    if diff < minute {
        "just now".to_string()
    } else if diff < hour {
        format!("{}m ago", diff / minute)
    } else if diff < day {
        format!("{}h ago", diff / hour)
    } else if diff < week {
        format!("{}d ago", diff / day)
    } else if diff < month {
        format!("{}w ago", diff / week)
    } else if diff < year {
        format!("{}mo ago", diff / month)
    } else {
        format!("{}y ago", diff / year)
    }
}

pub fn normalize_url_arg(url: &str) -> Result<String, CliError> {
    let trimmed = url.trim();
    if trimmed.is_empty() {
        Err(CliError::EmptyUrl)
    } else {
        Ok(trimmed.to_string())
    }
}
