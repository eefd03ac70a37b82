//! Durable representation of a pin in the canonical store

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Pin, Tags};
use crate::identity::PinId;

/// Internal identity of a stored record, using UUID v7 (time-sortable)
///
/// Independent of the pin's URL: the record keeps its identity when its URL
/// is rewritten (e.g. http→https) by a merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecordId(Uuid);

impl RecordId {
    /// Create a new unique record ID using UUID v7
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Get the string representation of this ID
    #[must_use]
    pub fn as_str(&self) -> String {
        self.0.to_string()
    }
}

impl Default for RecordId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RecordId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// A row of the `pins` table
///
/// Every column except the identities and `url` may be absent, e.g. on rows
/// written by an older schema or a partially synced replica.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredRecord {
    pub record_id: RecordId,
    pub pin_id: PinId,
    pub url: String,
    pub tombstone: Option<bool>,
    pub title: Option<String>,
    pub tags: Option<Tags>,
    pub notes: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub modified_at: Option<DateTime<Utc>>,
    pub accessed_at: Option<DateTime<Utc>>,
    pub is_read: Option<bool>,
    pub progress_page_scroll: Option<u32>,
    pub progress_page_scroll_max: Option<u32>,
    pub progress_pdf_page: Option<u32>,
    pub progress_pdf_page_max: Option<u32>,
}

impl StoredRecord {
    /// Build a fresh record populated verbatim from a pin
    #[must_use]
    pub fn from_pin(pin: &Pin) -> Self {
        let mut record = Self {
            record_id: RecordId::new(),
            pin_id: pin.id(),
            url: String::new(),
            tombstone: None,
            title: None,
            tags: None,
            notes: None,
            created_at: None,
            modified_at: None,
            accessed_at: None,
            is_read: None,
            progress_page_scroll: None,
            progress_page_scroll_max: None,
            progress_pdf_page: None,
            progress_pdf_page_max: None,
        };
        record.assign(pin);
        record
    }

    /// Overwrite every pin field of this record in place
    ///
    /// The record identity and pin identity are left untouched.
    pub fn assign(&mut self, pin: &Pin) {
        self.url.clone_from(&pin.url);
        self.tombstone = Some(pin.tombstone);
        self.title = Some(pin.title.clone());
        self.tags = Some(pin.tags.clone());
        self.notes = Some(pin.notes.clone());
        self.created_at = Some(pin.created_at);
        self.modified_at = Some(pin.modified_at);
        self.accessed_at = Some(pin.accessed_at);
        self.is_read = Some(pin.is_read);
        self.progress_page_scroll = Some(pin.progress_page_scroll);
        self.progress_page_scroll_max = Some(pin.progress_page_scroll_max);
        self.progress_pdf_page = Some(pin.progress_pdf_page);
        self.progress_pdf_page_max = Some(pin.progress_pdf_page_max);
    }

    /// Convert to a pin, defaulting absent fields
    #[must_use]
    pub fn to_pin(&self) -> Pin {
        Pin {
            url: self.url.clone(),
            tombstone: self.tombstone.unwrap_or(false),
            title: self.title.clone().unwrap_or_default(),
            tags: self.tags.clone().unwrap_or_default(),
            notes: self.notes.clone().unwrap_or_default(),
            created_at: self.created_at.unwrap_or_default(),
            modified_at: self.modified_at.unwrap_or_default(),
            accessed_at: self.accessed_at.unwrap_or_default(),
            is_read: self.is_read.unwrap_or(false),
            progress_page_scroll: self.progress_page_scroll.unwrap_or(0),
            progress_page_scroll_max: self.progress_page_scroll_max.unwrap_or(0),
            progress_pdf_page: self.progress_pdf_page.unwrap_or(0),
            progress_pdf_page_max: self.progress_pdf_page_max.unwrap_or(0),
        }
    }
}
