//! Pin model

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

use super::{timestamp, Tags};
use crate::identity::PinId;

/// A bookmarked page and everything known about it
///
/// Pins are values: editing a pin means building a new one and upserting it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pin {
    /// Source of the pin's identity (see [`PinId`])
    pub url: String,
    /// Soft delete flag
    #[serde(default)]
    pub tombstone: bool,
    pub title: String,
    pub tags: Tags,
    pub notes: String,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "timestamp")]
    pub modified_at: DateTime<Utc>,
    #[serde(with = "timestamp")]
    pub accessed_at: DateTime<Utc>,
    pub is_read: bool,

    // Reading progress, one pair of counters per content type. Web pages
    // scroll and pdfs flip pages; the two are never conflated.
    #[serde(default)]
    pub progress_page_scroll: u32,
    #[serde(default)]
    pub progress_page_scroll_max: u32,
    #[serde(default)]
    pub progress_pdf_page: u32,
    #[serde(default)]
    pub progress_pdf_page_max: u32,
}

impl Pin {
    /// Create a new, unread pin for a URL, timestamped now
    #[must_use]
    pub fn new(url: impl Into<String>, title: impl Into<String>) -> Self {
        let now = Utc::now().trunc_subsecs(3);
        Self {
            url: url.into(),
            tombstone: false,
            title: title.into(),
            tags: Tags::new(),
            notes: String::new(),
            created_at: now,
            modified_at: now,
            accessed_at: now,
            is_read: false,
            progress_page_scroll: 0,
            progress_page_scroll_max: 0,
            progress_pdf_page: 0,
            progress_pdf_page_max: 0,
        }
    }

    /// Content-addressed identity of this pin
    #[must_use]
    pub fn id(&self) -> PinId {
        PinId::from_url(&self.url)
    }

    /// Truncate all timestamps to the millisecond precision the store keeps
    #[must_use]
    pub fn with_millisecond_precision(mut self) -> Self {
        self.created_at = self.created_at.trunc_subsecs(3);
        self.modified_at = self.modified_at.trunc_subsecs(3);
        self.accessed_at = self.accessed_at.trunc_subsecs(3);
        self
    }

    /// Check the pin can enter the canonical store
    pub fn validate(&self) -> crate::Result<()> {
        if self.url.trim().is_empty() {
            return Err(crate::Error::InvalidInput("pin url cannot be empty".into()));
        }
        Ok(())
    }
}
