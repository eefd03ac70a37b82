//! Data models for Stacks

mod merge_diff;
mod pin;
mod record;
mod tags;
pub mod timestamp;

pub use merge_diff::{MergeDiff, RecordedMergeDiff};
pub use pin::Pin;
pub use record::{RecordId, StoredRecord};
pub use tags::Tags;
