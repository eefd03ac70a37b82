//! Services shared by every client of the canonical store.

mod backup;
mod projection;
mod store;
mod upsert;

pub use backup::{BackupOutcome, BackupService, RestoreReport, WipeReport};
pub use projection::PinsProjection;
pub use store::{CanonicalStore, StoreEvent, StoreSummary};
pub use upsert::{UpsertOrchestrator, UpsertOutcome, UpsertReport, MAX_MERGE_DIFFS};
