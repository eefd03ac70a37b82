//! stacks-core - Pin reconciliation for Stacks
//!
//! Pins arrive from several sources (Pinboard, Firestore, snapshots, user
//! edits), each holding a partial and possibly stale view. This crate merges
//! them into one canonical store keyed by content identity, and saves and
//! restores snapshots of that store.
//!
//! The entry points are [`services::UpsertOrchestrator`] for writes,
//! [`services::CanonicalStore`] and [`services::PinsProjection`] for reads,
//! and [`services::BackupService`] for snapshots.

pub mod backup;
pub mod config;
pub mod db;
pub mod error;
pub mod identity;
pub mod merge;
pub mod models;
pub mod services;
pub mod sources;
pub mod util;

pub use error::{Error, Result};
pub use identity::PinId;
pub use models::{MergeDiff, Pin, Tags};
