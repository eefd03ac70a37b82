//! Database layer for the canonical store

mod connection;
mod migrations;
mod repository;

pub use connection::{Database, SyncConfig, DEFAULT_SYNC_INTERVAL};
pub use repository::{LibSqlPinRepository, PinRepository};
