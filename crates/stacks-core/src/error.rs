//! Error types for stacks-core

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias using stacks-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in stacks-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// A required field was absent from a source record
    #[error("Required field not found: {0}")]
    NotFound(String),

    /// Malformed source record or snapshot
    #[error("Parse failure: {0}")]
    ParseFailure(String),

    /// Merge invoked across pins with different identities
    #[error("Precondition violated: {0}")]
    PreconditionViolation(String),

    /// Commit to the canonical store failed
    #[error("Persistence failure: {0}")]
    PersistenceFailure(String),

    /// Snapshot file has not been materialized by the backing storage yet
    #[error("Snapshot not fully materialized: {}", .0.display())]
    SnapshotIncomplete(PathBuf),

    /// libSQL error
    #[error("libSQL error: {0}")]
    LibSql(#[from] libsql::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),
}
