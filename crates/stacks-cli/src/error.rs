use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] stacks_core::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("Pin url cannot be empty")]
    EmptyUrl,
    #[error("Nothing to edit; pass --title, --notes, --tag, --read, --unread or --delete")]
    NothingToEdit,
    #[error("Refusing to wipe without --yes")]
    WipeNotConfirmed,
    #[error("Snapshot source expects a directory: {0}")]
    NotADirectory(String),
    #[error(
        "Sync is not configured. Set STACKS_SYNC_URL and STACKS_SYNC_AUTH_TOKEN, or sync_url and sync_auth_token in the config file."
    )]
    SyncNotConfigured,
}
