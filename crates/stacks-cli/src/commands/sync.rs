use stacks_core::services::CanonicalStore;

use crate::commands::common::Runtime;
use crate::error::CliError;

pub async fn run_sync(runtime: &Runtime, store: &CanonicalStore) -> Result<(), CliError> {
    if runtime.sync.is_none() {
        return Err(CliError::SyncNotConfigured);
    }

    store.sync().await?;
    let summary = store.summary().await?;
    println!("Sync completed ({} pins)", summary.pin_count);
    Ok(())
}
