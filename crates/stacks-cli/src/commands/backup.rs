use std::path::Path;

use stacks_core::services::BackupService;

use crate::commands::common::format_report;
use crate::error::CliError;

pub async fn run_backup(service: &BackupService) -> Result<(), CliError> {
    let outcome = service.save_to_backup().await?;
    if outcome.already_exists {
        println!("No changes since last backup: {}", outcome.backup_dir.display());
    } else {
        println!("Saved backup: {}", outcome.backup_dir.display());
    }
    Ok(())
}

pub fn run_backups(service: &BackupService) -> Result<(), CliError> {
    let backups = service.list_backups()?;
    if backups.is_empty() {
        println!("No backups in {}", service.backups_dir().display());
        return Ok(());
    }
    for dir in backups {
        println!("{}", dir.display());
    }
    Ok(())
}

pub async fn run_restore(service: &BackupService, dir: &Path) -> Result<(), CliError> {
    let report = service.upsert_from_backup(dir).await?;
    println!("Autosaved to {}", report.autosave.backup_dir.display());
    println!("{}", format_report(&report.upsert));
    Ok(())
}

pub async fn run_wipe(service: &BackupService, confirmed: bool) -> Result<(), CliError> {
    if !confirmed {
        return Err(CliError::WipeNotConfirmed);
    }
    let report = service.delete_all_state().await?;
    println!("Autosaved to {}", report.autosave.backup_dir.display());
    println!("Removed {} pins", report.removed);
    Ok(())
}
