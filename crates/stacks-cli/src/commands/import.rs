use std::path::Path;

use stacks_core::backup;
use stacks_core::services::{UpsertOrchestrator, UpsertReport};
use stacks_core::sources::{firestore, pinboard};
use stacks_core::Pin;

use crate::cli::ImportSource;
use crate::commands::common::format_report;
use crate::error::CliError;

pub async fn run_import(
    orchestrator: &UpsertOrchestrator,
    source: ImportSource,
    path: &Path,
) -> Result<UpsertReport, CliError> {
    let pins = read_pins(source, path)?;
    tracing::info!("Importing {} pins from {}", pins.len(), path.display());

    let report = orchestrator.upsert_batch(pins).await?;
    println!("{}", format_report(&report));
    Ok(report)
}

pub fn read_pins(source: ImportSource, path: &Path) -> Result<Vec<Pin>, CliError> {
    match source {
        ImportSource::Pinboard => Ok(pinboard::decode_posts(&std::fs::read_to_string(path)?)?),
        ImportSource::Firestore => Ok(firestore::decode_documents(&std::fs::read_to_string(
            path,
        )?)?),
        ImportSource::Snapshot => {
            if !path.is_dir() {
                return Err(CliError::NotADirectory(path.display().to_string()));
            }
            Ok(backup::load(path)?)
        }
    }
}
