use stacks_core::services::UpsertOrchestrator;
use stacks_core::Pin;

use crate::commands::common::{normalize_url_arg, pin_preview};
use crate::error::CliError;

/// Field changes requested on the command line
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PinEdit {
    pub title: Option<String>,
    pub notes: Option<String>,
    pub add_tags: Vec<String>,
    pub is_read: Option<bool>,
    pub tombstone: bool,
}

impl PinEdit {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.notes.is_none()
            && self.add_tags.is_empty()
            && self.is_read.is_none()
            && !self.tombstone
    }

    pub fn apply(self, pin: &mut Pin) {
        if let Some(title) = self.title {
            pin.title = title;
        }
        if let Some(notes) = self.notes {
            pin.notes = notes;
        }
        for tag in self.add_tags {
            pin.tags.insert(tag);
        }
        if let Some(is_read) = self.is_read {
            pin.is_read = is_read;
        }
        if self.tombstone {
            pin.tombstone = true;
        }
    }
}

pub async fn run_edit(
    orchestrator: &UpsertOrchestrator,
    url: &str,
    edit: PinEdit,
) -> Result<Pin, CliError> {
    let url = normalize_url_arg(url)?;
    if edit.is_empty() {
        return Err(CliError::NothingToEdit);
    }

    let pin = orchestrator.edit(&url, |pin| edit.apply(pin)).await?;
    println!("{}  {}", pin_preview(&pin, 60), pin.url);
    Ok(pin)
}
