use stacks_core::services::CanonicalStore;

use crate::commands::common::{filter_pins, format_pin_lines, pin_to_list_item, PinListItem};
use crate::error::CliError;

pub async fn run_list(
    store: &CanonicalStore,
    limit: usize,
    tag: Option<&str>,
    include_deleted: bool,
    as_json: bool,
) -> Result<(), CliError> {
    let pins = filter_pins(store.pins().await?, tag, include_deleted, limit);

    if as_json {
        let json_items = pins
            .iter()
            .map(pin_to_list_item)
            .collect::<Vec<PinListItem>>();
        println!("{}", serde_json::to_string_pretty(&json_items)?);
    } else if pins.is_empty() {
        println!("No pins.");
    } else {
        for line in format_pin_lines(&pins) {
            println!("{line}");
        }
    }

    Ok(())
}
