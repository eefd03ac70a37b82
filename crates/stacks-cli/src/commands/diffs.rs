use stacks_core::services::CanonicalStore;

use crate::commands::common::{format_merge_diff_lines, merge_diff_to_item, MergeDiffItem};
use crate::error::CliError;

pub async fn run_diffs(store: &CanonicalStore, limit: usize, as_json: bool) -> Result<(), CliError> {
    let diffs = store.recent_merge_diffs(limit).await?;

    if as_json {
        let json_items = diffs
            .iter()
            .map(merge_diff_to_item)
            .collect::<Vec<MergeDiffItem>>();
        println!("{}", serde_json::to_string_pretty(&json_items)?);
        return Ok(());
    }

    if diffs.is_empty() {
        println!("No merge diffs recorded.");
        return Ok(());
    }

    for line in format_merge_diff_lines(&diffs) {
        println!("{line}");
    }
    Ok(())
}
