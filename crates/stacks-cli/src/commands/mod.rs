pub mod backup;
pub mod common;
pub mod completions;
pub mod diffs;
pub mod edit;
pub mod import;
pub mod list;
pub mod sync;
