use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "stacks")]
#[command(about = "Reconcile bookmarked pins from many sources into one collection")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Optional path to local database file
    #[arg(long, global = true, value_name = "PATH")]
    pub db_path: Option<PathBuf>,

    /// Directory holding snapshot backups
    #[arg(long, global = true, value_name = "DIR")]
    pub backups_dir: Option<PathBuf>,

    /// JSON config file (defaults to the platform config dir)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List pins, newest first
    List {
        /// Number of pins to show
        #[arg(short, long, default_value = "20")]
        limit: usize,
        /// Only pins carrying this tag
        #[arg(long)]
        tag: Option<String>,
        /// Include deleted pins
        #[arg(long)]
        all: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Upsert pins exported from a source
    Import {
        /// Format of the input file
        #[arg(long, value_enum)]
        source: ImportSource,
        /// File (or snapshot directory) to import
        path: PathBuf,
    },
    /// Edit a stored pin
    Edit {
        /// Pin url (http and https variants match)
        url: String,
        /// New title
        #[arg(long)]
        title: Option<String>,
        /// New notes
        #[arg(long)]
        notes: Option<String>,
        /// Add a tag (repeatable)
        #[arg(long = "tag", value_name = "TAG")]
        tags: Vec<String>,
        /// Mark as read
        #[arg(long, conflicts_with = "unread")]
        read: bool,
        /// Mark as unread
        #[arg(long)]
        unread: bool,
        /// Mark as deleted
        #[arg(long)]
        delete: bool,
    },
    /// Save a snapshot of the store
    Backup,
    /// List saved snapshots
    Backups,
    /// Merge a snapshot into the store (autosaves first)
    Restore {
        /// Snapshot directory
        dir: PathBuf,
    },
    /// Remove every pin (autosaves first)
    Wipe {
        /// Confirm the wipe
        #[arg(long)]
        yes: bool,
    },
    /// Show recent merge diffs
    Diffs {
        /// Number of diffs to show
        #[arg(short, long, default_value = "10")]
        limit: usize,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Sync local replica with the remote database
    Sync,
    /// Generate shell completion scripts
    Completions {
        /// Target shell
        #[arg(value_enum)]
        shell: CompletionShell,
        /// Optional output path (stdout when omitted)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum ImportSource {
    /// Pinboard `posts/all` JSON
    Pinboard,
    /// Exported Firestore pin documents
    Firestore,
    /// A Stacks snapshot directory
    Snapshot,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum CompletionShell {
    Bash,
    Zsh,
    Fish,
}
