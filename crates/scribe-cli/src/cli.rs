use std::path::PathBuf;

use clap::{ArgGroup, Parser, Subcommand, ValueEnum};
use scribe_core::EntryType;

#[derive(Parser)]
#[command(name = "scribe")]
#[command(about = "Organize archives, tomes and entries, and sync them")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Optional path to local database file
    #[arg(long, global = true, value_name = "PATH")]
    pub db_path: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Manage archives
    Archive {
        #[command(subcommand)]
        command: ArchiveCommands,
    },
    /// Manage tomes inside an archive
    Tome {
        #[command(subcommand)]
        command: TomeCommands,
    },
    /// Manage entries inside a tome
    Entry {
        #[command(subcommand)]
        command: EntryCommands,
    },
    /// Delete a record and everything beneath it
    Delete {
        /// Kind of record to delete
        #[arg(value_enum)]
        kind: RecordKind,
        /// Record ID
        id: String,
    },
    /// Synchronize the local store with the sync service
    Sync {
        #[command(subcommand)]
        command: Option<SyncCommands>,
    },
    /// Run the initial sync and print the sync status
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
pub enum ArchiveCommands {
    /// Create an archive
    #[command(alias = "new")]
    Add {
        /// Archive name
        name: String,
        /// Optional description
        #[arg(short, long, default_value = "")]
        description: String,
    },
    /// List archives
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Rename an archive or change its description
    #[command(group(ArgGroup::new("changes").required(true).multiple(true).args(["name", "description"])))]
    Edit {
        /// Archive ID
        id: String,
        /// New name
        #[arg(long)]
        name: Option<String>,
        /// New description
        #[arg(short, long)]
        description: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum TomeCommands {
    /// Create a tome
    #[command(alias = "new")]
    Add {
        /// Owning archive ID
        #[arg(long, value_name = "ID")]
        archive: String,
        /// Tome name
        name: String,
        /// Optional description
        #[arg(short, long, default_value = "")]
        description: String,
    },
    /// List the tomes of an archive
    List {
        /// Archive ID
        archive_id: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Rename a tome or change its description
    #[command(group(ArgGroup::new("changes").required(true).multiple(true).args(["name", "description"])))]
    Edit {
        /// Tome ID
        id: String,
        /// New name
        #[arg(long)]
        name: Option<String>,
        /// New description
        #[arg(short, long)]
        description: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum EntryCommands {
    /// Create an entry
    #[command(alias = "new")]
    Add {
        /// Owning tome ID
        #[arg(long, value_name = "ID")]
        tome: String,
        /// Entry name
        name: String,
        /// Entry content (read from piped stdin when omitted)
        #[arg(short, long)]
        content: Option<String>,
        /// Entry type
        #[arg(long = "type", default_value_t = EntryType::Generic)]
        entry_type: EntryType,
    },
    /// List the entries of a tome
    List {
        /// Tome ID
        tome_id: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print an entry
    Show {
        /// Entry ID
        id: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Edit an entry; opens $EDITOR on the content when no flag is given
    Edit {
        /// Entry ID
        id: String,
        /// New name
        #[arg(long)]
        name: Option<String>,
        /// New content
        #[arg(short, long)]
        content: Option<String>,
        /// New entry type
        #[arg(long = "type")]
        entry_type: Option<EntryType>,
    },
}

#[derive(Subcommand)]
pub enum SyncCommands {
    /// Upload local records, then download remote ones (default)
    Full,
    /// Upload local records only
    Up,
    /// Download remote records only
    Down,
    /// List recently resolved sync conflicts
    Conflicts {
        /// Number of conflicts to show
        #[arg(short, long, default_value = "10")]
        limit: usize,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum RecordKind {
    Archive,
    Tome,
    Entry,
}
