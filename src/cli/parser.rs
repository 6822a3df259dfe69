use clap::{Parser, Subcommand};

/// Command-line interface definition for tempolog
/// Offline-first time tracking CLI backed by SQLite
#[derive(Parser)]
#[command(
    name = "tempolog",
    version = env!("CARGO_PKG_VERSION"),
    about = "Offline-first time tracking: running timers, travel entries and background sync",
    long_about = None
)]
pub struct Cli {
    /// Override database path (useful for tests or custom DB)
    #[arg(global = true, long = "db")]
    pub db: Option<String>,

    /// Run in test mode (no config file update)
    #[arg(global = true, long = "test", hide = true)]
    pub test: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize the database and configuration
    Init,

    /// Show or adjust the active configuration
    Config {
        #[arg(long = "print", help = "Print the current configuration file")]
        print_config: bool,

        #[arg(long = "default-project", help = "Project used by `start` when none is given")]
        default_project: Option<String>,

        #[arg(
            long = "threshold",
            value_name = "MINUTES",
            help = "Alert threshold for long-running timers"
        )]
        threshold: Option<i64>,
    },

    /// Manage projects (the owner of every tracked record)
    Project {
        #[command(subcommand)]
        action: ProjectAction,
    },

    /// Start the running timer for a project
    Start {
        /// Project name (falls back to the configured default project)
        project: Option<String>,

        #[arg(long, help = "Attach a note to the session")]
        note: Option<String>,
    },

    /// Pause the running timer
    Pause,

    /// Resume a paused timer
    Resume,

    /// Show the running timer and pending sync state
    Status,

    /// Stop the running timer and record the completed session
    Stop,

    /// Drop the running timer without recording anything
    Discard,

    /// Re-open a completed session: delete it and continue its timer
    Continue {
        /// Session id (see `list`)
        id: i64,
    },

    /// Record a travel distance entry
    Travel {
        /// Project name
        project: String,

        /// Distance in kilometres
        distance: f64,

        #[arg(long, help = "Date of the trip (YYYY-MM-DD), defaults to now")]
        date: Option<String>,

        #[arg(long, help = "Attach a note to the entry")]
        note: Option<String>,
    },

    /// List recorded sessions (or travel entries with --travel)
    List {
        #[arg(long, help = "List travel entries instead of sessions")]
        travel: bool,

        #[arg(long, help = "Filter by project name")]
        project: Option<String>,
    },

    /// Manage predefined notes
    Note {
        #[command(subcommand)]
        action: NoteAction,
    },

    /// Push unsynced records to the remote replica
    Sync,

    /// Print the internal log table
    Log {
        #[arg(long = "print", help = "Print rows from the internal log table")]
        print: bool,
    },

    /// Create a backup copy of the database
    Backup {
        #[arg(long, value_name = "FILE")]
        file: String,

        #[arg(long)]
        compress: bool,

        #[arg(long, short = 'f')]
        force: bool,
    },
}

#[derive(Subcommand)]
pub enum ProjectAction {
    /// Create a project
    Add {
        name: String,

        #[arg(long, help = "Display color, e.g. '#cc6644'")]
        color: Option<String>,
    },

    /// List all projects
    List,

    /// Archive a project (kept for history, hidden from pickers)
    Archive { id: i64 },
}

#[derive(Subcommand)]
pub enum NoteAction {
    /// Save a reusable note text
    Add { text: String },

    /// List saved notes
    List,
}
