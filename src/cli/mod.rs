//! CLI definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

pub mod commands;

/// kicksync - offline-first pregnancy tracking store with two-way sync
#[derive(Parser, Debug)]
#[command(name = "kicksync", author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Database path (default: ~/.kicksync/data/kicksync.db)
    #[arg(long, global = true, env = "KICKSYNC_DB")]
    pub db: Option<PathBuf>,

    /// User to act for (default: the signed-in user from the session marker)
    #[arg(long, global = true, env = "KICKSYNC_USER")]
    pub user: Option<String>,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Increase logging verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (no output except errors)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create the local store or bring its schema up to date
    Migrate,

    /// Local session marker (who background sync acts for)
    Session {
        #[command(subcommand)]
        command: SessionCommands,
    },

    /// Kick count entries
    Kicks {
        #[command(subcommand)]
        command: KickCommands,
    },

    /// Symptom logs
    Symptoms {
        #[command(subcommand)]
        command: SymptomCommands,
    },

    /// Goals
    Goals {
        #[command(subcommand)]
        command: GoalCommands,
    },

    /// Profile
    Profile {
        #[command(subcommand)]
        command: ProfileCommands,
    },

    /// Cached articles and tips
    Content {
        #[command(subcommand)]
        command: ContentCommands,
    },

    /// Push pending changes and pull remote data
    Sync(SyncArgs),

    /// Show per-domain sync state
    Status,

    /// Run periodic background sync until interrupted
    Daemon {
        /// Run one sync immediately before the first interval
        #[arg(long)]
        now: bool,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },

    /// Print version information
    Version,
}

// ============================================================================
// Session Commands
// ============================================================================

#[derive(Subcommand, Debug)]
pub enum SessionCommands {
    /// Record the signed-in user
    Set {
        /// User ID
        user: String,
    },

    /// Sign out: remove the marker and wipe local user data
    Clear {
        /// Keep local records and cached content
        #[arg(long)]
        keep_data: bool,
    },

    /// Show the signed-in user
    Show,
}

// ============================================================================
// Kick Commands
// ============================================================================

#[derive(Subcommand, Debug)]
pub enum KickCommands {
    /// Record a kick count session
    Add {
        /// Number of kicks
        #[arg(value_parser = clap::value_parser!(i64).range(0..))]
        count: i64,

        /// Date (YYYY-MM-DD, default: today)
        #[arg(long)]
        date: Option<String>,

        /// Time of day (morning, afternoon, evening, night)
        #[arg(long, short = 't', default_value = "morning")]
        time_of_day: String,

        /// Free-form notes
        #[arg(long)]
        notes: Option<String>,

        /// Overwrite an existing entry
        #[arg(long)]
        id: Option<String>,
    },

    /// List entries
    List {
        /// Exact date (YYYY-MM-DD)
        #[arg(long, conflicts_with_all = ["from", "to"])]
        date: Option<String>,

        /// Inclusive start date
        #[arg(long, requires = "to")]
        from: Option<String>,

        /// Inclusive end date
        #[arg(long, requires = "from")]
        to: Option<String>,
    },

    /// Daily kick totals over a date range
    Totals {
        /// Inclusive start date
        #[arg(long)]
        from: String,

        /// Inclusive end date (default: today)
        #[arg(long)]
        to: Option<String>,
    },
}

// ============================================================================
// Symptom Commands
// ============================================================================

#[derive(Subcommand, Debug)]
pub enum SymptomCommands {
    /// Log a symptom
    Add {
        /// Symptom name
        symptom: String,

        /// Severity from 1 (mild) to 5 (severe)
        #[arg(long, short, value_parser = clap::value_parser!(i64).range(1..=5))]
        severity: Option<i64>,

        /// Free-form notes
        #[arg(long)]
        notes: Option<String>,

        /// When it happened (ISO-8601, default: now)
        #[arg(long)]
        at: Option<String>,
    },

    /// List the most recent logs
    List {
        /// Maximum number of logs
        #[arg(long, short, default_value_t = crate::storage::symptoms::DEFAULT_RECENT_LIMIT)]
        limit: u32,
    },
}

// ============================================================================
// Goal Commands
// ============================================================================

#[derive(Subcommand, Debug)]
pub enum GoalCommands {
    /// Add or replace a goal
    Add {
        /// Goal title
        title: String,

        /// Category
        #[arg(long, short)]
        category: Option<String>,

        /// Target date (YYYY-MM-DD)
        #[arg(long)]
        target_date: Option<String>,

        /// Overwrite an existing goal
        #[arg(long)]
        id: Option<String>,
    },

    /// List goals, open first
    List,

    /// Mark a goal completed
    Complete {
        /// Goal ID
        id: String,
    },

    /// Delete a goal
    Remove {
        /// Goal ID
        id: String,
    },
}

// ============================================================================
// Profile Commands
// ============================================================================

#[derive(Subcommand, Debug)]
pub enum ProfileCommands {
    /// Show the locally stored profile
    Show,
}

// ============================================================================
// Content Commands
// ============================================================================

/// Which cached content to list.
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ContentKind {
    #[default]
    Articles,
    Tips,
}

#[derive(Subcommand, Debug)]
pub enum ContentCommands {
    /// List cached content
    List {
        /// Articles or tips
        #[arg(long, value_enum, default_value_t)]
        kind: ContentKind,

        /// Only this category
        #[arg(long, short)]
        category: Option<String>,

        /// Include stale items past their expiry
        #[arg(long)]
        include_expired: bool,
    },

    /// Delete expired cache rows
    Purge,
}

// ============================================================================
// Sync
// ============================================================================

#[derive(clap::Args, Debug)]
pub struct SyncArgs {
    /// Only this domain (profile, kicks, symptoms, goals, content)
    #[arg(long, short)]
    pub domain: Option<String>,

    /// Also refresh the content cache
    #[arg(long)]
    pub content: bool,

    /// Do nothing if the network is unreachable
    #[arg(long)]
    pub skip_if_offline: bool,
}
