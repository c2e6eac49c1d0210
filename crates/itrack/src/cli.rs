//! Command-line interface definitions using clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// itrack issue tracker
///
/// Administer the issue database: seed users and create, inspect, edit,
/// assign and delete issues. The HTTP API is served by `itrack-server`.
///
/// Exit Codes:
///   0  - Command succeeded
///   1  - Generic error occurred
///   2  - Invalid arguments or failed validation
///   3  - Resource not found (issue, user)
#[derive(Parser)]
#[command(name = "itrack")]
#[command(about = "Issue tracker administration", long_about = None)]
pub struct Cli {
    /// Config file (default: ./itrack.toml if present)
    #[arg(long, global = true, env = "ITRACK_CONFIG")]
    pub config: Option<PathBuf>,

    /// SQLite database path, or ":memory:" (overrides config)
    #[arg(long, global = true, env = "ITRACK_DATABASE")]
    pub database: Option<String>,

    /// Emit JSON instead of text
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create the database and its tables (idempotent)
    Init,

    /// User directory commands
    #[command(subcommand)]
    User(UserCommands),

    /// Issue management commands
    #[command(subcommand)]
    Issue(IssueCommands),
}

#[derive(Subcommand)]
pub enum UserCommands {
    /// Add a user who can be assigned issues
    Add {
        #[arg(short, long)]
        name: String,

        #[arg(short, long)]
        email: String,

        /// Explicit id (default: generated)
        #[arg(long)]
        id: Option<String>,
    },

    /// List users by name
    List,

    /// Show one user
    Show { id: String },
}

#[derive(Subcommand)]
pub enum IssueCommands {
    /// Create a new issue
    Create {
        #[arg(short, long)]
        title: String,

        #[arg(short = 'd', long = "description")]
        description: String,

        /// OPEN, IN_PROGRESS or CLOSED (default: OPEN)
        #[arg(short, long)]
        status: Option<String>,
    },

    /// List issues, newest first
    List {
        #[arg(short, long)]
        status: Option<String>,

        #[arg(short, long)]
        assignee: Option<String>,

        /// createdAt, title or status
        #[arg(long, default_value = "createdAt")]
        order_by: String,

        #[arg(long, default_value_t = 1)]
        page: u32,

        #[arg(long, default_value_t = crate::domain::DEFAULT_PAGE_SIZE)]
        page_size: u32,
    },

    /// Show issue details
    Show { id: i64 },

    /// Update fields of an issue
    Update {
        id: i64,

        #[arg(short, long)]
        title: Option<String>,

        #[arg(short = 'd', long = "description")]
        description: Option<String>,

        #[arg(short, long)]
        status: Option<String>,

        /// Assign to this user id
        #[arg(short, long, conflicts_with = "unassign")]
        assignee: Option<String>,

        /// Clear the assignee
        #[arg(long)]
        unassign: bool,
    },

    /// Delete an issue permanently
    Delete { id: i64 },

    /// Issue counts per status
    Summary,
}
