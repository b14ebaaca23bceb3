//! CLI argument definitions using clap
//!
//! Commands:
//! - adminctl init --config <path>
//! - adminctl create-admin --config <path> --phone <n> ...
//! - adminctl reset-password --config <path> --phone <n> ...
//! - adminctl list-admins / find-user / audit / verify-perms
//! - adminctl cleanup <target> [--dry-run] [--yes]
//! - adminctl rollback --operation <id> [--yes]
//! - adminctl operations

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// adminctl - operator tooling for the backend data store
#[derive(Parser, Debug)]
#[command(name = "adminctl")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Initialize the data and rollback directories
    Init {
        /// Path to configuration file
        #[arg(long, default_value = "./adminctl.json")]
        config: PathBuf,
    },

    /// Create a super admin account
    CreateAdmin {
        /// Path to configuration file
        #[arg(long, default_value = "./adminctl.json")]
        config: PathBuf,

        /// Phone number (unique)
        #[arg(long)]
        phone: String,

        /// Email address (unique when given)
        #[arg(long)]
        email: Option<String>,

        /// First name
        #[arg(long, default_value = "")]
        first_name: String,

        /// Last name
        #[arg(long, default_value = "")]
        last_name: String,

        /// Password (must satisfy the configured policy)
        #[arg(long, conflicts_with = "generate_password")]
        password: Option<String>,

        /// Generate a temporary password and print it once
        #[arg(long)]
        generate_password: bool,

        /// Skip the interactive confirmation
        #[arg(short = 'y', long)]
        yes: bool,
    },

    /// Reset a user's password
    ResetPassword {
        /// Path to configuration file
        #[arg(long, default_value = "./adminctl.json")]
        config: PathBuf,

        /// Phone number of the account
        #[arg(long)]
        phone: String,

        /// New password (must satisfy the configured policy)
        #[arg(long, conflicts_with = "generate_password")]
        password: Option<String>,

        /// Generate a temporary password and print it once
        #[arg(long)]
        generate_password: bool,

        /// Report what would change without writing
        #[arg(long)]
        dry_run: bool,

        /// Skip the interactive confirmation
        #[arg(short = 'y', long)]
        yes: bool,
    },

    /// List super admin accounts
    ListAdmins {
        /// Path to configuration file
        #[arg(long, default_value = "./adminctl.json")]
        config: PathBuf,
    },

    /// Search user records by phone, email, or name
    FindUser {
        /// Path to configuration file
        #[arg(long, default_value = "./adminctl.json")]
        config: PathBuf,

        /// Exact phone number
        #[arg(long)]
        phone: Option<String>,

        /// Exact email address
        #[arg(long)]
        email: Option<String>,

        /// Substring of the display name (case-insensitive)
        #[arg(long)]
        name: Option<String>,
    },

    /// Run every database integrity check
    Audit {
        /// Path to configuration file
        #[arg(long, default_value = "./adminctl.json")]
        config: PathBuf,
    },

    /// Verify role and permission assignments
    VerifyPerms {
        /// Path to configuration file
        #[arg(long, default_value = "./adminctl.json")]
        config: PathBuf,
    },

    /// Destructive repair operations (confirmed, snapshotted,
    /// reversible via rollback)
    Cleanup {
        /// Path to configuration file
        #[arg(long, default_value = "./adminctl.json")]
        config: PathBuf,

        /// What to clean up
        #[arg(value_enum)]
        target: CleanupTarget,

        /// Inactivity window in days (inactive-users only)
        #[arg(long, default_value_t = 90)]
        older_than_days: i64,

        /// Report what would change without writing
        #[arg(long)]
        dry_run: bool,

        /// Skip the interactive confirmation
        #[arg(short = 'y', long)]
        yes: bool,
    },

    /// Replay a recorded snapshot to restore prior state
    Rollback {
        /// Path to configuration file
        #[arg(long, default_value = "./adminctl.json")]
        config: PathBuf,

        /// Operation id from a previous run (see `operations`)
        #[arg(long)]
        operation: String,

        /// Skip the interactive confirmation
        #[arg(short = 'y', long)]
        yes: bool,
    },

    /// List recorded operations in the rollback log
    Operations {
        /// Path to configuration file
        #[arg(long, default_value = "./adminctl.json")]
        config: PathBuf,
    },
}

/// Destructive cleanup targets
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum CleanupTarget {
    /// Delete OTP records past their expiry
    ExpiredOtps,
    /// Deactivate accounts with no recent login
    InactiveUsers,
    /// Delete grant rows referencing missing users, roles, or
    /// permissions
    OrphanedGrants,
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
