//! Command-line interface
//!
//! Each subcommand is an independent operator entry point. Destructive
//! subcommands share the same surface: `--dry-run` previews, `--yes`
//! skips the interactive gate, and `rollback --operation <id>` replays
//! a recorded snapshot.
//!
//! Exit code 0 covers success, a confirmed abort, an empty match, and
//! a completed partial failure (operators inspect `errors` in the
//! report). Non-zero means a fatal failure: nothing was mutated, or
//! the failure is recorded in the rollback log.

mod args;
mod commands;
mod errors;
mod io;

pub use args::{Cli, CleanupTarget, Command};
pub use commands::{run, run_command, Config};
pub use errors::{CliError, CliErrorCode, CliResult};
