//! CLI module for marketgate
//!
//! Provides command-line interface for:
//! - serve: Load configuration and run the HTTP server
//! - hash-password: Produce a bootstrap admin entry
//! - check-config: Print the effective configuration

mod args;
mod commands;
mod errors;
mod io;

pub use args::{Cli, Command};
pub use commands::{
    bootstrap_entry, check_config, effective_config, hash_password, run, run_command, serve,
};
pub use errors::{CliError, CliErrorCode, CliResult};
