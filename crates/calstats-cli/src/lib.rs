//! The `calstats` command-line interface.
//!
//! Reads calendars from Google Calendar (or a JSON export), splits the work
//! week into half-day slots, and writes a CSV of how the time was spent.

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod ignorelist;
pub mod secret;

pub use cli::Cli;
pub use error::{CliError, CliResult};
