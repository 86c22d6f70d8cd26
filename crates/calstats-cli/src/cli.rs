//! Command-line interface definition.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// calstats - How much of your week goes to meetings
#[derive(Debug, Parser)]
#[command(name = "calstats")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(long, short, global = true, env = "CALSTATS_CONFIG")]
    pub config: Option<PathBuf>,

    /// Print the per-slot breakdown and debug logs to stderr
    #[arg(long, short, global = true)]
    pub verbose: bool,

    /// Log line format
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Compact)]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Write the meeting-load CSV report for one or more calendars
    Report(ReportArgs),

    /// Authentication commands
    Auth {
        #[command(subcommand)]
        provider: AuthProvider,
    },
}

#[derive(Debug, Args)]
pub struct ReportArgs {
    /// File of title patterns to ignore, one regular expression per line
    #[arg(long)]
    pub ignorelist: Option<PathBuf>,

    /// Start of the first work day, e.g. "2025/02/03 07:00:00"
    #[arg(long)]
    pub start: Option<String>,

    /// Window length in hours
    #[arg(long, conflicts_with = "days")]
    pub duration: Option<u32>,

    /// Window length in business days (weekends are skipped)
    #[arg(long)]
    pub days: Option<u32>,

    /// Text in an event description that marks it as an interview
    #[arg(long)]
    pub hiring_marker: Option<String>,

    /// Read calendars from a JSON file instead of Google Calendar
    #[arg(long)]
    pub events_file: Option<PathBuf>,

    /// Calendar identities (email addresses) to report on
    #[arg(required = true)]
    pub calendars: Vec<String>,
}

/// Authentication providers.
#[derive(Debug, Subcommand)]
pub enum AuthProvider {
    /// Authenticate with Google Calendar
    #[cfg(feature = "google")]
    Google {
        /// OAuth client ID (from Google Cloud Console)
        #[arg(long, env = "GOOGLE_CLIENT_ID")]
        client_id: Option<String>,

        /// OAuth client secret (from Google Cloud Console)
        #[arg(long, env = "GOOGLE_CLIENT_SECRET")]
        client_secret: Option<String>,

        /// Path to Google Cloud Console credentials JSON file
        ///
        /// Alternative to providing client_id and client_secret separately.
        #[arg(long, env = "GOOGLE_CREDENTIALS_FILE")]
        credentials_file: Option<PathBuf>,

        /// Force re-authentication even if already authenticated
        #[arg(long, short)]
        force: bool,
    },
}
