//! CLI error types.

use std::fmt;

use calstats_core::{CoreError, ReportError};
use calstats_providers::ProviderError;

use crate::secret::SecretError;

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

/// Everything that can abort a `calstats` run.
#[derive(Debug)]
pub enum CliError {
    /// Bad or missing configuration, flags, or ignore list.
    Config(String),
    /// Unknown timezone, or a work day starting in a DST gap.
    Timezone(String),
    /// Unparseable start time or event timestamp.
    TimeParse(String),
    /// The calendar backend failed.
    DataSource(ProviderError),
    /// Writing the CSV report failed.
    Output(ReportError),
    /// No usable credentials for the backend.
    AuthRequired(String),
    Io(std::io::Error),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "configuration error: {}", msg),
            Self::Timezone(msg) => write!(f, "timezone error: {}", msg),
            Self::TimeParse(msg) => write!(f, "time parse error: {}", msg),
            Self::DataSource(err) => write!(f, "data source error: {}", err),
            Self::Output(err) => write!(f, "output error: {}", err),
            Self::AuthRequired(msg) => write!(f, "authentication required: {}", msg),
            Self::Io(err) => write!(f, "IO error: {}", err),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::DataSource(err) => Some(err),
            Self::Output(err) => Some(err),
            Self::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::InvalidTimezone { .. } | CoreError::NonexistentLocalTime { .. } => {
                Self::Timezone(err.to_string())
            }
            CoreError::InvalidStartTime { .. } | CoreError::MalformedEventTime { .. } => {
                Self::TimeParse(err.to_string())
            }
            CoreError::InvalidPattern { .. } | CoreError::WindowTooLarge { .. } => {
                Self::Config(err.to_string())
            }
        }
    }
}

impl From<ProviderError> for CliError {
    fn from(err: ProviderError) -> Self {
        if err.needs_auth() {
            Self::AuthRequired(err.to_string())
        } else {
            Self::DataSource(err)
        }
    }
}

impl From<ReportError> for CliError {
    fn from(err: ReportError) -> Self {
        Self::Output(err)
    }
}

impl From<SecretError> for CliError {
    fn from(err: SecretError) -> Self {
        Self::Config(err.to_string())
    }
}
