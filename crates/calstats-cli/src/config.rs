//! Configuration file.
//!
//! Settings live in `~/.config/calstats/config.toml` by default:
//!
//! ```toml
//! [google]
//! client_id = "env::CALSTATS_CLIENT_ID"
//! client_secret = "pass::google/calstats"
//!
//! [report]
//! ignorelist = "/home/me/.config/calstats/ignorelist"
//! days = 5
//! ```
//!
//! Credential values support `pass::` and `env::` secret references.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{CliError, CliResult};

/// Contents of `config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Google Calendar settings.
    #[cfg(feature = "google")]
    pub google: Option<GoogleSettings>,

    /// Defaults for `calstats report`.
    pub report: ReportSettings,
}

/// Defaults for the report command; flags on the command line win.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportSettings {
    /// Ignore-list file.
    pub ignorelist: Option<PathBuf>,

    /// Description substring marking an interview.
    pub hiring_marker: Option<String>,

    /// Start of the first work day, `YYYY/MM/DD HH:MM:SS`.
    pub start: Option<String>,

    /// Window length in hours.
    pub duration_hours: Option<u32>,

    /// Window length in business days. Mutually exclusive with `duration_hours`.
    pub days: Option<u32>,
}

impl Config {
    /// Loads the file at `path`, or the default location when `path` is `None`.
    ///
    /// An explicit path must exist; a missing default file yields the
    /// built-in defaults.
    pub fn load(path: Option<&Path>) -> CliResult<Self> {
        match path {
            Some(path) => Self::load_from(path),
            None => {
                let path = Self::default_path();
                if path.exists() {
                    Self::load_from(&path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn load_from(path: &Path) -> CliResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            CliError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        toml::from_str(&content)
            .map_err(|e| CliError::Config(format!("failed to parse {}: {}", path.display(), e)))
    }

    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("calstats")
            .join("config.toml")
    }
}

/// `[google]` section.
#[cfg(feature = "google")]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GoogleSettings {
    /// OAuth client ID (supports `pass::` and `env::` prefixes).
    pub client_id: Option<String>,

    /// OAuth client secret (supports `pass::` and `env::` prefixes).
    pub client_secret: Option<String>,

    /// Where OAuth tokens are stored.
    pub token_path: Option<PathBuf>,
}

#[cfg(feature = "google")]
impl GoogleSettings {
    /// Builds the provider configuration, resolving secret references.
    pub fn to_provider_config(&self) -> CliResult<calstats_providers::google::GoogleConfig> {
        use calstats_providers::google::GoogleConfig;

        let credentials = self.resolve_credentials()?;
        credentials
            .validate()
            .map_err(|e| CliError::Config(e.message().to_string()))?;

        let mut config = GoogleConfig::new(credentials);
        if let Some(ref path) = self.token_path {
            config = config.with_token_path(path);
        }
        Ok(config)
    }

    pub(crate) fn resolve_credentials(
        &self,
    ) -> CliResult<calstats_providers::google::OAuthCredentials> {
        use calstats_providers::google::OAuthCredentials;

        let raw_id = self.client_id.as_deref().ok_or_else(|| {
            CliError::Config(format!(
                "Google credentials not found. Add to {}:\n  \
                 [google]\n  \
                 client_id = \"YOUR_ID.apps.googleusercontent.com\"\n  \
                 client_secret = \"YOUR_SECRET\"\n\n  \
                 Or run: calstats auth google --credentials-file <path>",
                Config::default_path().display()
            ))
        })?;
        let raw_secret = self.client_secret.as_deref().ok_or_else(|| {
            CliError::Config("client_secret is missing from the [google] section".to_string())
        })?;

        let client_id = crate::secret::resolve(raw_id)
            .map_err(|e| CliError::Config(format!("failed to resolve client_id: {}", e)))?;
        let client_secret = crate::secret::resolve(raw_secret)
            .map_err(|e| CliError::Config(format!("failed to resolve client_secret: {}", e)))?;

        Ok(OAuthCredentials::new(client_id, client_secret))
    }
}
