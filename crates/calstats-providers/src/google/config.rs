//! Google data source configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::{ProviderError, ProviderResult};

/// OAuth client ID and secret registered in the Google Cloud Console.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OAuthCredentials {
    pub client_id: String,
    pub client_secret: String,
}

/// A downloaded credentials file: either the Cloud Console layout with an
/// `installed` or `web` section, or a flat object with the two fields.
#[derive(Debug, Deserialize)]
struct CredentialsFile {
    installed: Option<ClientSection>,
    web: Option<ClientSection>,
    client_id: Option<String>,
    client_secret: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ClientSection {
    client_id: String,
    client_secret: String,
}

impl OAuthCredentials {
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }

    /// Reads credentials from a JSON file downloaded from the Cloud Console.
    pub fn from_file(path: impl AsRef<Path>) -> ProviderResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            ProviderError::configuration(format!(
                "failed to read credentials file {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_json(&content)
    }

    pub fn from_json(json: &str) -> ProviderResult<Self> {
        let file: CredentialsFile = serde_json::from_str(json).map_err(|e| {
            ProviderError::configuration(format!("failed to parse credentials JSON: {}", e))
        })?;

        match file {
            CredentialsFile {
                installed: Some(section),
                ..
            }
            | CredentialsFile {
                web: Some(section), ..
            } => Ok(Self::new(section.client_id, section.client_secret)),
            CredentialsFile {
                client_id: Some(id),
                client_secret: Some(secret),
                ..
            } => Ok(Self::new(id, secret)),
            _ => Err(ProviderError::configuration(
                "credentials file has neither an 'installed'/'web' section nor top-level 'client_id'/'client_secret'",
            )),
        }
    }

    /// Checks that the values look like a Google OAuth client.
    pub fn validate(&self) -> ProviderResult<()> {
        if self.client_id.is_empty() {
            return Err(ProviderError::configuration("client_id is required"));
        }
        if !self.client_id.ends_with(".apps.googleusercontent.com") {
            return Err(ProviderError::configuration(
                "client_id should end with .apps.googleusercontent.com",
            ));
        }
        if self.client_secret.is_empty() {
            return Err(ProviderError::configuration("client_secret is required"));
        }
        Ok(())
    }
}

/// Settings for [`GoogleSource`](super::GoogleSource).
#[derive(Debug, Clone)]
pub struct GoogleConfig {
    pub credentials: OAuthCredentials,
    /// Defaults to `<data dir>/calstats/google-tokens.json`.
    pub token_path: PathBuf,
    /// Per-request HTTP timeout.
    pub timeout: Duration,
    /// Ports tried, in order, for the OAuth loopback redirect.
    pub loopback_port_range: (u16, u16),
    pub scopes: Vec<String>,
}

impl GoogleConfig {
    pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

    /// Read-only access is all the report needs.
    pub const DEFAULT_SCOPE: &'static str = "https://www.googleapis.com/auth/calendar.readonly";

    pub fn new(credentials: OAuthCredentials) -> Self {
        Self {
            credentials,
            token_path: Self::default_token_path(),
            timeout: Duration::from_secs(Self::DEFAULT_TIMEOUT_SECS),
            loopback_port_range: (8080, 8090),
            scopes: vec![Self::DEFAULT_SCOPE.to_string()],
        }
    }

    pub fn default_token_path() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("calstats")
            .join("google-tokens.json")
    }

    pub fn with_token_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.token_path = path.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_loopback_port_range(mut self, start: u16, end: u16) -> Self {
        self.loopback_port_range = (start, end);
        self
    }

    pub fn with_scopes(mut self, scopes: Vec<String>) -> Self {
        self.scopes = scopes;
        self
    }

    pub fn validate(&self) -> ProviderResult<()> {
        self.credentials.validate()?;

        if self.scopes.is_empty() {
            return Err(ProviderError::configuration(
                "at least one OAuth scope is required",
            ));
        }
        if self.loopback_port_range.0 > self.loopback_port_range.1 {
            return Err(ProviderError::configuration("invalid loopback port range"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn credentials() -> OAuthCredentials {
        OAuthCredentials::new("calstats.apps.googleusercontent.com", "s3cret")
    }

    mod credentials {
        use super::*;

        #[test]
        fn validation() {
            assert!(credentials().validate().is_ok());
            assert!(OAuthCredentials::new("", "secret").validate().is_err());
            assert!(OAuthCredentials::new("not-google", "secret").validate().is_err());
            assert!(
                OAuthCredentials::new("x.apps.googleusercontent.com", "")
                    .validate()
                    .is_err()
            );
        }

        #[test]
        fn installed_section() {
            let json = r#"{"installed": {"client_id": "a.apps.googleusercontent.com", "client_secret": "b", "project_id": "p"}}"#;
            assert_eq!(
                OAuthCredentials::from_json(json).unwrap(),
                OAuthCredentials::new("a.apps.googleusercontent.com", "b")
            );
        }

        #[test]
        fn web_section() {
            let json = r#"{"web": {"client_id": "w.apps.googleusercontent.com", "client_secret": "ws"}}"#;
            let creds = OAuthCredentials::from_json(json).unwrap();
            assert_eq!(creds.client_secret, "ws");
        }

        #[test]
        fn flat_layout() {
            let json = r#"{"client_id": "f.apps.googleusercontent.com", "client_secret": "fs", "refresh_token": "r"}"#;
            let creds = OAuthCredentials::from_json(json).unwrap();
            assert_eq!(creds.client_id, "f.apps.googleusercontent.com");
        }

        #[test]
        fn missing_fields() {
            let err = OAuthCredentials::from_json(r#"{"client_id": "only-id"}"#).unwrap_err();
            assert!(err.message().contains("client_secret"));
        }

        #[test]
        fn malformed_json() {
            let err = OAuthCredentials::from_json("not json").unwrap_err();
            assert!(err.message().contains("parse"));
        }

        #[test]
        fn from_file() {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("client.json");
            std::fs::write(
                &path,
                r#"{"installed": {"client_id": "a.apps.googleusercontent.com", "client_secret": "b"}}"#,
            )
            .unwrap();
            assert!(OAuthCredentials::from_file(&path).is_ok());
            assert!(OAuthCredentials::from_file(dir.path().join("missing.json")).is_err());
        }
    }

    #[test]
    fn defaults() {
        let config = GoogleConfig::new(credentials());
        assert_eq!(config.scopes, [GoogleConfig::DEFAULT_SCOPE]);
        assert!(config.token_path.ends_with("calstats/google-tokens.json"));
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn builder_and_validation() {
        let config = GoogleConfig::new(credentials())
            .with_token_path("/tmp/tokens.json")
            .with_timeout(Duration::from_secs(5))
            .with_loopback_port_range(9000, 9010);
        assert_eq!(config.token_path, PathBuf::from("/tmp/tokens.json"));
        assert_eq!(config.loopback_port_range, (9000, 9010));

        assert!(config.clone().with_scopes(vec![]).validate().is_err());
        assert!(config.with_loopback_port_range(9010, 9000).validate().is_err());
    }
}
