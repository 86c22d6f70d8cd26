//! [`CalendarSource`] backed by Google Calendar.

use calstats_core::{Event, TimeWindow};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::error::{ProviderError, ProviderResult};
use crate::source::{BoxFuture, CalendarInfo, CalendarSource};

use super::client::GoogleCalendarClient;
use super::config::GoogleConfig;
use super::oauth::OAuthClient;
use super::tokens::{TokenInfo, TokenStorage};

const PROVIDER_NAME: &str = "google";

/// Reads calendars through the Google Calendar API.
///
/// Stored tokens are loaded on construction; an expired access token is
/// refreshed transparently before the next request.
#[derive(Debug)]
pub struct GoogleSource {
    config: GoogleConfig,
    storage: TokenStorage,
    oauth: OAuthClient,
    client: GoogleCalendarClient,
    tokens: Mutex<Option<TokenInfo>>,
}

impl GoogleSource {
    pub fn new(config: GoogleConfig) -> ProviderResult<Self> {
        config
            .validate()
            .map_err(|e| e.with_provider(PROVIDER_NAME))?;

        let storage = TokenStorage::new(&config.token_path);
        let tokens = storage.load()?;
        let oauth = OAuthClient::new(config.credentials.clone(), config.timeout)?;
        let client = GoogleCalendarClient::new(config.timeout)?;

        Ok(Self {
            config,
            storage,
            oauth,
            client,
            tokens: Mutex::new(tokens),
        })
    }

    /// True if stored tokens cover the configured scopes and can be used or
    /// refreshed without user interaction.
    pub async fn is_authenticated(&self) -> bool {
        self.tokens.lock().await.as_ref().is_some_and(|t| {
            t.has_scopes(&self.config.scopes) && (!t.is_expired() || t.refresh_token.is_some())
        })
    }

    /// Runs the browser authorization flow and stores the resulting tokens.
    pub async fn authenticate(&self) -> ProviderResult<()> {
        info!(token_path = %self.storage.path().display(), "starting Google authorization");
        let tokens = self
            .oauth
            .authorize(&self.config.scopes, self.config.loopback_port_range)
            .await
            .map_err(|e| e.with_provider(PROVIDER_NAME))?;
        self.storage.save(&tokens)?;
        *self.tokens.lock().await = Some(tokens);
        Ok(())
    }

    /// Deletes stored tokens.
    pub async fn logout(&self) -> ProviderResult<()> {
        *self.tokens.lock().await = None;
        self.storage.clear()
    }

    /// Returns a usable access token, refreshing it if needed.
    async fn access_token(&self) -> ProviderResult<String> {
        let mut guard = self.tokens.lock().await;
        let tokens = guard.take().ok_or_else(|| {
            ProviderError::authentication("not authorized; run 'calstats auth google'")
                .with_provider(PROVIDER_NAME)
        })?;

        if !tokens.is_expired() {
            let access_token = tokens.access_token.clone();
            *guard = Some(tokens);
            return Ok(access_token);
        }

        let Some(refresh_token) = tokens.refresh_token.clone() else {
            return Err(ProviderError::authentication(
                "access token expired and no refresh token is stored; run 'calstats auth google --force'",
            )
            .with_provider(PROVIDER_NAME));
        };

        debug!("refreshing expired access token");
        let refreshed = match self.oauth.refresh(&refresh_token).await {
            Ok((access_token, expires_in)) => tokens.refreshed(access_token, expires_in),
            Err(e) => {
                *guard = Some(tokens);
                return Err(e.with_provider(PROVIDER_NAME));
            }
        };
        let access_token = refreshed.access_token.clone();
        let saved = self.storage.save(&refreshed);
        *guard = Some(refreshed);
        saved?;
        Ok(access_token)
    }
}

impl CalendarSource for GoogleSource {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    fn calendar<'a>(&'a self, id: &'a str) -> BoxFuture<'a, ProviderResult<CalendarInfo>> {
        Box::pin(async move {
            let token = self.access_token().await?;
            self.client
                .get_calendar(&token, id)
                .await
                .map_err(|e| e.with_provider(PROVIDER_NAME))
        })
    }

    fn list_events<'a>(
        &'a self,
        id: &'a str,
        window: &'a TimeWindow,
    ) -> BoxFuture<'a, ProviderResult<Vec<Event>>> {
        Box::pin(async move {
            let token = self.access_token().await?;
            self.client
                .list_events(&token, id, window)
                .await
                .map_err(|e| e.with_provider(PROVIDER_NAME))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProviderErrorCode;
    use crate::google::OAuthCredentials;

    fn config(dir: &tempfile::TempDir) -> GoogleConfig {
        GoogleConfig::new(OAuthCredentials::new(
            "calstats.apps.googleusercontent.com",
            "secret",
        ))
        .with_token_path(dir.path().join("tokens.json"))
    }

    #[test]
    fn invalid_config_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config(&dir);
        config.credentials.client_id = "nope".to_string();
        let err = GoogleSource::new(config).unwrap_err();
        assert_eq!(err.code(), ProviderErrorCode::ConfigurationError);
        assert_eq!(err.provider(), Some("google"));
    }

    #[tokio::test]
    async fn without_tokens_requests_fail_with_auth_error() {
        let dir = tempfile::tempdir().unwrap();
        let source = GoogleSource::new(config(&dir)).unwrap();
        assert!(!source.is_authenticated().await);

        let err = source.calendar("me@x.com").await.unwrap_err();
        assert!(err.needs_auth());
        assert!(err.to_string().contains("calstats auth google"));
    }

    #[tokio::test]
    async fn stored_tokens_are_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(&dir);
        TokenStorage::new(&config.token_path)
            .save(&TokenInfo::new(
                "access",
                Some("refresh".to_string()),
                Some(3600),
                vec![GoogleConfig::DEFAULT_SCOPE.to_string()],
            ))
            .unwrap();

        let source = GoogleSource::new(config).unwrap();
        assert!(source.is_authenticated().await);
        assert_eq!(source.access_token().await.unwrap(), "access");
    }

    #[tokio::test]
    async fn tokens_missing_scope_are_not_enough() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(&dir);
        TokenStorage::new(&config.token_path)
            .save(&TokenInfo::new("access", None, None, vec!["other".to_string()]))
            .unwrap();

        let source = GoogleSource::new(config).unwrap();
        assert!(!source.is_authenticated().await);
    }

    #[tokio::test]
    async fn expired_without_refresh_token() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(&dir);
        let mut tokens = TokenInfo::new("access", None, Some(3600), vec![]);
        tokens.expires_at = Some(chrono::Utc::now() - chrono::Duration::minutes(5));
        TokenStorage::new(&config.token_path).save(&tokens).unwrap();

        let source = GoogleSource::new(config).unwrap();
        let err = source.access_token().await.unwrap_err();
        assert!(err.message().contains("--force"));
    }

    #[tokio::test]
    async fn logout_removes_tokens() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(&dir);
        let path = config.token_path.clone();
        TokenStorage::new(&path)
            .save(&TokenInfo::new("access", None, None, vec![]))
            .unwrap();

        let source = GoogleSource::new(config).unwrap();
        source.logout().await.unwrap();
        assert!(!path.exists());
        assert!(source.access_token().await.is_err());
    }
}
