//! OAuth 2.0 authorization code flow with PKCE (RFC 7636) for installed apps.
//!
//! A loopback listener on 127.0.0.1 receives Google's redirect carrying the
//! authorization code, which is then exchanged together with the PKCE
//! verifier for an access and refresh token.

use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::Rng as _;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, info, warn};

use crate::error::{ProviderError, ProviderResult};

use super::config::OAuthCredentials;
use super::tokens::TokenInfo;

const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// Verifier entropy in bytes, before base64 encoding.
const CODE_VERIFIER_LENGTH: usize = 32;

/// How long to wait for the user to finish in the browser.
const CALLBACK_TIMEOUT: Duration = Duration::from_secs(300);

const CALLBACK_PATH: &str = "/callback";

/// Talks to Google's OAuth endpoints.
#[derive(Debug)]
pub struct OAuthClient {
    credentials: OAuthCredentials,
    http_client: reqwest::Client,
}

impl OAuthClient {
    pub fn new(credentials: OAuthCredentials, timeout: Duration) -> ProviderResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProviderError::internal("failed to create HTTP client").with_source(e))?;

        Ok(Self {
            credentials,
            http_client,
        })
    }

    /// Runs the interactive flow: opens the consent page in a browser, waits
    /// for the redirect and exchanges the code for tokens.
    pub async fn authorize(
        &self,
        scopes: &[String],
        port_range: (u16, u16),
    ) -> ProviderResult<TokenInfo> {
        let pkce = PkceFlow::new();

        let (listener, port) = bind_loopback(port_range).await?;
        let redirect_uri = format!("http://127.0.0.1:{}{}", port, CALLBACK_PATH);
        let auth_url = pkce.build_auth_url(&self.credentials.client_id, &redirect_uri, scopes);

        info!("opening browser for Google authorization");
        debug!(url = %auth_url, "authorization URL");
        if let Err(e) = open::that(&auth_url) {
            warn!(error = %e, "failed to open browser");
            eprintln!("\nOpen this URL in your browser to continue:\n\n{}\n", auth_url);
        }

        let callback = tokio::time::timeout(CALLBACK_TIMEOUT, wait_for_callback(&listener))
            .await
            .map_err(|_| ProviderError::authentication("timed out waiting for authorization"))??;

        if callback.state != pkce.state {
            return Err(ProviderError::authentication(
                "OAuth state mismatch in authorization callback",
            ));
        }

        debug!("received authorization code");
        let response = self
            .token_request(&[
                ("code", callback.code.as_str()),
                ("code_verifier", pkce.verifier.as_str()),
                ("grant_type", "authorization_code"),
                ("redirect_uri", redirect_uri.as_str()),
            ])
            .await?;

        info!("authorization complete");
        Ok(TokenInfo::new(
            response.access_token,
            response.refresh_token,
            response.expires_in,
            scopes.to_vec(),
        ))
    }

    /// Exchanges a refresh token for a new access token.
    ///
    /// Returns the access token and its lifetime in seconds.
    pub async fn refresh(&self, refresh_token: &str) -> ProviderResult<(String, Option<i64>)> {
        let response = self
            .token_request(&[
                ("refresh_token", refresh_token),
                ("grant_type", "refresh_token"),
            ])
            .await?;
        info!("refreshed access token");
        Ok((response.access_token, response.expires_in))
    }

    async fn token_request(&self, params: &[(&str, &str)]) -> ProviderResult<TokenResponse> {
        let mut form = vec![
            ("client_id", self.credentials.client_id.as_str()),
            ("client_secret", self.credentials.client_secret.as_str()),
        ];
        form.extend_from_slice(params);

        let response = self
            .http_client
            .post(GOOGLE_TOKEN_URL)
            .form(&form)
            .send()
            .await
            .map_err(|e| ProviderError::network(format!("token request failed: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::network(format!("failed to read token response: {}", e)))?;

        if !status.is_success() {
            return Err(ProviderError::authentication(format!(
                "token endpoint returned {}: {}",
                status, body
            )));
        }

        serde_json::from_str(&body).map_err(|e| {
            ProviderError::invalid_response(format!("invalid token response: {}", e))
        })
    }
}

async fn bind_loopback(port_range: (u16, u16)) -> ProviderResult<(TcpListener, u16)> {
    for port in port_range.0..=port_range.1 {
        if let Ok(listener) = TcpListener::bind(("127.0.0.1", port)).await {
            debug!(port, "bound loopback listener");
            return Ok((listener, port));
        }
    }
    Err(ProviderError::configuration(format!(
        "no free loopback port in {}-{}",
        port_range.0, port_range.1
    )))
}

/// Accepts connections until one carries the OAuth redirect.
async fn wait_for_callback(listener: &TcpListener) -> ProviderResult<CallbackParams> {
    loop {
        let (stream, peer) = listener.accept().await.map_err(|e| {
            ProviderError::internal(format!("failed to accept connection: {}", e))
        })?;
        debug!(%peer, "loopback connection");
        if let Some(result) = handle_connection(stream).await {
            return result;
        }
    }
}

/// Returns `None` for requests that are not the redirect (e.g. favicon).
async fn handle_connection(mut stream: TcpStream) -> Option<ProviderResult<CallbackParams>> {
    let mut request_line = String::new();
    BufReader::new(&mut stream)
        .read_line(&mut request_line)
        .await
        .ok()?;

    let mut parts = request_line.split_whitespace();
    let (Some("GET"), Some(target)) = (parts.next(), parts.next()) else {
        return None;
    };
    let query = target.strip_prefix(CALLBACK_PATH)?;
    let result = parse_callback(query.strip_prefix('?').unwrap_or(query));

    let page = match &result {
        Ok(_) => {
            "HTTP/1.1 200 OK\r\nContent-Type: text/html\r\nConnection: close\r\n\r\n\
             <html><body><h1>calstats is authorized</h1>\
             <p>You can close this window.</p></body></html>"
        }
        Err(_) => {
            "HTTP/1.1 400 Bad Request\r\nContent-Type: text/html\r\nConnection: close\r\n\r\n\
             <html><body><h1>Authorization failed</h1>\
             <p>Return to the terminal for details.</p></body></html>"
        }
    };
    let _ = stream.write_all(page.as_bytes()).await;
    let _ = stream.shutdown().await;

    Some(result)
}

/// Query parameters of the OAuth redirect.
#[derive(Debug, PartialEq, Eq)]
struct CallbackParams {
    code: String,
    state: String,
}

fn parse_callback(query: &str) -> ProviderResult<CallbackParams> {
    let mut code = None;
    let mut state = None;
    let mut error = None;

    for pair in query.split('&') {
        let Some((key, value)) = pair.split_once('=') else {
            continue;
        };
        let value = urlencoding::decode(value)
            .map(|v| v.into_owned())
            .map_err(|e| ProviderError::invalid_response(format!("bad callback parameter: {}", e)))?;
        match key {
            "code" => code = Some(value),
            "state" => state = Some(value),
            "error" => error = Some(value),
            _ => {}
        }
    }

    if let Some(error) = error {
        return Err(ProviderError::authentication(format!(
            "authorization denied: {}",
            error
        )));
    }
    let code = code.ok_or_else(|| {
        ProviderError::authentication("authorization callback carried no code")
    })?;

    Ok(CallbackParams {
        code,
        state: state.unwrap_or_default(),
    })
}

/// PKCE verifier, challenge and anti-forgery state for one authorization.
#[derive(Debug)]
pub struct PkceFlow {
    pub verifier: String,
    /// base64url(SHA-256(verifier)).
    pub challenge: String,
    pub state: String,
}

impl PkceFlow {
    pub fn new() -> Self {
        let verifier = random_token(CODE_VERIFIER_LENGTH);
        Self {
            challenge: Self::compute_challenge(&verifier),
            verifier,
            state: random_token(16),
        }
    }

    fn compute_challenge(verifier: &str) -> String {
        URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()))
    }

    /// Google consent page URL requesting offline access.
    pub fn build_auth_url(&self, client_id: &str, redirect_uri: &str, scopes: &[String]) -> String {
        let params = [
            ("client_id", client_id.to_string()),
            ("redirect_uri", redirect_uri.to_string()),
            ("response_type", "code".to_string()),
            ("scope", scopes.join(" ")),
            ("code_challenge", self.challenge.clone()),
            ("code_challenge_method", "S256".to_string()),
            ("state", self.state.clone()),
            ("access_type", "offline".to_string()),
            ("prompt", "consent".to_string()),
        ];
        let query: Vec<String> = params
            .iter()
            .map(|(key, value)| format!("{}={}", key, urlencoding::encode(value)))
            .collect();
        format!("{}?{}", GOOGLE_AUTH_URL, query.join("&"))
    }
}

impl Default for PkceFlow {
    fn default() -> Self {
        Self::new()
    }
}

fn random_token(len: usize) -> String {
    let mut rng = rand::rng();
    let bytes: Vec<u8> = (0..len).map(|_| rng.random()).collect();
    URL_SAFE_NO_PAD.encode(bytes)
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    mod pkce {
        use super::*;

        #[test]
        fn verifier_is_43_chars() {
            assert_eq!(PkceFlow::new().verifier.len(), 43);
        }

        #[test]
        fn challenge_matches_rfc_example() {
            // RFC 7636 appendix B
            assert_eq!(
                PkceFlow::compute_challenge("dBjftJeZ4CVP-1mB92K27uhbUJU1p1r_wW1gFWFOEjXk"),
                "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM"
            );
        }

        #[test]
        fn flows_are_random() {
            let (a, b) = (PkceFlow::new(), PkceFlow::new());
            assert_ne!(a.verifier, b.verifier);
            assert_ne!(a.state, b.state);
        }

        #[test]
        fn auth_url() {
            let flow = PkceFlow::new();
            let url = flow.build_auth_url(
                "id.apps.googleusercontent.com",
                "http://127.0.0.1:8080/callback",
                &["https://www.googleapis.com/auth/calendar.readonly".to_string()],
            );
            assert!(url.starts_with("https://accounts.google.com/o/oauth2/v2/auth?client_id="));
            assert!(url.contains("redirect_uri=http%3A%2F%2F127.0.0.1%3A8080%2Fcallback"));
            assert!(url.contains(&format!("code_challenge={}", flow.challenge)));
            assert!(url.contains("code_challenge_method=S256"));
            assert!(url.contains("access_type=offline"));
            assert!(url.contains("prompt=consent"));
        }
    }

    mod callback {
        use super::*;

        #[test]
        fn code_and_state() {
            let params = parse_callback("state=abc&code=4%2F0Ab&scope=x").unwrap();
            assert_eq!(
                params,
                CallbackParams {
                    code: "4/0Ab".to_string(),
                    state: "abc".to_string(),
                }
            );
        }

        #[test]
        fn denied() {
            let err = parse_callback("error=access_denied&state=abc").unwrap_err();
            assert!(err.needs_auth());
            assert!(err.message().contains("access_denied"));
        }

        #[test]
        fn missing_code() {
            assert!(parse_callback("state=abc").is_err());
            assert!(parse_callback("").is_err());
        }

        #[tokio::test]
        async fn loopback_round_trip() {
            let (listener, port) = bind_loopback((0, 0)).await.unwrap();
            let port = if port == 0 {
                listener.local_addr().unwrap().port()
            } else {
                port
            };

            let client = tokio::spawn(async move {
                let mut stream = TcpStream::connect(("127.0.0.1", port)).await.unwrap();
                stream
                    .write_all(b"GET /favicon.ico HTTP/1.1\r\n\r\n")
                    .await
                    .unwrap();
                drop(stream);
                let mut stream = TcpStream::connect(("127.0.0.1", port)).await.unwrap();
                stream
                    .write_all(b"GET /callback?code=c0de&state=s1 HTTP/1.1\r\nHost: x\r\n\r\n")
                    .await
                    .unwrap();
            });

            let params = wait_for_callback(&listener).await.unwrap();
            assert_eq!(params.code, "c0de");
            assert_eq!(params.state, "s1");
            client.await.unwrap();
        }
    }
}
