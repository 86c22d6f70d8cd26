//! Google Calendar data source.
//!
//! Authorization uses the OAuth 2.0 installed-app flow with PKCE and a
//! loopback redirect. Users register their own OAuth client in the Google
//! Cloud Console and pass its ID and secret; tokens are stored on disk and
//! refreshed automatically.
//!
//! ```ignore
//! use calstats_providers::google::{GoogleConfig, GoogleSource, OAuthCredentials};
//!
//! let config = GoogleConfig::new(OAuthCredentials::new(client_id, client_secret));
//! let source = GoogleSource::new(config)?;
//! if !source.is_authenticated().await {
//!     source.authenticate().await?;
//! }
//! let info = source.calendar("me@example.com").await?;
//! ```

mod client;
mod config;
mod oauth;
mod source;
mod tokens;

pub use config::{GoogleConfig, OAuthCredentials};
pub use oauth::{OAuthClient, PkceFlow};
pub use source::GoogleSource;
pub use tokens::{TokenInfo, TokenStorage};
