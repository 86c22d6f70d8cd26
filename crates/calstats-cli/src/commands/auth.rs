//! Authentication commands.

use std::path::{Path, PathBuf};

use calstats_providers::google::{GoogleConfig, GoogleSource, OAuthCredentials};
use tracing::{info, warn};

use crate::config::{Config, GoogleSettings};
use crate::error::{CliError, CliResult};

/// Command-line inputs of `calstats auth google`.
#[derive(Debug, Default)]
pub struct GoogleAuthArgs {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub credentials_file: Option<PathBuf>,
    pub force: bool,
}

/// Runs the Google authorization flow.
///
/// Credentials given on the command line are written to the `[google]`
/// section of `config_path` so that later `report` runs find them.
pub async fn google(args: GoogleAuthArgs, config: &Config, config_path: &Path) -> CliResult<()> {
    let (client_id, client_secret, source) = resolve_google_credentials(
        args.client_id,
        args.client_secret,
        args.credentials_file,
        config.google.as_ref(),
    )?;

    let credentials = OAuthCredentials::new(&client_id, &client_secret);
    credentials.validate().map_err(|e| {
        CliError::Config(format!("invalid Google credentials: {}", e.message()))
    })?;

    let mut google_config = GoogleConfig::new(credentials);
    if let Some(ref settings) = config.google
        && let Some(ref path) = settings.token_path
    {
        google_config = google_config.with_token_path(path);
    }

    let provider = GoogleSource::new(google_config)?;

    if provider.is_authenticated().await && !args.force {
        save_if_new(config_path, &client_id, &client_secret, source);
        println!("Already authenticated with Google Calendar.");
        println!("Use --force to re-authenticate.");
        return Ok(());
    }

    if args.force {
        provider.logout().await?;
    }

    println!("Starting Google Calendar authorization...");
    println!();
    println!("A browser window will open for you to grant read-only calendar access.");
    println!("If it doesn't, open the URL printed below.");
    println!();

    provider.authenticate().await?;
    save_if_new(config_path, &client_id, &client_secret, source);

    info!("Google authorization successful");
    println!();
    println!("Authorization successful; tokens saved.");
    println!("Run `calstats report <email>` to analyze a calendar.");
    Ok(())
}

/// Where the credentials were resolved from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CredentialSource {
    /// `--client-id`/`--client-secret` or `--credentials-file`
    Cli,
    /// Already in the config file
    Config,
}

fn save_if_new(config_path: &Path, client_id: &str, client_secret: &str, source: CredentialSource) {
    if source == CredentialSource::Config {
        return;
    }
    match persist_credentials(config_path, client_id, client_secret) {
        Ok(()) => println!("Credentials saved to {}", config_path.display()),
        Err(e) => warn!(path = %config_path.display(), "could not save credentials: {}", e),
    }
}

/// Writes `client_id` and `client_secret` into the `[google]` table of the
/// TOML file at `path`, keeping everything else in the file.
fn persist_credentials(path: &Path, client_id: &str, client_secret: &str) -> CliResult<()> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
        Err(e) => return Err(e.into()),
    };

    let mut doc = content.parse::<toml_edit::DocumentMut>().map_err(|e| {
        CliError::Config(format!("failed to parse {}: {}", path.display(), e))
    })?;

    if !doc.contains_key("google") {
        doc["google"] = toml_edit::Item::Table(toml_edit::Table::new());
    }
    let google = doc["google"].as_table_mut().ok_or_else(|| {
        CliError::Config(format!("'google' in {} is not a table", path.display()))
    })?;
    google["client_id"] = toml_edit::value(client_id);
    google["client_secret"] = toml_edit::value(client_secret);

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, doc.to_string())?;
    Ok(())
}

/// Resolves Google credentials.
///
/// Priority (highest to lowest):
/// 1. `--client-id` + `--client-secret`
/// 2. `--credentials-file` (Google Cloud Console JSON)
/// 3. the `[google]` section of the config file, with secret resolution
fn resolve_google_credentials(
    cli_client_id: Option<String>,
    cli_client_secret: Option<String>,
    cli_credentials_file: Option<PathBuf>,
    config_google: Option<&GoogleSettings>,
) -> CliResult<(String, String, CredentialSource)> {
    if let (Some(id), Some(secret)) = (&cli_client_id, &cli_client_secret) {
        return Ok((id.clone(), secret.clone(), CredentialSource::Cli));
    }

    if let Some(ref path) = cli_credentials_file {
        let creds = OAuthCredentials::from_file(path).map_err(|e| {
            CliError::Config(format!(
                "failed to load credentials from {}: {}",
                path.display(),
                e.message()
            ))
        })?;
        return Ok((creds.client_id, creds.client_secret, CredentialSource::Cli));
    }

    if let Some(google) = config_google
        && google.client_id.is_some()
        && google.client_secret.is_some()
    {
        let creds = google.resolve_credentials()?;
        return Ok((creds.client_id, creds.client_secret, CredentialSource::Config));
    }

    if cli_client_id.is_some() || cli_client_secret.is_some() {
        return Err(CliError::Config(
            "both --client-id and --client-secret are required when providing credentials directly"
                .to_string(),
        ));
    }

    Err(CliError::Config(format!(
        "Google credentials are required. Provide via:\n  \
         - client_id + client_secret in {}\n  \
         - --client-id and --client-secret flags\n  \
         - --credentials-file flag (path to Google Cloud Console JSON)\n  \
         - GOOGLE_CLIENT_ID and GOOGLE_CLIENT_SECRET env vars",
        Config::default_path().display()
    )))
}
