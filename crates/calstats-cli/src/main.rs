//! calstats CLI entry point.

use std::io;
use std::process::ExitCode;

use clap::Parser;

use calstats_cli::cli::{AuthProvider, Cli, Command, LogFormat, ReportArgs};
use calstats_cli::commands::report::{self, ReportOptions};
use calstats_cli::config::Config;
use calstats_cli::error::{CliError, CliResult};
use calstats_cli::ignorelist;
use calstats_core::{TracingConfig, TracingOutputFormat, init_tracing};
use calstats_providers::{CalendarSource, MemorySource};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let format = match cli.log_format {
        LogFormat::Compact => TracingOutputFormat::Compact,
        LogFormat::Pretty => TracingOutputFormat::Pretty,
        LogFormat::Json => TracingOutputFormat::Json,
    };
    let tracing_config = if cli.verbose {
        TracingConfig::verbose()
    } else {
        TracingConfig::default()
    };
    if let Err(e) = init_tracing(tracing_config.with_format(format)) {
        eprintln!("error: {}", e);
        return ExitCode::FAILURE;
    }

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> CliResult<()> {
    let config = Config::load(cli.config.as_deref())?;

    match cli.command {
        Command::Report(args) => run_report(args, &config, cli.verbose).await,
        Command::Auth { provider } => match provider {
            #[cfg(feature = "google")]
            AuthProvider::Google {
                client_id,
                client_secret,
                credentials_file,
                force,
            } => {
                let config_path = cli.config.unwrap_or_else(Config::default_path);
                calstats_cli::commands::auth::google(
                    calstats_cli::commands::auth::GoogleAuthArgs {
                        client_id,
                        client_secret,
                        credentials_file,
                        force,
                    },
                    &config,
                    &config_path,
                )
                .await
            }
        },
    }
}

async fn run_report(args: ReportArgs, config: &Config, verbose: bool) -> CliResult<()> {
    let today = chrono::Local::now().date_naive();
    let options = ReportOptions::resolve(&args, &config.report, verbose, today)?;
    let patterns = ignorelist::load(
        args.ignorelist
            .as_deref()
            .or(config.report.ignorelist.as_deref()),
    )?;

    let source: Box<dyn CalendarSource> = match args.events_file {
        Some(ref path) => Box::new(MemorySource::from_file(path)?),
        None => google_source(config).await?,
    };

    report::run(
        source.as_ref(),
        &patterns,
        &options,
        io::stdout().lock(),
        io::stderr().lock(),
    )
    .await
}

#[cfg(feature = "google")]
async fn google_source(config: &Config) -> CliResult<Box<dyn CalendarSource>> {
    use calstats_providers::google::GoogleSource;

    let settings = config.google.as_ref().ok_or_else(|| {
        CliError::Config(format!(
            "no [google] section in {}; run 'calstats auth google' first",
            Config::default_path().display()
        ))
    })?;
    let source = GoogleSource::new(settings.to_provider_config()?)?;
    if !source.is_authenticated().await {
        return Err(CliError::AuthRequired(
            "not authorized with Google Calendar; run 'calstats auth google'".to_string(),
        ));
    }
    Ok(Box::new(source))
}

#[cfg(not(feature = "google"))]
async fn google_source(_config: &Config) -> CliResult<Box<dyn CalendarSource>> {
    Err(CliError::Config(
        "built without Google Calendar support; pass --events-file".to_string(),
    ))
}
