use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use taxi_eds::actions::ActionRunner;
use taxi_eds::api::Action;
use taxi_eds::cli::{Cli, Command, VerbosityLevel};
use taxi_eds::config::ConfigSource;
use taxi_eds::error::TaxiError;
use taxi_eds::host::{EditorHost, TextDocument};
use taxi_eds::output::TerminalHost;
use taxi_eds::state::JsonFileStore;
use taxi_eds::telemetry::TelemetryClient;

const EXIT_FAILURE: u8 = 1;
const EXIT_USAGE: u8 = 2;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse_args();
    init_tracing(cli.verbosity());

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {:#}", e);
            ExitCode::from(EXIT_USAGE)
        }
    }
}

fn init_tracing(verbosity: VerbosityLevel) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(verbosity.filter_directive()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn read_document(path: &Path) -> Result<TextDocument> {
    let text = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
    Ok(TextDocument::new(path.display().to_string(), text))
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let config_source = ConfigSource::new(cli.config.clone());
    let config = config_source
        .load()
        .await
        .context("failed to load configuration")?;

    let telemetry = Arc::new(
        TelemetryClient::new(&config.telemetry).context("failed to set up usage pings")?,
    );
    telemetry.ping("activate");

    let document = match cli.document_path() {
        Some(path) => Some(read_document(path).await?),
        None => None,
    };

    let state_path = cli
        .state_file
        .clone()
        .unwrap_or_else(JsonFileStore::default_path);
    debug!("using state file {}", state_path.display());

    let runner = ActionRunner::new(
        config_source,
        Arc::clone(&telemetry),
        Box::new(JsonFileStore::new(state_path)),
    );
    let mut host = TerminalHost::new(document, cli.format, cli.verbosity());

    let code = match &cli.command {
        Command::Validate { .. } => run_action(&runner, Action::Validate, &mut host).await,
        Command::Update { .. } => run_action(&runner, Action::Update, &mut host).await,
        Command::SetId { id, description } => {
            match runner
                .set_design_system(id, description.as_deref(), &mut host)
                .await
            {
                Ok(list) => {
                    host.print_list(&list);
                    ExitCode::SUCCESS
                }
                Err(e) => fail(&mut host, &e),
            }
        }
        Command::ListIds => match runner.design_systems().await {
            Ok(list) => {
                host.print_list(&list);
                ExitCode::SUCCESS
            }
            Err(e) => fail(&mut host, &e),
        },
        Command::Status => match runner.status().await {
            Ok(status) => {
                host.print_status(&status);
                ExitCode::SUCCESS
            }
            Err(e) => fail(&mut host, &e),
        },
    };

    telemetry.ping("deactivate");
    telemetry.flush().await;
    Ok(code)
}

fn fail(host: &mut TerminalHost, e: &TaxiError) -> ExitCode {
    host.show_error(&e.to_string());
    match e {
        TaxiError::Config(_) | TaxiError::Validation(_) => ExitCode::from(EXIT_USAGE),
        _ => ExitCode::from(EXIT_FAILURE),
    }
}

async fn run_action(
    runner: &ActionRunner,
    action: Action,
    host: &mut TerminalHost,
) -> ExitCode {
    match runner.run(action, host).await {
        Ok(report) if report.error_count() == 0 => ExitCode::SUCCESS,
        Ok(report) => {
            debug!("{} reported {} errors", action.verb(), report.error_count());
            ExitCode::from(EXIT_FAILURE)
        }
        // Already shown to the user by the runner
        Err(TaxiError::Config(_)) => ExitCode::from(EXIT_USAGE),
        Err(_) => ExitCode::from(EXIT_FAILURE),
    }
}
