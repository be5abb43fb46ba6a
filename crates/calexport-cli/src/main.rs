//! calexport CLI entry point.

use std::process::ExitCode;

use chrono::Utc;
use clap::Parser;

use calexport_cli::cli::Cli;
use calexport_cli::config::ClientConfig;
use calexport_cli::error::{ClientError, ClientResult};
use calexport_cli::export::{ExportOutcome, Exporter};
use calexport_core::{TracingConfig, init_tracing};
use calexport_providers::IcsFileWriter;
use calexport_providers::google::{GoogleAuthenticator, GoogleEventSource};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> ClientResult<()> {
    let config = ClientConfig::load()?;

    if let Err(e) = init_tracing(TracingConfig::for_debug(config.debug)) {
        eprintln!("warning: logging disabled: {}", e);
    }

    let export_config = config.to_export_config();
    let google = config.google.to_provider_config()?;

    let authenticator =
        GoogleAuthenticator::new(google.clone()).map_err(|e| ClientError::Config(e.to_string()))?;
    let source = GoogleEventSource::new(&google).map_err(|e| ClientError::Config(e.to_string()))?;
    let writer = IcsFileWriter::new();

    let outcome = Exporter::new(&authenticator, &source, &writer, &export_config)
        .run(Utc::now(), &cli.output)
        .await?;

    match outcome {
        ExportOutcome::Written { written, .. } => {
            tracing::debug!(written, "export finished");
        }
        ExportOutcome::NothingFetched | ExportOutcome::NothingAccepted { .. } => {
            tracing::debug!(path = %cli.output.display(), "no calendar written");
        }
    }
    Ok(())
}
