use crate::{
    commands::{Commands, RunOverrides},
    error::CliError,
    shutdown::{ExitCode, ShutdownCoordinator},
};
use clap::Parser;
use connectors::adapter::{destination_adapter, source_adapter};
use engine_config::{RunConfig, TransferConfig, load::load_transfer_config};
use engine_processing::{BatchReplicator, TransferResult};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

mod commands;
mod error;
mod output;
mod shutdown;

#[derive(Parser)]
#[command(name = "batchrep", version = "0.1.0", about = "Batched, resumable table replication")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> std::process::ExitCode {
    // Logs go to stderr, stdout carries the JSON result
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let code = match cli.command {
        Commands::Transfer {
            config,
            overrides,
            output,
        } => transfer(&config, overrides, output.as_deref()).await,
        Commands::Validate { config, overrides } => validate(&config, overrides).await,
    };

    code.unwrap_or_else(|err| {
        error!("{err}");
        ExitCode::GeneralError
    })
    .into()
}

async fn transfer(
    path: &str,
    overrides: RunOverrides,
    output: Option<&str>,
) -> Result<ExitCode, CliError> {
    let config = load_config(path, overrides).await?;
    let run_config = config.run.validate()?;

    let source = source_adapter(
        config.source.driver,
        run_config.record_shape,
        config.source.csv_settings()?,
    )?;
    let destination = destination_adapter(config.destination.driver)?;

    let shutdown = ShutdownCoordinator::new(CancellationToken::new());
    shutdown.register_handlers();

    let mut replicator = BatchReplicator::new(
        run_config,
        source,
        destination,
        config.destination.credentials(),
    )
    .with_cancellation(shutdown.cancel_token());
    let result = replicator.run().await;

    match output {
        Some(path) => output::write_result(&result, path).await?,
        None => output::print_result(&result)?,
    }

    Ok(exit_code(&result))
}

async fn validate(path: &str, overrides: RunOverrides) -> Result<ExitCode, CliError> {
    let config = load_config(path, overrides).await?;
    let run_config = config.run.validate()?;

    // Build both adapters so driver roles and CSV options are checked too
    source_adapter(
        config.source.driver,
        run_config.record_shape,
        config.source.csv_settings()?,
    )?;
    destination_adapter(config.destination.driver)?;

    info!(
        source = %config.source.driver,
        destination = %config.destination.driver,
        table = %run_config.destination_table,
        batch_size = run_config.batch_size,
        page_size = run_config.page_size,
        "Configuration is valid"
    );
    println!("{}", serde_json::to_string_pretty(&config.run)?);

    Ok(ExitCode::Success)
}

async fn load_config(path: &str, overrides: RunOverrides) -> Result<TransferConfig, CliError> {
    let mut config = load_transfer_config(path).await?;
    config.run = apply_overrides(config.run, overrides);
    Ok(config)
}

fn apply_overrides(mut run: RunConfig, overrides: RunOverrides) -> RunConfig {
    if let Some(batch_size) = overrides.batch_size {
        run = run.with_batch_size(batch_size);
    }
    if let Some(page_size) = overrides.page_size {
        run = run.with_page_size(page_size);
    }
    if let Some(offset) = overrides.resume_offset {
        run = run.with_resume_offset(offset);
    }
    if overrides.prefetch {
        run = run.with_prefetch(true);
    }
    run
}

fn exit_code(result: &TransferResult) -> ExitCode {
    if result.is_completed() {
        ExitCode::Success
    } else if result.was_cancelled() {
        warn!(
            resume_offset = result.resume_offset,
            "Transfer interrupted, rerun with --resume-offset to continue"
        );
        ExitCode::ShutdownRequested
    } else {
        ExitCode::GeneralError
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use model::records::record::RecordShape;

    #[test]
    fn overrides_take_precedence() {
        let run = RunConfig::new("q", "t", RecordShape::Tuple).with_batch_size(10);
        let overrides = RunOverrides {
            batch_size: Some(3),
            page_size: None,
            resume_offset: Some(9),
            prefetch: true,
        };

        let run = apply_overrides(run, overrides);
        assert_eq!(run.batch_size, 3);
        assert_eq!(run.page_size, None);
        assert_eq!(run.resume_offset, Some(9));
        assert!(run.prefetch);
    }

    #[test]
    fn absent_overrides_keep_file_values() {
        let run = RunConfig::new("q", "t", RecordShape::Tuple)
            .with_page_size(7)
            .with_prefetch(true);
        let run = apply_overrides(run, RunOverrides::default());
        assert_eq!(run.page_size, Some(7));
        assert!(run.prefetch);
    }

    #[test]
    fn cli_parses_transfer_flags() {
        let cli = Cli::try_parse_from([
            "batchrep",
            "transfer",
            "--config",
            "t.json",
            "--batch-size",
            "100",
            "--prefetch",
        ])
        .unwrap();
        match cli.command {
            Commands::Transfer {
                config, overrides, ..
            } => {
                assert_eq!(config, "t.json");
                assert_eq!(overrides.batch_size, Some(100));
                assert!(overrides.prefetch);
            }
            _ => panic!("expected transfer"),
        }
    }
}
