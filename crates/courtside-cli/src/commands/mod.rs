mod features;
mod ingest;
mod sql;
mod status;
mod transform;

use std::sync::Arc;

use courtside_core::{
    CancellationToken, FetchClient, IngestionOrchestrator, LoadMode, PipelineConfig,
    ReqwestHttpClient, Warehouse, WorkUnitKey,
};
use serde_json::Value;
use tracing::warn;

use crate::cli::{Cli, Command, IngestArgs};
use crate::error::CliError;

pub async fn run(cli: &Cli) -> Result<Value, CliError> {
    let config = load_config(cli)?;

    match &cli.command {
        Command::Ingest(args) => ingest::run(&config, args).await,
        Command::Run(args) => ingest::run_with_transform(&config, args).await,
        Command::Transform => transform::run(&config),
        Command::Features(args) => features::run(&config, args),
        Command::Sql(args) => sql::run(&config, args),
        Command::Status => status::run(&config),
    }
}

/// Defaults, config file and environment, then global flags.
fn load_config(cli: &Cli) -> Result<PipelineConfig, CliError> {
    let mut config = PipelineConfig::load(cli.config.as_deref())?;

    if let Some(db_path) = &cli.db_path {
        config.db_path = Some(db_path.clone());
    }
    if let Some(timeout_ms) = cli.timeout_ms {
        config.request_timeout_ms = timeout_ms;
    }
    if let Some(max_attempts) = cli.max_attempts {
        config.retry.max_attempts = max_attempts;
    }
    if let Some(backoff_factor) = cli.backoff_factor {
        config.retry.backoff_factor = backoff_factor;
    }

    config.validate()?;
    Ok(config)
}

fn open_warehouse(config: &PipelineConfig) -> Result<Warehouse, CliError> {
    Ok(Warehouse::open(config.warehouse_config())?)
}

/// Apply `ingest`/`run` flags and build the orchestrator with its work units.
fn prepare_ingest(
    config: &PipelineConfig,
    args: &IngestArgs,
) -> Result<(IngestionOrchestrator, Vec<WorkUnitKey>), CliError> {
    let mut config = config.clone();
    if !args.seasons.is_empty() {
        config.seasons = args.seasons.clone();
    }
    if let Some(concurrency) = args.concurrency {
        config.concurrency = concurrency;
    }
    if args.replace_seasons {
        config.load_mode = LoadMode::ReplaceUnits;
    }
    config.validate()?;

    let units = config.work_units()?;
    let http = Arc::new(ReqwestHttpClient::new()?);
    let fetcher = FetchClient::from_config(&config, http);
    let warehouse = open_warehouse(&config)?;
    Ok((IngestionOrchestrator::from_config(&config, fetcher, warehouse), units))
}

/// Token cancelled on Ctrl-C.
fn interrupt_token() -> CancellationToken {
    let token = CancellationToken::new();
    let signalled = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, cancelling run");
            signalled.cancel();
        }
    });
    token
}
