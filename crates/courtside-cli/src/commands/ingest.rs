use courtside_core::{run_pipeline, PipelineConfig};
use serde_json::{json, Value};

use crate::cli::IngestArgs;
use crate::error::CliError;

use super::{interrupt_token, prepare_ingest};

pub async fn run(config: &PipelineConfig, args: &IngestArgs) -> Result<Value, CliError> {
    let (orchestrator, units) = prepare_ingest(config, args)?;
    let cancel = interrupt_token();

    let report = orchestrator.run(&units, &cancel).await?;
    Ok(json!({
        "command": "ingest",
        "db_path": orchestrator.warehouse().db_path().display().to_string(),
        "ingest": report,
    }))
}

pub async fn run_with_transform(config: &PipelineConfig, args: &IngestArgs) -> Result<Value, CliError> {
    let (orchestrator, units) = prepare_ingest(config, args)?;
    let cancel = interrupt_token();

    let report = run_pipeline(&orchestrator, &units, &cancel).await?;
    Ok(json!({
        "command": "run",
        "db_path": orchestrator.warehouse().db_path().display().to_string(),
        "ingest": report.ingest,
        "transform": report.transform,
    }))
}
