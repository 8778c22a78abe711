use serde::Serialize;
use tracing::info;

use crate::cancel::CancellationToken;
use crate::domain::WorkUnitKey;
use crate::error::PipelineError;
use crate::ingest::{IngestReport, IngestionOrchestrator};
use crate::MaterializeReport;

/// Outcome of one ingest-then-transform run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PipelineReport {
    pub ingest: IngestReport,
    pub transform: MaterializeReport,
}

/// Ingest `units`, then rebuild the feature tables.
///
/// The transform only starts once the bulk load has committed; a failed
/// ingestion leaves the feature tables untouched.
pub async fn run_pipeline(
    orchestrator: &IngestionOrchestrator,
    units: &[WorkUnitKey],
    cancel: &CancellationToken,
) -> Result<PipelineReport, PipelineError> {
    let ingest = orchestrator.run(units, cancel).await?;
    let transform = orchestrator.warehouse().materialize_features()?;

    info!(
        run_id = %ingest.run_id,
        loaded = ingest.loaded_records,
        team_games = transform.feature_rows,
        "pipeline run complete"
    );
    Ok(PipelineReport { ingest, transform })
}
