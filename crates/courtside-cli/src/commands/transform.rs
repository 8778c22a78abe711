use courtside_core::PipelineConfig;
use serde_json::{json, Value};

use crate::error::CliError;

use super::open_warehouse;

pub fn run(config: &PipelineConfig) -> Result<Value, CliError> {
    let warehouse = open_warehouse(config)?;
    let report = warehouse.materialize_features()?;

    Ok(json!({
        "command": "transform",
        "db_path": warehouse.db_path().display().to_string(),
        "transform": report,
    }))
}
