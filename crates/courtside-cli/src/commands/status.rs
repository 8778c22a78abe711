use courtside_core::{PipelineConfig, RAW_SCHEMA_VERSION};
use serde_json::{json, Value};

use crate::error::CliError;

use super::open_warehouse;

pub fn run(config: &PipelineConfig) -> Result<Value, CliError> {
    let warehouse = open_warehouse(config)?;
    let counts = warehouse.table_counts()?;
    let migrations = warehouse.migration_versions()?;

    Ok(json!({
        "command": "status",
        "db_path": warehouse.db_path().display().to_string(),
        "raw_schema": RAW_SCHEMA_VERSION,
        "migrations": migrations,
        "tables": counts,
        "seasons": config.seasons,
    }))
}
