use courtside_core::{PipelineConfig, QueryGuardrails};
use serde_json::{json, Value};

use crate::cli::SqlArgs;
use crate::error::CliError;

use super::open_warehouse;

pub fn run(config: &PipelineConfig, args: &SqlArgs) -> Result<Value, CliError> {
    let guardrails = QueryGuardrails {
        max_rows: args.max_rows,
        query_timeout_ms: args.query_timeout_ms,
    };

    let warehouse = open_warehouse(config)?;
    let result = warehouse.execute_query(&args.query, guardrails, args.write)?;

    Ok(json!({
        "command": "sql",
        "columns": result.columns,
        "rows": result.rows,
        "row_count": result.row_count,
        "truncated": result.truncated,
    }))
}
