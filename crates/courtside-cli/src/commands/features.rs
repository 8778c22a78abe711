use courtside_core::{FeatureFilter, PipelineConfig};
use serde_json::{json, Value};

use crate::cli::FeaturesArgs;
use crate::error::CliError;

use super::open_warehouse;

pub fn run(config: &PipelineConfig, args: &FeaturesArgs) -> Result<Value, CliError> {
    let filter = FeatureFilter {
        team_abbr: args.team.as_ref().map(|team| team.trim().to_ascii_uppercase()),
        min_rest_days: args.min_rest,
        max_rest_days: args.max_rest,
        limit: args.limit,
    };

    let warehouse = open_warehouse(config)?;
    let rows = warehouse.feature_rows(&filter)?;

    Ok(json!({
        "command": "features",
        "row_count": rows.len(),
        "rows": rows,
    }))
}
