use serde::{Deserialize, Serialize};

/// One player's box-score line for one game, ready for the raw table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerGameLogRecord {
    /// Work unit (season) the row was fetched for.
    pub season: String,
    pub game_id: String,
    /// Calendar date as `YYYY-MM-DD`.
    pub game_date: String,
    pub team_id: Option<i64>,
    pub team_abbr: String,
    pub matchup: Option<String>,
    pub player_id: i64,
    pub player_name: String,
    pub minutes: Option<f64>,
    pub points: Option<i64>,
    pub rebounds: Option<i64>,
    pub assists: Option<i64>,
    pub plus_minus: Option<f64>,
    /// `"W"` or `"L"`.
    pub win_loss: String,
}

/// How a bulk load treats rows already present for the same seasons.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadMode {
    /// Append every row; reloading a season duplicates its rows.
    #[default]
    Append,
    /// Delete the rows of every season present in the batch, then append.
    ReplaceUnits,
}

impl LoadMode {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Append => "append",
            Self::ReplaceUnits => "replace_units",
        }
    }
}

/// One row of `team_game_features`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TeamGameFeatureRow {
    pub game_id: String,
    pub game_date: String,
    pub team_abbr: String,
    /// Null when no player row of the team-game reports points.
    pub team_points: Option<i64>,
    pub team_rebounds: Option<i64>,
    pub team_assists: Option<i64>,
    pub avg_plus_minus: Option<f64>,
    pub players_used: i64,
    pub win_loss: String,
    pub game_number: i64,
    pub prev_game_date: Option<String>,
    pub rest_days: Option<i64>,
}

/// Optional predicates for reading the feature table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeatureFilter {
    pub team_abbr: Option<String>,
    /// Inclusive lower bound; rows with null `rest_days` are excluded when set.
    pub min_rest_days: Option<i64>,
    /// Inclusive upper bound; rows with null `rest_days` are excluded when set.
    pub max_rest_days: Option<i64>,
    pub limit: Option<usize>,
}

/// Outcome of one feature materialization.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MaterializeReport {
    pub aggregate_rows: usize,
    pub feature_rows: usize,
    /// Team-games whose players disagree on the outcome.
    pub win_loss_conflicts: usize,
    /// Team-games sharing a date with another game of the same team.
    pub same_date_collisions: usize,
    pub elapsed_ms: u64,
}

/// Row counts of the pipeline tables. Derived tables report `None` until materialized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableCounts {
    pub player_game_logs: usize,
    pub team_game_aggregates: Option<usize>,
    pub team_game_features: Option<usize>,
    pub ingest_runs: usize,
}
