//! Reporting views over the materialized feature table.

use ::duckdb::Connection;

/// Create views for downstream analysis.
///
/// Creates the following views:
/// - `vw_team_game_features_report`: the consumer-facing feature columns
/// - `vw_rest_day_summary`: per rest-day averages and win rate
///
/// Both read `team_game_features`, so they must be created after it.
///
/// # Errors
/// Returns an error if the view creation SQL fails to execute.
pub fn create_feature_views(connection: &Connection) -> Result<(), ::duckdb::Error> {
    connection.execute_batch(
        r"
CREATE OR REPLACE VIEW vw_team_game_features_report AS
SELECT
    game_date,
    team_abbr,
    team_points,
    team_rebounds,
    team_assists,
    rest_days,
    avg_plus_minus,
    win_loss
FROM team_game_features;

CREATE OR REPLACE VIEW vw_rest_day_summary AS
SELECT
    rest_days,
    COUNT(*) AS games,
    AVG(team_points)::DOUBLE AS avg_team_points,
    AVG(avg_plus_minus)::DOUBLE AS avg_plus_minus,
    AVG(CASE WHEN win_loss = 'W' THEN 1.0 ELSE 0.0 END)::DOUBLE AS win_rate
FROM team_game_features
WHERE rest_days IS NOT NULL
GROUP BY rest_days;
",
    )?;

    Ok(())
}
