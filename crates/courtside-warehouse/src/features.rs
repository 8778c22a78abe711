//! Team-game aggregation and rest-day features.
//!
//! Both derived tables are rebuilt from `player_game_logs` on every run.
//! Within a team, games are ordered by `game_date` and then `game_id`, so two
//! games of one team on the same date get a stable order and a `rest_days`
//! of 0 for the later one.
//!
//! Team totals stay null when no player row of the team-game carries the stat.

use std::time::Instant;

use ::duckdb::Connection;
use tracing::{info, warn};

use crate::models::MaterializeReport;
use crate::views;
use crate::{count_table, WarehouseError};

const BUILD_AGGREGATES_SQL: &str = r"
CREATE OR REPLACE TABLE team_game_aggregates AS
SELECT
    game_id,
    game_date,
    team_abbr,
    MAX(win_loss) AS win_loss,
    CAST(SUM(points) AS BIGINT) AS team_points,
    CAST(SUM(rebounds) AS BIGINT) AS team_rebounds,
    CAST(SUM(assists) AS BIGINT) AS team_assists,
    AVG(plus_minus)::DOUBLE AS avg_plus_minus,
    CAST(SUM(CASE WHEN minutes > 0 THEN 1 ELSE 0 END) AS BIGINT) AS players_used
FROM player_game_logs
GROUP BY game_id, game_date, team_abbr;
";

const BUILD_FEATURES_SQL: &str = r"
CREATE OR REPLACE TABLE team_game_features AS
WITH ordered AS (
    SELECT
        *,
        ROW_NUMBER() OVER team_games AS game_number,
        LAG(game_date) OVER team_games AS prev_game_date
    FROM team_game_aggregates
    WINDOW team_games AS (PARTITION BY team_abbr ORDER BY game_date, game_id)
)
SELECT
    *,
    DATE_DIFF('day', prev_game_date, game_date) AS rest_days
FROM ordered;
";

/// Rebuild `team_game_aggregates`, `team_game_features` and their views.
///
/// Runs on the caller's connection; the caller owns the transaction.
pub(crate) fn materialize(connection: &Connection) -> Result<MaterializeReport, WarehouseError> {
    let started = Instant::now();

    let win_loss_conflicts = log_win_loss_conflicts(connection)?;

    connection.execute_batch(BUILD_AGGREGATES_SQL)?;
    connection.execute_batch(BUILD_FEATURES_SQL)?;
    views::create_feature_views(connection)?;

    let negative: i64 = connection.query_row(
        "SELECT COUNT(*) FROM team_game_features WHERE rest_days < 0",
        [],
        |row| row.get(0),
    )?;
    if negative > 0 {
        return Err(WarehouseError::FeatureIntegrity(format!(
            "{negative} team-game rows have negative rest_days"
        )));
    }

    let same_date_collisions = log_same_date_collisions(connection)?;
    let aggregate_rows = count_table(connection, "team_game_aggregates")?;
    let feature_rows = count_table(connection, "team_game_features")?;

    let report = MaterializeReport {
        aggregate_rows,
        feature_rows,
        win_loss_conflicts,
        same_date_collisions,
        elapsed_ms: started.elapsed().as_millis().min(u128::from(u64::MAX)) as u64,
    };
    info!(
        aggregate_rows,
        feature_rows,
        win_loss_conflicts,
        same_date_collisions,
        "materialized team game features"
    );
    Ok(report)
}

/// Team-games whose player rows disagree on `win_loss`. `MAX` resolves them to `'W'`.
fn log_win_loss_conflicts(connection: &Connection) -> Result<usize, WarehouseError> {
    let mut statement = connection.prepare(
        "SELECT game_id, team_abbr, MIN(win_loss) || ',' || MAX(win_loss) \
         FROM player_game_logs \
         GROUP BY game_id, team_abbr \
         HAVING COUNT(DISTINCT win_loss) > 1 \
         ORDER BY game_id, team_abbr",
    )?;
    let conflicts = statement
        .query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    for (game_id, team_abbr, outcomes) in &conflicts {
        warn!(%game_id, %team_abbr, %outcomes, "players disagree on team outcome; keeping 'W'");
    }
    Ok(conflicts.len())
}

fn log_same_date_collisions(connection: &Connection) -> Result<usize, WarehouseError> {
    let mut statement = connection.prepare(
        "SELECT team_abbr, CAST(game_date AS VARCHAR), COUNT(*) \
         FROM team_game_features \
         GROUP BY team_abbr, game_date \
         HAVING COUNT(*) > 1 \
         ORDER BY team_abbr, game_date",
    )?;
    let collisions = statement
        .query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, i64>(2)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let mut games = 0_usize;
    for (team_abbr, game_date, count) in &collisions {
        warn!(%team_abbr, %game_date, games = count, "team has several games on one date; ordered by game_id");
        games += usize::try_from(*count).unwrap_or_default();
    }
    Ok(games)
}
