//! # Courtside Warehouse
//!
//! DuckDB-backed storage for NBA player game logs and the team-game features
//! derived from them.
//!
//! ## Overview
//!
//! - **Bulk load**: one transaction per batch of raw player rows
//! - **Materialize**: rebuild the aggregate and feature tables from scratch
//! - **Query surface**: typed feature reads and guarded ad-hoc SQL
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use courtside_warehouse::{FeatureFilter, Warehouse, WarehouseConfig};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let warehouse = Warehouse::open(WarehouseConfig::at("nba.duckdb"))?;
//!     let report = warehouse.materialize_features()?;
//!     println!("{} team games", report.feature_rows);
//!
//!     let rested = warehouse.feature_rows(&FeatureFilter {
//!         min_rest_days: Some(0),
//!         max_rest_days: Some(5),
//!         ..FeatureFilter::default()
//!     })?;
//!     println!("{} rows with 0-5 rest days", rested.len());
//!     Ok(())
//! }
//! ```
//!
//! ## Tables
//!
//! | Table | Description |
//! |-------|-------------|
//! | `player_game_logs` | Raw per-player box-score rows (append-only) |
//! | `team_game_aggregates` | One row per (`game_id`, `team_abbr`) |
//! | `team_game_features` | Aggregates plus `game_number`, `prev_game_date`, `rest_days` |
//! | `ingest_log` | One row per season per bulk load |
//! | `schema_migrations` | Applied migration versions |
//!
//! ## Views
//!
//! | View | Description |
//! |------|-------------|
//! | `vw_team_game_features_report` | Consumer-facing feature columns |
//! | `vw_rest_day_summary` | Averages and win rate per rest-day value |

pub mod duckdb;
mod error;
mod features;
pub mod migrations;
mod models;
pub mod views;

use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use ::duckdb::types::Value as DuckValue;
use ::duckdb::{params, params_from_iter, Connection, ToSql};
use serde::Serialize;
use serde_json::{Number, Value};
use tracing::info;

pub use duckdb::{AccessMode, DuckDbConnectionManager, PooledConnection};
pub use error::WarehouseError;
pub use migrations::RAW_TABLE_VERSION;
pub use models::{
    FeatureFilter, LoadMode, MaterializeReport, PlayerGameLogRecord, TableCounts,
    TeamGameFeatureRow,
};

/// Configuration for the warehouse database.
#[derive(Debug, Clone)]
pub struct WarehouseConfig {
    /// Path to the `DuckDB` database file.
    pub db_path: PathBuf,
    /// Maximum number of idle connections kept per access mode.
    pub max_pool_size: usize,
}

impl WarehouseConfig {
    pub fn at(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: db_path.into(),
            ..Self::default()
        }
    }
}

impl Default for WarehouseConfig {
    fn default() -> Self {
        Self {
            db_path: resolve_courtside_home().join("nba.duckdb"),
            max_pool_size: 4,
        }
    }
}

/// Guardrails for query execution to prevent resource exhaustion.
#[derive(Debug, Clone, Copy)]
pub struct QueryGuardrails {
    /// Maximum number of rows to return.
    pub max_rows: usize,
    /// Query timeout in milliseconds.
    pub query_timeout_ms: u64,
}

impl Default for QueryGuardrails {
    fn default() -> Self {
        Self {
            max_rows: 10_000,
            query_timeout_ms: 5_000,
        }
    }
}

impl QueryGuardrails {
    fn timeout(self) -> Duration {
        Duration::from_millis(self.query_timeout_ms.max(1))
    }

    fn validate(self) -> Result<(), WarehouseError> {
        if self.max_rows == 0 {
            return Err(WarehouseError::QueryRejected(String::from(
                "--max-rows must be greater than zero",
            )));
        }
        if self.query_timeout_ms == 0 {
            return Err(WarehouseError::QueryRejected(String::from(
                "--query-timeout-ms must be greater than zero",
            )));
        }
        Ok(())
    }
}

/// Column metadata for query results.
#[derive(Debug, Clone, Serialize)]
pub struct SqlColumn {
    pub name: String,
    #[serde(rename = "type")]
    pub r#type: String,
}

/// Result of a SQL query execution.
#[derive(Debug, Clone, Serialize)]
pub struct QueryResult {
    pub columns: Vec<SqlColumn>,
    /// Row data as JSON values.
    pub rows: Vec<Vec<Value>>,
    pub row_count: usize,
    /// Whether results were truncated due to the `max_rows` limit.
    pub truncated: bool,
}

/// Handle to the courtside database file.
#[derive(Clone)]
pub struct Warehouse {
    manager: DuckDbConnectionManager,
}

impl Warehouse {
    /// Open a warehouse at the default location.
    pub fn open_default() -> Result<Self, WarehouseError> {
        Self::open(WarehouseConfig::default())
    }

    /// Open (creating if needed) the database file and apply pending migrations.
    pub fn open(config: WarehouseConfig) -> Result<Self, WarehouseError> {
        if let Some(parent) = config.db_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let manager = DuckDbConnectionManager::open(config.db_path, config.max_pool_size)?;
        let warehouse = Self { manager };
        warehouse.initialize()?;
        Ok(warehouse)
    }

    fn initialize(&self) -> Result<(), WarehouseError> {
        let connection = self.manager.acquire(AccessMode::ReadWrite)?;
        let applied = migrations::apply_migrations(&connection)?;
        if !applied.is_empty() {
            info!(db = %self.db_path().display(), ?applied, "applied warehouse migrations");
        }
        Ok(())
    }

    /// Get the path to the database file.
    pub fn db_path(&self) -> &Path {
        self.manager.db_path()
    }

    /// Migration versions recorded in the database.
    pub fn migration_versions(&self) -> Result<Vec<String>, WarehouseError> {
        let connection = self.manager.acquire(AccessMode::ReadOnly)?;
        Ok(migrations::applied_versions(&connection)?)
    }

    /// Load a batch of raw player rows in one transaction.
    ///
    /// An empty batch is a no-op. In [`LoadMode::Append`] rows are never
    /// deduplicated, so loading the same season twice doubles its rows.
    /// One `ingest_log` row is written per season in the batch.
    pub fn bulk_load_raw(
        &self,
        run_id: &str,
        rows: &[PlayerGameLogRecord],
        mode: LoadMode,
    ) -> Result<usize, WarehouseError> {
        if rows.is_empty() {
            info!(run_id, "no player game logs to load");
            return Ok(0);
        }

        let mut per_season: BTreeMap<&str, i64> = BTreeMap::new();
        for row in rows {
            *per_season.entry(row.season.as_str()).or_default() += 1;
        }

        let connection = self.manager.acquire(AccessMode::ReadWrite)?;
        connection.execute_batch("BEGIN TRANSACTION")?;
        let result = (|| -> Result<usize, WarehouseError> {
            if mode == LoadMode::ReplaceUnits {
                for season in per_season.keys() {
                    let removed = connection.execute(
                        "DELETE FROM player_game_logs WHERE season = ?",
                        params![season],
                    )?;
                    info!(run_id, season, removed, "cleared season before reload");
                }
            }

            stage_rows(&connection, rows)?;
            connection.execute_batch(
                "INSERT INTO player_game_logs \
                 (season, game_id, game_date, team_id, team_abbr, matchup, player_id, player_name, \
                  minutes, points, rebounds, assists, plus_minus, win_loss) \
                 SELECT season, game_id, CAST(game_date AS DATE), team_id, team_abbr, matchup, \
                        player_id, player_name, minutes, points, rebounds, assists, plus_minus, win_loss \
                 FROM player_game_logs_staging; \
                 DROP TABLE player_game_logs_staging;",
            )?;

            let mode_name = mode.as_str();
            for (season, count) in &per_season {
                let params: [&dyn ToSql; 4] = [&run_id, season, &mode_name, count];
                connection.execute(
                    "INSERT INTO ingest_log \
                     (run_id, season, load_mode, record_count, status, timestamp) \
                     VALUES (?, ?, ?, ?, 'loaded', CURRENT_TIMESTAMP)",
                    params.as_slice(),
                )?;
            }

            Ok(rows.len())
        })();

        let loaded = finalize_transaction(&connection, result)?;
        info!(run_id, loaded, seasons = per_season.len(), mode = mode.as_str(), "loaded player game logs");
        Ok(loaded)
    }

    /// Number of rows in `player_game_logs`.
    pub fn raw_row_count(&self) -> Result<usize, WarehouseError> {
        let connection = self.manager.acquire(AccessMode::ReadOnly)?;
        count_table(&connection, "player_game_logs")
    }

    /// Rebuild `team_game_aggregates` and `team_game_features` from the raw table.
    ///
    /// Runs in a single transaction: either both tables (and their views) are
    /// replaced or neither is.
    pub fn materialize_features(&self) -> Result<MaterializeReport, WarehouseError> {
        let connection = self.manager.acquire(AccessMode::ReadWrite)?;
        connection.execute_batch("BEGIN TRANSACTION")?;
        let result = features::materialize(&connection);
        finalize_transaction(&connection, result)
    }

    /// Read rows of `team_game_features` ordered by team and game order.
    pub fn feature_rows(
        &self,
        filter: &FeatureFilter,
    ) -> Result<Vec<TeamGameFeatureRow>, WarehouseError> {
        let connection = self.manager.acquire(AccessMode::ReadOnly)?;
        if !table_exists(&connection, "team_game_features")? {
            return Err(WarehouseError::QueryRejected(String::from(
                "team_game_features has not been materialized yet",
            )));
        }

        let mut predicates = Vec::new();
        let mut values = Vec::new();
        if let Some(team) = &filter.team_abbr {
            predicates.push("team_abbr = ?");
            values.push(DuckValue::Text(team.clone()));
        }
        if let Some(min) = filter.min_rest_days {
            predicates.push("rest_days >= ?");
            values.push(DuckValue::BigInt(min));
        }
        if let Some(max) = filter.max_rest_days {
            predicates.push("rest_days <= ?");
            values.push(DuckValue::BigInt(max));
        }

        let mut sql = String::from(
            "SELECT game_id, CAST(game_date AS VARCHAR), team_abbr, team_points, team_rebounds, \
             team_assists, avg_plus_minus, players_used, win_loss, game_number, \
             CAST(prev_game_date AS VARCHAR), rest_days \
             FROM team_game_features",
        );
        if !predicates.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&predicates.join(" AND "));
        }
        sql.push_str(" ORDER BY team_abbr, game_number");
        if let Some(limit) = filter.limit {
            sql.push_str(&format!(" LIMIT {limit}"));
        }

        let mut statement = connection.prepare(sql.as_str())?;
        let rows = statement
            .query_map(params_from_iter(values), |row| {
                Ok(TeamGameFeatureRow {
                    game_id: row.get(0)?,
                    game_date: row.get(1)?,
                    team_abbr: row.get(2)?,
                    team_points: row.get(3)?,
                    team_rebounds: row.get(4)?,
                    team_assists: row.get(5)?,
                    avg_plus_minus: row.get(6)?,
                    players_used: row.get(7)?,
                    win_loss: row.get(8)?,
                    game_number: row.get(9)?,
                    prev_game_date: row.get(10)?,
                    rest_days: row.get(11)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Row counts of the pipeline tables.
    pub fn table_counts(&self) -> Result<TableCounts, WarehouseError> {
        let connection = self.manager.acquire(AccessMode::ReadOnly)?;
        let optional_count = |table: &str| -> Result<Option<usize>, WarehouseError> {
            if table_exists(&connection, table)? {
                count_table(&connection, table).map(Some)
            } else {
                Ok(None)
            }
        };

        let ingest_runs: i64 = connection.query_row(
            "SELECT COUNT(DISTINCT run_id) FROM ingest_log",
            [],
            |row| row.get(0),
        )?;

        Ok(TableCounts {
            player_game_logs: count_table(&connection, "player_game_logs")?,
            team_game_aggregates: optional_count("team_game_aggregates")?,
            team_game_features: optional_count("team_game_features")?,
            ingest_runs: usize::try_from(ingest_runs).unwrap_or_default(),
        })
    }

    /// Execute a SQL query with guardrails.
    ///
    /// Only SELECT-like statements run unless `allow_write` is true.
    pub fn execute_query(
        &self,
        sql: &str,
        guardrails: QueryGuardrails,
        allow_write: bool,
    ) -> Result<QueryResult, WarehouseError> {
        guardrails.validate()?;
        let sql = normalize_sql(sql)?;

        if !allow_write {
            enforce_read_only_query(sql)?;
        }

        let mode = if allow_write {
            AccessMode::ReadWrite
        } else {
            AccessMode::ReadOnly
        };
        let connection = self.manager.acquire(mode)?;
        execute_with_guardrails(&connection, sql, guardrails, allow_write)
    }
}

const CREATE_STAGING_SQL: &str = r"
CREATE OR REPLACE TABLE player_game_logs_staging (
    season TEXT,
    game_id TEXT,
    game_date TEXT,
    team_id BIGINT,
    team_abbr TEXT,
    matchup TEXT,
    player_id BIGINT,
    player_name TEXT,
    minutes DOUBLE,
    points BIGINT,
    rebounds BIGINT,
    assists BIGINT,
    plus_minus DOUBLE,
    win_loss TEXT
);
";

/// Append `rows` to a staging table with the engine's bulk appender.
///
/// Runs inside the caller's transaction, so a failed load leaves no staging table behind.
fn stage_rows(connection: &Connection, rows: &[PlayerGameLogRecord]) -> Result<(), WarehouseError> {
    connection.execute_batch(CREATE_STAGING_SQL)?;

    let mut appender = connection.appender("player_game_logs_staging")?;
    for row in rows {
        // All values are bound as parameters, never interpolated.
        let values: [&dyn ToSql; 14] = [
            &row.season,
            &row.game_id,
            &row.game_date,
            &row.team_id,
            &row.team_abbr,
            &row.matchup,
            &row.player_id,
            &row.player_name,
            &row.minutes,
            &row.points,
            &row.rebounds,
            &row.assists,
            &row.plus_minus,
            &row.win_loss,
        ];
        appender.append_row(values.as_slice())?;
    }
    appender.flush()?;
    Ok(())
}

/// Commit on success, roll back on failure.
fn finalize_transaction<T>(
    connection: &Connection,
    result: Result<T, WarehouseError>,
) -> Result<T, WarehouseError> {
    match result {
        Ok(value) => {
            connection.execute_batch("COMMIT")?;
            Ok(value)
        }
        Err(error) => {
            let _ = connection.execute_batch("ROLLBACK");
            Err(error)
        }
    }
}

fn table_exists(connection: &Connection, table: &str) -> Result<bool, WarehouseError> {
    let count: i64 = connection.query_row(
        "SELECT COUNT(*) FROM information_schema.tables WHERE table_name = ?",
        params![table],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

/// `table` must be a trusted identifier.
pub(crate) fn count_table(connection: &Connection, table: &str) -> Result<usize, WarehouseError> {
    let sql = format!("SELECT COUNT(*) FROM {table}");
    let count: i64 = connection.query_row(sql.as_str(), [], |row| row.get(0))?;
    Ok(usize::try_from(count).unwrap_or_default())
}

fn execute_with_guardrails(
    connection: &Connection,
    sql: &str,
    guardrails: QueryGuardrails,
    allow_write: bool,
) -> Result<QueryResult, WarehouseError> {
    let started = Instant::now();
    if is_select_like(sql) {
        execute_select_query(connection, sql, guardrails, started)
    } else if allow_write {
        connection.execute_batch(sql)?;
        ensure_timeout(started, guardrails.timeout())?;
        Ok(QueryResult {
            columns: Vec::new(),
            rows: Vec::new(),
            row_count: 0,
            truncated: false,
        })
    } else {
        Err(WarehouseError::QueryRejected(String::from(
            "only SELECT/CTE queries are allowed unless --write is provided",
        )))
    }
}

fn execute_select_query(
    connection: &Connection,
    sql: &str,
    guardrails: QueryGuardrails,
    started: Instant,
) -> Result<QueryResult, WarehouseError> {
    let mut statement = connection.prepare(sql)?;
    // Column metadata is only populated after the statement has executed once.
    let _ = statement.query([])?;

    let column_count = statement.column_count();
    let mut columns = Vec::with_capacity(column_count);
    for index in 0..column_count {
        let name = statement
            .column_name(index)
            .map_or_else(|_| format!("column_{index}"), ToString::to_string);
        columns.push(SqlColumn {
            name,
            r#type: statement.column_type(index).to_string(),
        });
    }

    let mut cursor = statement.query([])?;
    let mut rows = Vec::new();
    let mut truncated = false;
    while let Some(row) = cursor.next()? {
        ensure_timeout(started, guardrails.timeout())?;

        if rows.len() >= guardrails.max_rows {
            truncated = true;
            break;
        }
        rows.push(read_row(row, column_count)?);
    }

    ensure_timeout(started, guardrails.timeout())?;

    Ok(QueryResult {
        columns,
        row_count: rows.len(),
        rows,
        truncated,
    })
}

fn read_row(row: &::duckdb::Row<'_>, column_count: usize) -> Result<Vec<Value>, ::duckdb::Error> {
    let mut output = Vec::with_capacity(column_count);
    for index in 0..column_count {
        let value: DuckValue = row.get(index)?;
        output.push(to_json_value(value));
    }
    Ok(output)
}

fn to_json_value(value: DuckValue) -> Value {
    match value {
        DuckValue::Null => Value::Null,
        DuckValue::Boolean(value) => Value::Bool(value),
        DuckValue::TinyInt(value) => Value::Number(Number::from(value)),
        DuckValue::SmallInt(value) => Value::Number(Number::from(value)),
        DuckValue::Int(value) => Value::Number(Number::from(value)),
        DuckValue::BigInt(value) => Value::Number(Number::from(value)),
        DuckValue::HugeInt(value) => i64::try_from(value)
            .map(|value| Value::Number(Number::from(value)))
            .unwrap_or_else(|_| Value::String(value.to_string())),
        DuckValue::UTinyInt(value) => Value::Number(Number::from(value)),
        DuckValue::USmallInt(value) => Value::Number(Number::from(value)),
        DuckValue::UInt(value) => Value::Number(Number::from(value)),
        DuckValue::UBigInt(value) => Value::Number(Number::from(value)),
        DuckValue::Float(value) => number_from_f64(f64::from(value)),
        DuckValue::Double(value) => number_from_f64(value),
        DuckValue::Text(value) => Value::String(value),
        DuckValue::Blob(value) => Value::String(hex::encode(value)),
        other => Value::String(format!("{other:?}")),
    }
}

/// NaN and infinities become `null`.
fn number_from_f64(value: f64) -> Value {
    Number::from_f64(value)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

fn normalize_sql(sql: &str) -> Result<&str, WarehouseError> {
    let normalized = sql.trim();
    if normalized.is_empty() {
        return Err(WarehouseError::QueryRejected(String::from(
            "query must not be empty",
        )));
    }
    Ok(normalized.trim_end_matches(';').trim())
}

fn enforce_read_only_query(sql: &str) -> Result<(), WarehouseError> {
    if !is_select_like(sql) {
        return Err(WarehouseError::QueryRejected(String::from(
            "read-only mode accepts only SELECT/CTE queries; use --write for write statements",
        )));
    }
    if has_multiple_statements(sql) {
        return Err(WarehouseError::QueryRejected(String::from(
            "multiple SQL statements are not allowed in read-only mode",
        )));
    }
    Ok(())
}

fn is_select_like(sql: &str) -> bool {
    let first_keyword = sql
        .split_whitespace()
        .next()
        .unwrap_or_default()
        .to_ascii_uppercase();
    matches!(
        first_keyword.as_str(),
        "SELECT" | "WITH" | "EXPLAIN" | "SHOW" | "DESCRIBE" | "SUMMARIZE"
    )
}

fn has_multiple_statements(sql: &str) -> bool {
    sql.split(';')
        .filter(|part| !part.trim().is_empty())
        .count()
        > 1
}

fn ensure_timeout(started: Instant, timeout: Duration) -> Result<(), WarehouseError> {
    if started.elapsed() > timeout {
        return Err(WarehouseError::QueryTimeout {
            timeout_ms: timeout.as_millis().min(u128::from(u64::MAX)) as u64,
        });
    }
    Ok(())
}

/// `COURTSIDE_HOME`, else `~/.courtside`, else `.courtside`.
pub fn resolve_courtside_home() -> PathBuf {
    if let Some(path) = env::var_os("COURTSIDE_HOME") {
        let path = PathBuf::from(path);
        if !path.as_os_str().is_empty() {
            return path;
        }
    }

    if let Some(home) = env::var_os("HOME") {
        return PathBuf::from(home).join(".courtside");
    }

    PathBuf::from(".courtside")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::{tempdir, TempDir};

    fn open_temp() -> (TempDir, Warehouse) {
        let temp = tempdir().expect("tempdir");
        let warehouse = Warehouse::open(WarehouseConfig {
            db_path: temp.path().join("cache").join("nba.duckdb"),
            max_pool_size: 2,
        })
        .expect("warehouse open");
        (temp, warehouse)
    }

    fn player_row(season: &str, player_name: &str) -> PlayerGameLogRecord {
        PlayerGameLogRecord {
            season: season.to_string(),
            game_id: "0022100001".to_string(),
            game_date: "2021-10-19".to_string(),
            team_id: Some(1_610_612_749),
            team_abbr: "MIL".to_string(),
            matchup: Some("MIL vs. BKN".to_string()),
            player_id: 203_507,
            player_name: player_name.to_string(),
            minutes: Some(32.0),
            points: Some(32),
            rebounds: Some(14),
            assists: Some(7),
            plus_minus: Some(13.0),
            win_loss: "W".to_string(),
        }
    }

    #[test]
    fn initializes_raw_table_and_migrations() {
        let (_temp, warehouse) = open_temp();

        let query = warehouse
            .execute_query(
                "SELECT COUNT(*) AS c FROM information_schema.tables WHERE table_name = 'player_game_logs'",
                QueryGuardrails::default(),
                false,
            )
            .expect("query");
        assert_eq!(query.rows[0][0], Value::Number(Number::from(1)));
        assert_eq!(
            warehouse.migration_versions().expect("versions")[0],
            RAW_TABLE_VERSION
        );
    }

    #[test]
    fn read_only_mode_rejects_write_query() {
        let (_temp, warehouse) = open_temp();

        let error = warehouse
            .execute_query(
                "DELETE FROM player_game_logs",
                QueryGuardrails::default(),
                false,
            )
            .expect_err("should reject");

        assert!(matches!(error, WarehouseError::QueryRejected(_)));
    }

    #[test]
    fn bulk_load_binds_values_as_parameters() {
        let (_temp, warehouse) = open_temp();
        let hostile_name = r#"Giannis'); DROP TABLE player_game_logs; --"#;

        let loaded = warehouse
            .bulk_load_raw("run-1", &[player_row("2021-22", hostile_name)], LoadMode::Append)
            .expect("load");
        assert_eq!(loaded, 1);

        let result = warehouse
            .execute_query(
                "SELECT player_name, CAST(game_date AS VARCHAR) FROM player_game_logs",
                QueryGuardrails::default(),
                false,
            )
            .expect("query");
        assert_eq!(result.rows[0][0], Value::String(hostile_name.to_string()));
        assert_eq!(result.rows[0][1], Value::String("2021-10-19".to_string()));
    }

    #[test]
    fn bulk_load_writes_one_ingest_log_row_per_season() {
        let (_temp, warehouse) = open_temp();
        let rows = vec![
            player_row("2020-21", "A"),
            player_row("2021-22", "B"),
            player_row("2021-22", "C"),
        ];

        warehouse
            .bulk_load_raw("run-7", &rows, LoadMode::Append)
            .expect("load");

        let result = warehouse
            .execute_query(
                "SELECT season, record_count FROM ingest_log WHERE run_id = 'run-7' ORDER BY season",
                QueryGuardrails::default(),
                false,
            )
            .expect("query");
        assert_eq!(result.row_count, 2);
        assert_eq!(result.rows[1][1], Value::Number(Number::from(2)));
    }

    #[test]
    fn failed_load_rolls_back_every_row() {
        let (_temp, warehouse) = open_temp();
        let mut bad = player_row("2021-22", "Bad Date");
        bad.game_date = "not-a-date".to_string();

        let error = warehouse
            .bulk_load_raw("run-2", &[player_row("2021-22", "Good"), bad], LoadMode::Append)
            .expect_err("cast must fail");

        assert!(matches!(error, WarehouseError::DuckDb(_)));
        assert_eq!(warehouse.raw_row_count().expect("count"), 0);
        let connection = warehouse.manager.acquire(AccessMode::ReadOnly).expect("connection");
        assert!(!table_exists(&connection, "player_game_logs_staging").expect("exists"));
    }

    #[test]
    fn bulk_load_appends_large_batches_through_staging() {
        let (_temp, warehouse) = open_temp();
        let rows = (0..2_500_i64)
            .map(|player_id| {
                let mut row = player_row("2021-22", &format!("Player {player_id}"));
                row.player_id = player_id;
                row.points = if player_id % 10 == 0 { None } else { Some(player_id % 40) };
                row
            })
            .collect::<Vec<_>>();

        let loaded = warehouse
            .bulk_load_raw("run-3", &rows, LoadMode::Append)
            .expect("load");

        assert_eq!(loaded, 2_500);
        assert_eq!(warehouse.raw_row_count().expect("count"), 2_500);
        let nulls = warehouse
            .execute_query(
                "SELECT COUNT(*) FROM player_game_logs WHERE points IS NULL",
                QueryGuardrails::default(),
                false,
            )
            .expect("query");
        assert_eq!(nulls.rows[0][0], Value::Number(Number::from(250)));
        let connection = warehouse.manager.acquire(AccessMode::ReadOnly).expect("connection");
        assert!(!table_exists(&connection, "player_game_logs_staging").expect("exists"));
    }

    #[test]
    fn feature_rows_require_materialization() {
        let (_temp, warehouse) = open_temp();

        let error = warehouse
            .feature_rows(&FeatureFilter::default())
            .expect_err("not materialized");
        assert!(matches!(error, WarehouseError::QueryRejected(_)));

        let counts = warehouse.table_counts().expect("counts");
        assert_eq!(counts.team_game_features, None);
    }

    #[test]
    fn select_results_are_capped_by_guardrails() {
        let (_temp, warehouse) = open_temp();

        let result = warehouse
            .execute_query(
                "SELECT * FROM range(50)",
                QueryGuardrails {
                    max_rows: 10,
                    query_timeout_ms: 5_000,
                },
                false,
            )
            .expect("query");

        assert_eq!(result.row_count, 10);
        assert!(result.truncated);
        assert_eq!(result.columns.len(), 1);
    }
}
