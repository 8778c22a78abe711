//! CLI argument definitions for courtside.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `ingest` | Fetch seasons and bulk load the raw player game logs |
//! | `transform` | Rebuild team-game aggregates and rest-day features |
//! | `run` | `ingest` followed by `transform` |
//! | `features` | Read rows of the feature table |
//! | `sql` | Query the local DuckDB warehouse |
//! | `status` | Table counts and applied migrations |
//!
//! # Global Options
//!
//! | Option | Default | Description |
//! |--------|---------|-------------|
//! | `--config` | `$COURTSIDE_CONFIG` | TOML configuration file |
//! | `--db-path` | `$COURTSIDE_HOME/nba.duckdb` | Warehouse database file |
//! | `--pretty` | `false` | Pretty-print JSON output |
//! | `--timeout-ms` | `45000` | Per-request timeout |
//! | `--max-attempts` | `6` | Attempts per season |
//! | `--backoff-factor` | `2.0` | Delay after attempt n is factor^n seconds |
//!
//! # Examples
//!
//! ```bash
//! courtside run --season 2021-22 --season 2022-23
//! courtside features --team BOS --min-rest 0 --max-rest 5 --pretty
//! courtside sql "SELECT * FROM vw_rest_day_summary ORDER BY rest_days"
//! ```

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// NBA game log ingestion and rest-day feature pipeline.
#[derive(Debug, Parser)]
#[command(
    name = "courtside",
    author,
    version,
    about = "NBA game log ingestion and rest-day feature pipeline",
    long_about = "courtside fetches per-player box scores from the NBA stats league game log, \
stores them in a local DuckDB warehouse and derives per-team-per-game features such as \
rest days between games.\n\
\n\
Results are written to stdout as JSON; logs go to stderr (set RUST_LOG to adjust)."
)]
pub struct Cli {
    /// TOML configuration file; falls back to `COURTSIDE_CONFIG`.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Warehouse database file.
    #[arg(long, global = true)]
    pub db_path: Option<PathBuf>,

    /// Pretty-print JSON output with indentation.
    #[arg(long, global = true, default_value_t = false)]
    pub pretty: bool,

    /// Per-request timeout in milliseconds.
    #[arg(long, global = true)]
    pub timeout_ms: Option<u64>,

    /// Attempts per season before giving up.
    #[arg(long, global = true)]
    pub max_attempts: Option<u32>,

    /// Base of the exponential backoff between attempts.
    #[arg(long, global = true)]
    pub backoff_factor: Option<f64>,

    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fetch seasons and load their player game logs.
    ///
    /// All seasons are fetched first; nothing is written unless every season
    /// succeeds.
    ///
    ///   courtside ingest --season 2021-22
    ///   courtside ingest --season 2020-21 --season 2021-22 --concurrency 2
    Ingest(IngestArgs),

    /// Rebuild team_game_aggregates and team_game_features.
    Transform,

    /// Ingest, then transform.
    Run(IngestArgs),

    /// Read team-game feature rows.
    ///
    ///   courtside features --team MIL --min-rest 0 --max-rest 5
    Features(FeaturesArgs),

    /// Run SQL queries against the DuckDB warehouse.
    ///
    /// Read-only by default; use --write for data modifications.
    ///
    ///   courtside sql "SELECT rest_days, win_rate FROM vw_rest_day_summary"
    Sql(SqlArgs),

    /// Show table counts and applied migrations.
    Status,
}

/// Arguments shared by `ingest` and `run`.
#[derive(Debug, Clone, Args)]
pub struct IngestArgs {
    /// Season to fetch (e.g. 2021-22). Repeat for several; defaults to the configured list.
    #[arg(long = "season")]
    pub seasons: Vec<String>,

    /// Delete already loaded rows of the fetched seasons before loading.
    #[arg(long, default_value_t = false)]
    pub replace_seasons: bool,

    /// Number of seasons fetched at once.
    #[arg(long)]
    pub concurrency: Option<usize>,
}

/// Arguments for the `features` command.
#[derive(Debug, Clone, Args)]
pub struct FeaturesArgs {
    /// Team abbreviation, e.g. BOS.
    #[arg(long)]
    pub team: Option<String>,

    /// Minimum rest days (inclusive).
    #[arg(long)]
    pub min_rest: Option<i64>,

    /// Maximum rest days (inclusive).
    #[arg(long)]
    pub max_rest: Option<i64>,

    /// Maximum number of rows to return.
    #[arg(long)]
    pub limit: Option<usize>,
}

/// Arguments for the `sql` command.
#[derive(Debug, Clone, Args)]
pub struct SqlArgs {
    /// SQL query to execute.
    pub query: String,

    /// Allow write operations (INSERT, UPDATE, DELETE, CREATE, etc.).
    #[arg(long, default_value_t = false)]
    pub write: bool,

    /// Maximum number of rows to return.
    #[arg(long, default_value_t = 10_000)]
    pub max_rows: usize,

    /// Query timeout in milliseconds.
    #[arg(long, default_value_t = 5_000)]
    pub query_timeout_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_repeated_seasons_and_global_flags() {
        let cli = Cli::try_parse_from([
            "courtside",
            "run",
            "--season",
            "2020-21",
            "--season",
            "2021-22",
            "--concurrency",
            "2",
            "--max-attempts",
            "3",
            "--pretty",
        ])
        .expect("parse");

        assert!(cli.pretty);
        assert_eq!(cli.max_attempts, Some(3));
        match cli.command {
            Command::Run(args) => {
                assert_eq!(args.seasons, vec!["2020-21", "2021-22"]);
                assert_eq!(args.concurrency, Some(2));
                assert!(!args.replace_seasons);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn parses_feature_filters() {
        let cli = Cli::try_parse_from([
            "courtside",
            "features",
            "--team",
            "BOS",
            "--min-rest",
            "0",
            "--max-rest",
            "5",
        ])
        .expect("parse");

        match cli.command {
            Command::Features(args) => {
                assert_eq!(args.team.as_deref(), Some("BOS"));
                assert_eq!(args.min_rest, Some(0));
                assert_eq!(args.max_rest, Some(5));
                assert_eq!(args.limit, None);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn sql_requires_a_query() {
        assert!(Cli::try_parse_from(["courtside", "sql"]).is_err());
    }
}
