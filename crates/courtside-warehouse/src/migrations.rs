use ::duckdb::{params, Connection};

/// Version tag of the raw player game log table layout.
pub const RAW_TABLE_VERSION: &str = "0001_player_game_logs";

struct Migration {
    version: &'static str,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        version: RAW_TABLE_VERSION,
        sql: r#"
CREATE TABLE IF NOT EXISTS player_game_logs (
    season TEXT NOT NULL,
    game_id TEXT NOT NULL,
    game_date DATE NOT NULL,
    team_id BIGINT,
    team_abbr TEXT NOT NULL,
    matchup TEXT,
    player_id BIGINT NOT NULL,
    player_name TEXT NOT NULL,
    minutes DOUBLE,
    points BIGINT,
    rebounds BIGINT,
    assists BIGINT,
    plus_minus DOUBLE,
    win_loss TEXT NOT NULL,
    ingested_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
);
"#,
    },
    Migration {
        version: "0002_ingest_log",
        sql: r#"
CREATE TABLE IF NOT EXISTS ingest_log (
    run_id TEXT NOT NULL,
    season TEXT NOT NULL,
    load_mode TEXT NOT NULL,
    record_count BIGINT NOT NULL,
    status TEXT NOT NULL,
    timestamp TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
);
"#,
    },
    Migration {
        version: "0003_indexes",
        sql: r#"
CREATE INDEX IF NOT EXISTS idx_player_game_logs_season ON player_game_logs(season);
CREATE INDEX IF NOT EXISTS idx_player_game_logs_team_game ON player_game_logs(team_abbr, game_id);
CREATE INDEX IF NOT EXISTS idx_ingest_log_run ON ingest_log(run_id);
"#,
    },
];

/// Apply every migration that is not yet recorded in `schema_migrations`.
///
/// Returns the versions applied by this call, in order.
pub fn apply_migrations(connection: &Connection) -> Result<Vec<&'static str>, ::duckdb::Error> {
    connection.execute_batch(
        r#"
CREATE TABLE IF NOT EXISTS schema_migrations (
    version TEXT PRIMARY KEY,
    applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
);
"#,
    )?;

    let mut applied = Vec::new();
    for migration in MIGRATIONS {
        let applied_count: i64 = connection.query_row(
            "SELECT COUNT(*) FROM schema_migrations WHERE version = ?",
            params![migration.version],
            |row| row.get(0),
        )?;

        if applied_count == 0 {
            connection.execute_batch(migration.sql)?;
            connection.execute(
                "INSERT INTO schema_migrations (version) VALUES (?)",
                params![migration.version],
            )?;
            applied.push(migration.version);
        }
    }

    Ok(applied)
}

/// Versions recorded in `schema_migrations`, oldest first.
pub fn applied_versions(connection: &Connection) -> Result<Vec<String>, ::duckdb::Error> {
    let mut statement =
        connection.prepare("SELECT version FROM schema_migrations ORDER BY version")?;
    let rows = statement.query_map([], |row| row.get::<_, String>(0))?;
    rows.collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migrations_apply_once() {
        let connection = Connection::open_in_memory().expect("in-memory db");

        let first = apply_migrations(&connection).expect("first pass");
        let second = apply_migrations(&connection).expect("second pass");

        assert_eq!(first.len(), MIGRATIONS.len());
        assert!(second.is_empty());
        assert_eq!(
            applied_versions(&connection).expect("versions"),
            vec!["0001_player_game_logs", "0002_ingest_log", "0003_indexes"]
        );
    }
}
