use thiserror::Error;

/// Errors that can occur during warehouse operations.
///
/// Engine and file-system failures pass through unchanged.
#[derive(Debug, Error)]
pub enum WarehouseError {
    /// `DuckDB` database error.
    #[error(transparent)]
    DuckDb(#[from] ::duckdb::Error),

    /// I/O error (file system operations).
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Query was rejected due to policy violation.
    #[error("query rejected: {0}")]
    QueryRejected(String),

    /// Query execution timed out.
    #[error("query timed out after {timeout_ms}ms")]
    QueryTimeout { timeout_ms: u64 },

    /// Materialized features violate an ordering invariant.
    #[error("feature integrity check failed: {0}")]
    FeatureIntegrity(String),
}
