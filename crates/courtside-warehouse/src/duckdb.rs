//! `DuckDB` connection pool management.
//!
//! The database file is opened exactly once per pool. Every pooled handle is a
//! `try_clone` of that root connection, so all handles share one database
//! instance and observe each other's committed writes.

use std::ops::{Deref, DerefMut};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use ::duckdb::Connection;

/// Access mode for database connections.
///
/// `DuckDB` fixes the access mode per database instance, so the mode only
/// partitions the pool. Read-only semantics are enforced by the query layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessMode {
    ReadOnly,
    ReadWrite,
}

#[derive(Default)]
struct PoolState {
    read_only: Vec<Connection>,
    read_write: Vec<Connection>,
}

impl PoolState {
    fn slot(&mut self, mode: AccessMode) -> &mut Vec<Connection> {
        match mode {
            AccessMode::ReadOnly => &mut self.read_only,
            AccessMode::ReadWrite => &mut self.read_write,
        }
    }
}

struct PoolInner {
    db_path: PathBuf,
    max_pool_size: usize,
    root: Mutex<Connection>,
    state: Mutex<PoolState>,
}

impl PoolInner {
    fn state(&self) -> MutexGuard<'_, PoolState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// A connection pool manager for a single `DuckDB` database file.
#[derive(Clone)]
pub struct DuckDbConnectionManager {
    inner: Arc<PoolInner>,
}

impl DuckDbConnectionManager {
    /// Open the database file and create a pool around it.
    ///
    /// # Errors
    /// Returns an error if the database file cannot be opened or configured.
    pub fn open(path: impl Into<PathBuf>, max_pool_size: usize) -> Result<Self, ::duckdb::Error> {
        let db_path = path.into();
        let root = Connection::open(db_path.as_path())?;
        configure_connection(&root)?;

        Ok(Self {
            inner: Arc::new(PoolInner {
                db_path,
                max_pool_size: max_pool_size.max(1),
                root: Mutex::new(root),
                state: Mutex::new(PoolState::default()),
            }),
        })
    }

    /// Acquire a connection from the pool, cloning a new handle when the pool is empty.
    ///
    /// # Errors
    /// Returns an error if a new handle cannot be created or configured.
    pub fn acquire(&self, mode: AccessMode) -> Result<PooledConnection, ::duckdb::Error> {
        let pooled = self.inner.state().slot(mode).pop();

        let connection = match pooled {
            Some(connection) => connection,
            None => {
                let root = self.inner.root.lock().unwrap_or_else(PoisonError::into_inner);
                let connection = root.try_clone()?;
                drop(root);
                configure_connection(&connection)?;
                connection
            }
        };

        Ok(PooledConnection {
            mode,
            pool: Arc::clone(&self.inner),
            connection: Some(connection),
        })
    }

    /// Number of idle connections currently held for `mode`.
    #[must_use]
    pub fn idle_connections(&self, mode: AccessMode) -> usize {
        self.inner.state().slot(mode).len()
    }

    /// Get the path to the database file.
    #[must_use]
    pub fn db_path(&self) -> &Path {
        self.inner.db_path.as_path()
    }
}

/// A pooled connection that returns to the pool when dropped.
pub struct PooledConnection {
    mode: AccessMode,
    pool: Arc<PoolInner>,
    connection: Option<Connection>,
}

impl PooledConnection {
    pub const fn mode(&self) -> AccessMode {
        self.mode
    }
}

impl Deref for PooledConnection {
    type Target = Connection;

    fn deref(&self) -> &Self::Target {
        // Only `Drop` takes the connection out.
        self.connection
            .as_ref()
            .expect("pooled connection is present until drop")
    }
}

impl DerefMut for PooledConnection {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.connection
            .as_mut()
            .expect("pooled connection is present until drop")
    }
}

impl Drop for PooledConnection {
    fn drop(&mut self) {
        let Some(connection) = self.connection.take() else {
            return;
        };

        let mut state = self.pool.state();
        let slot = state.slot(self.mode);
        if slot.len() < self.pool.max_pool_size {
            slot.push(connection);
        }
    }
}

fn configure_connection(connection: &Connection) -> Result<(), ::duckdb::Error> {
    connection.execute_batch("PRAGMA disable_progress_bar;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn released_connections_return_to_their_mode_slot() {
        let temp = tempdir().expect("tempdir");
        let manager =
            DuckDbConnectionManager::open(temp.path().join("pool.duckdb"), 2).expect("open");

        {
            let _reader = manager.acquire(AccessMode::ReadOnly).expect("reader");
            let _writer = manager.acquire(AccessMode::ReadWrite).expect("writer");
        }

        assert_eq!(manager.idle_connections(AccessMode::ReadOnly), 1);
        assert_eq!(manager.idle_connections(AccessMode::ReadWrite), 1);
    }

    #[test]
    fn cloned_handles_see_committed_writes() {
        let temp = tempdir().expect("tempdir");
        let manager =
            DuckDbConnectionManager::open(temp.path().join("pool.duckdb"), 2).expect("open");

        let reader = manager.acquire(AccessMode::ReadOnly).expect("reader");
        let writer = manager.acquire(AccessMode::ReadWrite).expect("writer");
        writer
            .execute_batch("CREATE TABLE t (id INTEGER); INSERT INTO t VALUES (1), (2);")
            .expect("write");

        let count: i64 = reader
            .query_row("SELECT COUNT(*) FROM t", [], |row| row.get(0))
            .expect("count");
        assert_eq!(count, 2);
    }
}
