//! Database connection pool management.
//!
//! Connection pooling for SQLite using r2d2. Every connection handed out by
//! the pool has foreign keys enabled, which is what makes contributor deletes
//! cascade to their records.

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use chorelog_common::{Error, Result};

use crate::migrations;

/// Type alias for the database connection pool.
pub type DbPool = Pool<SqliteConnectionManager>;

/// Type alias for a pooled database connection.
pub type PooledConnection = r2d2::PooledConnection<SqliteConnectionManager>;

/// Default number of pooled connections.
const POOL_SIZE: u32 = 4;

/// Initialize a new database pool with the given file path.
///
/// Creates the SQLite file if needed, enables foreign keys and a busy timeout
/// on every connection, and runs pending migrations.
///
/// # Example
///
/// ```no_run
/// use chorelog_db::pool::init_pool;
///
/// let pool = init_pool("/var/lib/chorelog/chorelog.db").unwrap();
/// let conn = pool.get().unwrap();
/// ```
pub fn init_pool(db_path: &str) -> Result<DbPool> {
    let manager = SqliteConnectionManager::file(db_path).with_init(|conn| {
        conn.execute_batch("PRAGMA foreign_keys = ON; PRAGMA busy_timeout = 5000;")
    });

    build_pool(manager, POOL_SIZE)
}

/// Initialize an in-memory database pool for testing.
///
/// The pool holds a single connection: every SQLite `:memory:` connection is
/// its own database, so a larger pool would hand out empty schemas.
///
/// # Example
///
/// ```
/// use chorelog_db::pool::init_memory_pool;
///
/// let pool = init_memory_pool().unwrap();
/// let conn = pool.get().unwrap();
/// ```
pub fn init_memory_pool() -> Result<DbPool> {
    let manager = SqliteConnectionManager::memory()
        .with_init(|conn| conn.execute_batch("PRAGMA foreign_keys = ON;"));

    build_pool(manager, 1)
}

fn build_pool(manager: SqliteConnectionManager, size: u32) -> Result<DbPool> {
    let pool = Pool::builder()
        .max_size(size)
        .build(manager)
        .map_err(|e| Error::database(format!("Failed to create connection pool: {}", e)))?;

    let conn = pool
        .get()
        .map_err(|e| Error::database(format!("Failed to get connection for migrations: {}", e)))?;

    migrations::run_migrations(&conn)
        .map_err(|e| Error::database(format!("Failed to run migrations: {}", e)))?;

    Ok(pool)
}

/// Get a connection from the pool.
///
/// Convenience wrapper around `pool.get()` that converts the r2d2 error into
/// the common Error type.
pub fn get_conn(pool: &DbPool) -> Result<PooledConnection> {
    pool.get()
        .map_err(|e| Error::database(format!("Failed to get connection from pool: {}", e)))
}
