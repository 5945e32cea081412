//! Embedded schema migrations.
//!
//! Each step is a SQL script compiled into the binary. A step's version is
//! its position in [`STEPS`] (starting at 1), and the applied version lives
//! in SQLite's `user_version` header field, so no bookkeeping table is
//! needed. Steps run in order, each in its own transaction together with the
//! version bump.

use rusqlite::Connection;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MigrationError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Migration {version} ({name}) failed: {source}")]
    Step {
        version: usize,
        name: &'static str,
        #[source]
        source: rusqlite::Error,
    },

    #[error("Database schema version {found} is newer than this build supports ({latest})")]
    NewerSchema { found: usize, latest: usize },
}

/// Ordered migration scripts as `(name, sql)`.
const STEPS: &[(&str, &str)] = &[("initial", include_str!("001_initial.sql"))];

fn read_user_version(conn: &Connection) -> rusqlite::Result<usize> {
    let version: i64 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;
    Ok(usize::try_from(version).unwrap_or(0))
}

/// Bring the schema up to [`latest_version`].
///
/// Returns the number of steps applied; zero when the schema is current.
/// A database written by a newer build is refused rather than modified.
pub fn run_migrations(conn: &Connection) -> Result<usize, MigrationError> {
    let found = read_user_version(conn)?;
    let latest = latest_version();
    if found > latest {
        return Err(MigrationError::NewerSchema { found, latest });
    }

    for (index, &(name, sql)) in STEPS.iter().enumerate().skip(found) {
        let version = index + 1;
        let step_err = |source| MigrationError::Step {
            version,
            name,
            source,
        };

        let tx = conn.unchecked_transaction()?;
        tx.execute_batch(sql).map_err(step_err)?;
        // PRAGMA arguments cannot be bound as parameters.
        tx.execute_batch(&format!("PRAGMA user_version = {}", version))
            .map_err(step_err)?;
        tx.commit().map_err(step_err)?;
    }

    Ok(latest - found)
}

/// Schema version recorded in the database.
pub fn current_version(conn: &Connection) -> Result<usize, MigrationError> {
    Ok(read_user_version(conn)?)
}

/// Version the schema reaches after every embedded step has run.
pub fn latest_version() -> usize {
    STEPS.len()
}
