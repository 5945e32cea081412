//! Contributor database queries.
//!
//! Names are unique. [`get_or_create_contributor`] is the only write path
//! used by record creation, and it is safe under concurrent callers: the
//! insert is a no-op when the name already exists and the row is then read
//! back, so racing requests converge on a single contributor.

use chorelog_common::{ContributorId, Error, Result};
use rusqlite::{Connection, OptionalExtension, Row};

use super::{db_err, is_unique_violation};
use crate::models::Contributor;

const NAME_TAKEN: &str = "contributor with this name already exists.";

fn contributor_from_row(row: &Row<'_>) -> rusqlite::Result<Contributor> {
    Ok(Contributor {
        id: ContributorId::from(row.get::<_, i64>(0)?),
        name: row.get(1)?,
    })
}

/// Create a new contributor.
///
/// # Returns
///
/// * `Ok(Contributor)` - The created contributor
/// * `Err(Error::Conflict)` - If the name is already taken
/// * `Err(Error)` - If a database error occurs
pub fn create_contributor(conn: &Connection, name: &str) -> Result<Contributor> {
    conn.execute(
        "INSERT INTO contributors (name) VALUES (:name)",
        rusqlite::named_params! { ":name": name },
    )
    .map_err(|e| {
        if is_unique_violation(&e) {
            Error::conflict("name", NAME_TAKEN)
        } else {
            db_err(e)
        }
    })?;

    Ok(Contributor {
        id: ContributorId::from(conn.last_insert_rowid()),
        name: name.to_string(),
    })
}

/// Get a contributor by ID.
///
/// # Returns
///
/// * `Ok(Some(Contributor))` - The contributor if found
/// * `Ok(None)` - If the contributor does not exist
pub fn get_contributor(conn: &Connection, id: ContributorId) -> Result<Option<Contributor>> {
    conn.query_row(
        "SELECT id, name FROM contributors WHERE id = :id",
        rusqlite::named_params! { ":id": id.get() },
        contributor_from_row,
    )
    .optional()
    .map_err(db_err)
}

/// Look up a contributor by exact name.
pub fn find_contributor_by_name(conn: &Connection, name: &str) -> Result<Option<Contributor>> {
    conn.query_row(
        "SELECT id, name FROM contributors WHERE name = :name",
        rusqlite::named_params! { ":name": name },
        contributor_from_row,
    )
    .optional()
    .map_err(db_err)
}

/// Resolve a contributor by name, creating it when absent.
///
/// # Returns
///
/// * `Ok((Contributor, true))` - A new contributor was inserted
/// * `Ok((Contributor, false))` - An existing contributor was reused
pub fn get_or_create_contributor(conn: &Connection, name: &str) -> Result<(Contributor, bool)> {
    let inserted = conn
        .execute(
            "INSERT INTO contributors (name) VALUES (:name) ON CONFLICT(name) DO NOTHING",
            rusqlite::named_params! { ":name": name },
        )
        .map_err(db_err)?;

    let contributor = find_contributor_by_name(conn, name)?.ok_or_else(|| {
        Error::internal(format!("contributor '{}' vanished after get-or-create", name))
    })?;

    Ok((contributor, inserted == 1))
}

/// List contributors ordered by name.
pub fn list_contributors(conn: &Connection, offset: i64, limit: i64) -> Result<Vec<Contributor>> {
    let mut stmt = conn
        .prepare(
            "SELECT id, name FROM contributors
             ORDER BY name, id
             LIMIT :limit OFFSET :offset",
        )
        .map_err(db_err)?;

    let contributors = stmt
        .query_map(
            rusqlite::named_params! { ":limit": limit, ":offset": offset },
            contributor_from_row,
        )
        .map_err(db_err)?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(db_err)?;

    Ok(contributors)
}

/// Total number of contributors.
pub fn count_contributors(conn: &Connection) -> Result<i64> {
    conn.query_row("SELECT COUNT(*) FROM contributors", [], |row| row.get(0))
        .map_err(db_err)
}

/// Rename a contributor.
///
/// # Returns
///
/// * `Ok(Contributor)` - The renamed contributor
/// * `Err(Error::NotFound)` - If the contributor does not exist
/// * `Err(Error::Conflict)` - If another contributor already has the name
pub fn rename_contributor(conn: &Connection, id: ContributorId, name: &str) -> Result<Contributor> {
    let rows_affected = conn
        .execute(
            "UPDATE contributors SET name = :name WHERE id = :id",
            rusqlite::named_params! { ":id": id.get(), ":name": name },
        )
        .map_err(|e| {
            if is_unique_violation(&e) {
                Error::conflict("name", NAME_TAKEN)
            } else {
                db_err(e)
            }
        })?;

    if rows_affected == 0 {
        return Err(Error::not_found(format!("contributor {}", id)));
    }

    Ok(Contributor {
        id,
        name: name.to_string(),
    })
}

/// Delete a contributor (cascades to its records).
///
/// # Returns
///
/// * `Ok(true)` - If the contributor was deleted
/// * `Ok(false)` - If the contributor did not exist
pub fn delete_contributor(conn: &Connection, id: ContributorId) -> Result<bool> {
    let rows_affected = conn
        .execute(
            "DELETE FROM contributors WHERE id = :id",
            rusqlite::named_params! { ":id": id.get() },
        )
        .map_err(db_err)?;

    Ok(rows_affected > 0)
}
