//! Housework record database queries.
//!
//! Every read joins the owning contributor so callers always get a fully
//! resolved [`Record`]. Listings are newest first; ties on `record_time`
//! fall back to the higher id.

use chorelog_common::{ContributorId, Error, RecordId, Result};
use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, Row};

use super::{db_err, format_timestamp, parse_timestamp};
use crate::models::{Contributor, NewRecord, Record, RecordChanges};

const SELECT_RECORD: &str = "SELECT r.id, r.record_time, r.points, r.note, r.image, c.id, c.name
     FROM records r
     JOIN contributors c ON c.id = r.contributor_id";

fn record_from_row(row: &Row<'_>) -> rusqlite::Result<Record> {
    let record_time: String = row.get(1)?;
    Ok(Record {
        id: RecordId::from(row.get::<_, i64>(0)?),
        record_time: parse_timestamp(1, &record_time)?,
        points: row.get(2)?,
        note: row.get(3)?,
        image: row.get(4)?,
        contributor: Contributor {
            id: ContributorId::from(row.get::<_, i64>(5)?),
            name: row.get(6)?,
        },
    })
}

/// Insert a record stamped with the current time.
///
/// # Returns
///
/// * `Ok(Record)` - The created record with its contributor
/// * `Err(Error::NotFound)` - If the contributor does not exist
pub fn create_record(conn: &Connection, new: &NewRecord) -> Result<Record> {
    let record_time = Utc::now();

    conn.execute(
        "INSERT INTO records (contributor_id, record_time, points, note, image)
         VALUES (:contributor_id, :record_time, :points, :note, :image)",
        rusqlite::named_params! {
            ":contributor_id": new.contributor_id.get(),
            ":record_time": format_timestamp(&record_time),
            ":points": new.points,
            ":note": new.note,
            ":image": new.image,
        },
    )
    .map_err(|e| match e {
        rusqlite::Error::SqliteFailure(ref f, _)
            if f.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY =>
        {
            Error::not_found(format!("contributor {}", new.contributor_id))
        }
        other => db_err(other),
    })?;

    let id = RecordId::from(conn.last_insert_rowid());
    get_record(conn, id)?
        .ok_or_else(|| Error::internal(format!("record {} missing after insert", id)))
}

/// Get a record by ID.
///
/// # Returns
///
/// * `Ok(Some(Record))` - The record if found
/// * `Ok(None)` - If the record does not exist
pub fn get_record(conn: &Connection, id: RecordId) -> Result<Option<Record>> {
    conn.query_row(
        &format!("{} WHERE r.id = :id", SELECT_RECORD),
        rusqlite::named_params! { ":id": id.get() },
        record_from_row,
    )
    .optional()
    .map_err(db_err)
}

/// List records, newest first.
pub fn list_records(conn: &Connection, offset: i64, limit: i64) -> Result<Vec<Record>> {
    let mut stmt = conn
        .prepare(&format!(
            "{} ORDER BY r.record_time DESC, r.id DESC LIMIT :limit OFFSET :offset",
            SELECT_RECORD
        ))
        .map_err(db_err)?;

    let records = stmt
        .query_map(
            rusqlite::named_params! { ":limit": limit, ":offset": offset },
            record_from_row,
        )
        .map_err(db_err)?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(db_err)?;

    Ok(records)
}

/// Total number of records.
pub fn count_records(conn: &Connection) -> Result<i64> {
    conn.query_row("SELECT COUNT(*) FROM records", [], |row| row.get(0))
        .map_err(db_err)
}

/// List one contributor's records, newest first.
pub fn list_records_for_contributor(
    conn: &Connection,
    contributor_id: ContributorId,
    offset: i64,
    limit: i64,
) -> Result<Vec<Record>> {
    let mut stmt = conn
        .prepare(&format!(
            "{} WHERE r.contributor_id = :contributor_id
             ORDER BY r.record_time DESC, r.id DESC LIMIT :limit OFFSET :offset",
            SELECT_RECORD
        ))
        .map_err(db_err)?;

    let records = stmt
        .query_map(
            rusqlite::named_params! {
                ":contributor_id": contributor_id.get(),
                ":limit": limit,
                ":offset": offset,
            },
            record_from_row,
        )
        .map_err(db_err)?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(db_err)?;

    Ok(records)
}

/// Number of records owned by a contributor.
pub fn count_records_for_contributor(conn: &Connection, contributor_id: ContributorId) -> Result<i64> {
    conn.query_row(
        "SELECT COUNT(*) FROM records WHERE contributor_id = :contributor_id",
        rusqlite::named_params! { ":contributor_id": contributor_id.get() },
        |row| row.get(0),
    )
    .map_err(db_err)
}

/// Apply a partial update to a record.
///
/// Columns whose change is `None` keep their stored value. `record_time` is
/// never modified.
///
/// # Returns
///
/// * `Ok(Record)` - The record after the update
/// * `Err(Error::NotFound)` - If the record does not exist
pub fn update_record(conn: &Connection, id: RecordId, changes: &RecordChanges) -> Result<Record> {
    let current =
        get_record(conn, id)?.ok_or_else(|| Error::not_found(format!("record {}", id)))?;

    if changes.is_empty() {
        return Ok(current);
    }

    let contributor_id = changes.contributor_id.unwrap_or(current.contributor.id);
    let points = changes.points.unwrap_or(current.points);
    let note = changes.note.as_deref().unwrap_or(current.note.as_str());
    let image = match &changes.image {
        Some(image) => image.as_deref(),
        None => current.image.as_deref(),
    };

    conn.execute(
        "UPDATE records
         SET contributor_id = :contributor_id, points = :points, note = :note, image = :image
         WHERE id = :id",
        rusqlite::named_params! {
            ":id": id.get(),
            ":contributor_id": contributor_id.get(),
            ":points": points,
            ":note": note,
            ":image": image,
        },
    )
    .map_err(db_err)?;

    get_record(conn, id)?.ok_or_else(|| Error::not_found(format!("record {}", id)))
}

/// Delete a record.
///
/// # Returns
///
/// * `Ok(true)` - If the record was deleted
/// * `Ok(false)` - If the record did not exist
pub fn delete_record(conn: &Connection, id: RecordId) -> Result<bool> {
    let rows_affected = conn
        .execute(
            "DELETE FROM records WHERE id = :id",
            rusqlite::named_params! { ":id": id.get() },
        )
        .map_err(db_err)?;

    Ok(rows_affected > 0)
}
