//! Housework record routes.
//!
//! Writes follow one order: validate the body, upload any photo, then
//! resolve the contributor and persist inside a single transaction. A failed
//! upload therefore never leaves a row behind.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect},
    routing::{delete, get, post, put},
    Json, Router,
};
use chorelog_common::{Error, RecordId};
use chorelog_db::{
    models::{NewRecord, Record, RecordChanges},
    pool::get_conn,
    queries::{contributors, records},
};
use serde::Serialize;
use utoipa::ToSchema;

use super::error::AppError;
use super::pagination::{Page, PageQuery, PageRequest};
use super::payload::{FormData, ImageField, RecordPayload};
use super::routes_contributors::ContributorResponse;
use super::{parse_id, AppContext};
use crate::storage::parse_reference;

/// Create record routes.
pub fn record_routes() -> Router<AppContext> {
    Router::new()
        .route("/records/", get(list_records).post(create_record))
        .route("/records/add/", post(create_record))
        .route(
            "/records/:id/",
            get(get_record)
                .put(update_record)
                .patch(update_record)
                .delete(delete_record),
        )
        .route("/records/:id/update/", put(update_record).patch(update_record))
        .route("/records/:id/delete/", delete(delete_record))
        .route("/records/:id/image/", get(get_record_image))
}

// ============================================================================
// Response types
// ============================================================================

/// A logged chore.
#[derive(Debug, Serialize, ToSchema)]
pub struct RecordResponse {
    pub id: i64,
    pub contributor: ContributorResponse,
    /// When the record was created (RFC 3339)
    pub record_time: String,
    pub points: i64,
    pub note: String,
    /// Stored image reference (`bucket/key`), if any
    pub image: Option<String>,
}

impl From<Record> for RecordResponse {
    fn from(record: Record) -> Self {
        Self {
            id: record.id.get(),
            contributor: record.contributor.into(),
            record_time: record
                .record_time
                .to_rfc3339_opts(chrono::SecondsFormat::Micros, true),
            points: record.points,
            note: record.note,
            image: record.image,
        }
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// List records, newest first.
#[utoipa::path(
    get,
    path = "/api/records/",
    tag = "records",
    params(
        ("page" = Option<u32>, Query, description = "1-based page number"),
        ("page_size" = Option<u32>, Query, description = "Items per page")
    ),
    responses(
        (status = 200, description = "One page of records", body = super::openapi::RecordPageSchema),
        (status = 400, description = "Invalid pagination parameters"),
        (status = 404, description = "Page out of range")
    )
)]
pub async fn list_records(
    State(ctx): State<AppContext>,
    Query(query): Query<PageQuery>,
) -> Result<Json<Page<RecordResponse>>, AppError> {
    let request = PageRequest::from_query(&query, &ctx.config.pagination)?;
    let conn = get_conn(&ctx.db)?;

    let count = records::count_records(&conn)?;
    request.check_in_range(count)?;
    let items = records::list_records(&conn, request.offset(), request.limit())?;

    Ok(Json(
        Page::new(request, count, items).map(RecordResponse::from),
    ))
}

/// Create a record, creating its contributor by name when needed.
#[utoipa::path(
    post,
    path = "/api/records/",
    tag = "records",
    request_body(
        content = super::openapi::RecordWriteSchema,
        description = "JSON or multipart/form-data; `image` may be a file part"
    ),
    responses(
        (status = 201, description = "Record created", body = RecordResponse),
        (status = 400, description = "Field validation errors"),
        (status = 502, description = "Object storage unavailable")
    )
)]
pub async fn create_record(
    State(ctx): State<AppContext>,
    form: FormData,
) -> Result<impl IntoResponse, AppError> {
    let payload = RecordPayload::for_create(form)?;
    let name = payload
        .contributor_name
        .ok_or_else(|| Error::field("contributor_name", super::payload::REQUIRED))?;

    let image = match payload.image {
        ImageField::Upload(upload) => Some(ctx.images.store_upload(upload).await?),
        ImageField::Reference(reference) => Some(reference),
        ImageField::Absent | ImageField::Clear => None,
    };

    let mut conn = get_conn(&ctx.db)?;
    let tx = conn.transaction()?;

    let (contributor, created) = contributors::get_or_create_contributor(&tx, &name)?;
    if created {
        tracing::info!("Created contributor {} ({})", contributor.name, contributor.id);
    }

    let record = records::create_record(
        &tx,
        &NewRecord {
            contributor_id: contributor.id,
            points: payload.points.unwrap_or(chorelog_db::models::DEFAULT_POINTS),
            note: payload.note.unwrap_or_default(),
            image,
        },
    )?;
    tx.commit()?;

    tracing::debug!("Created record {} for {}", record.id, record.contributor.name);
    Ok((StatusCode::CREATED, Json(RecordResponse::from(record))))
}

/// Get a record by ID.
#[utoipa::path(
    get,
    path = "/api/records/{id}/",
    tag = "records",
    params(("id" = i64, Path, description = "Record ID")),
    responses(
        (status = 200, description = "Record details", body = RecordResponse),
        (status = 404, description = "Record not found")
    )
)]
pub async fn get_record(
    State(ctx): State<AppContext>,
    Path(id): Path<String>,
) -> Result<Json<RecordResponse>, AppError> {
    let id: RecordId = parse_id(&id)?;
    let conn = get_conn(&ctx.db)?;

    let record = records::get_record(&conn, id)?
        .ok_or_else(|| Error::not_found(format!("record {}", id)))?;
    Ok(Json(record.into()))
}

/// Partially update a record.
///
/// Omitted fields keep their stored values. A new photo replaces the stored
/// reference; the previous object stays in the bucket.
#[utoipa::path(
    put,
    path = "/api/records/{id}/",
    tag = "records",
    params(("id" = i64, Path, description = "Record ID")),
    request_body(
        content = super::openapi::RecordWriteSchema,
        description = "Any subset of the record fields"
    ),
    responses(
        (status = 200, description = "Updated record", body = RecordResponse),
        (status = 400, description = "Field validation errors"),
        (status = 404, description = "Record not found"),
        (status = 502, description = "Object storage unavailable")
    )
)]
pub async fn update_record(
    State(ctx): State<AppContext>,
    Path(id): Path<String>,
    form: FormData,
) -> Result<Json<RecordResponse>, AppError> {
    let id: RecordId = parse_id(&id)?;
    let payload = RecordPayload::for_update(form)?;

    // Scoped so the connection goes back to the pool before the upload.
    let previous_image = {
        let conn = get_conn(&ctx.db)?;
        records::get_record(&conn, id)?
            .ok_or_else(|| Error::not_found(format!("record {}", id)))?
            .image
    };

    let image = match payload.image {
        ImageField::Absent => None,
        ImageField::Clear => Some(None),
        ImageField::Reference(reference) => Some(Some(reference)),
        ImageField::Upload(upload) => Some(Some(ctx.images.store_upload(upload).await?)),
    };

    let mut conn = get_conn(&ctx.db)?;
    let tx = conn.transaction()?;

    let contributor_id = match payload.contributor_name {
        Some(name) => {
            let (contributor, created) = contributors::get_or_create_contributor(&tx, &name)?;
            if created {
                tracing::info!("Created contributor {} ({})", contributor.name, contributor.id);
            }
            Some(contributor.id)
        }
        None => None,
    };

    let replaced = matches!(&image, Some(new) if *new != previous_image);

    let record = records::update_record(
        &tx,
        id,
        &RecordChanges {
            contributor_id,
            points: payload.points,
            note: payload.note,
            image,
        },
    )?;
    tx.commit()?;

    if replaced {
        if let Some(old) = previous_image {
            tracing::debug!("Record {} no longer references {}; object left in place", id, old);
        }
    }

    Ok(Json(record.into()))
}

/// Delete a record.
#[utoipa::path(
    delete,
    path = "/api/records/{id}/",
    tag = "records",
    params(("id" = i64, Path, description = "Record ID")),
    responses(
        (status = 204, description = "Record deleted"),
        (status = 404, description = "Record not found")
    )
)]
pub async fn delete_record(
    State(ctx): State<AppContext>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let id: RecordId = parse_id(&id)?;
    let conn = get_conn(&ctx.db)?;

    if records::delete_record(&conn, id)? {
        tracing::debug!("Deleted record {}", id);
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(Error::not_found(format!("record {}", id)).into())
    }
}

/// Redirect to a downloadable URL for the record's photo.
#[utoipa::path(
    get,
    path = "/api/records/{id}/image/",
    tag = "records",
    params(("id" = i64, Path, description = "Record ID")),
    responses(
        (status = 307, description = "Redirect to the image URL"),
        (status = 404, description = "Record not found, has no image, or its image is not in the photo bucket"),
        (status = 502, description = "Object storage unavailable")
    )
)]
pub async fn get_record_image(
    State(ctx): State<AppContext>,
    Path(id): Path<String>,
) -> Result<Redirect, AppError> {
    let id: RecordId = parse_id(&id)?;
    let reference = {
        let conn = get_conn(&ctx.db)?;
        records::get_record(&conn, id)?
            .and_then(|record| record.image)
            .ok_or_else(|| Error::not_found(format!("image for record {}", id)))?
    };

    // Only objects in the photo bucket are presigned. Verbatim URLs and
    // references into other buckets are never followed.
    let (bucket, key) = parse_reference(&reference)
        .filter(|(bucket, _)| *bucket == ctx.images.bucket())
        .ok_or_else(|| {
            tracing::debug!("Refusing to serve image reference '{}' for record {}", reference, id);
            Error::not_found(format!("image reference '{}'", reference))
        })?;
    let url = ctx.store.url_for(bucket, key).await?;
    Ok(Redirect::temporary(&url))
}
