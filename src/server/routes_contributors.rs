//! Contributor routes.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post, put},
    Json, Router,
};
use chorelog_common::{ContributorId, Error};
use chorelog_db::{
    models::Contributor,
    pool::get_conn,
    queries::{contributors, records},
};
use serde::Serialize;
use utoipa::ToSchema;

use super::error::AppError;
use super::pagination::{Page, PageQuery, PageRequest};
use super::payload::{ContributorPayload, FormData, REQUIRED};
use super::routes_records::RecordResponse;
use super::{parse_id, AppContext};

/// Create contributor routes.
pub fn contributor_routes() -> Router<AppContext> {
    Router::new()
        .route("/contributors/", get(list_contributors).post(create_contributor))
        .route("/contributors/add/", post(create_contributor))
        .route(
            "/contributors/:id/",
            get(get_contributor)
                .put(replace_contributor)
                .patch(patch_contributor)
                .delete(delete_contributor),
        )
        .route(
            "/contributors/:id/update/",
            put(replace_contributor).patch(patch_contributor),
        )
        .route("/contributors/:id/delete/", delete(delete_contributor))
        .route("/contributors/:id/records/", get(list_contributor_records))
}

/// A person credited with housework.
#[derive(Debug, Serialize, ToSchema)]
pub struct ContributorResponse {
    pub id: i64,
    pub name: String,
}

impl From<Contributor> for ContributorResponse {
    fn from(contributor: Contributor) -> Self {
        Self {
            id: contributor.id.get(),
            name: contributor.name,
        }
    }
}

/// List contributors ordered by name.
#[utoipa::path(
    get,
    path = "/api/contributors/",
    tag = "contributors",
    params(
        ("page" = Option<u32>, Query, description = "1-based page number"),
        ("page_size" = Option<u32>, Query, description = "Items per page")
    ),
    responses(
        (status = 200, description = "One page of contributors", body = super::openapi::ContributorPageSchema),
        (status = 400, description = "Invalid pagination parameters"),
        (status = 404, description = "Page out of range")
    )
)]
pub async fn list_contributors(
    State(ctx): State<AppContext>,
    Query(query): Query<PageQuery>,
) -> Result<Json<Page<ContributorResponse>>, AppError> {
    let request = PageRequest::from_query(&query, &ctx.config.pagination)?;
    let conn = get_conn(&ctx.db)?;

    let count = contributors::count_contributors(&conn)?;
    request.check_in_range(count)?;
    let items = contributors::list_contributors(&conn, request.offset(), request.limit())?;

    Ok(Json(
        Page::new(request, count, items).map(ContributorResponse::from),
    ))
}

/// Create a contributor.
#[utoipa::path(
    post,
    path = "/api/contributors/",
    tag = "contributors",
    request_body = super::openapi::ContributorWriteSchema,
    responses(
        (status = 201, description = "Contributor created", body = ContributorResponse),
        (status = 400, description = "Name missing, blank, too long or already taken")
    )
)]
pub async fn create_contributor(
    State(ctx): State<AppContext>,
    form: FormData,
) -> Result<impl IntoResponse, AppError> {
    let name = ContributorPayload::parse(form, true)?
        .name
        .ok_or_else(|| Error::field("name", REQUIRED))?;

    let conn = get_conn(&ctx.db)?;
    let contributor = contributors::create_contributor(&conn, &name)?;

    tracing::info!("Created contributor {} ({})", contributor.name, contributor.id);
    Ok((StatusCode::CREATED, Json(ContributorResponse::from(contributor))))
}

/// Get a contributor by ID.
#[utoipa::path(
    get,
    path = "/api/contributors/{id}/",
    tag = "contributors",
    params(("id" = i64, Path, description = "Contributor ID")),
    responses(
        (status = 200, description = "Contributor details", body = ContributorResponse),
        (status = 404, description = "Contributor not found")
    )
)]
pub async fn get_contributor(
    State(ctx): State<AppContext>,
    Path(id): Path<String>,
) -> Result<Json<ContributorResponse>, AppError> {
    let id: ContributorId = parse_id(&id)?;
    let conn = get_conn(&ctx.db)?;

    let contributor = contributors::get_contributor(&conn, id)?
        .ok_or_else(|| Error::not_found(format!("contributor {}", id)))?;
    Ok(Json(contributor.into()))
}

/// Rename a contributor; `name` is required.
#[utoipa::path(
    put,
    path = "/api/contributors/{id}/",
    tag = "contributors",
    params(("id" = i64, Path, description = "Contributor ID")),
    request_body = super::openapi::ContributorWriteSchema,
    responses(
        (status = 200, description = "Renamed contributor", body = ContributorResponse),
        (status = 400, description = "Name missing, blank, too long or already taken"),
        (status = 404, description = "Contributor not found")
    )
)]
pub async fn replace_contributor(
    State(ctx): State<AppContext>,
    Path(id): Path<String>,
    form: FormData,
) -> Result<Json<ContributorResponse>, AppError> {
    write_contributor(&ctx, &id, form, true)
}

/// Rename a contributor; an empty body changes nothing.
#[utoipa::path(
    patch,
    path = "/api/contributors/{id}/",
    tag = "contributors",
    params(("id" = i64, Path, description = "Contributor ID")),
    request_body = super::openapi::ContributorWriteSchema,
    responses(
        (status = 200, description = "Contributor after the update", body = ContributorResponse),
        (status = 400, description = "Name blank, too long or already taken"),
        (status = 404, description = "Contributor not found")
    )
)]
pub async fn patch_contributor(
    State(ctx): State<AppContext>,
    Path(id): Path<String>,
    form: FormData,
) -> Result<Json<ContributorResponse>, AppError> {
    write_contributor(&ctx, &id, form, false)
}

fn write_contributor(
    ctx: &AppContext,
    raw_id: &str,
    form: FormData,
    name_required: bool,
) -> Result<Json<ContributorResponse>, AppError> {
    let id: ContributorId = parse_id(raw_id)?;
    let conn = get_conn(&ctx.db)?;

    // Unknown ids are a 404 even when the body is also invalid.
    let current = contributors::get_contributor(&conn, id)?
        .ok_or_else(|| Error::not_found(format!("contributor {}", id)))?;

    let contributor = match ContributorPayload::parse(form, name_required)?.name {
        Some(name) if name != current.name => {
            let renamed = contributors::rename_contributor(&conn, id, &name)?;
            tracing::info!("Renamed contributor {} from {} to {}", id, current.name, renamed.name);
            renamed
        }
        _ => current,
    };

    Ok(Json(contributor.into()))
}

/// Delete a contributor together with all of its records.
#[utoipa::path(
    delete,
    path = "/api/contributors/{id}/",
    tag = "contributors",
    params(("id" = i64, Path, description = "Contributor ID")),
    responses(
        (status = 204, description = "Contributor and its records deleted"),
        (status = 404, description = "Contributor not found")
    )
)]
pub async fn delete_contributor(
    State(ctx): State<AppContext>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let id: ContributorId = parse_id(&id)?;
    let conn = get_conn(&ctx.db)?;

    if contributors::delete_contributor(&conn, id)? {
        tracing::info!("Deleted contributor {} and its records", id);
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(Error::not_found(format!("contributor {}", id)).into())
    }
}

/// List one contributor's records, newest first.
#[utoipa::path(
    get,
    path = "/api/contributors/{id}/records/",
    tag = "contributors",
    params(
        ("id" = i64, Path, description = "Contributor ID"),
        ("page" = Option<u32>, Query, description = "1-based page number"),
        ("page_size" = Option<u32>, Query, description = "Items per page")
    ),
    responses(
        (status = 200, description = "One page of records", body = super::openapi::RecordPageSchema),
        (status = 404, description = "Contributor not found or page out of range")
    )
)]
pub async fn list_contributor_records(
    State(ctx): State<AppContext>,
    Path(id): Path<String>,
    Query(query): Query<PageQuery>,
) -> Result<Json<Page<RecordResponse>>, AppError> {
    let id: ContributorId = parse_id(&id)?;
    let request = PageRequest::from_query(&query, &ctx.config.pagination)?;
    let conn = get_conn(&ctx.db)?;

    if contributors::get_contributor(&conn, id)?.is_none() {
        return Err(Error::not_found(format!("contributor {}", id)).into());
    }

    let count = records::count_records_for_contributor(&conn, id)?;
    request.check_in_range(count)?;
    let items =
        records::list_records_for_contributor(&conn, id, request.offset(), request.limit())?;

    Ok(Json(
        Page::new(request, count, items).map(RecordResponse::from),
    ))
}
