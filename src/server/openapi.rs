//! OpenAPI documentation and Swagger UI integration.
//!
//! This module provides OpenAPI 3.0 documentation for the chorelog API.

use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use super::AppContext;

/// OpenAPI documentation for chorelog.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Chorelog API",
        version = "0.1.0",
        description = "Household chore tracking with photo uploads",
        license(name = "MIT", url = "https://opensource.org/licenses/MIT"),
    ),
    servers(
        (url = "/", description = "Default server")
    ),
    paths(
        // Record routes (routes_records.rs)
        super::routes_records::list_records,
        super::routes_records::create_record,
        super::routes_records::get_record,
        super::routes_records::update_record,
        super::routes_records::delete_record,
        super::routes_records::get_record_image,
        // Contributor routes (routes_contributors.rs)
        super::routes_contributors::list_contributors,
        super::routes_contributors::create_contributor,
        super::routes_contributors::get_contributor,
        super::routes_contributors::replace_contributor,
        super::routes_contributors::patch_contributor,
        super::routes_contributors::delete_contributor,
        super::routes_contributors::list_contributor_records,
    ),
    components(
        schemas(
            super::routes_records::RecordResponse,
            super::routes_contributors::ContributorResponse,
            RecordWriteSchema,
            ContributorWriteSchema,
            RecordPageSchema,
            ContributorPageSchema,
        )
    ),
    tags(
        (name = "records", description = "Housework record endpoints"),
        (name = "contributors", description = "Contributor endpoints"),
    )
)]
pub struct ApiDoc;

// Schema wrappers for request bodies decoded by `FormData` and for the
// generic `Page` envelope.

/// Record fields accepted on create and update.
#[derive(utoipa::ToSchema)]
#[schema(as = RecordWrite)]
pub struct RecordWriteSchema {
    /// Contributor to credit; created when the name is new. Required on create.
    pub contributor_name: Option<String>,
    /// Points awarded (default 3)
    pub points: Option<i64>,
    /// Free-text note
    pub note: Option<String>,
    /// Image file (multipart) or an existing reference string; null clears it
    #[schema(value_type = Option<String>, format = Binary)]
    pub image: Option<String>,
}

/// Contributor fields accepted on create and update.
#[derive(utoipa::ToSchema)]
#[schema(as = ContributorWrite)]
pub struct ContributorWriteSchema {
    /// Unique display name, at most 100 characters
    pub name: String,
}

/// A page of records.
#[derive(utoipa::ToSchema)]
#[schema(as = RecordPage)]
pub struct RecordPageSchema {
    /// Total number of records
    pub count: i64,
    /// Next page number
    pub next: Option<u32>,
    /// Previous page number
    pub previous: Option<u32>,
    pub results: Vec<super::routes_records::RecordResponse>,
}

/// A page of contributors.
#[derive(utoipa::ToSchema)]
#[schema(as = ContributorPage)]
pub struct ContributorPageSchema {
    /// Total number of contributors
    pub count: i64,
    /// Next page number
    pub next: Option<u32>,
    /// Previous page number
    pub previous: Option<u32>,
    pub results: Vec<super::routes_contributors::ContributorResponse>,
}

/// Swagger UI at `/api/docs`, document at `/api/openapi.json`.
pub fn openapi_routes() -> Router<AppContext> {
    Router::new().merge(SwaggerUi::new("/docs").url("/openapi.json", ApiDoc::openapi()))
}
