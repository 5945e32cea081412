use crate::config::Config;
use crate::images::ImageService;
use crate::storage::{self, ObjectStore};
use anyhow::{Context, Result};
use axum::{
    extract::DefaultBodyLimit,
    http::{header, Method, StatusCode},
    response::IntoResponse,
    routing::get,
    Router,
};
use chorelog_common::Error;
use chorelog_db::pool::DbPool;
use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::Arc;
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

pub mod error;
pub mod openapi;
pub mod pagination;
pub mod payload;
pub mod routes_contributors;
pub mod routes_records;

pub use error::AppError;

/// Shared application context
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<Config>,
    /// Database connection pool
    pub db: DbPool,
    /// Object store holding record photos
    pub store: Arc<dyn ObjectStore>,
    /// Normalizes and uploads photos into the configured bucket
    pub images: ImageService,
}

impl AppContext {
    pub fn new(config: Config, db: DbPool, store: Arc<dyn ObjectStore>) -> Self {
        let images = ImageService::new(
            store.clone(),
            config.storage.bucket.clone(),
            config.images.clone(),
        );
        Self {
            config: Arc::new(config),
            db,
            store,
            images,
        }
    }
}

/// Create the Axum router with all routes
pub fn create_router(ctx: AppContext) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers([header::CONTENT_TYPE]);

    let body_limit = ctx.config.server.max_body_bytes;

    Router::new()
        // Health check
        .route("/health", get(health_check))
        .nest("/api", api_routes())
        // OpenAPI documentation (Swagger UI at /api/docs)
        .nest("/api", openapi::openapi_routes())
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(ctx)
}

fn api_routes() -> Router<AppContext> {
    routes_records::record_routes().merge(routes_contributors::contributor_routes())
}

async fn health_check() -> impl IntoResponse {
    StatusCode::OK
}

/// Parse a path id; anything that is not an id is an unknown resource.
pub(crate) fn parse_id<T: FromStr>(raw: &str) -> Result<T, AppError> {
    raw.parse()
        .map_err(|_| AppError::new(Error::not_found(format!("id '{}'", raw))))
}

/// Create the configured bucket if it is missing, logging which happened.
pub async fn ensure_bucket(store: &dyn ObjectStore, bucket: &str) -> Result<()> {
    let created = store
        .ensure_bucket(bucket)
        .await
        .with_context(|| format!("Failed to ensure bucket '{}'", bucket))?;

    if created {
        tracing::info!("Created bucket '{}'", bucket);
    } else {
        tracing::info!("Bucket '{}' already exists", bucket);
    }
    Ok(())
}

/// Start the HTTP server
///
/// Ensures the bucket, opens the database (running migrations) and serves
/// until Ctrl+C or SIGTERM.
pub async fn start_server(config: Config) -> Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid server address")?;

    let store = storage::build_store(&config.storage);
    ensure_bucket(store.as_ref(), &config.storage.bucket).await?;

    let db_path = config.database.path.to_string_lossy().to_string();
    let db = chorelog_db::pool::init_pool(&db_path)
        .with_context(|| format!("Failed to open database at {}", db_path))?;
    tracing::info!("Database ready at {}", db_path);

    let app = create_router(AppContext::new(config, db, store));

    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => {}
            Err(e) => {
                tracing::error!("Failed to install Ctrl+C handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
