//! Shared test harness for integration tests.
//!
//! Provides [`TestHarness`] which creates an in-memory DB, an in-memory
//! object store with the bucket already present, and a full [`AppContext`].
//! The [`TestHarness::with_server`] constructor starts Axum on a random port
//! for HTTP-level testing.
//!
//! The in-memory pool holds a single connection, so tests must drop any
//! connection from [`TestHarness::conn`] before issuing a request.

#![allow(dead_code)]

use std::io::Cursor;
use std::net::SocketAddr;
use std::sync::Arc;

use chorelog::config::{Config, StorageBackend};
use chorelog::server::{create_router, AppContext};
use chorelog::storage::{MemoryStore, ObjectStore};
use chorelog_db::pool::{init_memory_pool, DbPool};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage, Rgba, RgbaImage};
use serde_json::{json, Value};

pub const BUCKET: &str = "housework";

/// Test harness wrapping a fully-constructed [`AppContext`].
pub struct TestHarness {
    pub ctx: AppContext,
    pub db: DbPool,
    pub store: Arc<MemoryStore>,
    pub addr: SocketAddr,
    pub client: reqwest::Client,
}

impl TestHarness {
    /// Start a server with default configuration.
    pub async fn with_server() -> Self {
        Self::with_server_config(test_config()).await
    }

    /// Start an Axum server with custom config on a random port.
    pub async fn with_server_config(config: Config) -> Self {
        let db = init_memory_pool().expect("failed to create in-memory pool");
        let store = Arc::new(MemoryStore::new());
        store
            .ensure_bucket(&config.storage.bucket)
            .await
            .expect("failed to create bucket");

        let ctx = AppContext::new(config, db.clone(), store.clone());
        let app = create_router(ctx.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind random port");
        let addr = listener.local_addr().expect("failed to get local addr");

        tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .expect("failed to build client");

        Self {
            ctx,
            db,
            store,
            addr,
            client,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Get a database connection from the pool.
    pub fn conn(&self) -> chorelog_db::pool::PooledConnection {
        chorelog_db::pool::get_conn(&self.db).expect("failed to get db connection")
    }

    pub async fn get(&self, path: &str) -> reqwest::Response {
        self.client.get(self.url(path)).send().await.unwrap()
    }

    pub async fn post_json(&self, path: &str, body: Value) -> reqwest::Response {
        self.client.post(self.url(path)).json(&body).send().await.unwrap()
    }

    pub async fn put_json(&self, path: &str, body: Value) -> reqwest::Response {
        self.client.put(self.url(path)).json(&body).send().await.unwrap()
    }

    pub async fn patch_json(&self, path: &str, body: Value) -> reqwest::Response {
        self.client.patch(self.url(path)).json(&body).send().await.unwrap()
    }

    pub async fn delete(&self, path: &str) -> reqwest::Response {
        self.client.delete(self.url(path)).send().await.unwrap()
    }

    pub async fn post_multipart(&self, path: &str, form: reqwest::multipart::Form) -> reqwest::Response {
        self.client.post(self.url(path)).multipart(form).send().await.unwrap()
    }

    pub async fn put_multipart(&self, path: &str, form: reqwest::multipart::Form) -> reqwest::Response {
        self.client.put(self.url(path)).multipart(form).send().await.unwrap()
    }

    /// Create a record through the API and return its JSON body.
    pub async fn create_record(&self, contributor: &str, points: i64, note: &str) -> Value {
        let resp = self
            .post_json(
                "/api/records/",
                json!({"contributor_name": contributor, "points": points, "note": note}),
            )
            .await;
        assert_eq!(resp.status(), 201);
        resp.json().await.unwrap()
    }

    /// Create a contributor through the API and return its JSON body.
    pub async fn create_contributor(&self, name: &str) -> Value {
        let resp = self.post_json("/api/contributors/", json!({ "name": name })).await;
        assert_eq!(resp.status(), 201);
        resp.json().await.unwrap()
    }

    pub fn contributor_count(&self) -> i64 {
        let conn = self.conn();
        chorelog_db::queries::contributors::count_contributors(&conn).unwrap()
    }

    pub fn record_count(&self) -> i64 {
        let conn = self.conn();
        chorelog_db::queries::records::count_records(&conn).unwrap()
    }
}

/// Default config with the in-memory storage backend.
pub fn test_config() -> Config {
    let mut config = Config::default();
    config.storage.backend = StorageBackend::Memory;
    config.storage.bucket = BUCKET.to_string();
    config
}

pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([30, 60, 90])));
    encode(img, ImageFormat::Png)
}

/// A fully transparent PNG.
pub fn transparent_png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(width, height, Rgba([0, 0, 0, 0])));
    encode(img, ImageFormat::Png)
}

pub fn jpeg_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([200, 180, 20])));
    encode(img, ImageFormat::Jpeg)
}

fn encode(img: DynamicImage, format: ImageFormat) -> Vec<u8> {
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, format).unwrap();
    buf.into_inner()
}

/// A multipart file part.
pub fn file_part(data: Vec<u8>, file_name: &str, mime: &str) -> reqwest::multipart::Part {
    reqwest::multipart::Part::bytes(data)
        .file_name(file_name.to_string())
        .mime_str(mime)
        .unwrap()
}

/// Split a stored `bucket/key` reference.
pub fn split_reference(reference: &str) -> (String, String) {
    let (bucket, key) = reference.split_once('/').expect("reference has no '/'");
    (bucket.to_string(), key.to_string())
}
