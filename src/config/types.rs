use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub images: ImageConfig,

    #[serde(default)]
    pub pagination: PaginationConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Largest accepted request body, uploads included.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8000
}
fn default_max_body_bytes() -> usize {
    10 * 1024 * 1024
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    /// SQLite file; relative paths resolve against the working directory.
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("chorelog.db")
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

/// Which object store implementation backs image uploads.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// MinIO or any S3-compatible service.
    #[default]
    S3,
    /// Process-local store; contents are lost on exit.
    Memory,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,

    /// Host and port of the S3 endpoint, e.g. `localhost:9000`.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_access_key")]
    pub access_key: String,

    #[serde(default = "default_secret_key")]
    pub secret_key: String,

    #[serde(default = "default_bucket")]
    pub bucket: String,

    #[serde(default = "default_region")]
    pub region: String,

    /// Use https when talking to the endpoint.
    #[serde(default)]
    pub secure: bool,

    /// Lifetime of presigned download URLs.
    #[serde(default = "default_presign_expiry_secs")]
    pub presign_expiry_secs: u64,
}

fn default_endpoint() -> String {
    "localhost:9000".to_string()
}
fn default_access_key() -> String {
    "minioadmin".to_string()
}
fn default_secret_key() -> String {
    "minioadmin".to_string()
}
fn default_bucket() -> String {
    "housework".to_string()
}
fn default_region() -> String {
    "us-east-1".to_string()
}
fn default_presign_expiry_secs() -> u64 {
    3600
}

impl StorageConfig {
    /// Endpoint as a full URL with scheme.
    pub fn endpoint_url(&self) -> String {
        if self.endpoint.starts_with("http://") || self.endpoint.starts_with("https://") {
            return self.endpoint.clone();
        }
        let scheme = if self.secure { "https" } else { "http" };
        format!("{}://{}", scheme, self.endpoint)
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            endpoint: default_endpoint(),
            access_key: default_access_key(),
            secret_key: default_secret_key(),
            bucket: default_bucket(),
            region: default_region(),
            secure: false,
            presign_expiry_secs: default_presign_expiry_secs(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ImageConfig {
    /// Flatten, downscale and re-encode uploads before storing them.
    #[serde(default = "default_normalize")]
    pub normalize: bool,

    /// Bounding box edge, in pixels, that normalized images fit inside.
    #[serde(default = "default_max_dimension")]
    pub max_dimension: u32,

    #[serde(default = "default_jpeg_quality")]
    pub jpeg_quality: u8,
}

fn default_normalize() -> bool {
    true
}
fn default_max_dimension() -> u32 {
    1920
}
fn default_jpeg_quality() -> u8 {
    80
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            normalize: default_normalize(),
            max_dimension: default_max_dimension(),
            jpeg_quality: default_jpeg_quality(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PaginationConfig {
    #[serde(default = "default_page_size")]
    pub default_page_size: u32,

    #[serde(default = "default_max_page_size")]
    pub max_page_size: u32,
}

fn default_page_size() -> u32 {
    10
}
fn default_max_page_size() -> u32 {
    100
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            default_page_size: default_page_size(),
            max_page_size: default_max_page_size(),
        }
    }
}
