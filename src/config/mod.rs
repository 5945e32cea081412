mod types;

pub use types::*;

use anyhow::{Context, Result};
use std::path::Path;

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let mut config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    validate_config(&config)?;

    Ok(config)
}

/// Load config from default locations or return default config
pub fn load_config_or_default(custom_path: Option<&Path>) -> Result<Config> {
    if let Some(path) = custom_path {
        return load_config(path);
    }

    let default_paths = [
        "./chorelog.toml",
        "./config.toml",
        "~/.config/chorelog/config.toml",
    ];

    for path_str in default_paths {
        let path = shellexpand::tilde(path_str);
        let path = Path::new(path.as_ref());
        if path.exists() {
            return load_config(path);
        }
    }

    let mut config = Config::default();
    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    validate_config(&config)?;
    Ok(config)
}

/// Overlay the MinIO and database environment variables onto a config.
///
/// The lookup is injected so tests don't have to mutate process env.
pub fn apply_env_overrides<F>(config: &mut Config, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(endpoint) = lookup("MINIO_ENDPOINT") {
        config.storage.endpoint = endpoint;
    }
    if let Some(access_key) = lookup("MINIO_ACCESS_KEY") {
        config.storage.access_key = access_key;
    }
    if let Some(secret_key) = lookup("MINIO_SECRET_KEY") {
        config.storage.secret_key = secret_key;
    }
    if let Some(bucket) = lookup("MINIO_BUCKET_NAME") {
        config.storage.bucket = bucket;
    }
    if let Some(secure) = lookup("MINIO_SECURE") {
        config.storage.secure = matches!(secure.to_lowercase().as_str(), "1" | "true" | "yes");
    }
    if let Some(path) = lookup("DATABASE_PATH") {
        config.database.path = path.into();
    }
}

/// Validate configuration
pub fn validate_config(config: &Config) -> Result<()> {
    if config.server.port == 0 {
        anyhow::bail!("Server port cannot be 0");
    }

    if config.storage.bucket.trim().is_empty() {
        anyhow::bail!("Storage bucket name cannot be empty");
    }

    if config.images.max_dimension == 0 {
        anyhow::bail!("images.max_dimension must be greater than 0");
    }

    if !(1..=100).contains(&config.images.jpeg_quality) {
        anyhow::bail!(
            "images.jpeg_quality must be between 1 and 100, got {}",
            config.images.jpeg_quality
        );
    }

    let pagination = &config.pagination;
    if pagination.default_page_size == 0 || pagination.max_page_size == 0 {
        anyhow::bail!("Page sizes must be greater than 0");
    }
    if pagination.default_page_size > pagination.max_page_size {
        anyhow::bail!(
            "pagination.default_page_size ({}) exceeds max_page_size ({})",
            pagination.default_page_size,
            pagination.max_page_size
        );
    }

    Ok(())
}
