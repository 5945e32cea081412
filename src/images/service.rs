//! Upload orchestration for record photos.
//!
//! Turns a submitted file into a stored object reference: optional
//! normalization, random key generation and the upload itself.

use std::sync::Arc;

use bytes::Bytes;
use chorelog_common::paths::{extension_of, object_key_for};
use chorelog_common::{Error, Result};
use image::ImageFormat;

use super::normalize::{normalize, verify};
use crate::config::ImageConfig;
use crate::storage::{object_reference, ObjectStore};

/// A file received from a client.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub data: Bytes,
}

/// Stores uploaded photos in the configured bucket.
#[derive(Clone)]
pub struct ImageService {
    store: Arc<dyn ObjectStore>,
    bucket: String,
    config: ImageConfig,
}

impl ImageService {
    /// Create a new `ImageService`.
    ///
    /// # Arguments
    ///
    /// * `store` - The object store uploads are written to
    /// * `bucket` - Bucket holding every photo
    /// * `config` - Normalization settings
    pub fn new(store: Arc<dyn ObjectStore>, bucket: impl Into<String>, config: ImageConfig) -> Self {
        Self {
            store,
            bucket: bucket.into(),
            config,
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Normalize (when enabled) and upload a photo.
    ///
    /// # Returns
    ///
    /// The canonical `bucket/key` reference of the stored object.
    ///
    /// # Errors
    ///
    /// * `Error::Validation` - The bytes are not a decodable image
    /// * `Error::Storage` - The object store rejected the upload
    pub async fn store_upload(&self, upload: ImageUpload) -> Result<String> {
        let (key, data, content_type) = if self.config.normalize {
            let max_dimension = self.config.max_dimension;
            let quality = self.config.jpeg_quality;
            let content_type = upload.content_type.clone();
            let raw = upload.data.clone();

            let normalized = tokio::task::spawn_blocking(move || {
                normalize(&raw, content_type.as_deref(), max_dimension, quality)
            })
            .await
            .map_err(|e| Error::internal(format!("Image normalization task failed: {}", e)))??;

            if normalized.format != normalized.source_format {
                tracing::debug!(
                    "Converted {:?} upload to {:?}",
                    normalized.source_format,
                    normalized.format
                );
            }
            let extension =
                key_extension(upload.file_name.as_deref(), normalized.format, normalized.extension());
            let key = object_key_for(Some(extension));
            let content_type = normalized.content_type().to_string();
            (key, Bytes::from(normalized.data), content_type)
        } else {
            let content_type = upload.content_type.clone();
            let raw = upload.data.clone();
            let format = tokio::task::spawn_blocking(move || verify(&raw, content_type.as_deref()))
                .await
                .map_err(|e| Error::internal(format!("Image verification task failed: {}", e)))??;

            let fallback = format.extensions_str().first().copied().unwrap_or_default();
            let key = object_key_for(Some(key_extension(upload.file_name.as_deref(), format, fallback)));
            let content_type = upload
                .content_type
                .clone()
                .unwrap_or_else(|| format.to_mime_type().to_string());
            (key, upload.data, content_type)
        };

        self.store
            .upload(&self.bucket, &key, data, &content_type)
            .await?;

        let reference = object_reference(&self.bucket, &key);
        tracing::info!("Stored image {} ({})", reference, content_type);
        Ok(reference)
    }
}

/// Extension for a stored object.
///
/// The client's extension is kept only when it names the format of the
/// stored bytes; otherwise `fallback` is used.
fn key_extension<'a>(file_name: Option<&'a str>, format: ImageFormat, fallback: &'a str) -> &'a str {
    file_name
        .and_then(extension_of)
        .filter(|ext| ImageFormat::from_extension(ext) == Some(format))
        .unwrap_or(fallback)
}
