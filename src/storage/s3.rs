use std::time::Duration;

use async_trait::async_trait;
use aws_sdk_s3::config::{BehaviorVersion, Credentials, Region};
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{BucketLocationConstraint, CreateBucketConfiguration};
use bytes::Bytes;
use chorelog_common::{Error, Result};

use super::ObjectStore;
use crate::config::StorageConfig;

/// MinIO / S3 backed store using path-style addressing.
#[derive(Debug, Clone)]
pub struct S3Store {
    client: aws_sdk_s3::Client,
    region: String,
    presign_expiry: Duration,
}

impl S3Store {
    pub fn new(config: &StorageConfig) -> Self {
        let credentials = Credentials::new(
            config.access_key.clone(),
            config.secret_key.clone(),
            None,
            None,
            "chorelog-config",
        );

        let s3_config = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .endpoint_url(config.endpoint_url())
            .region(Region::new(config.region.clone()))
            .credentials_provider(credentials)
            .force_path_style(true)
            .build();

        Self {
            client: aws_sdk_s3::Client::from_conf(s3_config),
            region: config.region.clone(),
            presign_expiry: Duration::from_secs(config.presign_expiry_secs),
        }
    }
}

fn storage_err<E: std::error::Error>(context: &str, err: E) -> Error {
    Error::storage(format!("{}: {}", context, DisplayErrorContext(err)))
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn ensure_bucket(&self, bucket: &str) -> Result<bool> {
        match self.client.head_bucket().bucket(bucket).send().await {
            Ok(_) => return Ok(false),
            Err(e) => {
                let missing = e
                    .as_service_error()
                    .map(|svc| svc.is_not_found())
                    .unwrap_or(false);
                if !missing {
                    return Err(storage_err("head_bucket failed", e));
                }
            }
        }

        let mut request = self.client.create_bucket().bucket(bucket);
        if self.region != "us-east-1" {
            request = request.create_bucket_configuration(
                CreateBucketConfiguration::builder()
                    .location_constraint(BucketLocationConstraint::from(self.region.as_str()))
                    .build(),
            );
        }

        match request.send().await {
            Ok(_) => Ok(true),
            Err(e) => {
                let raced = e
                    .as_service_error()
                    .map(|svc| svc.is_bucket_already_owned_by_you())
                    .unwrap_or(false);
                if raced {
                    Ok(false)
                } else {
                    Err(storage_err("create_bucket failed", e))
                }
            }
        }
    }

    async fn upload(&self, bucket: &str, key: &str, data: Bytes, content_type: &str) -> Result<()> {
        let length = data.len() as i64;
        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .content_type(content_type)
            .content_length(length)
            .body(ByteStream::from(data))
            .send()
            .await
            .map_err(|e| storage_err("put_object failed", e))?;

        tracing::debug!("Uploaded {}/{} ({} bytes)", bucket, key, length);
        Ok(())
    }

    async fn url_for(&self, bucket: &str, key: &str) -> Result<String> {
        let presigning = PresigningConfig::expires_in(self.presign_expiry)
            .map_err(|e| storage_err("invalid presign expiry", e))?;

        let presigned = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .presigned(presigning)
            .await
            .map_err(|e| storage_err("presigning get_object failed", e))?;

        Ok(presigned.uri().to_string())
    }
}
