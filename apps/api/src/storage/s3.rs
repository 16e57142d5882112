use std::time::Duration;

use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_s3::{
    config::Credentials, error::DisplayErrorContext, presigning::PresigningConfig,
    primitives::ByteStream, Client,
};
use bytes::Bytes;
use tracing::info;

use super::{FileStorage, StorageError};
use crate::config::Config;

/// S3 (or MinIO) bucket.
#[derive(Clone)]
pub struct S3Storage {
    client: Client,
    bucket: String,
}

impl S3Storage {
    /// Constructs a client for MinIO (custom endpoint, path-style) or AWS.
    /// Static credentials are used when configured, otherwise the default chain.
    pub async fn from_config(config: &Config) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.s3_region.clone()));

        if let (Some(key_id), Some(secret)) =
            (&config.aws_access_key_id, &config.aws_secret_access_key)
        {
            loader = loader.credentials_provider(Credentials::new(
                key_id,
                secret,
                None,
                None,
                "jobtrack-static",
            ));
        }
        if let Some(endpoint) = &config.s3_endpoint {
            loader = loader.endpoint_url(endpoint);
        }
        let sdk_config = loader.load().await;

        let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
            .force_path_style(config.s3_endpoint.is_some())
            .build();

        info!("S3 storage configured for bucket {}", config.s3_bucket);
        Self {
            client: Client::from_conf(s3_config),
            bucket: config.s3_bucket.clone(),
        }
    }
}

#[async_trait]
impl FileStorage for S3Storage {
    async fn put(&self, key: &str, body: Bytes, content_type: &str) -> Result<(), StorageError> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(body))
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| StorageError::Upload {
                key: key.to_string(),
                message: DisplayErrorContext(&e).to_string(),
            })?;

        info!("Uploaded s3://{}/{}", self.bucket, key);
        Ok(())
    }

    async fn presigned_get_url(
        &self,
        key: &str,
        expires_in: Duration,
    ) -> Result<String, StorageError> {
        let presign_err = |message: String| StorageError::Presign {
            key: key.to_string(),
            message,
        };

        let presigning = PresigningConfig::expires_in(expires_in)
            .map_err(|e| presign_err(e.to_string()))?;
        let request = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .presigned(presigning)
            .await
            .map_err(|e| presign_err(DisplayErrorContext(&e).to_string()))?;

        Ok(request.uri().to_string())
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| StorageError::Delete {
                key: key.to_string(),
                message: DisplayErrorContext(&e).to_string(),
            })?;
        Ok(())
    }
}
