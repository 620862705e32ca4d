//! Object storage for finished interview records.
//!
//! `BlobStore` is the storage collaborator seen by the exporter; `S3BlobStore`
//! backs it with S3 (or any S3-compatible endpoint such as MinIO).

use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Failed to serialize interview record: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Upload failed: {0}")]
    Upload(String),
}

/// Uploads one JSON document and returns a locator string for it.
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn upload(
        &self,
        bucket: &str,
        json_blob: String,
        object_name: &str,
    ) -> Result<String, StorageError>;
}

#[derive(Clone)]
pub struct S3BlobStore {
    client: aws_sdk_s3::Client,
}

impl S3BlobStore {
    pub fn new(client: aws_sdk_s3::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl BlobStore for S3BlobStore {
    async fn upload(
        &self,
        bucket: &str,
        json_blob: String,
        object_name: &str,
    ) -> Result<String, StorageError> {
        self.client
            .put_object()
            .bucket(bucket)
            .key(object_name)
            .body(ByteStream::from(json_blob.into_bytes()))
            .content_type("application/json")
            .send()
            .await
            .map_err(|e| StorageError::Upload(e.to_string()))?;

        let locator = s3_locator(bucket, object_name);
        info!("Uploaded interview record to {locator}");
        Ok(locator)
    }
}

pub fn s3_locator(bucket: &str, object_name: &str) -> String {
    format!("s3://{bucket}/{object_name}")
}
