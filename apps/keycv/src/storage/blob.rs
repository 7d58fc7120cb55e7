use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use tracing::info;

use crate::storage::{BlobStore, StoreError};

/// `BlobStore` backed by an S3-compatible bucket (MinIO locally).
#[derive(Clone)]
pub struct S3BlobStore {
    client: aws_sdk_s3::Client,
    bucket: String,
}

impl S3BlobStore {
    pub fn new(client: aws_sdk_s3::Client, bucket: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
        }
    }
}

#[async_trait]
impl BlobStore for S3BlobStore {
    async fn upload_text(&self, path: &str, contents: &str) -> Result<String, StoreError> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(path)
            .body(ByteStream::from(contents.as_bytes().to_vec()))
            .content_type("text/plain")
            .send()
            .await
            .map_err(|e| StoreError::Blob(format!("S3 upload failed: {e}")))?;

        info!("Uploaded resume text to s3://{}/{}", self.bucket, path);
        Ok(path.to_string())
    }
}
