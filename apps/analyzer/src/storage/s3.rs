use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client as S3Client;
use bytes::Bytes;
use tracing::info;

use crate::storage::{BlobHandle, BlobStore, StorageError, StoredBlob};

const FILE_NAME_METADATA: &str = "file-name";

/// Blobs live at `blobs/<handle>`; the original file name rides along as
/// object metadata.
#[derive(Clone)]
pub struct S3BlobStore {
    client: S3Client,
    bucket: String,
}

impl S3BlobStore {
    pub fn new(client: S3Client, bucket: String) -> Self {
        Self { client, bucket }
    }

    fn key(handle: BlobHandle) -> String {
        format!("blobs/{handle}")
    }
}

/// S3 user metadata must be ASCII.
fn metadata_safe(file_name: &str) -> String {
    file_name
        .chars()
        .map(|c| if c.is_ascii() && !c.is_ascii_control() { c } else { '_' })
        .collect()
}

#[async_trait]
impl BlobStore for S3BlobStore {
    async fn put(&self, bytes: Bytes, file_name: &str) -> Result<BlobHandle, StorageError> {
        let handle = BlobHandle::new();
        let key = Self::key(handle);
        let size = bytes.len();

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .body(ByteStream::from(bytes))
            .metadata(FILE_NAME_METADATA, metadata_safe(file_name))
            .send()
            .await
            .map_err(|e| StorageError::Blob(format!("S3 upload failed: {e}")))?;

        info!("Uploaded {size} bytes to s3://{}/{}", self.bucket, key);
        Ok(handle)
    }

    async fn get(&self, handle: BlobHandle) -> Result<Option<StoredBlob>, StorageError> {
        let output = match self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(Self::key(handle))
            .send()
            .await
        {
            Ok(output) => output,
            Err(e) => {
                let e = e.into_service_error();
                if e.is_no_such_key() {
                    return Ok(None);
                }
                return Err(StorageError::Blob(format!("S3 download failed: {e}")));
            }
        };

        let file_name = output
            .metadata()
            .and_then(|m| m.get(FILE_NAME_METADATA))
            .cloned()
            .unwrap_or_else(|| handle.to_string());
        let bytes = output
            .body
            .collect()
            .await
            .map_err(|e| StorageError::Blob(format!("S3 body read failed: {e}")))?
            .into_bytes();

        Ok(Some(StoredBlob { bytes, file_name }))
    }

    async fn delete(&self, handle: BlobHandle) -> Result<(), StorageError> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(Self::key(handle))
            .send()
            .await
            .map_err(|e| StorageError::Blob(format!("S3 delete failed: {e}")))?;
        Ok(())
    }
}
