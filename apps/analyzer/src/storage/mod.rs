//! Document and blob store contracts.
//!
//! Documents are partitioned by tenant (the user name); no method reads
//! across tenants. Documents reference blobs by handle only, so the stores
//! never cascade: whoever deletes a document deletes its blobs first.

#[cfg(test)]
pub mod memory;
pub mod postgres;
pub mod s3;

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::models::document::{NewDocument, StoredDocument};

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Blob store error: {0}")]
    Blob(String),

    #[error("Corrupt document {id}: {reason}")]
    Corrupt { id: Uuid, reason: String },
}

/// Opaque reference to a stored blob.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlobHandle(Uuid);

impl BlobHandle {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl From<Uuid> for BlobHandle {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl FromStr for BlobHandle {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

impl fmt::Display for BlobHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A resolved blob: its bytes and the file name it was stored under.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredBlob {
    pub bytes: Bytes,
    pub file_name: String,
}

#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn put(&self, bytes: Bytes, file_name: &str) -> Result<BlobHandle, StorageError>;

    async fn get(&self, handle: BlobHandle) -> Result<Option<StoredBlob>, StorageError>;

    /// Deleting a handle that does not exist succeeds.
    async fn delete(&self, handle: BlobHandle) -> Result<(), StorageError>;
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn insert(&self, tenant: &str, doc: NewDocument) -> Result<StoredDocument, StorageError>;

    async fn find(&self, tenant: &str, id: Uuid) -> Result<Option<StoredDocument>, StorageError>;

    /// All of a tenant's documents in stored (insertion) order.
    async fn list(&self, tenant: &str) -> Result<Vec<StoredDocument>, StorageError>;

    /// Returns false when no such document existed.
    async fn delete(&self, tenant: &str, id: Uuid) -> Result<bool, StorageError>;

    async fn tenant_exists(&self, tenant: &str) -> Result<bool, StorageError>;
}
