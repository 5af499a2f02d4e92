//! In-memory stores for tests.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::models::document::{NewDocument, StoredDocument};
use crate::storage::{BlobHandle, BlobStore, DocumentStore, StorageError, StoredBlob};

#[derive(Default)]
pub struct MemoryBlobStore {
    blobs: RwLock<HashMap<BlobHandle, StoredBlob>>,
    fail_puts: AtomicBool,
    undeletable: RwLock<HashSet<BlobHandle>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every subsequent `put` fails.
    pub fn fail_puts(&self) {
        self.fail_puts.store(true, Ordering::SeqCst);
    }

    /// Deletes of `handle` fail until `heal`.
    pub async fn fail_deletes_of(&self, handle: BlobHandle) {
        self.undeletable.write().await.insert(handle);
    }

    pub async fn heal(&self) {
        self.undeletable.write().await.clear();
    }

    pub async fn len(&self) -> usize {
        self.blobs.read().await.len()
    }

    pub async fn contains(&self, handle: BlobHandle) -> bool {
        self.blobs.read().await.contains_key(&handle)
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put(&self, bytes: Bytes, file_name: &str) -> Result<BlobHandle, StorageError> {
        if self.fail_puts.load(Ordering::SeqCst) {
            return Err(StorageError::Blob("blob store unavailable".to_string()));
        }
        let handle = BlobHandle::new();
        self.blobs.write().await.insert(
            handle,
            StoredBlob {
                bytes,
                file_name: file_name.to_string(),
            },
        );
        Ok(handle)
    }

    async fn get(&self, handle: BlobHandle) -> Result<Option<StoredBlob>, StorageError> {
        Ok(self.blobs.read().await.get(&handle).cloned())
    }

    async fn delete(&self, handle: BlobHandle) -> Result<(), StorageError> {
        if self.undeletable.read().await.contains(&handle) {
            return Err(StorageError::Blob(format!("cannot delete {handle}")));
        }
        self.blobs.write().await.remove(&handle);
        Ok(())
    }
}

/// Tenant → documents in insertion order.
#[derive(Default)]
pub struct MemoryDocumentStore {
    tenants: RwLock<HashMap<String, Vec<StoredDocument>>>,
    fail_inserts: AtomicBool,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_inserts(&self) {
        self.fail_inserts.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn insert(&self, tenant: &str, doc: NewDocument) -> Result<StoredDocument, StorageError> {
        if self.fail_inserts.load(Ordering::SeqCst) {
            return Err(StorageError::Database(sqlx::Error::PoolClosed));
        }
        let stored = StoredDocument::from_new(Uuid::new_v4(), doc);
        self.tenants
            .write()
            .await
            .entry(tenant.to_string())
            .or_default()
            .push(stored.clone());
        Ok(stored)
    }

    async fn find(&self, tenant: &str, id: Uuid) -> Result<Option<StoredDocument>, StorageError> {
        Ok(self
            .tenants
            .read()
            .await
            .get(tenant)
            .and_then(|docs| docs.iter().find(|d| d.id == id).cloned()))
    }

    async fn list(&self, tenant: &str) -> Result<Vec<StoredDocument>, StorageError> {
        Ok(self
            .tenants
            .read()
            .await
            .get(tenant)
            .cloned()
            .unwrap_or_default())
    }

    async fn delete(&self, tenant: &str, id: Uuid) -> Result<bool, StorageError> {
        let mut tenants = self.tenants.write().await;
        let Some(docs) = tenants.get_mut(tenant) else {
            return Ok(false);
        };
        let before = docs.len();
        docs.retain(|d| d.id != id);
        let removed = docs.len() < before;
        if docs.is_empty() {
            tenants.remove(tenant);
        }
        Ok(removed)
    }

    async fn tenant_exists(&self, tenant: &str) -> Result<bool, StorageError> {
        Ok(self
            .tenants
            .read()
            .await
            .get(tenant)
            .is_some_and(|docs| !docs.is_empty()))
    }
}
