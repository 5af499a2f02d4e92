//! Persistence Coordinator: stores blobs, stamps metadata, writes the document.
//!
//! Durability policy: the uploaded file must be stored or the whole call
//! fails. The rendered report is best-effort; a corrupt or unstorable report
//! leaves `resume_report_id` empty and the document is written anyway.

use std::sync::Arc;

use bytes::Bytes;
use chrono::NaiveDate;
use serde::Serialize;
use thiserror::Error;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::models::document::{NewDocument, Outcome, StoredDocument};
use crate::report::validate_report_pdf;
use crate::storage::{BlobHandle, BlobStore, DocumentStore, StorageError, StoredBlob};

#[derive(Debug, Error)]
pub enum PersistenceError {
    /// The uploaded file could not be stored. Nothing was persisted.
    #[error("Failed to store uploaded file: {0}")]
    FileStore(StorageError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// The original upload as received.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: String,
    pub bytes: Bytes,
}

/// Aggregates computed while scanning a tenant's documents.
#[derive(Debug, Clone, Serialize)]
pub struct TenantSummary {
    pub documents: Vec<StoredDocument>,
    pub total_analyses: usize,
    pub total_valid_analyses: usize,
    pub avg_ats_score: f64,
    pub overall_score_change: i32,
}

/// Scans in stored order. The score change is latest minus previous
/// successful overall score, or 0 with fewer than two successes.
pub fn summarize(documents: Vec<StoredDocument>) -> TenantSummary {
    let mut ats_total = 0u32;
    let mut valid = 0usize;
    let mut previous: Option<u8> = None;
    let mut current: Option<u8> = None;

    for record in documents.iter().filter_map(|d| d.data.as_ref()) {
        ats_total += u32::from(record.ats_score);
        valid += 1;
        previous = current;
        current = Some(record.overall_score);
    }

    let avg_ats_score = if valid == 0 {
        0.0
    } else {
        f64::from(ats_total) / valid as f64
    };
    let overall_score_change = match (previous, current) {
        (Some(prev), Some(curr)) => i32::from(curr) - i32::from(prev),
        _ => 0,
    };

    TenantSummary {
        total_analyses: documents.len(),
        total_valid_analyses: valid,
        avg_ats_score,
        overall_score_change,
        documents,
    }
}

fn report_file_name(tenant: &str) -> String {
    format!("{tenant}_report.pdf")
}

#[derive(Clone)]
pub struct PersistenceCoordinator {
    documents: Arc<dyn DocumentStore>,
    blobs: Arc<dyn BlobStore>,
}

impl PersistenceCoordinator {
    pub fn new(documents: Arc<dyn DocumentStore>, blobs: Arc<dyn BlobStore>) -> Self {
        Self { documents, blobs }
    }

    /// Stores one analysis attempt: file blob, optional report blob, document.
    pub async fn persist(
        &self,
        tenant: &str,
        outcome: Outcome,
        file: UploadedFile,
        report: Option<Vec<u8>>,
        uploaded_date: NaiveDate,
    ) -> Result<StoredDocument, PersistenceError> {
        // 1. Original file: fatal on failure
        let resume_file_id = self
            .blobs
            .put(file.bytes, &file.file_name)
            .await
            .map_err(|e| {
                error!("Storing uploaded file for '{tenant}' failed: {e}");
                PersistenceError::FileStore(e)
            })?;

        // 2. Rendered report: validated, best-effort
        let resume_report_id = match report {
            Some(bytes) => self.store_report(tenant, bytes).await,
            None => None,
        };

        // 3. Document
        let doc = NewDocument {
            outcome,
            resume_file_id,
            resume_report_id,
            resume_file_name: file.file_name,
            uploaded_date,
        };
        match self.documents.insert(tenant, doc).await {
            Ok(stored) => {
                info!(
                    "Stored document {} for '{tenant}' (success: {}, report: {})",
                    stored.id,
                    stored.success,
                    stored.resume_report_id.is_some()
                );
                Ok(stored)
            }
            Err(e) => {
                error!("Document insert for '{tenant}' failed: {e}");
                let written = std::iter::once(resume_file_id).chain(resume_report_id);
                self.discard_blobs(written).await;
                Err(PersistenceError::Storage(e))
            }
        }
    }

    async fn store_report(&self, tenant: &str, bytes: Vec<u8>) -> Option<BlobHandle> {
        if let Err(e) = validate_report_pdf(&bytes) {
            warn!("Dropping report for '{tenant}': {e}");
            return None;
        }
        match self.blobs.put(Bytes::from(bytes), &report_file_name(tenant)).await {
            Ok(handle) => Some(handle),
            Err(e) => {
                warn!("Storing report for '{tenant}' failed, continuing without it: {e}");
                None
            }
        }
    }

    async fn discard_blobs(&self, handles: impl Iterator<Item = BlobHandle>) {
        for handle in handles {
            if let Err(e) = self.blobs.delete(handle).await {
                warn!("Could not remove orphaned blob {handle}: {e}");
            }
        }
    }

    pub async fn get(&self, tenant: &str, id: Uuid) -> Result<Option<StoredDocument>, PersistenceError> {
        Ok(self.documents.find(tenant, id).await?)
    }

    pub async fn list(&self, tenant: &str) -> Result<TenantSummary, PersistenceError> {
        Ok(summarize(self.documents.list(tenant).await?))
    }

    pub async fn tenant_exists(&self, tenant: &str) -> Result<bool, PersistenceError> {
        Ok(self.documents.tenant_exists(tenant).await?)
    }

    pub async fn download(&self, handle: BlobHandle) -> Result<Option<StoredBlob>, PersistenceError> {
        Ok(self.blobs.get(handle).await?)
    }

    /// Removes the document's blobs, then the document. Returns false when the
    /// tenant has no such document.
    ///
    /// Every blob delete is attempted. If any fails the document stays, and a
    /// retry is safe since deleting a missing blob succeeds.
    pub async fn delete(&self, tenant: &str, id: Uuid) -> Result<bool, PersistenceError> {
        let Some(doc) = self.documents.find(tenant, id).await? else {
            return Ok(false);
        };
        let mut first_error = None;
        for handle in doc.blob_handles() {
            if let Err(e) = self.blobs.delete(handle).await {
                error!("Deleting blob {handle} of document {id} failed: {e}");
                first_error.get_or_insert(e);
            }
        }
        if let Some(e) = first_error {
            return Err(PersistenceError::Storage(e));
        }
        let deleted = self.documents.delete(tenant, id).await?;
        info!("Deleted document {id} for '{tenant}'");
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::pipeline::FailureKind;
    use crate::analysis::testing::sample_record;
    use crate::models::document::StoredError;
    use crate::report::{PdfReportRenderer, ReportRenderer};
    use crate::storage::memory::{MemoryBlobStore, MemoryDocumentStore};

    struct Fixture {
        documents: Arc<MemoryDocumentStore>,
        blobs: Arc<MemoryBlobStore>,
        coordinator: PersistenceCoordinator,
    }

    fn fixture() -> Fixture {
        let documents = Arc::new(MemoryDocumentStore::new());
        let blobs = Arc::new(MemoryBlobStore::new());
        let coordinator = PersistenceCoordinator::new(documents.clone(), blobs.clone());
        Fixture {
            documents,
            blobs,
            coordinator,
        }
    }

    fn upload() -> UploadedFile {
        UploadedFile {
            file_name: "jane_cv.pdf".to_string(),
            bytes: Bytes::from_static(b"%PDF-1.4 original upload"),
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
    }

    fn report() -> Vec<u8> {
        PdfReportRenderer.render(&sample_record(), "jane").unwrap()
    }

    fn failure() -> Outcome {
        Outcome::Failure(StoredError {
            kind: FailureKind::InvalidInput,
            message: FailureKind::InvalidInput.user_message().to_string(),
        })
    }

    fn success_with(ats: u8, overall: u8) -> Outcome {
        let mut record = sample_record();
        record.ats_score = ats;
        record.overall_score = overall;
        Outcome::Success(record)
    }

    #[tokio::test]
    async fn test_success_stores_both_blobs() {
        let f = fixture();
        let doc = f
            .coordinator
            .persist("jane", Outcome::Success(sample_record()), upload(), Some(report()), today())
            .await
            .unwrap();

        assert!(doc.success);
        assert!(doc.data.is_some());
        assert!(doc.error.is_none());
        assert_eq!(doc.resume_file_name, "jane_cv.pdf");
        assert_eq!(doc.uploaded_date, today());
        let report_id = doc.resume_report_id.unwrap();
        assert!(f.blobs.contains(doc.resume_file_id).await);
        assert!(f.blobs.contains(report_id).await);

        let stored = f.coordinator.download(report_id).await.unwrap().unwrap();
        assert_eq!(stored.file_name, "jane_report.pdf");
    }

    #[tokio::test]
    async fn test_failure_outcome_stores_only_file() {
        let f = fixture();
        let doc = f
            .coordinator
            .persist("jane", failure(), upload(), None, today())
            .await
            .unwrap();

        assert!(!doc.success);
        assert!(doc.data.is_none());
        assert_eq!(doc.error.as_ref().unwrap().kind, FailureKind::InvalidInput);
        assert!(doc.resume_report_id.is_none());
        assert_eq!(f.blobs.len().await, 1);
    }

    #[tokio::test]
    async fn test_corrupt_report_is_dropped_not_fatal() {
        let f = fixture();
        let doc = f
            .coordinator
            .persist(
                "jane",
                Outcome::Success(sample_record()),
                upload(),
                Some(b"garbage".to_vec()),
                today(),
            )
            .await
            .unwrap();

        assert!(doc.success);
        assert!(doc.resume_report_id.is_none());
        assert_eq!(f.blobs.len().await, 1);
    }

    #[tokio::test]
    async fn test_file_store_failure_aborts_without_document() {
        let f = fixture();
        f.blobs.fail_puts();

        let err = f
            .coordinator
            .persist("jane", failure(), upload(), None, today())
            .await
            .unwrap_err();

        assert!(matches!(err, PersistenceError::FileStore(_)));
        assert!(!f.coordinator.tenant_exists("jane").await.unwrap());
    }

    #[tokio::test]
    async fn test_insert_failure_removes_written_blobs() {
        let f = fixture();
        f.documents.fail_inserts();

        let err = f
            .coordinator
            .persist("jane", Outcome::Success(sample_record()), upload(), Some(report()), today())
            .await
            .unwrap_err();

        assert!(matches!(err, PersistenceError::Storage(_)));
        assert_eq!(f.blobs.len().await, 0);
    }

    #[tokio::test]
    async fn test_delete_removes_blobs_then_document() {
        let f = fixture();
        let doc = f
            .coordinator
            .persist("jane", Outcome::Success(sample_record()), upload(), Some(report()), today())
            .await
            .unwrap();
        let report_id = doc.resume_report_id.unwrap();

        assert!(f.coordinator.delete("jane", doc.id).await.unwrap());

        assert!(!f.blobs.contains(doc.resume_file_id).await);
        assert!(!f.blobs.contains(report_id).await);
        assert!(f.coordinator.download(report_id).await.unwrap().is_none());
        assert!(f.coordinator.get("jane", doc.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_attempts_every_blob_and_keeps_document_on_failure() {
        let f = fixture();
        let doc = f
            .coordinator
            .persist("jane", Outcome::Success(sample_record()), upload(), Some(report()), today())
            .await
            .unwrap();
        let report_id = doc.resume_report_id.unwrap();
        f.blobs.fail_deletes_of(doc.resume_file_id).await;

        let err = f.coordinator.delete("jane", doc.id).await.unwrap_err();

        assert!(matches!(err, PersistenceError::Storage(_)));
        assert!(!f.blobs.contains(report_id).await);
        assert!(f.coordinator.get("jane", doc.id).await.unwrap().is_some());

        f.blobs.heal().await;
        assert!(f.coordinator.delete("jane", doc.id).await.unwrap());
        assert_eq!(f.blobs.len().await, 0);
        assert!(f.coordinator.get("jane", doc.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_missing_or_foreign_document_is_not_found() {
        let f = fixture();
        let doc = f
            .coordinator
            .persist("jane", failure(), upload(), None, today())
            .await
            .unwrap();

        assert!(!f.coordinator.delete("jane", Uuid::new_v4()).await.unwrap());
        assert!(!f.coordinator.delete("john", doc.id).await.unwrap());
        assert!(f.blobs.contains(doc.resume_file_id).await);
    }

    #[tokio::test]
    async fn test_tenants_are_isolated() {
        let f = fixture();
        let doc = f
            .coordinator
            .persist("jane", failure(), upload(), None, today())
            .await
            .unwrap();

        assert!(f.coordinator.get("john", doc.id).await.unwrap().is_none());
        assert_eq!(f.coordinator.list("john").await.unwrap().total_analyses, 0);
        assert!(f.coordinator.tenant_exists("jane").await.unwrap());
        assert!(!f.coordinator.tenant_exists("john").await.unwrap());
    }

    #[tokio::test]
    async fn test_list_aggregates_in_stored_order() {
        let f = fixture();
        for outcome in [success_with(60, 55), failure(), success_with(80, 70), success_with(70, 64)] {
            f.coordinator
                .persist("jane", outcome, upload(), None, today())
                .await
                .unwrap();
        }

        let summary = f.coordinator.list("jane").await.unwrap();
        assert_eq!(summary.total_analyses, 4);
        assert_eq!(summary.total_valid_analyses, 3);
        assert!((summary.avg_ats_score - 70.0).abs() < f64::EPSILON);
        assert_eq!(summary.overall_score_change, -6);
    }

    #[test]
    fn test_summary_without_successes_is_zero() {
        let summary = summarize(Vec::new());
        assert_eq!(summary.avg_ats_score, 0.0);
        assert_eq!(summary.overall_score_change, 0);
    }

    #[tokio::test]
    async fn test_single_success_has_zero_change() {
        let f = fixture();
        f.coordinator
            .persist("jane", success_with(75, 68), upload(), None, today())
            .await
            .unwrap();

        let summary = f.coordinator.list("jane").await.unwrap();
        assert_eq!(summary.overall_score_change, 0);
        assert!((summary.avg_ats_score - 75.0).abs() < f64::EPSILON);
    }
}
