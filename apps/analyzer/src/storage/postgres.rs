use async_trait::async_trait;
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::document::{DocumentRow, NewDocument, Outcome, StoredDocument};
use crate::storage::{DocumentStore, StorageError};

const DOCUMENT_COLUMNS: &str = "id, success, data, error, resume_file_id, resume_report_id, \
                                resume_file_name, uploaded_date";

/// `analysis_documents` table. `seq` defines stored order within a tenant.
#[derive(Clone)]
pub struct PgDocumentStore {
    db: PgPool,
}

impl PgDocumentStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    async fn insert(&self, tenant: &str, doc: NewDocument) -> Result<StoredDocument, StorageError> {
        let (success, data, error) = match &doc.outcome {
            Outcome::Success(record) => (true, Some(Json(record)), None),
            Outcome::Failure(error) => (false, None, Some(Json(error))),
        };

        let row = sqlx::query_as::<_, DocumentRow>(&format!(
            "INSERT INTO analysis_documents \
             (user_name, success, data, error, resume_file_id, resume_report_id, resume_file_name, uploaded_date) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             RETURNING {DOCUMENT_COLUMNS}"
        ))
        .bind(tenant)
        .bind(success)
        .bind(data)
        .bind(error)
        .bind(doc.resume_file_id.as_uuid())
        .bind(doc.resume_report_id.map(|h| h.as_uuid()))
        .bind(&doc.resume_file_name)
        .bind(doc.uploaded_date)
        .fetch_one(&self.db)
        .await?;

        StoredDocument::try_from(row)
    }

    async fn find(&self, tenant: &str, id: Uuid) -> Result<Option<StoredDocument>, StorageError> {
        sqlx::query_as::<_, DocumentRow>(&format!(
            "SELECT {DOCUMENT_COLUMNS} FROM analysis_documents WHERE user_name = $1 AND id = $2"
        ))
        .bind(tenant)
        .bind(id)
        .fetch_optional(&self.db)
        .await?
        .map(StoredDocument::try_from)
        .transpose()
    }

    async fn list(&self, tenant: &str) -> Result<Vec<StoredDocument>, StorageError> {
        sqlx::query_as::<_, DocumentRow>(&format!(
            "SELECT {DOCUMENT_COLUMNS} FROM analysis_documents WHERE user_name = $1 ORDER BY seq"
        ))
        .bind(tenant)
        .fetch_all(&self.db)
        .await?
        .into_iter()
        .map(StoredDocument::try_from)
        .collect()
    }

    async fn delete(&self, tenant: &str, id: Uuid) -> Result<bool, StorageError> {
        let result = sqlx::query("DELETE FROM analysis_documents WHERE user_name = $1 AND id = $2")
            .bind(tenant)
            .bind(id)
            .execute(&self.db)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn tenant_exists(&self, tenant: &str) -> Result<bool, StorageError> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM analysis_documents WHERE user_name = $1)",
        )
        .bind(tenant)
        .fetch_one(&self.db)
        .await?;
        Ok(exists)
    }
}
