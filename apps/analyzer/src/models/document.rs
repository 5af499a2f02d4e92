use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

use crate::analysis::models::AnalysisRecord;
use crate::analysis::pipeline::{FailureKind, PipelineFailure};
use crate::storage::{BlobHandle, StorageError};

/// Stored form of a failed run: kind plus the fixed user-facing message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredError {
    pub kind: FailureKind,
    pub message: String,
}

impl From<&PipelineFailure> for StoredError {
    fn from(failure: &PipelineFailure) -> Self {
        Self {
            kind: failure.kind,
            message: failure.kind.user_message().to_string(),
        }
    }
}

/// Result of one analysis attempt, as persisted.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Success(AnalysisRecord),
    Failure(StoredError),
}

impl From<Result<AnalysisRecord, PipelineFailure>> for Outcome {
    fn from(result: Result<AnalysisRecord, PipelineFailure>) -> Self {
        match result {
            Ok(record) => Outcome::Success(record),
            Err(failure) => Outcome::Failure(StoredError::from(&failure)),
        }
    }
}

impl Outcome {
    pub fn record(&self) -> Option<&AnalysisRecord> {
        match self {
            Outcome::Success(record) => Some(record),
            Outcome::Failure(_) => None,
        }
    }
}

/// A document ready for insert. The store assigns the id.
#[derive(Debug, Clone)]
pub struct NewDocument {
    pub outcome: Outcome,
    pub resume_file_id: BlobHandle,
    pub resume_report_id: Option<BlobHandle>,
    pub resume_file_name: String,
    pub uploaded_date: NaiveDate,
}

/// One persisted analysis attempt. Immutable once written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredDocument {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub success: bool,
    pub data: Option<AnalysisRecord>,
    pub error: Option<StoredError>,
    pub resume_file_id: BlobHandle,
    pub resume_report_id: Option<BlobHandle>,
    pub resume_file_name: String,
    pub uploaded_date: NaiveDate,
}

impl StoredDocument {
    #[cfg(test)]
    pub fn from_new(id: Uuid, doc: NewDocument) -> Self {
        let (success, data, error) = match doc.outcome {
            Outcome::Success(record) => (true, Some(record), None),
            Outcome::Failure(error) => (false, None, Some(error)),
        };
        Self {
            id,
            success,
            data,
            error,
            resume_file_id: doc.resume_file_id,
            resume_report_id: doc.resume_report_id,
            resume_file_name: doc.resume_file_name,
            uploaded_date: doc.uploaded_date,
        }
    }

    /// Blob handles this document owns.
    pub fn blob_handles(&self) -> impl Iterator<Item = BlobHandle> {
        std::iter::once(self.resume_file_id).chain(self.resume_report_id)
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct DocumentRow {
    pub id: Uuid,
    pub success: bool,
    pub data: Option<Json<AnalysisRecord>>,
    pub error: Option<Json<StoredError>>,
    pub resume_file_id: Uuid,
    pub resume_report_id: Option<Uuid>,
    pub resume_file_name: String,
    pub uploaded_date: NaiveDate,
}

impl TryFrom<DocumentRow> for StoredDocument {
    type Error = StorageError;

    fn try_from(row: DocumentRow) -> Result<Self, Self::Error> {
        let data = row.data.map(|Json(record)| record);
        let error = row.error.map(|Json(error)| error);
        if row.success != data.is_some() || row.success == error.is_some() {
            return Err(StorageError::Corrupt {
                id: row.id,
                reason: "success flag disagrees with data/error columns".to_string(),
            });
        }
        Ok(Self {
            id: row.id,
            success: row.success,
            data,
            error,
            resume_file_id: BlobHandle::from(row.resume_file_id),
            resume_report_id: row.resume_report_id.map(BlobHandle::from),
            resume_file_name: row.resume_file_name,
            uploaded_date: row.uploaded_date,
        })
    }
}
