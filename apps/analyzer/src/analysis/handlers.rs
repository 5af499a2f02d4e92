//! Axum route handlers for the resume analysis API.

use std::sync::Arc;

use axum::{
    extract::{Multipart, Path, Query, State},
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::analysis::models::{AnalysisRecord, Submission};
use crate::errors::AppError;
use crate::extract::extract_text;
use crate::models::document::{Outcome, StoredDocument};
use crate::persistence::{TenantSummary, UploadedFile};
use crate::report::ReportRenderer;
use crate::state::AppState;
use crate::storage::BlobHandle;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct UsernameResponse {
    pub exists: bool,
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct RetrieveQuery {
    pub user_name: String,
    pub report_id: String,
}

#[derive(Debug, Serialize)]
pub struct RetrieveResponse {
    pub message: String,
    pub document: Option<StoredDocument>,
}

#[derive(Debug, Deserialize)]
pub struct TenantQuery {
    pub username: String,
}

#[derive(Debug, Serialize)]
pub struct DocumentsResponse {
    pub message: String,
    pub documents: Vec<StoredDocument>,
    #[serde(rename = "Total_Analyses")]
    pub total_analyses: usize,
    #[serde(rename = "Total_Valid_Analyses")]
    pub total_valid_analyses: usize,
    #[serde(rename = "Avg_ATS_Score")]
    pub avg_ats_score: f64,
    #[serde(rename = "Overall_Score_Change")]
    pub overall_score_change: i32,
}

impl DocumentsResponse {
    fn new(username: &str, summary: TenantSummary) -> Self {
        let message = if summary.documents.is_empty() {
            format!("No documents found for user {username}")
        } else {
            format!(
                "Retrieved {} document(s) for user {username}",
                summary.total_analyses
            )
        };
        Self {
            message,
            total_analyses: summary.total_analyses,
            total_valid_analyses: summary.total_valid_analyses,
            avg_ats_score: summary.avg_ats_score,
            overall_score_change: summary.overall_score_change,
            documents: summary.documents,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Parsed `POST /upload_resume` form.
struct UploadForm {
    user_name: String,
    job_description: String,
    file: UploadedFile,
}

async fn read_upload_form(mut multipart: Multipart) -> Result<UploadForm, AppError> {
    let mut user_name = None;
    let mut job_description = String::new();
    let mut file = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Malformed multipart body: {e}")))?
    {
        match field.name().unwrap_or("") {
            "file" | "uploaded_file" => {
                let file_name = field.file_name().unwrap_or("resume.pdf").to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::Validation(format!("Invalid file: {e}")))?;
                file = Some(UploadedFile { file_name, bytes });
            }
            "job_description" => {
                job_description = field
                    .text()
                    .await
                    .map_err(|e| AppError::Validation(format!("Invalid job_description: {e}")))?;
            }
            "user_name" => {
                user_name = Some(
                    field
                        .text()
                        .await
                        .map_err(|e| AppError::Validation(format!("Invalid user_name: {e}")))?,
                );
            }
            other => {
                let other = other.to_string();
                field
                    .bytes()
                    .await
                    .map_err(|e| AppError::Validation(format!("Invalid {other}: {e}")))?;
            }
        }
    }

    let user_name = user_name
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
        .ok_or_else(|| AppError::Validation("user_name is required".to_string()))?;
    let file = file
        .filter(|f| !f.bytes.is_empty())
        .ok_or_else(|| AppError::Validation("A resume file is required".to_string()))?;

    Ok(UploadForm {
        user_name,
        job_description,
        file,
    })
}

async fn render_report(
    renderer: Arc<dyn ReportRenderer>,
    record: AnalysisRecord,
    user_name: String,
) -> Option<Vec<u8>> {
    let rendered =
        tokio::task::spawn_blocking(move || renderer.render(&record, &user_name)).await;
    match rendered {
        Ok(Ok(bytes)) => Some(bytes),
        Ok(Err(e)) => {
            warn!("Report rendering failed, storing without report: {e}");
            None
        }
        Err(e) => {
            warn!("Report rendering task failed: {e}");
            None
        }
    }
}

/// Pipeline → report → persistence for one extracted upload.
async fn analyze_and_persist(
    state: AppState,
    form: UploadForm,
    resume_text: String,
) -> Result<StoredDocument, AppError> {
    let outcome = Outcome::from(
        state
            .pipeline
            .run(Submission::new(resume_text, form.job_description))
            .await,
    );

    let report = match outcome.record() {
        Some(record) => {
            render_report(state.renderer.clone(), record.clone(), form.user_name.clone()).await
        }
        None => None,
    };

    let doc = state
        .persistence
        .persist(
            &form.user_name,
            outcome,
            form.file,
            report,
            Utc::now().date_naive(),
        )
        .await?;
    Ok(doc)
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /upload_resume
///
/// Multipart: `file` (or `uploaded_file`), `job_description`, `user_name`.
/// Every pipeline outcome is stored and returned with 200; only missing input,
/// unreadable files and a failed file store are HTTP errors.
pub async fn handle_upload_resume(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<StoredDocument>, AppError> {
    let form = read_upload_form(multipart).await?;
    info!(
        "Upload from '{}': {} ({} bytes)",
        form.user_name,
        form.file.file_name,
        form.file.bytes.len()
    );

    let resume_text = extract_text(&form.file.file_name, &form.file.bytes).await?;

    // Detached so a client disconnect cannot abort paid provider calls.
    let doc = tokio::spawn(analyze_and_persist(state, form, resume_text))
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("analysis task failed: {e}")))??;

    Ok(Json(doc))
}

/// GET /check_username/:username
pub async fn handle_check_username(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<Json<UsernameResponse>, AppError> {
    let exists = state.persistence.tenant_exists(&username).await?;
    let message = if exists {
        format!("Username {username} already exists.")
    } else {
        format!("Username {username} does not exist.")
    };
    Ok(Json(UsernameResponse { exists, message }))
}

/// GET /retrieve_document?user_name=&report_id=
///
/// A malformed id is just another miss.
pub async fn handle_retrieve_document(
    State(state): State<AppState>,
    Query(query): Query<RetrieveQuery>,
) -> Result<Json<RetrieveResponse>, AppError> {
    let document = match Uuid::parse_str(&query.report_id) {
        Ok(id) => state.persistence.get(&query.user_name, id).await?,
        Err(_) => None,
    };
    let message = match document {
        Some(_) => format!("Retrieved document for user {}", query.user_name),
        None => format!("No document found for user {}", query.user_name),
    };
    Ok(Json(RetrieveResponse { message, document }))
}

/// GET /get_all_documents?username=
pub async fn handle_get_all_documents(
    State(state): State<AppState>,
    Query(query): Query<TenantQuery>,
) -> Result<Json<DocumentsResponse>, AppError> {
    let summary = state.persistence.list(&query.username).await?;
    Ok(Json(DocumentsResponse::new(&query.username, summary)))
}

/// GET /download_reportfile/:file_id
pub async fn handle_download_reportfile(
    State(state): State<AppState>,
    Path(file_id): Path<String>,
) -> Result<Response, AppError> {
    let not_found = || AppError::NotFound(format!("File {file_id} not found"));

    let handle: BlobHandle = file_id.parse().map_err(|_| not_found())?;
    let blob = state
        .persistence
        .download(handle)
        .await?
        .ok_or_else(not_found)?;

    let disposition = format!(
        "attachment; filename=\"{}\"",
        blob.file_name.replace(['"', '\\'], "_")
    );
    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        blob.bytes,
    )
        .into_response())
}

/// DELETE /delete_report/:report_id?username=
pub async fn handle_delete_report(
    State(state): State<AppState>,
    Path(report_id): Path<String>,
    Query(query): Query<TenantQuery>,
) -> Result<Json<MessageResponse>, AppError> {
    let not_found = || {
        AppError::NotFound(format!(
            "Report {report_id} not found for user {}",
            query.username
        ))
    };

    let id = Uuid::parse_str(&report_id).map_err(|_| not_found())?;
    if !state.persistence.delete(&query.username, id).await? {
        return Err(not_found());
    }
    Ok(Json(MessageResponse {
        message: format!("Report {report_id} deleted successfully"),
    }))
}
