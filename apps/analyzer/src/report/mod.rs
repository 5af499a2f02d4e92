//! Report Renderer: finished analysis record → downloadable PDF.

pub mod metrics;
pub mod pdf;

use lopdf::Document;
use thiserror::Error;

use crate::analysis::models::AnalysisRecord;

pub use pdf::PdfReportRenderer;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Report rendering failed: {0}")]
    Render(String),

    #[error("Report is not a valid PDF: {0}")]
    Invalid(String),
}

pub trait ReportRenderer: Send + Sync {
    fn render(&self, record: &AnalysisRecord, user_name: &str) -> Result<Vec<u8>, ReportError>;
}

/// Accepts `bytes` only if they parse as a PDF with at least one page.
pub fn validate_report_pdf(bytes: &[u8]) -> Result<(), ReportError> {
    if bytes.is_empty() {
        return Err(ReportError::Invalid("empty document".to_string()));
    }
    let doc = Document::load_mem(bytes).map_err(|e| ReportError::Invalid(e.to_string()))?;
    if doc.get_pages().is_empty() {
        return Err(ReportError::Invalid("document has no pages".to_string()));
    }
    Ok(())
}
