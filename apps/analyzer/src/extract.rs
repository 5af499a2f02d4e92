//! Upload text extraction. PDF via pdf-extract, plain text via UTF-8 with a
//! Latin-1 fallback. Other formats are rejected.

use std::path::Path;

use thiserror::Error;

const PDF_MAGIC: &[u8] = b"%PDF";

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("Unsupported file type '{0}'. Upload a PDF or TXT file")]
    Unsupported(String),

    #[error("Could not read text from PDF: {0}")]
    Pdf(String),

    #[error("Extraction task failed: {0}")]
    Task(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Pdf,
    Text,
}

fn kind_of(file_name: &str, bytes: &[u8]) -> Result<Kind, ExtractError> {
    let extension = Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or("")
        .to_lowercase();
    match extension.as_str() {
        "pdf" => Ok(Kind::Pdf),
        "txt" => Ok(Kind::Text),
        _ if bytes.starts_with(PDF_MAGIC) => Ok(Kind::Pdf),
        "" => Err(ExtractError::Unsupported(file_name.to_string())),
        other => Err(ExtractError::Unsupported(other.to_string())),
    }
}

fn decode_text(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(_) => bytes.iter().map(|&b| char::from(b)).collect(),
    }
}

/// Returns the upload's text. PDF parsing is CPU-bound and runs on the
/// blocking pool.
pub async fn extract_text(file_name: &str, bytes: &[u8]) -> Result<String, ExtractError> {
    match kind_of(file_name, bytes)? {
        Kind::Text => Ok(decode_text(bytes)),
        Kind::Pdf => {
            let owned = bytes.to_vec();
            tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&owned))
                .await
                .map_err(|e| ExtractError::Task(e.to_string()))?
                .map_err(|e| ExtractError::Pdf(e.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_txt_utf8() {
        let text = extract_text("cv.TXT", "Skills: Rust, Zürich".as_bytes())
            .await
            .unwrap();
        assert_eq!(text, "Skills: Rust, Zürich");
    }

    #[tokio::test]
    async fn test_txt_latin1_fallback() {
        // "café" in Latin-1
        let text = extract_text("cv.txt", &[b'c', b'a', b'f', 0xE9]).await.unwrap();
        assert_eq!(text, "café");
    }

    #[tokio::test]
    async fn test_rejects_docx() {
        let err = extract_text("cv.docx", b"PK\x03\x04").await.unwrap_err();
        assert!(matches!(err, ExtractError::Unsupported(ext) if ext == "docx"));
    }

    #[tokio::test]
    async fn test_broken_pdf_is_extraction_error() {
        let err = extract_text("cv.pdf", b"%PDF-1.4 truncated").await.unwrap_err();
        // pdf-extract may panic on malformed input; the blocking task contains it
        assert!(matches!(err, ExtractError::Pdf(_) | ExtractError::Task(_)));
    }

    #[test]
    fn test_pdf_detected_by_magic_without_extension() {
        assert_eq!(kind_of("upload", b"%PDF-1.7").unwrap(), Kind::Pdf);
        assert!(kind_of("upload", b"hello").is_err());
    }
}
