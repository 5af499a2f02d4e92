//! Category Classifier: maps resume text to a job-category label.
//!
//! The trained model runs out of process. This module owns the input contract
//! (normalisation via `clean_resume`) and the empty-input sentinel; the model
//! itself is reached through the `CategoryModel` trait.

pub mod clean;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

pub use clean::clean_resume;

/// Label returned when there is no text to classify.
pub const EXTRACTION_FAILED_LABEL: &str = "Extraction failed or content is empty.";

const CLASSIFIER_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Error)]
pub enum ClassifierError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Classifier returned status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Classifier returned an empty label")]
    EmptyLabel,
}

/// A pre-trained text → label model. Receives already-normalised text.
#[async_trait]
pub trait CategoryModel: Send + Sync {
    async fn predict(&self, cleaned_text: &str) -> Result<String, ClassifierError>;
}

/// Normalises and lowercases input, then delegates to the model. Empty input short-circuits
/// to `EXTRACTION_FAILED_LABEL` without touching the model.
#[derive(Clone)]
pub struct CategoryClassifier {
    model: Arc<dyn CategoryModel>,
}

impl CategoryClassifier {
    pub fn new(model: Arc<dyn CategoryModel>) -> Self {
        Self { model }
    }

    pub async fn classify(&self, resume_text: &str) -> Result<String, ClassifierError> {
        if resume_text.trim().is_empty() {
            return Ok(EXTRACTION_FAILED_LABEL.to_string());
        }
        // the model's vectoriser was fitted on lowercased text
        let cleaned = clean_resume(resume_text).to_ascii_lowercase();
        let label = self.model.predict(&cleaned).await?;
        if label.trim().is_empty() {
            return Err(ClassifierError::EmptyLabel);
        }
        Ok(label)
    }
}

#[derive(Debug, Serialize)]
struct PredictRequest<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct PredictResponse {
    category: String,
}

/// HTTP client for the classifier service: `POST {base_url}/predict`.
pub struct HttpCategoryModel {
    client: Client,
    endpoint: String,
}

impl HttpCategoryModel {
    pub fn new(base_url: &str) -> Result<Self, ClassifierError> {
        Ok(Self {
            client: Client::builder()
                .timeout(Duration::from_secs(CLASSIFIER_TIMEOUT_SECS))
                .build()?,
            endpoint: format!("{}/predict", base_url.trim_end_matches('/')),
        })
    }
}

#[async_trait]
impl CategoryModel for HttpCategoryModel {
    async fn predict(&self, cleaned_text: &str) -> Result<String, ClassifierError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&PredictRequest { text: cleaned_text })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ClassifierError::Status {
                status: status.as_u16(),
                message,
            });
        }

        let body: PredictResponse = response.json().await?;
        debug!("Classifier predicted '{}'", body.category);
        Ok(body.category)
    }
}
