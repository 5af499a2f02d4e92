//! Analysis Pipeline: the fail-fast state machine behind every upload.
//!
//! `Start → Validated → Classified → Analyzed → Scored → Done`
//!
//! Each transition is owned by one component (gate, classifier, analysis call,
//! overall-score call) and consumes the previous stage's typed value. The first
//! failing transition ends the run; nothing is retried here. Retries, if any,
//! belong to the provider clients.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, info, instrument};
use uuid::Uuid;

use crate::analysis::models::{
    AnalysisRecord, Analyzed, Classified, OverallScore, ResumeAnalysis, Submission,
};
use crate::analysis::prompts::{
    fill, ANALYSIS_PROMPT_TEMPLATE, ANALYSIS_SYSTEM, NO_JOB_DESCRIPTION, OVERALL_PROMPT_TEMPLATE,
    OVERALL_SYSTEM,
};
use crate::analysis::validation::{GateError, ValidationGate, INVALID_INPUT_MESSAGE};
use crate::classifier::CategoryClassifier;
use crate::llm_client::{infer, StructuredInference};

pub const PROVIDER_FAILURE_MESSAGE: &str =
    "Something went wrong during resume analysis. Please try again later.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PipelineState {
    Start,
    Validated,
    Classified,
    Analyzed,
    Scored,
    Done,
}

/// Externally visible failure kinds. Stored verbatim in the failed document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureKind {
    InvalidInput,
    ProviderFailure,
}

impl FailureKind {
    /// Fixed user-facing message. Never includes the underlying cause.
    pub fn user_message(self) -> &'static str {
        match self {
            FailureKind::InvalidInput => INVALID_INPUT_MESSAGE,
            FailureKind::ProviderFailure => PROVIDER_FAILURE_MESSAGE,
        }
    }
}

/// A terminated run. `at` is the last state the run reached; `cause` is for
/// operators only.
#[derive(Debug, Error)]
#[error("{kind:?} after {at:?}: {cause}")]
pub struct PipelineFailure {
    pub at: PipelineState,
    pub kind: FailureKind,
    pub cause: String,
}

impl PipelineFailure {
    fn provider(at: PipelineState, cause: impl ToString) -> Self {
        let failure = Self {
            at,
            kind: FailureKind::ProviderFailure,
            cause: cause.to_string(),
        };
        error!(at = ?failure.at, cause = %failure.cause, "Pipeline provider failure");
        failure
    }
}

#[derive(Clone)]
pub struct AnalysisPipeline {
    inference: Arc<dyn StructuredInference>,
    gate: Arc<ValidationGate>,
    classifier: CategoryClassifier,
}

impl AnalysisPipeline {
    pub fn new(inference: Arc<dyn StructuredInference>, classifier: CategoryClassifier) -> Self {
        Self {
            gate: Arc::new(ValidationGate::new(inference.clone())),
            inference,
            classifier,
        }
    }

    /// Runs one submission to `Done` or to its first failure.
    #[instrument(skip_all, fields(run_id = %Uuid::new_v4()))]
    pub async fn run(&self, submission: Submission) -> Result<AnalysisRecord, PipelineFailure> {
        let validated = self.gate.validate(submission).await.map_err(|e| match e {
            GateError::Rejected(reason) => PipelineFailure {
                at: PipelineState::Start,
                kind: FailureKind::InvalidInput,
                cause: format!("{reason:?}"),
            },
            GateError::Provider(e) => PipelineFailure::provider(PipelineState::Start, e),
        })?;
        info!(state = ?PipelineState::Validated, "Pipeline advanced");

        let ml_category = self
            .classifier
            .classify(validated.submission().resume_text())
            .await
            .map_err(|e| PipelineFailure::provider(PipelineState::Validated, e))?;
        let classified = validated.classified(ml_category);
        info!(state = ?PipelineState::Classified, ml_category = classified.ml_category(), "Pipeline advanced");

        let analyzed = self.analyze(classified).await?;
        info!(
            state = ?PipelineState::Analyzed,
            ats_score = analyzed.analysis().ats_score,
            tier = ?analyzed.analysis().tier(),
            "Pipeline advanced"
        );

        let overall = self.score(&analyzed).await?;
        let record = analyzed.scored(overall);
        info!(state = ?PipelineState::Scored, overall_score = record.overall_score, "Pipeline advanced");

        info!(state = ?PipelineState::Done, tier = ?record.tier(), "Pipeline finished");
        Ok(record)
    }

    /// Analysis call: scores and tiered feedback in a single request.
    async fn analyze(&self, classified: Classified) -> Result<Analyzed, PipelineFailure> {
        let submission = classified.submission();
        let prompt = fill(
            ANALYSIS_PROMPT_TEMPLATE,
            &[
                ("resume_text", submission.resume_text()),
                ("job_description", job_description_or_na(submission)),
                ("ml_category", classified.ml_category()),
            ],
        );
        let analysis: ResumeAnalysis = infer(self.inference.as_ref(), ANALYSIS_SYSTEM, &prompt)
            .await
            .map_err(|e| PipelineFailure::provider(PipelineState::Classified, e))?;
        Ok(classified.analyzed(analysis))
    }

    /// Overall-score call over the whole accumulated record.
    async fn score(&self, analyzed: &Analyzed) -> Result<OverallScore, PipelineFailure> {
        let submission = analyzed.submission();
        let a = analyzed.analysis();
        let (ats, content, format, keyword) = (
            a.ats_score.to_string(),
            a.content_score.to_string(),
            a.format_design_score.to_string(),
            a.keyword_score.to_string(),
        );
        let (strengths, weaknesses, content_improvements, format_improvements, key_improvements) = (
            bullets(&a.strengths),
            bullets(&a.weakness),
            bullets(&a.content_improvements),
            bullets(&a.format_design_improvements),
            bullets(&a.key_improvements),
        );
        let prompt = fill(
            OVERALL_PROMPT_TEMPLATE,
            &[
                ("resume_text", submission.resume_text()),
                ("job_description", job_description_or_na(submission)),
                ("ats_score", &ats),
                ("content_score", &content),
                ("format_design_score", &format),
                ("keyword_score", &keyword),
                ("ai_category", &a.ai_job_category),
                ("ml_category", analyzed.ml_category()),
                ("strengths", &strengths),
                ("weaknesses", &weaknesses),
                ("content_improvements", &content_improvements),
                ("format_design_improvements", &format_improvements),
                ("key_improvements", &key_improvements),
                ("conclusion", &a.conclusion),
            ],
        );
        infer(self.inference.as_ref(), OVERALL_SYSTEM, &prompt)
            .await
            .map_err(|e| PipelineFailure::provider(PipelineState::Analyzed, e))
    }
}

fn job_description_or_na(submission: &Submission) -> &str {
    match submission.job_description().trim() {
        "" => NO_JOB_DESCRIPTION,
        jd => jd,
    }
}

fn bullets(items: &[String]) -> String {
    items
        .iter()
        .map(|item| format!("\n  * {item}"))
        .collect()
}
