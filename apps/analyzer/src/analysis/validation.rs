//! Validation Gate: rejects malformed or adversarial input before any paid work.
//!
//! Three checks, all must pass:
//! 1. resume length / section-keyword heuristic
//! 2. job-description denylist (blunt substring filter; misses are accepted)
//! 3. semantic validity verdict from the inference provider
//!
//! Checks 1 and 2 run first and never touch a collaborator. Every rejection
//! maps to the same external error; the specific `RejectionReason` is only
//! logged for operators.

use std::sync::Arc;

use thiserror::Error;
use tracing::warn;

use crate::analysis::models::{ResumeValidity, Submission, Validated};
use crate::analysis::prompts::{fill, NO_JOB_DESCRIPTION, VALIDITY_PROMPT_TEMPLATE, VALIDITY_SYSTEM};
use crate::llm_client::{infer, LlmError, StructuredInference};

pub const MIN_RESUME_CHARS: usize = 100;

const RESUME_SECTION_KEYWORDS: &[&str] = &["experience", "education", "skills"];

/// Lowercase phrases associated with prompt injection or command execution.
const JOB_DESCRIPTION_DENYLIST: &[&str] = &[
    "ignore all instructions",
    "ignore previous instructions",
    "ignore the above",
    "disregard previous instructions",
    "system command",
    "execute",
    "delete",
    "print environment",
    "import os",
    "subprocess",
];

/// Fixed user-facing message for every gate rejection.
pub const INVALID_INPUT_MESSAGE: &str =
    "The uploaded document or the job description does not appear to be valid. \
     Please upload a professional resume.";

/// Internal reason for a rejection. Never surfaced to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectionReason {
    TooShort { chars: usize },
    MissingSections,
    DeniedPhrase(&'static str),
    SemanticCheck,
}

#[derive(Debug, Error)]
pub enum GateError {
    #[error("input rejected: {0:?}")]
    Rejected(RejectionReason),

    /// The semantic check could not be performed. Not a validation verdict.
    #[error("semantic check failed: {0}")]
    Provider(#[from] LlmError),
}

/// Length + section-keyword heuristic on the resume text.
pub fn check_resume_text(resume_text: &str) -> Result<(), RejectionReason> {
    let chars = resume_text.chars().count();
    if chars < MIN_RESUME_CHARS {
        return Err(RejectionReason::TooShort { chars });
    }
    let lower = resume_text.to_lowercase();
    if !RESUME_SECTION_KEYWORDS.iter().any(|k| lower.contains(k)) {
        return Err(RejectionReason::MissingSections);
    }
    Ok(())
}

/// Denylist filter on the job description.
pub fn check_job_description(job_description: &str) -> Result<(), RejectionReason> {
    let lower = job_description.to_lowercase();
    match JOB_DESCRIPTION_DENYLIST.iter().find(|p| lower.contains(*p)) {
        Some(phrase) => Err(RejectionReason::DeniedPhrase(phrase)),
        None => Ok(()),
    }
}

/// Both local heuristics, in gate order.
pub fn check_heuristics(submission: &Submission) -> Result<(), RejectionReason> {
    check_resume_text(submission.resume_text())?;
    check_job_description(submission.job_description())
}

pub struct ValidationGate {
    inference: Arc<dyn StructuredInference>,
}

impl ValidationGate {
    pub fn new(inference: Arc<dyn StructuredInference>) -> Self {
        Self { inference }
    }

    /// Runs all three checks. Provider errors from the semantic check are
    /// returned as `GateError::Provider`, not as a rejection.
    pub async fn validate(&self, submission: Submission) -> Result<Validated, GateError> {
        if let Err(reason) = check_heuristics(&submission) {
            warn!(?reason, "Validation gate rejected submission");
            return Err(GateError::Rejected(reason));
        }

        let job_description = match submission.job_description().trim() {
            "" => NO_JOB_DESCRIPTION,
            jd => jd,
        };
        let prompt = fill(
            VALIDITY_PROMPT_TEMPLATE,
            &[
                ("resume_text", submission.resume_text()),
                ("job_description", job_description),
            ],
        );
        let verdict: ResumeValidity =
            infer(self.inference.as_ref(), VALIDITY_SYSTEM, &prompt).await?;

        if !verdict.is_valid {
            let reason = RejectionReason::SemanticCheck;
            warn!(?reason, "Validation gate rejected submission");
            return Err(GateError::Rejected(reason));
        }

        Ok(Validated::new(submission))
    }
}
