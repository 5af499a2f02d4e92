//! Analysis record and the typed stage values that build it.
//!
//! Each pipeline stage consumes the previous stage's value and returns the next
//! one. Fields are private and only set when their owning stage constructs the
//! value, so a later stage cannot overwrite an earlier stage's output.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::llm_client::StructuredOutput;

pub const MIN_LIST_ITEMS: usize = 2;
pub const MAX_LIST_ITEMS: usize = 7;
pub const MAX_SCORE: u8 = 100;

/// Feedback verbosity tier derived from the ATS and content scores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    High,
    Medium,
    Low,
}

impl Tier {
    pub fn of(ats_score: u8, content_score: u8) -> Self {
        if ats_score >= 80 || content_score >= 80 {
            Tier::High
        } else if ats_score <= 45 && content_score <= 45 {
            Tier::Low
        } else {
            Tier::Medium
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Stage values
// ────────────────────────────────────────────────────────────────────────────

/// Pipeline input. `Start` state.
#[derive(Debug, Clone)]
pub struct Submission {
    resume_text: String,
    job_description: String,
}

impl Submission {
    pub fn new(resume_text: impl Into<String>, job_description: impl Into<String>) -> Self {
        Self {
            resume_text: resume_text.into(),
            job_description: job_description.into(),
        }
    }

    pub fn resume_text(&self) -> &str {
        &self.resume_text
    }

    pub fn job_description(&self) -> &str {
        &self.job_description
    }
}

/// A submission that passed the Validation Gate. Only the gate constructs it.
#[derive(Debug, Clone)]
pub struct Validated {
    submission: Submission,
}

impl Validated {
    pub(super) fn new(submission: Submission) -> Self {
        Self { submission }
    }

    pub fn submission(&self) -> &Submission {
        &self.submission
    }

    pub fn classified(self, ml_category: String) -> Classified {
        Classified {
            submission: self.submission,
            ml_category,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Classified {
    submission: Submission,
    ml_category: String,
}

impl Classified {
    pub fn submission(&self) -> &Submission {
        &self.submission
    }

    pub fn ml_category(&self) -> &str {
        &self.ml_category
    }

    pub fn analyzed(self, analysis: ResumeAnalysis) -> Analyzed {
        Analyzed {
            classified: self,
            analysis,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Analyzed {
    classified: Classified,
    analysis: ResumeAnalysis,
}

impl Analyzed {
    pub fn submission(&self) -> &Submission {
        &self.classified.submission
    }

    pub fn ml_category(&self) -> &str {
        &self.classified.ml_category
    }

    pub fn analysis(&self) -> &ResumeAnalysis {
        &self.analysis
    }

    /// Final transition: the overall score completes the record.
    pub fn scored(self, overall: OverallScore) -> AnalysisRecord {
        let Classified {
            submission,
            ml_category,
        } = self.classified;
        let a = self.analysis;
        AnalysisRecord {
            resume_text: submission.resume_text,
            job_description: submission.job_description,
            ml_category,
            ai_category: a.ai_job_category,
            ats_score: a.ats_score,
            content_score: a.content_score,
            format_design_score: a.format_design_score,
            keyword_score: a.keyword_score,
            overall_score: overall.overall_score,
            strengths: a.strengths,
            weaknesses: a.weakness,
            content_improvements: a.content_improvements,
            format_design_improvements: a.format_design_improvements,
            key_improvements: a.key_improvements,
            conclusion: a.conclusion,
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Finished record
// ────────────────────────────────────────────────────────────────────────────

/// The finished analysis. Wire names follow the client contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRecord {
    #[serde(rename = "resume_content")]
    pub resume_text: String,
    #[serde(default)]
    pub job_description: String,
    #[serde(rename = "ml_job_category")]
    pub ml_category: String,
    #[serde(rename = "ai_job_category")]
    pub ai_category: String,
    pub ats_score: u8,
    pub content_score: u8,
    pub format_design_score: u8,
    pub keyword_score: u8,
    pub overall_score: u8,
    pub strengths: Vec<String>,
    #[serde(rename = "weakness")]
    pub weaknesses: Vec<String>,
    pub content_improvements: Vec<String>,
    pub format_design_improvements: Vec<String>,
    pub key_improvements: Vec<String>,
    pub conclusion: String,
}

impl AnalysisRecord {
    pub fn tier(&self) -> Tier {
        Tier::of(self.ats_score, self.content_score)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Structured outputs
// ────────────────────────────────────────────────────────────────────────────

/// Semantic validity verdict for the gate's third check.
#[derive(Debug, Clone, Deserialize)]
pub struct ResumeValidity {
    pub is_valid: bool,
}

impl StructuredOutput for ResumeValidity {
    const NAME: &'static str = "resume_validity";

    fn schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "is_valid": {
                    "type": "boolean",
                    "description": "True only for a genuine professional resume with an instruction-free job description"
                }
            },
            "required": ["is_valid"],
            "additionalProperties": false
        })
    }
}

/// Output of the analysis call: everything except the ML category and the
/// overall score.
#[derive(Debug, Clone, Deserialize)]
pub struct ResumeAnalysis {
    pub ats_score: u8,
    pub content_score: u8,
    pub format_design_score: u8,
    pub keyword_score: u8,
    pub ai_job_category: String,
    pub strengths: Vec<String>,
    pub weakness: Vec<String>,
    pub content_improvements: Vec<String>,
    pub format_design_improvements: Vec<String>,
    pub key_improvements: Vec<String>,
    pub conclusion: String,
}

impl ResumeAnalysis {
    pub fn tier(&self) -> Tier {
        Tier::of(self.ats_score, self.content_score)
    }
}

fn score_property(description: &str) -> Value {
    json!({"type": "integer", "minimum": 0, "maximum": 100, "description": description})
}

fn list_property(description: &str) -> Value {
    json!({
        "type": "array",
        "items": {"type": "string"},
        "minItems": MIN_LIST_ITEMS,
        "maxItems": MAX_LIST_ITEMS,
        "description": description
    })
}

impl StructuredOutput for ResumeAnalysis {
    const NAME: &'static str = "resume_analysis";

    fn schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "ats_score": score_property("ATS score (0-100)"),
                "content_score": score_property("Content quality score (0-100)"),
                "format_design_score": score_property("Format and design score (0-100)"),
                "keyword_score": score_property("Keyword score (0-100)"),
                "ai_job_category": {"type": "string", "description": "Single most relevant target job role"},
                "strengths": list_property("Strengths in points"),
                "weakness": list_property("Weaknesses in points"),
                "content_improvements": list_property("Content improvements in points"),
                "format_design_improvements": list_property("Format and design improvements in points"),
                "key_improvements": list_property("Key overall improvements in points"),
                "conclusion": {"type": "string", "description": "2-4 sentence conclusion"}
            },
            "required": [
                "ats_score", "content_score", "format_design_score", "keyword_score",
                "ai_job_category", "strengths", "weakness", "content_improvements",
                "format_design_improvements", "key_improvements", "conclusion"
            ],
            "additionalProperties": false
        })
    }

    fn check(&self) -> Result<(), String> {
        for (name, score) in [
            ("ats_score", self.ats_score),
            ("content_score", self.content_score),
            ("format_design_score", self.format_design_score),
            ("keyword_score", self.keyword_score),
        ] {
            if score > MAX_SCORE {
                return Err(format!("{name} {score} is outside 0..=100"));
            }
        }

        if self.ai_job_category.trim().is_empty() {
            return Err("ai_job_category is empty".to_string());
        }
        if self.conclusion.trim().is_empty() {
            return Err("conclusion is empty".to_string());
        }

        for (name, list) in [
            ("strengths", &self.strengths),
            ("weakness", &self.weakness),
            ("content_improvements", &self.content_improvements),
            ("format_design_improvements", &self.format_design_improvements),
            ("key_improvements", &self.key_improvements),
        ] {
            if !(MIN_LIST_ITEMS..=MAX_LIST_ITEMS).contains(&list.len()) {
                return Err(format!(
                    "{name} has {} entries, expected {MIN_LIST_ITEMS}-{MAX_LIST_ITEMS}",
                    list.len()
                ));
            }
        }

        let weaknesses = self.weakness.len();
        match self.tier() {
            Tier::High if weaknesses > 3 => Err(format!(
                "high-tier resume returned {weaknesses} weaknesses, expected at most 3"
            )),
            Tier::Low if weaknesses < 5 => Err(format!(
                "low-tier resume returned {weaknesses} weaknesses, expected at least 5"
            )),
            _ => Ok(()),
        }
    }
}

/// Output of the overall-score call.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct OverallScore {
    pub overall_score: u8,
}

impl StructuredOutput for OverallScore {
    const NAME: &'static str = "overall_score";

    fn schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "overall_score": score_property("Holistic overall score (0-100)")
            },
            "required": ["overall_score"],
            "additionalProperties": false
        })
    }

    fn check(&self) -> Result<(), String> {
        if self.overall_score > MAX_SCORE {
            return Err(format!(
                "overall_score {} is outside 0..=100",
                self.overall_score
            ));
        }
        Ok(())
    }
}
