//! Summarization: turns extracted resume text into a `CurriculumSummary`.
//!
//! Two backends implement the `Summarizer` trait:
//! - `LlmSummarizer` (default): fixed prompt, JSON-only response contract.
//! - `RuleBasedSummarizer`: deterministic pattern matching, no model call.
//!
//! `AppState` and the pipeline hold an `Arc<dyn Summarizer>`, picked at startup
//! from `SUMMARIZER_BACKEND`.

use async_trait::async_trait;
use thiserror::Error;

use crate::models::analysis::{CurriculumSummary, FailureReason};

pub mod llm;
pub mod prompts;
pub mod rules;
pub mod vocabulary;

pub use llm::LlmSummarizer;
pub use rules::RuleBasedSummarizer;

/// Placeholder for fields the source document does not state.
pub const NOT_SPECIFIED: &str = "Não especificado";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SummarizationFailure {
    #[error("model output could not be parsed: {0}")]
    ParseError(String),

    #[error("language model call failed: {0}")]
    ModelError(String),
}

impl SummarizationFailure {
    pub fn reason(&self) -> FailureReason {
        match self {
            SummarizationFailure::ParseError(_) => FailureReason::ParseError,
            SummarizationFailure::ModelError(_) => FailureReason::ModelError,
        }
    }
}

#[async_trait]
pub trait Summarizer: Send + Sync {
    /// Summarizes non-empty extracted text. `file_name`, `file_type` and
    /// `extracted_text_length` are filled from the arguments, never from the model.
    async fn summarize(
        &self,
        text: &str,
        file_name: &str,
        file_type: &str,
    ) -> Result<CurriculumSummary, SummarizationFailure>;

    /// "llm" or "rules", for logs and health output.
    fn backend(&self) -> &'static str;

    /// Readiness check used by `/health`.
    async fn probe(&self) -> Result<(), String> {
        Ok(())
    }
}

/// Trims, drops blanks and removes case-insensitive duplicates, keeping first-seen order.
pub(crate) fn normalize_skills<I>(skills: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut seen: Vec<String> = Vec::new();
    let mut out = Vec::new();
    for skill in skills {
        let trimmed = skill.trim();
        if trimmed.is_empty() {
            continue;
        }
        let key = trimmed.to_lowercase();
        if seen.contains(&key) {
            continue;
        }
        seen.push(key);
        out.push(trimmed.to_string());
    }
    out
}
