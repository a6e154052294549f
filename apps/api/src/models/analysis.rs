use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Seniority classification attached to a summary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PositionLevel {
    #[default]
    #[serde(rename = "Unknown")]
    Unknown,
    #[serde(rename = "Júnior")]
    Junior,
    #[serde(rename = "Pleno")]
    Pleno,
    #[serde(rename = "Sênior")]
    Senior,
}

impl PositionLevel {
    /// Lenient parse of free text ("senior", "Sênior", "Pleno", "jr"...).
    /// Anything unrecognised maps to `Unknown`.
    pub fn parse(raw: &str) -> Self {
        let lower = raw.trim().to_lowercase();
        if lower.contains("sênior") || lower.contains("senior") || lower == "sr" {
            PositionLevel::Senior
        } else if lower.contains("pleno") || lower == "mid" || lower.contains("mid-level") {
            PositionLevel::Pleno
        } else if lower.contains("júnior") || lower.contains("junior") || lower == "jr" {
            PositionLevel::Junior
        } else {
            PositionLevel::Unknown
        }
    }

    /// Ordinal used for level alignment. `Unknown` ranks below every known level.
    pub fn rank(self) -> u8 {
        match self {
            PositionLevel::Unknown => 0,
            PositionLevel::Junior => 1,
            PositionLevel::Pleno => 2,
            PositionLevel::Senior => 3,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            PositionLevel::Unknown => "Unknown",
            PositionLevel::Junior => "Júnior",
            PositionLevel::Pleno => "Pleno",
            PositionLevel::Senior => "Sênior",
        }
    }
}

impl fmt::Display for PositionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Structured summary of one successfully processed curriculum.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurriculumSummary {
    pub file_name: String,
    pub file_type: String,
    pub extracted_text_length: usize,
    pub summary: String,
    pub key_skills: Vec<String>,
    pub experience_years: String,
    pub position_level: PositionLevel,
    pub education: String,
}

/// Categorized reason a single file did not produce a summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureReason {
    UnsupportedType,
    OcrError,
    CorruptFile,
    Empty,
    TooLarge,
    ParseError,
    ModelError,
    Timeout,
    InternalError,
}

impl FailureReason {
    /// Caller-facing note for each category. Raw tool or model messages stay in the logs.
    pub fn note(self) -> &'static str {
        match self {
            FailureReason::UnsupportedType => "File type is not supported; send a PDF, PNG or JPEG",
            FailureReason::OcrError => "Text recognition failed for this image",
            FailureReason::CorruptFile => "File is corrupt or could not be decoded",
            FailureReason::Empty => "No readable text was found in this file",
            FailureReason::TooLarge => "File exceeds the maximum allowed size",
            FailureReason::ParseError => "Summary could not be built from the model response",
            FailureReason::ModelError => "Language model was unavailable for this file",
            FailureReason::Timeout => "Processing stopped before this file finished",
            FailureReason::InternalError => "Unexpected internal error while processing this file",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailedFile {
    pub file_name: String,
    pub reason: FailureReason,
    /// Short human-readable note. Never carries raw tool or model output.
    pub detail: String,
}

impl FailedFile {
    pub fn new(file_name: impl Into<String>, reason: FailureReason) -> Self {
        Self {
            file_name: file_name.into(),
            reason,
            detail: reason.note().to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryMatch {
    pub file_name: String,
    pub score: f64,
    pub match_reasons: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryAnalysis {
    pub query: String,
    pub best_matches: Vec<QueryMatch>,
    pub analysis_reasoning: String,
}

/// Request-level failure categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestFailureKind {
    NoFilesProvided,
    TooManyFiles,
    Timeout,
}

impl RequestFailureKind {
    /// Intake rejections happen before any file is touched.
    pub fn is_intake_rejection(self) -> bool {
        matches!(
            self,
            RequestFailureKind::NoFilesProvided | RequestFailureKind::TooManyFiles
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestError {
    pub kind: RequestFailureKind,
    pub message: String,
}

/// Aggregate result of one `/analyze` request. Built once, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResponse {
    pub request_id: Uuid,
    pub success: bool,
    pub processed_files: usize,
    pub summaries: Vec<CurriculumSummary>,
    pub failed_files: Vec<FailedFile>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query_analysis: Option<QueryAnalysis>,
    pub processing_time_seconds: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RequestError>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_level_parse_accepts_accents_and_ascii() {
        assert_eq!(PositionLevel::parse("Sênior"), PositionLevel::Senior);
        assert_eq!(PositionLevel::parse("senior engineer"), PositionLevel::Senior);
        assert_eq!(PositionLevel::parse("JÚNIOR"), PositionLevel::Junior);
        assert_eq!(PositionLevel::parse("Pleno"), PositionLevel::Pleno);
        assert_eq!(PositionLevel::parse("Não especificado"), PositionLevel::Unknown);
    }

    #[test]
    fn test_position_level_serializes_as_label() {
        let json = serde_json::to_string(&PositionLevel::Senior).unwrap();
        assert_eq!(json, "\"Sênior\"");
        let back: PositionLevel = serde_json::from_str("\"Júnior\"").unwrap();
        assert_eq!(back, PositionLevel::Junior);
    }

    #[test]
    fn test_rank_orders_levels() {
        assert!(PositionLevel::Senior.rank() > PositionLevel::Pleno.rank());
        assert!(PositionLevel::Pleno.rank() > PositionLevel::Junior.rank());
        assert!(PositionLevel::Junior.rank() > PositionLevel::Unknown.rank());
    }

    #[test]
    fn test_absent_query_analysis_is_omitted_from_json() {
        let response = AnalysisResponse {
            request_id: Uuid::new_v4(),
            success: false,
            processed_files: 0,
            summaries: vec![],
            failed_files: vec![],
            query_analysis: None,
            processing_time_seconds: 0.0,
            error: None,
        };
        let value = serde_json::to_value(&response).unwrap();
        assert!(value.get("query_analysis").is_none());
        assert!(value.get("error").is_none());
        assert_eq!(value["processed_files"], 0);
    }
}
