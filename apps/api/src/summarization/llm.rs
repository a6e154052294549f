use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use super::prompts::{build_summary_prompt, system_prompt};
use super::{normalize_skills, SummarizationFailure, Summarizer, NOT_SPECIFIED};
use crate::llm_client::{LlmClient, LlmError};
use crate::models::analysis::{CurriculumSummary, PositionLevel};

/// Upper bound on resume characters sent to the model.
const MAX_PROMPT_CHARS: usize = 12_000;

/// Raw model output. Every field is optional here; `into_summary` decides what
/// is required and what falls back to a default.
#[derive(Debug, Deserialize)]
struct ModelSummary {
    summary: Option<String>,
    key_skills: Option<Vec<String>>,
    experience_years: Option<Value>,
    position_level: Option<String>,
    education: Option<String>,
}

impl ModelSummary {
    fn into_summary(
        self,
        file_name: &str,
        file_type: &str,
        extracted_text_length: usize,
    ) -> Result<CurriculumSummary, SummarizationFailure> {
        let summary = self
            .summary
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| SummarizationFailure::ParseError("missing 'summary'".to_string()))?;
        let key_skills = self
            .key_skills
            .map(normalize_skills)
            .ok_or_else(|| SummarizationFailure::ParseError("missing 'key_skills'".to_string()))?;

        Ok(CurriculumSummary {
            file_name: file_name.to_string(),
            file_type: file_type.to_string(),
            extracted_text_length,
            summary,
            key_skills,
            experience_years: experience_label(self.experience_years.as_ref()),
            position_level: self
                .position_level
                .as_deref()
                .map(PositionLevel::parse)
                .unwrap_or_default(),
            education: non_blank(self.education).unwrap_or_else(|| NOT_SPECIFIED.to_string()),
        })
    }
}

/// Accepts `6`, `6.5`, `"6 anos"`; anything else is "not specified".
fn experience_label(value: Option<&Value>) -> String {
    match value {
        Some(Value::Number(n)) => format!("{n} anos"),
        Some(Value::String(s)) if !s.trim().is_empty() => s.trim().to_string(),
        _ => NOT_SPECIFIED.to_string(),
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Cuts `text` to at most `max` characters on a char boundary.
fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Summarizer backed by the language model.
pub struct LlmSummarizer {
    llm: LlmClient,
}

impl LlmSummarizer {
    pub fn new(llm: LlmClient) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl Summarizer for LlmSummarizer {
    async fn summarize(
        &self,
        text: &str,
        file_name: &str,
        file_type: &str,
    ) -> Result<CurriculumSummary, SummarizationFailure> {
        let prompt = build_summary_prompt(file_name, truncate_chars(text, MAX_PROMPT_CHARS));
        let raw: ModelSummary = self
            .llm
            .call_json(&prompt, &system_prompt())
            .await
            .map_err(map_llm_error)?;
        debug!("Model summary received for {file_name}");

        raw.into_summary(file_name, file_type, text.chars().count())
    }

    fn backend(&self) -> &'static str {
        "llm"
    }
}

fn map_llm_error(error: LlmError) -> SummarizationFailure {
    if error.is_output_error() {
        SummarizationFailure::ParseError(error.to_string())
    } else {
        SummarizationFailure::ModelError(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm_client::tests::{client_for, text_reply};
    use httpmock::{Method::POST, MockServer};
    use serde_json::json;

    fn parse(json: Value) -> Result<CurriculumSummary, SummarizationFailure> {
        let raw: ModelSummary = serde_json::from_value(json).unwrap();
        raw.into_summary("cv.pdf", "application/pdf", 120)
    }

    #[test]
    fn test_full_model_output_becomes_summary() {
        let summary = parse(json!({
            "summary": "Engenheira de software com foco em backend.",
            "key_skills": ["Python", "Docker", "python"],
            "experience_years": "6 anos",
            "position_level": "Sênior",
            "education": "Ciência da Computação - USP"
        }))
        .unwrap();
        assert_eq!(summary.key_skills, vec!["Python", "Docker"]);
        assert_eq!(summary.position_level, PositionLevel::Senior);
        assert_eq!(summary.experience_years, "6 anos");
        assert_eq!(summary.file_name, "cv.pdf");
        assert_eq!(summary.extracted_text_length, 120);
    }

    #[test]
    fn test_missing_optional_fields_use_defaults() {
        let summary = parse(json!({
            "summary": "Perfil generalista.",
            "key_skills": [],
            "experience_years": null,
            "position_level": null
        }))
        .unwrap();
        assert_eq!(summary.experience_years, NOT_SPECIFIED);
        assert_eq!(summary.position_level, PositionLevel::Unknown);
        assert_eq!(summary.education, NOT_SPECIFIED);
    }

    #[test]
    fn test_numeric_experience_is_labelled() {
        let summary = parse(json!({"summary": "x", "key_skills": ["Go"], "experience_years": 4}))
            .unwrap();
        assert_eq!(summary.experience_years, "4 anos");
    }

    #[test]
    fn test_missing_required_fields_are_parse_errors() {
        let no_summary = parse(json!({"key_skills": ["Rust"]})).unwrap_err();
        assert!(matches!(no_summary, SummarizationFailure::ParseError(_)));

        let blank_summary = parse(json!({"summary": "  ", "key_skills": []})).unwrap_err();
        assert!(matches!(blank_summary, SummarizationFailure::ParseError(_)));

        let no_skills = parse(json!({"summary": "ok"})).unwrap_err();
        assert!(matches!(no_skills, SummarizationFailure::ParseError(_)));
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        assert_eq!(truncate_chars("ãéíõú", 3), "ãéí");
        assert_eq!(truncate_chars("abc", 10), "abc");
    }

    #[tokio::test]
    async fn test_summarize_end_to_end_against_mock_model() {
        let server = MockServer::start_async().await;
        let body = json!({
            "summary": "Desenvolvedor backend.",
            "key_skills": ["Rust", "PostgreSQL"],
            "experience_years": "3 anos",
            "position_level": "Pleno",
            "education": null
        })
        .to_string();
        server
            .mock_async(|when, then| {
                when.method(POST).path("/v1/messages");
                then.status(200).json_body(text_reply(&body));
            })
            .await;

        let summarizer = LlmSummarizer::new(client_for(&server, 1));
        let text = "João Lima\nRust e PostgreSQL";
        let summary = summarizer
            .summarize(text, "joao.png", "image/png")
            .await
            .unwrap();
        assert_eq!(summary.file_type, "image/png");
        assert_eq!(summary.extracted_text_length, text.chars().count());
        assert_eq!(summary.position_level, PositionLevel::Pleno);
    }

    #[tokio::test]
    async fn test_overloaded_model_is_retried_then_model_error() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/v1/messages");
                then.status(503).body("overloaded");
            })
            .await;

        let summarizer = LlmSummarizer::new(client_for(&server, 3));
        let err = summarizer
            .summarize("texto", "cv.pdf", "application/pdf")
            .await
            .unwrap_err();
        assert!(matches!(err, SummarizationFailure::ModelError(_)));
        mock.assert_hits_async(3).await;
    }

    #[tokio::test]
    async fn test_prose_reply_is_parse_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/v1/messages");
                then.status(200).json_body(text_reply("Here is the summary you asked for."));
            })
            .await;

        let summarizer = LlmSummarizer::new(client_for(&server, 1));
        let err = summarizer
            .summarize("texto", "cv.pdf", "application/pdf")
            .await
            .unwrap_err();
        assert!(matches!(err, SummarizationFailure::ParseError(_)));
    }
}
