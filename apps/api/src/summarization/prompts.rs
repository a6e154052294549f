// Prompt templates for curriculum summarization.

use crate::llm_client::prompts::{JSON_ONLY_SYSTEM, NO_INVENTION_INSTRUCTION};

/// Role line of the system prompt; the JSON-only fragment is appended by `system_prompt()`.
const SUMMARY_ROLE: &str = "You are an experienced technical recruiter. \
    You read resumes written in Portuguese or English and produce concise, \
    factual structured summaries.";

/// Summary prompt template. Replace `{file_name}` and `{resume_text}` before sending.
pub const SUMMARY_PROMPT_TEMPLATE: &str = r#"Analyze the resume below (file: {file_name}) and return a JSON object with this EXACT schema:
{
  "summary": "2-4 sentence overview of the candidate, in Portuguese",
  "key_skills": ["most relevant technical skills, most important first"],
  "experience_years": "total professional experience, e.g. \"6 anos\", or null",
  "position_level": "Júnior" | "Pleno" | "Sênior" | null,
  "education": "highest degree and institution, or null"
}

Rules:
- key_skills: at most 15 entries, each a short skill name (e.g. "Python", "Docker").
- position_level: infer from titles and years of experience; null when unclear.
- {no_invention}

RESUME:
{resume_text}
"#;

pub fn system_prompt() -> String {
    format!("{SUMMARY_ROLE} {JSON_ONLY_SYSTEM}")
}

pub fn build_summary_prompt(file_name: &str, resume_text: &str) -> String {
    SUMMARY_PROMPT_TEMPLATE
        .replace("{no_invention}", NO_INVENTION_INSTRUCTION)
        .replace("{file_name}", file_name)
        .replace("{resume_text}", resume_text)
}
