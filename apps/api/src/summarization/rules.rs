use std::sync::OnceLock;

use async_trait::async_trait;
use regex::Regex;

use super::vocabulary::{contains_term, detect_skills, EDUCATION_KEYWORDS, WORK_AREAS};
use super::{SummarizationFailure, Summarizer, NOT_SPECIFIED};
use crate::models::analysis::{CurriculumSummary, PositionLevel};

/// Skills named in the summary sentence before "e outras N tecnologias".
const SUMMARY_SKILLS: usize = 5;
const MAX_EDUCATION_TERMS: usize = 3;
const NAME_SCAN_LINES: usize = 5;

fn experience_patterns() -> &'static [Regex] {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            r"(\d+)\s*anos?\s*de\s*experi[êe]ncia",
            r"experi[êe]ncia\s*de\s*(\d+)\s*anos?",
            r"(\d+)\s*years?\s*of\s*experience",
            r"(\d+)\+\s*anos?",
        ]
        .iter()
        .map(|p| Regex::new(p).expect("experience pattern is valid"))
        .collect()
    })
}

/// First stated number of years of experience, trying each pattern in order.
pub fn extract_experience_years(text: &str) -> Option<u32> {
    let lower = text.to_lowercase();
    experience_patterns().iter().find_map(|re| {
        re.captures(&lower)
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().parse().ok())
    })
}

/// Level from explicit keywords, then from years of experience, then from skill count.
pub fn infer_level(text: &str, years: Option<u32>, skill_count: usize) -> PositionLevel {
    let lower = text.to_lowercase();
    let has_any = |words: &[&str]| words.iter().any(|w| lower.contains(w));

    if has_any(&["senior", "sênior", "lead", "líder", "arquiteto"]) {
        return PositionLevel::Senior;
    }
    if has_any(&["junior", "júnior", "trainee", "estagiário"]) {
        return PositionLevel::Junior;
    }
    if lower.contains("pleno") {
        return PositionLevel::Pleno;
    }

    match years {
        Some(y) if y >= 5 => return PositionLevel::Senior,
        Some(y) if y >= 2 => return PositionLevel::Pleno,
        Some(y) if y > 0 => return PositionLevel::Junior,
        _ => {}
    }

    match skill_count {
        n if n >= 10 => PositionLevel::Senior,
        n if n >= 5 => PositionLevel::Pleno,
        n if n > 0 => PositionLevel::Junior,
        _ => PositionLevel::Unknown,
    }
}

fn extract_education(text: &str) -> Option<String> {
    let lower = text.to_lowercase();
    let found: Vec<&str> = EDUCATION_KEYWORDS
        .iter()
        .filter(|(pattern, _)| lower.contains(pattern))
        .map(|(_, display)| *display)
        .take(MAX_EDUCATION_TERMS)
        .collect();
    if found.is_empty() {
        None
    } else {
        Some(found.join(", "))
    }
}

/// A name is a short line of 2-4 words near the top, with no digits or contact markers.
fn extract_candidate_name(text: &str) -> Option<&str> {
    text.lines().take(NAME_SCAN_LINES).map(str::trim).find(|line| {
        let words = line.split_whitespace().count();
        let lower = line.to_lowercase();
        (2..=4).contains(&words)
            && line.chars().count() < 50
            && !line.chars().any(|c| c.is_ascii_digit())
            && !["cv", "curriculum", "currículo", "resumo", "email", "e-mail", "@"]
                .iter()
                .any(|marker| lower.contains(marker))
    })
}

fn identify_work_area(text: &str) -> Option<&'static str> {
    let lower = text.to_lowercase();
    WORK_AREAS
        .iter()
        .find(|(_, triggers)| triggers.iter().any(|t| contains_term(&lower, t)))
        .map(|(area, _)| *area)
}

/// Deterministic summarizer: vocabulary and pattern matching only.
#[derive(Debug, Default, Clone, Copy)]
pub struct RuleBasedSummarizer;

impl RuleBasedSummarizer {
    pub fn new() -> Self {
        Self
    }

    pub fn summarize_text(&self, text: &str, file_name: &str, file_type: &str) -> CurriculumSummary {
        let key_skills = detect_skills(text);
        let years = extract_experience_years(text).filter(|y| *y > 0);
        let level = infer_level(text, years, key_skills.len());
        let education = extract_education(text);

        let mut sentences = Vec::new();
        let mut profile = match extract_candidate_name(text) {
            Some(name) => format!("Perfil de {name}"),
            None => "Perfil do candidato".to_string(),
        };
        if level != PositionLevel::Unknown {
            profile.push_str(&format!(", profissional de nível {level}"));
        }
        if !key_skills.is_empty() {
            let shown = key_skills
                .iter()
                .take(SUMMARY_SKILLS)
                .cloned()
                .collect::<Vec<_>>()
                .join(", ");
            profile.push_str(&format!(" com experiência em {shown}"));
            if key_skills.len() > SUMMARY_SKILLS {
                profile.push_str(&format!(
                    " e outras {} tecnologias",
                    key_skills.len() - SUMMARY_SKILLS
                ));
            }
        }
        if let Some(y) = years {
            profile.push_str(&format!(" ({y} anos de experiência)"));
        }
        sentences.push(profile);
        if let Some(edu) = &education {
            sentences.push(format!("Formação: {edu}"));
        }
        if let Some(area) = identify_work_area(text) {
            sentences.push(format!("Área: {area}"));
        }

        CurriculumSummary {
            file_name: file_name.to_string(),
            file_type: file_type.to_string(),
            extracted_text_length: text.chars().count(),
            summary: format!("{}.", sentences.join(". ")),
            key_skills,
            experience_years: years
                .map(|y| format!("{y} anos"))
                .unwrap_or_else(|| NOT_SPECIFIED.to_string()),
            position_level: level,
            education: education.unwrap_or_else(|| NOT_SPECIFIED.to_string()),
        }
    }
}

#[async_trait]
impl Summarizer for RuleBasedSummarizer {
    async fn summarize(
        &self,
        text: &str,
        file_name: &str,
        file_type: &str,
    ) -> Result<CurriculumSummary, SummarizationFailure> {
        Ok(self.summarize_text(text, file_name, file_type))
    }

    fn backend(&self) -> &'static str {
        "rules"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SENIOR_CV: &str = "Maria Souza\n\
        Engenheira de Software Sênior\n\
        8 anos de experiência com Python, Django, PostgreSQL e Docker.\n\
        Bacharelado em Ciência da Computação - Universidade de São Paulo";

    #[test]
    fn test_experience_patterns_in_both_languages() {
        assert_eq!(extract_experience_years("Tenho 6 anos de experiência"), Some(6));
        assert_eq!(extract_experience_years("Experiência de 3 anos em QA"), Some(3));
        assert_eq!(extract_experience_years("10 years of experience"), Some(10));
        assert_eq!(extract_experience_years("Python 5+ anos"), Some(5));
        assert_eq!(extract_experience_years("sem números aqui"), None);
    }

    #[test]
    fn test_level_keywords_win_over_fallbacks() {
        assert_eq!(infer_level("Tech Lead", Some(1), 0), PositionLevel::Senior);
        assert_eq!(infer_level("Estagiário de TI", Some(9), 12), PositionLevel::Junior);
        assert_eq!(infer_level("Analista pleno", None, 0), PositionLevel::Pleno);
    }

    #[test]
    fn test_level_falls_back_to_years_then_skills() {
        assert_eq!(infer_level("analista", Some(5), 0), PositionLevel::Senior);
        assert_eq!(infer_level("analista", Some(2), 0), PositionLevel::Pleno);
        assert_eq!(infer_level("analista", Some(1), 0), PositionLevel::Junior);
        assert_eq!(infer_level("analista", None, 10), PositionLevel::Senior);
        assert_eq!(infer_level("analista", None, 5), PositionLevel::Pleno);
        assert_eq!(infer_level("analista", None, 1), PositionLevel::Junior);
        assert_eq!(infer_level("analista", None, 0), PositionLevel::Unknown);
    }

    #[test]
    fn test_candidate_name_skips_contact_lines() {
        let text = "email: ana@exemplo.com\nAna Paula Ribeiro\nDesenvolvedora";
        assert_eq!(extract_candidate_name(text), Some("Ana Paula Ribeiro"));
        assert_eq!(extract_candidate_name("Currículo Vitae 2024\nTelefone 1234"), None);
    }

    #[test]
    fn test_senior_resume_summary() {
        let summary = RuleBasedSummarizer::new().summarize_text(SENIOR_CV, "maria.pdf", "application/pdf");
        assert_eq!(
            summary.key_skills,
            vec!["Python", "Django", "PostgreSQL", "Docker"]
        );
        assert_eq!(summary.experience_years, "8 anos");
        assert_eq!(summary.position_level, PositionLevel::Senior);
        assert!(summary.education.contains("Bacharelado"));
        assert!(summary.summary.starts_with("Perfil de Maria Souza"));
        assert!(summary.summary.contains("Área: Desenvolvimento de Software"));
        assert_eq!(summary.extracted_text_length, SENIOR_CV.chars().count());
    }

    #[test]
    fn test_sparse_text_uses_placeholders() {
        let summary = RuleBasedSummarizer::new().summarize_text("Olá mundo", "x.png", "image/png");
        assert!(summary.key_skills.is_empty());
        assert_eq!(summary.experience_years, NOT_SPECIFIED);
        assert_eq!(summary.education, NOT_SPECIFIED);
        assert_eq!(summary.position_level, PositionLevel::Unknown);
    }

    #[tokio::test]
    async fn test_summarize_is_deterministic() {
        let summarizer = RuleBasedSummarizer::new();
        let first = summarizer.summarize(SENIOR_CV, "a.pdf", "application/pdf").await.unwrap();
        let second = summarizer.summarize(SENIOR_CV, "a.pdf", "application/pdf").await.unwrap();
        assert_eq!(first, second);
    }
}
