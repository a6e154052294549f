use std::sync::OnceLock;

use regex::Regex;

use crate::models::analysis::PositionLevel;
use crate::summarization::vocabulary::{contains_term, detect_skills, QUERY_STOPWORDS};

/// What a free-text job query asks for.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryRequirements {
    pub skills: Vec<String>,
    pub min_years: Option<u32>,
    pub level: Option<PositionLevel>,
}

fn years_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(\d+)\s*\+?\s*(?:anos?|years?)\b").expect("years pattern is valid")
    })
}

impl QueryRequirements {
    pub fn parse(query: &str) -> Self {
        let lower = query.to_lowercase();

        let mut skills = detect_skills(query);
        if skills.is_empty() {
            skills = free_terms(&lower);
        }

        let min_years = years_pattern()
            .captures(&lower)
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().parse().ok());

        let level = if contains_term(&lower, "sênior") || contains_term(&lower, "senior") {
            Some(PositionLevel::Senior)
        } else if contains_term(&lower, "pleno") {
            Some(PositionLevel::Pleno)
        } else if contains_term(&lower, "júnior") || contains_term(&lower, "junior") {
            Some(PositionLevel::Junior)
        } else {
            None
        };

        Self {
            skills,
            min_years,
            level,
        }
    }

    /// True when the query names none of the scored dimensions.
    pub fn is_empty(&self) -> bool {
        self.skills.is_empty() && self.min_years.is_none() && self.level.is_none()
    }
}

/// Non-stopword alphabetic tokens of at least three characters, deduplicated.
fn free_terms(lower: &str) -> Vec<String> {
    let mut terms: Vec<String> = Vec::new();
    for token in lower.split(|c: char| !(c.is_alphanumeric() || c == '+' || c == '#' || c == '.')) {
        let token = token.trim_matches('.');
        if token.chars().count() < 3
            || token.chars().all(|c| c.is_ascii_digit() || c == '+')
            || QUERY_STOPWORDS.contains(&token)
            || terms.iter().any(|t| t == token)
        {
            continue;
        }
        terms.push(token.to_string());
    }
    terms
}
