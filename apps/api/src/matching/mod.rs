//! Matching: scores summaries against a free-text job query.
//!
//! Three dimensions contribute: skill overlap, years of experience against a
//! stated minimum, and seniority alignment. Only the dimensions the query
//! actually names are weighed, so any query can reach a score of 1.0.

use crate::models::analysis::{CurriculumSummary, PositionLevel, QueryAnalysis, QueryMatch};
use crate::summarization::vocabulary::{canonical_skill, contains_term};

pub mod query;

pub use query::QueryRequirements;

/// Relative weight of each scoring dimension. Tunable; a score is divided by
/// the sum of the weights of the dimensions the query names.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchWeights {
    pub skills: f64,
    pub experience: f64,
    pub level: f64,
}

impl MatchWeights {
    pub const DEFAULT: MatchWeights = MatchWeights {
        skills: 0.5,
        experience: 0.3,
        level: 0.2,
    };
}

impl Default for MatchWeights {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Containment matching only kicks in when the shorter side has at least this
/// many characters, so "c" does not match "c++".
const MIN_SUBSTRING_LEN: usize = 3;

#[derive(Debug, Clone, Default)]
pub struct MatchingEngine {
    weights: MatchWeights,
}

struct Scored {
    score: f64,
    reasons: Vec<String>,
}

impl MatchingEngine {
    pub fn new(weights: MatchWeights) -> Self {
        Self { weights }
    }

    /// Scores every summary and orders them by descending score. Ties keep
    /// submission order.
    pub fn rank(&self, query: &str, summaries: &[CurriculumSummary]) -> QueryAnalysis {
        let requirements = QueryRequirements::parse(query);

        let mut best_matches: Vec<QueryMatch> = summaries
            .iter()
            .map(|summary| {
                let scored = self.score(&requirements, summary);
                QueryMatch {
                    file_name: summary.file_name.clone(),
                    score: scored.score,
                    match_reasons: scored.reasons,
                }
            })
            .collect();
        best_matches.sort_by(|a, b| b.score.total_cmp(&a.score));

        let analysis_reasoning = build_reasoning(query, &best_matches);
        QueryAnalysis {
            query: query.to_string(),
            best_matches,
            analysis_reasoning,
        }
    }

    fn score(&self, req: &QueryRequirements, summary: &CurriculumSummary) -> Scored {
        let mut weighted = 0.0;
        let mut active = 0.0;
        let mut reasons = Vec::new();

        if !req.skills.is_empty() {
            active += self.weights.skills;
            let matched: Vec<&str> = req
                .skills
                .iter()
                .filter_map(|wanted| {
                    summary
                        .key_skills
                        .iter()
                        .find(|have| skill_matches(wanted, have))
                        .map(String::as_str)
                })
                .collect();
            if !matched.is_empty() {
                weighted += self.weights.skills * matched.len() as f64 / req.skills.len() as f64;
                reasons.push(format!(
                    "Domínio em: {} ({}/{} requisitos)",
                    matched.join(", "),
                    matched.len(),
                    req.skills.len()
                ));
            }
        }

        if let Some(min_years) = req.min_years {
            active += self.weights.experience;
            let years = leading_years(&summary.experience_years);
            let ratio = match (years, min_years) {
                (_, 0) => 1.0,
                (Some(y), min) => (y as f64 / min as f64).min(1.0),
                (None, _) => 0.0,
            };
            if ratio > 0.0 {
                weighted += self.weights.experience * ratio;
            }
            if let Some(y) = years.filter(|y| *y > 0) {
                reasons.push(format!("Experiência: {y} anos (mínimo {min_years})"));
            }
        }

        if let Some(required) = req.level {
            active += self.weights.level;
            let fit = level_fit(required, summary.position_level);
            if fit > 0.0 {
                weighted += self.weights.level * fit;
                reasons.push(format!("Nível: {}", summary.position_level));
            }
        }

        let score = if active > 0.0 {
            round3((weighted / active).clamp(0.0, 1.0))
        } else {
            0.0
        };
        Scored { score, reasons }
    }
}

/// Compares alias-collapsed keys. Containment is word-bounded, so "React"
/// matches "React Native" but "Java" never matches "JavaScript".
fn skill_matches(wanted: &str, have: &str) -> bool {
    let wanted = canonical_skill(wanted);
    let have = canonical_skill(have);
    if wanted.is_empty() || have.is_empty() {
        return false;
    }
    if wanted == have {
        return true;
    }
    let shorter = wanted.chars().count().min(have.chars().count());
    shorter >= MIN_SUBSTRING_LEN && (contains_term(&have, &wanted) || contains_term(&wanted, &have))
}

/// First run of digits in an experience label such as "6 anos" or "5+ years".
fn leading_years(label: &str) -> Option<u32> {
    let digits: String = label
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}

/// 1.0 at or above the required level, 0.5 one level below, otherwise 0.
fn level_fit(required: PositionLevel, candidate: PositionLevel) -> f64 {
    if candidate == PositionLevel::Unknown {
        return 0.0;
    }
    let (have, want) = (candidate.rank(), required.rank());
    if have >= want {
        1.0
    } else if have + 1 == want {
        0.5
    } else {
        0.0
    }
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

fn build_reasoning(query: &str, ranked: &[QueryMatch]) -> String {
    let Some(best) = ranked.first() else {
        return "Nenhum currículo disponível para análise.".to_string();
    };

    let mut text = format!(
        "Baseado na análise da consulta '{query}', o candidato mais adequado é {} com score {:.2}",
        best.file_name, best.score
    );
    if best.match_reasons.is_empty() {
        text.push_str(", sem requisitos da consulta atendidos. ");
    } else {
        text.push_str(&format!(", devido a: {}. ", best.match_reasons.join("; ")));
    }
    if let Some(second) = ranked.get(1) {
        text.push_str(&format!(
            "O segundo colocado ({}) tem score {:.2}. ",
            second.file_name, second.score
        ));
    }
    text.push_str(recommendation(best.score));
    text
}

fn recommendation(score: f64) -> &'static str {
    if score >= 0.8 {
        "Recomendação: excelente candidato para a posição."
    } else if score >= 0.6 {
        "Recomendação: bom candidato, recomendo entrevista."
    } else if score >= 0.4 {
        "Recomendação: candidato adequado, avaliar outros fatores."
    } else {
        "Recomendação: match parcial, considerar requisitos alternativos."
    }
}
