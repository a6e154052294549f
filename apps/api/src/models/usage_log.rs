use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Metadata-only audit record of one request. Never carries file content or
/// extracted text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct UsageLogEntry {
    pub request_id: Uuid,
    pub user_id: String,
    #[sqlx(rename = "logged_at")]
    pub timestamp: DateTime<Utc>,
    pub query: Option<String>,
    pub files_count: i32,
    pub processing_time_seconds: f64,
    pub success: bool,
    pub error_message: Option<String>,
}

/// Optional filters for aggregate statistics.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatsFilter {
    pub user_id: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}

impl StatsFilter {
    pub fn matches(&self, entry: &UsageLogEntry) -> bool {
        self.user_id.as_deref().map_or(true, |u| entry.user_id == u)
            && self.start_date.map_or(true, |s| entry.timestamp >= s)
            && self.end_date.map_or(true, |e| entry.timestamp <= e)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageStats {
    pub total_requests: u64,
    pub successful_requests: u64,
    pub success_rate: f64,
    pub total_files_processed: u64,
    pub average_processing_time: f64,
    pub unique_users_count: u64,
}

impl UsageStats {
    /// Derives the rounded ratios from raw aggregates. Every store funnels
    /// through here so the numbers agree regardless of backend.
    pub fn from_totals(
        total_requests: u64,
        successful_requests: u64,
        total_files_processed: u64,
        total_processing_time: f64,
        unique_users_count: u64,
    ) -> Self {
        let (success_rate, average_processing_time) = if total_requests == 0 {
            (0.0, 0.0)
        } else {
            (
                round_to(successful_requests as f64 / total_requests as f64 * 100.0, 2),
                round_to(total_processing_time / total_requests as f64, 3),
            )
        };
        Self {
            total_requests,
            successful_requests,
            success_rate,
            total_files_processed,
            average_processing_time,
            unique_users_count,
        }
    }
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10_f64.powi(decimals);
    (value * factor).round() / factor
}
