use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::usage_log::{StatsFilter, UsageLogEntry, UsageStats};
use crate::state::AppState;

const USER_LOGS_DEFAULT_LIMIT: u32 = 100;
const USER_LOGS_MAX_LIMIT: u32 = 1000;
const RECENT_DEFAULT_LIMIT: u32 = 20;
const RECENT_MAX_LIMIT: u32 = 100;

#[derive(Deserialize)]
pub struct LimitQuery {
    pub limit: Option<u32>,
}

#[derive(Deserialize)]
pub struct UserLogsQuery {
    pub skip: Option<u32>,
    pub limit: Option<u32>,
}

/// Aggregates plus the filters they were computed under.
#[derive(Serialize)]
pub struct StatsReport {
    #[serde(flatten)]
    pub stats: UsageStats,
    pub query_params: StatsFilter,
}

fn clamp_limit(requested: Option<u32>, default: u32, max: u32) -> u32 {
    requested.unwrap_or(default).clamp(1, max)
}

/// GET /logs/:user_id
pub async fn handle_user_logs(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Query(params): Query<UserLogsQuery>,
) -> Result<Json<Vec<UsageLogEntry>>, AppError> {
    let user_id = user_id.trim();
    if user_id.is_empty() {
        return Err(AppError::Validation("user_id must not be blank".into()));
    }
    let limit = clamp_limit(params.limit, USER_LOGS_DEFAULT_LIMIT, USER_LOGS_MAX_LIMIT);
    let skip = params.skip.unwrap_or(0);
    let logs = state.audit.query_by_user(user_id, skip, limit).await?;
    Ok(Json(logs))
}

/// GET /activity/recent
pub async fn handle_recent_activity(
    State(state): State<AppState>,
    Query(params): Query<LimitQuery>,
) -> Result<Json<Vec<UsageLogEntry>>, AppError> {
    let limit = clamp_limit(params.limit, RECENT_DEFAULT_LIMIT, RECENT_MAX_LIMIT);
    Ok(Json(state.audit.recent_activity(limit).await?))
}

/// GET /stats
pub async fn handle_stats(
    State(state): State<AppState>,
    Query(filter): Query<StatsFilter>,
) -> Result<Json<StatsReport>, AppError> {
    if let (Some(start), Some(end)) = (filter.start_date, filter.end_date) {
        if start > end {
            return Err(AppError::Validation(
                "start_date must not be after end_date".into(),
            ));
        }
    }
    let stats = state.audit.stats(&filter).await?;
    Ok(Json(StatsReport {
        stats,
        query_params: filter,
    }))
}

/// GET /requests/:request_id
pub async fn handle_request_details(
    State(state): State<AppState>,
    Path(request_id): Path<Uuid>,
) -> Result<Json<UsageLogEntry>, AppError> {
    state
        .audit
        .find_by_request(request_id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("No audit entry for request {request_id}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limits_default_and_clamp() {
        assert_eq!(clamp_limit(None, 100, 1000), 100);
        assert_eq!(clamp_limit(Some(0), 100, 1000), 1);
        assert_eq!(clamp_limit(Some(5000), 100, 1000), 1000);
        assert_eq!(clamp_limit(Some(7), 20, 100), 7);
    }
}
