use async_trait::async_trait;
use sqlx::error::ErrorKind;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use super::{validate_entry, AuditLogStore, StorageError};
use crate::models::usage_log::{StatsFilter, UsageLogEntry, UsageStats};

const ENTRY_COLUMNS: &str = "request_id, user_id, logged_at, query, files_count, \
     processing_time_seconds, success, error_message";

/// Audit store on the `usage_logs` table.
#[derive(Clone)]
pub struct PgAuditLogStore {
    pool: PgPool,
}

impl PgAuditLogStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn map_sqlx_error(err: sqlx::Error, request_id: Option<Uuid>) -> StorageError {
    if let sqlx::Error::Database(db_err) = &err {
        match (db_err.kind(), request_id) {
            (ErrorKind::UniqueViolation, Some(id)) => return StorageError::DuplicateKey(id),
            (ErrorKind::NotNullViolation | ErrorKind::CheckViolation, _) => {
                return StorageError::ValidationError(db_err.message().to_string())
            }
            _ => {}
        }
    }
    StorageError::ConnectionError(err.to_string())
}

#[async_trait]
impl AuditLogStore for PgAuditLogStore {
    async fn append(&self, entry: &UsageLogEntry) -> Result<(), StorageError> {
        validate_entry(entry)?;

        sqlx::query(
            r#"
            INSERT INTO usage_logs
                (request_id, user_id, logged_at, query, files_count,
                 processing_time_seconds, success, error_message)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(entry.request_id)
        .bind(&entry.user_id)
        .bind(entry.timestamp)
        .bind(&entry.query)
        .bind(entry.files_count)
        .bind(entry.processing_time_seconds)
        .bind(entry.success)
        .bind(&entry.error_message)
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error(e, Some(entry.request_id)))?;

        info!("Audit entry stored for request {}", entry.request_id);
        Ok(())
    }

    async fn query_by_user(
        &self,
        user_id: &str,
        skip: u32,
        limit: u32,
    ) -> Result<Vec<UsageLogEntry>, StorageError> {
        sqlx::query_as::<_, UsageLogEntry>(&format!(
            "SELECT {ENTRY_COLUMNS} FROM usage_logs WHERE user_id = $1 \
             ORDER BY logged_at DESC LIMIT $2 OFFSET $3"
        ))
        .bind(user_id)
        .bind(i64::from(limit))
        .bind(i64::from(skip))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error(e, None))
    }

    async fn recent_activity(&self, limit: u32) -> Result<Vec<UsageLogEntry>, StorageError> {
        sqlx::query_as::<_, UsageLogEntry>(&format!(
            "SELECT {ENTRY_COLUMNS} FROM usage_logs ORDER BY logged_at DESC LIMIT $1"
        ))
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error(e, None))
    }

    async fn stats(&self, filter: &StatsFilter) -> Result<UsageStats, StorageError> {
        let (total, successful, files, time, users): (i64, i64, i64, f64, i64) = sqlx::query_as(
            r#"
            SELECT
                COUNT(*)::BIGINT,
                COUNT(*) FILTER (WHERE success)::BIGINT,
                COALESCE(SUM(files_count), 0)::BIGINT,
                COALESCE(SUM(processing_time_seconds), 0)::DOUBLE PRECISION,
                COUNT(DISTINCT user_id)::BIGINT
            FROM usage_logs
            WHERE ($1::TEXT IS NULL OR user_id = $1)
              AND ($2::TIMESTAMPTZ IS NULL OR logged_at >= $2)
              AND ($3::TIMESTAMPTZ IS NULL OR logged_at <= $3)
            "#,
        )
        .bind(&filter.user_id)
        .bind(filter.start_date)
        .bind(filter.end_date)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_sqlx_error(e, None))?;

        Ok(UsageStats::from_totals(
            total.max(0) as u64,
            successful.max(0) as u64,
            files.max(0) as u64,
            time,
            users.max(0) as u64,
        ))
    }

    async fn find_by_request(
        &self,
        request_id: Uuid,
    ) -> Result<Option<UsageLogEntry>, StorageError> {
        sqlx::query_as::<_, UsageLogEntry>(&format!(
            "SELECT {ENTRY_COLUMNS} FROM usage_logs WHERE request_id = $1"
        ))
        .bind(request_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error(e, None))
    }

    async fn ping(&self) -> Result<(), StorageError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map(|_| ())
            .map_err(|e| map_sqlx_error(e, None))
    }

    fn backend(&self) -> &'static str {
        "postgres"
    }
}
