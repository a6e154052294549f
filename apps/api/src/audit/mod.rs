//! Audit log: one metadata-only record per `/analyze` request.
//!
//! The pipeline is the only writer. Read-side queries back the `/logs`,
//! `/activity/recent`, `/stats` and `/requests` endpoints.

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::models::usage_log::{StatsFilter, UsageLogEntry, UsageStats};

pub mod handlers;
pub mod memory;
pub mod postgres;

pub use memory::InMemoryAuditLogStore;
pub use postgres::PgAuditLogStore;

#[derive(Debug, Error)]
pub enum StorageError {
    /// A request id was appended twice. Always a caller bug.
    #[error("audit entry for request {0} already exists")]
    DuplicateKey(Uuid),

    #[error("invalid audit entry: {0}")]
    ValidationError(String),

    #[error("audit store unavailable: {0}")]
    ConnectionError(String),
}

#[async_trait]
pub trait AuditLogStore: Send + Sync {
    /// Inserts a new entry. Never overwrites an existing `request_id`.
    async fn append(&self, entry: &UsageLogEntry) -> Result<(), StorageError>;

    /// Entries for one user, newest first, skipping the newest `skip`.
    async fn query_by_user(
        &self,
        user_id: &str,
        skip: u32,
        limit: u32,
    ) -> Result<Vec<UsageLogEntry>, StorageError>;

    /// Entries across all users, newest first.
    async fn recent_activity(&self, limit: u32) -> Result<Vec<UsageLogEntry>, StorageError>;

    async fn stats(&self, filter: &StatsFilter) -> Result<UsageStats, StorageError>;

    async fn find_by_request(&self, request_id: Uuid)
        -> Result<Option<UsageLogEntry>, StorageError>;

    /// Connectivity check used by `/health`.
    async fn ping(&self) -> Result<(), StorageError>;

    /// "postgres" | "memory"
    fn backend(&self) -> &'static str;
}

/// Schema checks applied by every store before an insert.
pub fn validate_entry(entry: &UsageLogEntry) -> Result<(), StorageError> {
    if entry.request_id.is_nil() {
        return Err(StorageError::ValidationError("request_id is required".into()));
    }
    if entry.user_id.trim().is_empty() {
        return Err(StorageError::ValidationError("user_id is required".into()));
    }
    if entry.files_count < 0 {
        return Err(StorageError::ValidationError(
            "files_count must not be negative".into(),
        ));
    }
    if !entry.processing_time_seconds.is_finite() || entry.processing_time_seconds < 0.0 {
        return Err(StorageError::ValidationError(
            "processing_time_seconds must be a non-negative number".into(),
        ));
    }
    Ok(())
}
