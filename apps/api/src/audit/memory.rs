use std::collections::{HashSet, VecDeque};

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use super::{validate_entry, AuditLogStore, StorageError};
use crate::models::usage_log::{StatsFilter, UsageLogEntry, UsageStats};

/// Entries kept before the oldest are evicted.
pub const DEFAULT_RETENTION: usize = 10_000;

/// Process-local store. Used when no database is configured, and by tests.
/// Holds at most `retention` entries, evicting in insertion order; everything
/// is lost on restart.
#[derive(Debug)]
pub struct InMemoryAuditLogStore {
    inner: RwLock<Inner>,
    retention: usize,
}

#[derive(Debug, Default)]
struct Inner {
    entries: VecDeque<UsageLogEntry>,
    ids: HashSet<Uuid>,
}

impl Default for InMemoryAuditLogStore {
    fn default() -> Self {
        Self::with_retention(DEFAULT_RETENTION)
    }
}

impl InMemoryAuditLogStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_retention(retention: usize) -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
            retention: retention.max(1),
        }
    }

    #[cfg(test)]
    pub async fn len(&self) -> usize {
        self.inner.read().await.entries.len()
    }
}

/// Newest first. Equal timestamps put the later insert first.
fn newest_first<'a>(
    entries: impl DoubleEndedIterator<Item = &'a UsageLogEntry>,
    keep: impl Fn(&UsageLogEntry) -> bool,
    skip: u32,
    limit: u32,
) -> Vec<UsageLogEntry> {
    let mut selected: Vec<UsageLogEntry> = entries.rev().filter(|e| keep(e)).cloned().collect();
    selected.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    selected
        .into_iter()
        .skip(skip as usize)
        .take(limit as usize)
        .collect()
}

#[async_trait]
impl AuditLogStore for InMemoryAuditLogStore {
    async fn append(&self, entry: &UsageLogEntry) -> Result<(), StorageError> {
        validate_entry(entry)?;
        let mut inner = self.inner.write().await;
        if !inner.ids.insert(entry.request_id) {
            return Err(StorageError::DuplicateKey(entry.request_id));
        }
        inner.entries.push_back(entry.clone());
        while inner.entries.len() > self.retention {
            if let Some(evicted) = inner.entries.pop_front() {
                inner.ids.remove(&evicted.request_id);
                debug!("Audit entry {} evicted from memory store", evicted.request_id);
            }
        }
        Ok(())
    }

    async fn query_by_user(
        &self,
        user_id: &str,
        skip: u32,
        limit: u32,
    ) -> Result<Vec<UsageLogEntry>, StorageError> {
        let inner = self.inner.read().await;
        Ok(newest_first(
            inner.entries.iter(),
            |e| e.user_id == user_id,
            skip,
            limit,
        ))
    }

    async fn recent_activity(&self, limit: u32) -> Result<Vec<UsageLogEntry>, StorageError> {
        let inner = self.inner.read().await;
        Ok(newest_first(inner.entries.iter(), |_| true, 0, limit))
    }

    async fn stats(&self, filter: &StatsFilter) -> Result<UsageStats, StorageError> {
        let inner = self.inner.read().await;
        let selected: Vec<&UsageLogEntry> =
            inner.entries.iter().filter(|e| filter.matches(e)).collect();

        let total = selected.len() as u64;
        let successful = selected.iter().filter(|e| e.success).count() as u64;
        let files: u64 = selected.iter().map(|e| e.files_count.max(0) as u64).sum();
        let time: f64 = selected.iter().map(|e| e.processing_time_seconds).sum();
        let users = selected
            .iter()
            .map(|e| e.user_id.as_str())
            .collect::<HashSet<_>>()
            .len() as u64;

        Ok(UsageStats::from_totals(total, successful, files, time, users))
    }

    async fn find_by_request(
        &self,
        request_id: Uuid,
    ) -> Result<Option<UsageLogEntry>, StorageError> {
        let inner = self.inner.read().await;
        if !inner.ids.contains(&request_id) {
            return Ok(None);
        }
        Ok(inner.entries.iter().find(|e| e.request_id == request_id).cloned())
    }

    async fn ping(&self) -> Result<(), StorageError> {
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}
