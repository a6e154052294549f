//! Pipeline: drives one `/analyze` request from uploaded files to response.
//!
//! Per request:
//! 1. Intake: reject empty or oversized batches (still audited).
//! 2. Fan out: each file is extracted then summarized in its own task, capped
//!    by a semaphore. A failure stays in that file's slot.
//! 3. Collect into slots indexed by submission position, under one deadline.
//!    On expiry in-flight tasks are aborted and their files marked `Timeout`.
//! 4. Rank summaries against the query, if any.
//! 5. Append exactly one audit entry, then return the response.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::audit::AuditLogStore;
use crate::config::Config;
use crate::extraction::TextExtractor;
use crate::matching::{MatchWeights, MatchingEngine};
use crate::models::analysis::{
    AnalysisResponse, CurriculumSummary, FailedFile, FailureReason, RequestError,
    RequestFailureKind,
};
use crate::models::upload::UploadedFile;
use crate::models::usage_log::UsageLogEntry;
use crate::summarization::Summarizer;

pub mod handlers;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineSettings {
    pub max_files: usize,
    pub max_concurrency: usize,
    pub timeout: Duration,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            max_files: 20,
            max_concurrency: 4,
            timeout: Duration::from_secs(300),
        }
    }
}

impl PipelineSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_files: config.max_files_per_request,
            max_concurrency: config.max_concurrent_files.max(1),
            timeout: Duration::from_secs(config.processing_timeout_secs),
        }
    }
}

/// Request-level failures. Per-file problems never show up here.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PipelineFailure {
    #[error("No files were provided")]
    NoFilesProvided,

    #[error("{count} files were sent, the limit is {limit} per request")]
    TooManyFiles { count: usize, limit: usize },

    #[error("Processing exceeded the {}s time limit", .0.as_secs())]
    Timeout(Duration),
}

impl PipelineFailure {
    pub fn kind(&self) -> RequestFailureKind {
        match self {
            PipelineFailure::NoFilesProvided => RequestFailureKind::NoFilesProvided,
            PipelineFailure::TooManyFiles { .. } => RequestFailureKind::TooManyFiles,
            PipelineFailure::Timeout(_) => RequestFailureKind::Timeout,
        }
    }

    fn to_request_error(&self) -> RequestError {
        RequestError {
            kind: self.kind(),
            message: self.to_string(),
        }
    }
}

enum FileOutcome {
    Summarized(CurriculumSummary),
    Failed(FailedFile),
}

pub struct Pipeline {
    extractor: Arc<dyn TextExtractor>,
    summarizer: Arc<dyn Summarizer>,
    audit: Arc<dyn AuditLogStore>,
    matcher: MatchingEngine,
    settings: PipelineSettings,
}

impl Pipeline {
    pub fn new(
        extractor: Arc<dyn TextExtractor>,
        summarizer: Arc<dyn Summarizer>,
        audit: Arc<dyn AuditLogStore>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            extractor,
            summarizer,
            audit,
            matcher: MatchingEngine::new(MatchWeights::DEFAULT),
            settings,
        }
    }

    /// Processes one batch. Always returns a well-formed response; the audit
    /// entry is written before returning.
    pub async fn process(
        &self,
        user_id: &str,
        query: Option<&str>,
        files: Vec<UploadedFile>,
    ) -> AnalysisResponse {
        let request_id = Uuid::new_v4();
        let started = Instant::now();
        let query = query.map(str::trim).filter(|q| !q.is_empty());
        let files_count = files.len();

        info!("Request {request_id}: {files_count} file(s) from user {user_id}");

        let response = match self.check_intake(files_count) {
            Err(failure) => {
                warn!("Request {request_id} rejected at intake: {failure}");
                AnalysisResponse {
                    request_id,
                    success: false,
                    processed_files: 0,
                    summaries: vec![],
                    failed_files: vec![],
                    query_analysis: None,
                    processing_time_seconds: elapsed_seconds(started),
                    error: Some(failure.to_request_error()),
                }
            }
            Ok(()) => self.run_batch(request_id, started, query, files).await,
        };

        info!(
            "Request {request_id} finished: success={}, processed={}, failed={}, {:.3}s",
            response.success,
            response.processed_files,
            response.failed_files.len(),
            response.processing_time_seconds
        );

        self.record(&response, user_id, query, files_count).await;
        response
    }

    fn check_intake(&self, files_count: usize) -> Result<(), PipelineFailure> {
        if files_count == 0 {
            return Err(PipelineFailure::NoFilesProvided);
        }
        if files_count > self.settings.max_files {
            return Err(PipelineFailure::TooManyFiles {
                count: files_count,
                limit: self.settings.max_files,
            });
        }
        Ok(())
    }

    async fn run_batch(
        &self,
        request_id: Uuid,
        started: Instant,
        query: Option<&str>,
        files: Vec<UploadedFile>,
    ) -> AnalysisResponse {
        let names: Vec<String> = files.iter().map(|f| f.name.clone()).collect();
        let semaphore = Arc::new(Semaphore::new(self.settings.max_concurrency.max(1)));
        let mut tasks = JoinSet::new();

        for (index, file) in files.into_iter().enumerate() {
            let extractor = Arc::clone(&self.extractor);
            let summarizer = Arc::clone(&self.summarizer);
            let semaphore = Arc::clone(&semaphore);
            tasks.spawn(async move {
                // Never closed; a permit is always granted eventually.
                let _permit = semaphore.acquire_owned().await.ok();
                let outcome = process_file(extractor.as_ref(), summarizer.as_ref(), &file).await;
                (index, outcome)
            });
        }

        let mut slots: Vec<Option<FileOutcome>> = names.iter().map(|_| None).collect();
        let deadline = started + self.settings.timeout;
        let mut timed_out = false;

        loop {
            match tokio::time::timeout_at(deadline, tasks.join_next()).await {
                Ok(Some(Ok((index, outcome)))) => slots[index] = Some(outcome),
                Ok(Some(Err(join_error))) => {
                    error!("Request {request_id}: file task aborted: {join_error}");
                }
                Ok(None) => break,
                Err(_) => {
                    timed_out = true;
                    warn!(
                        "Request {request_id}: timed out after {:?}, {} file(s) unfinished",
                        self.settings.timeout,
                        tasks.len()
                    );
                    // Aborted tasks drop their temp dirs and child processes.
                    tasks.shutdown().await;
                    break;
                }
            }
        }

        let mut summaries = Vec::new();
        let mut failed_files = Vec::new();
        for (slot, name) in slots.into_iter().zip(names) {
            match slot {
                Some(FileOutcome::Summarized(summary)) => summaries.push(summary),
                Some(FileOutcome::Failed(failed)) => failed_files.push(failed),
                None if timed_out => failed_files.push(FailedFile::new(name, FailureReason::Timeout)),
                None => failed_files.push(FailedFile::new(name, FailureReason::InternalError)),
            }
        }

        // Ranking is synchronous, so partial summaries are still ranked after a timeout.
        let query_analysis = match query {
            Some(q) if !summaries.is_empty() => Some(self.matcher.rank(q, &summaries)),
            _ => None,
        };

        let processed_files = summaries.len();
        AnalysisResponse {
            request_id,
            success: processed_files > 0 && !timed_out,
            processed_files,
            summaries,
            failed_files,
            query_analysis,
            processing_time_seconds: elapsed_seconds(started),
            error: timed_out
                .then(|| PipelineFailure::Timeout(self.settings.timeout).to_request_error()),
        }
    }

    /// Appends the audit entry. A storage failure is logged, never returned:
    /// the response has already been computed.
    async fn record(
        &self,
        response: &AnalysisResponse,
        user_id: &str,
        query: Option<&str>,
        files_count: usize,
    ) {
        let error_message = match (&response.error, response.success) {
            (Some(err), _) => Some(err.message.clone()),
            (None, false) => Some(format!("All {files_count} file(s) failed to process")),
            (None, true) => None,
        };
        let entry = UsageLogEntry {
            request_id: response.request_id,
            user_id: user_id.to_string(),
            timestamp: Utc::now(),
            query: query.map(str::to_string),
            files_count: i32::try_from(files_count).unwrap_or(i32::MAX),
            processing_time_seconds: response.processing_time_seconds,
            success: response.success,
            error_message,
        };

        if let Err(e) = self.audit.append(&entry).await {
            error!(
                "Request {}: audit entry could not be written ({}): {e}",
                response.request_id,
                self.audit.backend()
            );
        }
    }
}

async fn process_file(
    extractor: &dyn TextExtractor,
    summarizer: &dyn Summarizer,
    file: &UploadedFile,
) -> FileOutcome {
    let extracted = match extractor.extract(file).await {
        Ok(extracted) => extracted,
        Err(failure) => {
            warn!("File '{}' failed extraction: {failure}", file.name);
            return FileOutcome::Failed(FailedFile::new(&file.name, failure.reason()));
        }
    };
    debug!("File '{}' extracted: {} chars", file.name, extracted.length);

    match summarizer
        .summarize(&extracted.text, &file.name, file.media_type.as_mime())
        .await
    {
        Ok(summary) => FileOutcome::Summarized(summary),
        Err(failure) => {
            warn!("File '{}' failed summarization: {failure}", file.name);
            FileOutcome::Failed(FailedFile::new(&file.name, failure.reason()))
        }
    }
}

fn elapsed_seconds(started: Instant) -> f64 {
    (started.elapsed().as_secs_f64() * 1000.0).round() / 1000.0
}
