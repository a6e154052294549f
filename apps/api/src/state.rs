use std::sync::Arc;

use crate::audit::AuditLogStore;
use crate::config::Config;
use crate::extraction::TextExtractor;
use crate::pipeline::Pipeline;
use crate::summarization::Summarizer;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub pipeline: Arc<Pipeline>,
    /// Read side of the audit log. The pipeline holds the same store for writes.
    pub audit: Arc<dyn AuditLogStore>,
    pub extractor: Arc<dyn TextExtractor>,
    pub summarizer: Arc<dyn Summarizer>,
}
