mod audit;
mod config;
mod db;
mod errors;
mod extraction;
mod llm_client;
mod matching;
mod models;
mod pipeline;
mod routes;
mod state;
mod summarization;

use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::audit::{AuditLogStore, InMemoryAuditLogStore, PgAuditLogStore};
use crate::config::{Config, SummarizerBackend};
use crate::db::{create_pool, run_migrations};
use crate::extraction::{DocumentTextExtractor, TextExtractor};
use crate::llm_client::LlmClient;
use crate::pipeline::{Pipeline, PipelineSettings};
use crate::routes::build_router;
use crate::state::AppState;
use crate::summarization::{LlmSummarizer, RuleBasedSummarizer, Summarizer};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first; invalid or missing values abort startup
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={}",
                env!("CARGO_CRATE_NAME"),
                &config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Curriculum API v{}", env!("CARGO_PKG_VERSION"));

    // Audit store: PostgreSQL when configured, otherwise process memory
    let audit: Arc<dyn AuditLogStore> = match &config.database_url {
        Some(url) => {
            let pool = create_pool(url).await?;
            run_migrations(&pool).await?;
            Arc::new(PgAuditLogStore::new(pool))
        }
        None => {
            warn!("DATABASE_URL is not set; audit entries are kept in memory and lost on restart");
            Arc::new(InMemoryAuditLogStore::new())
        }
    };

    // Text extraction (pdf-extract + tesseract)
    let extractor: Arc<dyn TextExtractor> = Arc::new(DocumentTextExtractor::from_config(&config));
    info!(
        "Text extraction ready (tesseract: {}, languages: {})",
        config.tesseract_path, config.ocr_languages
    );

    // Summarizer backend
    let summarizer: Arc<dyn Summarizer> = match config.summarizer_backend {
        SummarizerBackend::Llm => {
            let llm = LlmClient::from_config(&config)?;
            info!("LLM summarizer initialized (model: {})", llm.model());
            Arc::new(LlmSummarizer::new(llm))
        }
        SummarizerBackend::Rules => {
            info!("Rule-based summarizer initialized");
            Arc::new(RuleBasedSummarizer::new())
        }
    };

    let settings = PipelineSettings::from_config(&config);
    info!(
        "Pipeline: max {} files/request, {} concurrent, {}s timeout",
        settings.max_files,
        settings.max_concurrency,
        settings.timeout.as_secs()
    );
    let pipeline = Arc::new(Pipeline::new(
        Arc::clone(&extractor),
        Arc::clone(&summarizer),
        Arc::clone(&audit),
        settings,
    ));

    // Build app state
    let state = AppState {
        config: config.clone(),
        pipeline,
        audit,
        extractor,
        summarizer,
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .with_context(|| format!("Invalid HOST/PORT '{}:{}'", config.host, config.port))?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
