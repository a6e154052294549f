use std::str::FromStr;

use anyhow::{bail, Context, Result};

const DEFAULT_LLM_API_URL: &str = "https://api.anthropic.com/v1/messages";
const DEFAULT_LLM_MODEL: &str = "claude-sonnet-4-5";

/// Which summarizer implementation backs the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SummarizerBackend {
    Llm,
    Rules,
}

impl FromStr for SummarizerBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "llm" => Ok(Self::Llm),
            "rules" => Ok(Self::Rules),
            other => bail!("unknown summarizer backend '{other}' (expected 'llm' or 'rules')"),
        }
    }
}

/// Application configuration loaded from environment variables.
/// Built once at startup and never mutated afterwards.
#[derive(Debug, Clone)]
pub struct Config {
    /// Unset means the in-memory audit store.
    pub database_url: Option<String>,
    pub host: String,
    pub port: u16,
    pub tesseract_path: String,
    pub ocr_languages: String,
    pub ocr_timeout_secs: u64,
    pub summarizer_backend: SummarizerBackend,
    pub llm_api_url: String,
    pub llm_model: String,
    pub llm_api_key: Option<String>,
    pub llm_timeout_secs: u64,
    pub llm_max_retries: u32,
    pub max_files_per_request: usize,
    pub max_file_size_bytes: usize,
    pub max_concurrent_files: usize,
    pub processing_timeout_secs: u64,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let summarizer_backend: SummarizerBackend = parse_or("SUMMARIZER_BACKEND", "llm")?;
        let llm_api_key = std::env::var("LLM_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty());
        if summarizer_backend == SummarizerBackend::Llm && llm_api_key.is_none() {
            bail!("LLM_API_KEY must be set when SUMMARIZER_BACKEND=llm");
        }

        let config = Config {
            database_url: std::env::var("DATABASE_URL")
                .ok()
                .filter(|u| !u.trim().is_empty()),
            host: std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: parse_or("PORT", "8000")?,
            tesseract_path: std::env::var("TESSERACT_PATH")
                .unwrap_or_else(|_| "tesseract".to_string()),
            ocr_languages: std::env::var("OCR_LANGUAGES").unwrap_or_else(|_| "por+eng".to_string()),
            ocr_timeout_secs: parse_or("OCR_TIMEOUT_SECONDS", "60")?,
            summarizer_backend,
            llm_api_url: std::env::var("LLM_API_URL")
                .unwrap_or_else(|_| DEFAULT_LLM_API_URL.to_string()),
            llm_model: std::env::var("LLM_MODEL").unwrap_or_else(|_| DEFAULT_LLM_MODEL.to_string()),
            llm_api_key,
            llm_timeout_secs: parse_or("LLM_TIMEOUT_SECONDS", "120")?,
            llm_max_retries: parse_or("LLM_MAX_RETRIES", "3")?,
            max_files_per_request: parse_or("MAX_FILES_PER_REQUEST", "20")?,
            max_file_size_bytes: parse_or("MAX_FILE_SIZE_BYTES", "10485760")?,
            max_concurrent_files: parse_or("MAX_CONCURRENT_FILES", "4")?,
            processing_timeout_secs: parse_or("PROCESSING_TIMEOUT_SECONDS", "300")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        };

        if config.max_files_per_request == 0 || config.max_concurrent_files == 0 {
            bail!("MAX_FILES_PER_REQUEST and MAX_CONCURRENT_FILES must be at least 1");
        }

        Ok(config)
    }

    /// Defaults matching an empty environment, rules backend, no database.
    #[cfg(test)]
    pub fn test_defaults() -> Self {
        Config {
            database_url: None,
            host: "127.0.0.1".to_string(),
            port: 8000,
            tesseract_path: "tesseract".to_string(),
            ocr_languages: "por+eng".to_string(),
            ocr_timeout_secs: 60,
            summarizer_backend: SummarizerBackend::Rules,
            llm_api_url: DEFAULT_LLM_API_URL.to_string(),
            llm_model: DEFAULT_LLM_MODEL.to_string(),
            llm_api_key: None,
            llm_timeout_secs: 120,
            llm_max_retries: 3,
            max_files_per_request: 20,
            max_file_size_bytes: 10 * 1024 * 1024,
            max_concurrent_files: 4,
            processing_timeout_secs: 300,
            rust_log: "info".to_string(),
        }
    }
}

fn parse_or<T>(key: &str, default: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw = std::env::var(key).unwrap_or_else(|_| default.to_string());
    raw.trim()
        .parse::<T>()
        .map_err(|e| anyhow::anyhow!("{e}"))
        .with_context(|| format!("{key} has an invalid value '{raw}'"))
}
