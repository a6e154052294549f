use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tracing::debug;

use super::ExtractionFailure;
use crate::models::upload::MediaType;

/// OCR path for images, backed by the tesseract CLI.
///
/// Each call stages the payload in its own temporary directory. The directory
/// is removed when the call returns or its future is dropped, and the child
/// process is killed on drop, so a cancelled request leaves nothing behind.
pub struct TesseractOcr {
    binary: PathBuf,
    languages: String,
    timeout: Duration,
    scratch_root: PathBuf,
}

impl TesseractOcr {
    pub fn new(binary: impl Into<PathBuf>, languages: impl Into<String>, timeout: Duration) -> Self {
        Self {
            binary: binary.into(),
            languages: languages.into(),
            timeout,
            scratch_root: std::env::temp_dir(),
        }
    }

    #[cfg(test)]
    fn with_scratch_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.scratch_root = root.into();
        self
    }

    pub async fn recognize(
        &self,
        bytes: &[u8],
        media_type: MediaType,
    ) -> Result<String, ExtractionFailure> {
        let workdir = tempfile::Builder::new()
            .prefix("cv-ocr-")
            .tempdir_in(&self.scratch_root)
            .map_err(|e| ExtractionFailure::OcrError(format!("scratch directory: {e}")))?;
        let input = workdir
            .path()
            .join(format!("upload.{}", media_type.extension()));
        tokio::fs::write(&input, bytes)
            .await
            .map_err(|e| ExtractionFailure::OcrError(format!("staging upload: {e}")))?;

        let mut command = Command::new(&self.binary);
        command
            .arg(&input)
            .arg("stdout")
            .arg("-l")
            .arg(&self.languages)
            .stdin(Stdio::null())
            .kill_on_drop(true);

        let output = match tokio::time::timeout(self.timeout, command.output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                return Err(ExtractionFailure::OcrError(format!(
                    "failed to launch {}: {e}",
                    self.binary.display()
                )))
            }
            Err(_) => {
                return Err(ExtractionFailure::OcrError(format!(
                    "timed out after {}s",
                    self.timeout.as_secs()
                )))
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(classify_failure(&stderr));
        }

        let text = String::from_utf8_lossy(&output.stdout).into_owned();
        debug!("OCR produced {} chars", text.len());
        Ok(text)
    }

    /// Runs `tesseract --version`; used by the health probe.
    pub async fn version(&self) -> Result<String, String> {
        let output = tokio::time::timeout(
            Duration::from_secs(5),
            Command::new(&self.binary)
                .arg("--version")
                .stdin(Stdio::null())
                .kill_on_drop(true)
                .output(),
        )
        .await
        .map_err(|_| "tesseract --version timed out".to_string())?
        .map_err(|e| format!("cannot run {}: {e}", self.binary.display()))?;

        if !output.status.success() {
            return Err(format!("tesseract exited with {}", output.status));
        }
        // Older releases print the banner on stderr.
        let banner = if output.stdout.is_empty() {
            output.stderr
        } else {
            output.stdout
        };
        Ok(String::from_utf8_lossy(&banner)
            .lines()
            .next()
            .unwrap_or_default()
            .to_string())
    }
}

/// Tesseract reports undecodable images through leptonica; anything else is
/// treated as a tool failure.
fn classify_failure(stderr: &str) -> ExtractionFailure {
    let lower = stderr.to_lowercase();
    let undecodable = ["pixread", "cannot be read", "unknown format", "truncated"]
        .iter()
        .any(|marker| lower.contains(marker));
    if undecodable {
        ExtractionFailure::CorruptFile("image could not be decoded".to_string())
    } else {
        let first_line = stderr.lines().next().unwrap_or("tesseract failed").trim();
        ExtractionFailure::OcrError(first_line.chars().take(200).collect())
    }
}
