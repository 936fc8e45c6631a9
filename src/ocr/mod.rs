//! Tesseract OCR adapter
//!
//! Runs the Tesseract CLI on one image and returns cleaned text. Failures are
//! never raised: the caller gets [`OCR_FAILED`] instead.

mod locate;

pub use locate::{fallback_candidates, locate_tesseract, locate_tesseract_in, TESSERACT_EXE};

use async_trait::async_trait;
use essay_grader_common::OCR_FAILED;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::{debug, warn};

/// Shorter results are treated as failed recognition.
pub const MIN_OCR_CHARS: usize = 10;

/// Latin + Simplified Chinese
pub const OCR_LANGUAGES: &str = "eng+chi_sim";

#[async_trait]
pub trait TextRecognizer: Send + Sync {
    /// Cleaned text, or [`OCR_FAILED`].
    async fn recognize(&self, image: &Path) -> String;
}

#[derive(Debug, Clone)]
pub struct TesseractOcr {
    binary: PathBuf,
    languages: String,
}

impl TesseractOcr {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            languages: OCR_LANGUAGES.to_string(),
        }
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    async fn run(&self, image: &Path) -> std::io::Result<std::process::Output> {
        Command::new(&self.binary)
            .arg(image)
            .arg("stdout")
            .args(["-l", self.languages.as_str()])
            .kill_on_drop(true)
            .output()
            .await
    }
}

#[async_trait]
impl TextRecognizer for TesseractOcr {
    async fn recognize(&self, image: &Path) -> String {
        let output = match self.run(image).await {
            Ok(output) => output,
            Err(err) => {
                warn!("OCR could not start {}: {err}", self.binary.display());
                return OCR_FAILED.to_string();
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            warn!(
                "OCR failed on {} (code {:?}): {}",
                image.display(),
                output.status.code(),
                stderr.trim()
            );
            return OCR_FAILED.to_string();
        }

        let text = clean_ocr_output(&String::from_utf8_lossy(&output.stdout));
        debug!("OCR result for {}: {:?}", image.display(), text);
        text
    }
}

/// Trim every line, drop blank ones, apply the minimum length.
pub fn clean_ocr_output(raw: &str) -> String {
    let text = raw
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n");

    if text.chars().count() < MIN_OCR_CHARS {
        OCR_FAILED.to_string()
    } else {
        text
    }
}
