//! Sequential grading run
//!
//! Idle -> (optional off-peak wait) -> Running -> Idle. Images are processed
//! one at a time in selection order; a failed OCR or AI call is recorded in
//! that image's report and the run continues.

use crate::annotate::{Annotator, OutputNames};
use crate::config::Settings;
use crate::error::{GraderError, Result};
use crate::grader::{Grader, GradingClient};
use crate::ocr::{TesseractOcr, TextRecognizer};
use crate::schedule::{cancel_pair, time_until_window, wait_or_cancel, CancelToken, Canceller, Waited};
use chrono::{Local, NaiveDateTime};
use essay_grader_common::{
    build_grading_prompt, format_summary, parse_score_value, total_usage, Grading, SUMMARY_FILE_NAME,
};
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use thiserror::Error;
use tracing::{error, info, warn};

/// Created next to the first selected image.
pub const OUTPUT_DIR_NAME: &str = "grading-results";

const PREVIEW_CHARS: usize = 100;

#[derive(Debug, Clone, Default)]
pub struct BatchRequest {
    pub images: Vec<PathBuf>,
    pub title: String,
    pub rubric: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Please select image files first")]
    NoImages,
    #[error("Please set the API key first")]
    MissingApiKey,
    #[error("Please enter the essay title")]
    MissingTitle,
    #[error("Please enter the grading rubric")]
    MissingRubric,
}

/// When to start relative to the off-peak window.
#[derive(Debug, Clone, Copy)]
pub enum StartPolicy {
    Immediately,
    /// Wait for the window if `now` falls outside it.
    OffPeak { now: NaiveDateTime },
}

impl StartPolicy {
    pub fn from_settings(settings: &Settings) -> Self {
        if settings.api.cost_saving {
            StartPolicy::OffPeak {
                now: Local::now().naive_local(),
            }
        } else {
            StartPolicy::Immediately
        }
    }
}

#[derive(Debug, Clone)]
pub struct EssayOutcome {
    pub image: PathBuf,
    pub ocr_text: String,
    pub grading: Grading,
    pub score_label: String,
    pub score: Option<f32>,
    pub annotated_image: Option<PathBuf>,
    pub report_path: PathBuf,
}

#[derive(Debug, Clone)]
pub struct BatchSummary {
    pub output_dir: PathBuf,
    pub summary_path: PathBuf,
    pub outcomes: Vec<EssayOutcome>,
    pub total_prompt_tokens: u64,
    pub total_completion_tokens: u64,
}

#[derive(Debug, Clone)]
pub enum BatchOutcome {
    Finished(BatchSummary),
    Cancelled,
}

#[derive(Debug, Clone)]
pub enum BatchEvent {
    Waiting { until: NaiveDateTime },
    Started { total: usize, output_dir: PathBuf },
    Progress { index: usize, total: usize, preview: String },
    Finished(BatchSummary),
    Cancelled,
    Failed(String),
}

/// First failing check, in the order the user fills the form.
pub fn validate(request: &BatchRequest, settings: &Settings) -> std::result::Result<(), ValidationError> {
    if request.images.is_empty() {
        return Err(ValidationError::NoImages);
    }
    if settings.effective_api_key().is_none() {
        return Err(ValidationError::MissingApiKey);
    }
    if request.title.trim().is_empty() {
        return Err(ValidationError::MissingTitle);
    }
    if request.rubric.trim().is_empty() {
        return Err(ValidationError::MissingRubric);
    }
    Ok(())
}

pub fn output_dir_for(first_image: &Path) -> PathBuf {
    first_image
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."))
        .join(OUTPUT_DIR_NAME)
}

pub async fn run_batch(
    request: &BatchRequest,
    recognizer: &dyn TextRecognizer,
    grader: &dyn Grader,
    annotator: &Annotator,
    policy: StartPolicy,
    token: &CancelToken,
    events: &Sender<BatchEvent>,
) -> Result<BatchOutcome> {
    let Some(first) = request.images.first() else {
        return Err(ValidationError::NoImages.into());
    };

    if let StartPolicy::OffPeak { now } = policy {
        if let Some((until, wait)) = time_until_window(now) {
            info!("Cost-saving mode: waiting until {until}");
            let _ = events.send(BatchEvent::Waiting { until });
            if wait_or_cancel(wait, token).await == Waited::Cancelled {
                info!("Batch cancelled before the off-peak window");
                return Ok(BatchOutcome::Cancelled);
            }
        }
    }

    let output_dir = output_dir_for(first);
    std::fs::create_dir_all(&output_dir)?;
    let total = request.images.len();
    info!("Grading {total} essays into {}", output_dir.display());
    let _ = events.send(BatchEvent::Started {
        total,
        output_dir: output_dir.clone(),
    });

    let mut outcomes = Vec::with_capacity(total);
    let mut reports = Vec::with_capacity(total);
    let mut names = OutputNames::new();
    for (index, image) in request.images.iter().enumerate() {
        if token.is_cancelled() {
            info!("Batch cancelled after {index}/{total} essays");
            return Ok(BatchOutcome::Cancelled);
        }

        let ocr_text = recognizer.recognize(image).await;
        let prompt = build_grading_prompt(&request.title, &request.rubric, &ocr_text);
        let grading = grader.grade(&prompt).await;
        let output_stem = names.claim(image);
        let annotated = annotator.annotate(image, &output_stem, &ocr_text, &grading, &output_dir);

        let preview = grading.preview(PREVIEW_CHARS);
        info!("[{}/{total}] {}: {}", index + 1, image.display(), annotated.score_label);
        let _ = events.send(BatchEvent::Progress { index, total, preview });

        reports.push((
            annotated
                .report_path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default(),
            annotated.report,
        ));
        outcomes.push(EssayOutcome {
            image: image.clone(),
            ocr_text,
            score: parse_score_value(&annotated.score_label).ok(),
            score_label: annotated.score_label,
            grading,
            annotated_image: annotated.annotated_image,
            report_path: annotated.report_path,
        });
    }

    let (total_prompt_tokens, total_completion_tokens) =
        total_usage(outcomes.iter().map(|o| o.grading.usage.as_ref()));
    let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
    let summary = format_summary(&timestamp, total_prompt_tokens, total_completion_tokens, &reports);
    let summary_path = output_dir.join(SUMMARY_FILE_NAME);
    if let Err(err) = std::fs::write(&summary_path, summary) {
        error!("Writing summary {} failed: {err}", summary_path.display());
    }

    Ok(BatchOutcome::Finished(BatchSummary {
        output_dir,
        summary_path,
        outcomes,
        total_prompt_tokens,
        total_completion_tokens,
    }))
}

/// Run a batch on its own thread; events arrive on `events`.
///
/// Validation and client setup happen on the caller's thread so the GUI can
/// report them before anything is scheduled.
pub fn spawn_batch(
    request: BatchRequest,
    settings: &Settings,
    tesseract: PathBuf,
    events: Sender<BatchEvent>,
) -> Result<Canceller> {
    validate(&request, settings)?;
    let grader = GradingClient::from_settings(settings)?;
    let annotator = Annotator::from_settings(&settings.annotate)?;
    let recognizer = TesseractOcr::new(tesseract);
    let policy = StartPolicy::from_settings(settings);
    let (canceller, token) = cancel_pair();

    std::thread::Builder::new()
        .name("grading-worker".into())
        .spawn(move || {
            let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
                Ok(rt) => rt,
                Err(err) => {
                    let _ = events.send(BatchEvent::Failed(format!("runtime: {err}")));
                    return;
                }
            };
            let result = runtime.block_on(run_batch(
                &request,
                &recognizer,
                &grader,
                &annotator,
                policy,
                &token,
                &events,
            ));
            let event = match result {
                Ok(BatchOutcome::Finished(summary)) => BatchEvent::Finished(summary),
                Ok(BatchOutcome::Cancelled) => BatchEvent::Cancelled,
                Err(err) => {
                    warn!("Batch failed: {err}");
                    BatchEvent::Failed(err.to_string())
                }
            };
            let _ = events.send(event);
        })
        .map_err(GraderError::Io)?;

    Ok(canceller)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings_with_key() -> Settings {
        let mut settings = Settings::default();
        settings.api.key = "sk-test".into();
        settings
    }

    fn request() -> BatchRequest {
        BatchRequest {
            images: vec![PathBuf::from("a.png")],
            title: "My Hometown".into(),
            rubric: "Content 10".into(),
        }
    }

    #[test]
    fn test_validate_ok() {
        assert_eq!(validate(&request(), &settings_with_key()), Ok(()));
    }

    #[test]
    fn test_validate_order() {
        let settings = settings_with_key();
        let mut req = request();
        req.title.clear();
        req.rubric.clear();
        assert_eq!(validate(&req, &settings), Err(ValidationError::MissingTitle));

        req.title = "t".into();
        assert_eq!(validate(&req, &settings), Err(ValidationError::MissingRubric));

        req.images.clear();
        assert_eq!(validate(&req, &settings), Err(ValidationError::NoImages));
    }

    #[test]
    fn test_validate_whitespace_title_rejected() {
        let mut req = request();
        req.title = "  \n".into();
        assert_eq!(validate(&req, &settings_with_key()), Err(ValidationError::MissingTitle));
    }

    #[test]
    fn test_output_dir_next_to_first_image() {
        assert_eq!(
            output_dir_for(Path::new("/scans/class1/a.jpg")),
            Path::new("/scans/class1/grading-results")
        );
        assert_eq!(output_dir_for(Path::new("a.jpg")), Path::new("./grading-results"));
    }

    #[test]
    fn test_spawn_rejects_invalid_request() {
        let (tx, _rx) = std::sync::mpsc::channel();
        let result = spawn_batch(BatchRequest::default(), &settings_with_key(), PathBuf::from("tesseract"), tx);
        assert!(matches!(result, Err(GraderError::Validation(ValidationError::NoImages))));
    }
}
