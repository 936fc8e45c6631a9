//! Score stamping and per-essay reports

mod font;

pub use font::{font_candidates, load_font, LoadedFont};

use crate::config::AnnotateSettings;
use crate::error::Result;
use ab_glyph::{FontVec, PxScale};
use essay_grader_common::{format_essay_report, score_label, Grading};
use image::Rgb;
use imageproc::drawing::draw_text_mut;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, error};

pub const SCORE_FONT_PX: f32 = 40.0;
pub const SCORE_ORIGIN: (i32, i32) = (20, 5);
const SCORE_COLOR: Rgb<u8> = Rgb([255, 0, 0]);

/// What was written for one essay.
#[derive(Debug, Clone)]
pub struct Annotated {
    pub score_label: String,
    /// `None` when the image could not be decoded or written.
    pub annotated_image: Option<PathBuf>,
    pub report_path: PathBuf,
    pub report: String,
}

pub struct Annotator {
    font: FontVec,
    font_origin: String,
}

impl Annotator {
    pub fn new(font_override: Option<&Path>) -> Result<Self> {
        let LoadedFont { font, origin } = load_font(font_override)?;
        Ok(Self {
            font,
            font_origin: origin,
        })
    }

    pub fn from_settings(settings: &AnnotateSettings) -> Result<Self> {
        Self::new(settings.font_path.as_deref())
    }

    pub fn font_origin(&self) -> &str {
        &self.font_origin
    }

    /// Write `<output_stem>.txt` then the stamped copy of `image` into `out_dir`.
    ///
    /// `output_stem` comes from [`OutputNames::claim`]. Failures are logged;
    /// the report is written even when the image is not.
    pub fn annotate(
        &self,
        image: &Path,
        output_stem: &str,
        ocr_text: &str,
        grading: &Grading,
        out_dir: &Path,
    ) -> Annotated {
        let label = score_label(&grading.text);
        let report = format_essay_report(ocr_text, &grading.text, grading.usage.as_ref());

        let report_path = out_dir.join(report_file_name(output_stem));
        if let Err(err) = std::fs::write(&report_path, &report) {
            error!("Writing report {} failed: {err}", report_path.display());
        }

        let dest = out_dir.join(image_file_name(output_stem, image));
        let annotated_image = match self.stamp(image, &label, &dest) {
            Ok(()) => Some(dest),
            Err(err) => {
                error!("Annotating {} failed: {err}", image.display());
                None
            }
        };

        Annotated {
            score_label: label,
            annotated_image,
            report_path,
            report,
        }
    }

    /// Draw `label` at the top-left of `image` and save it to `dest`.
    pub fn stamp(&self, image: &Path, label: &str, dest: &Path) -> Result<()> {
        let mut canvas = image::open(image)?.to_rgb8();
        draw_text_mut(
            &mut canvas,
            SCORE_COLOR,
            SCORE_ORIGIN.0,
            SCORE_ORIGIN.1,
            PxScale::from(SCORE_FONT_PX),
            &self.font,
            label,
        );
        canvas.save(dest)?;
        debug!("Stamped {:?} on {}", label, dest.display());
        Ok(())
    }
}

/// Output stems already handed out in one run.
///
/// Images sharing a stem (`essay.png` and `essay.jpg`, or `essay.png` from two
/// folders) get `essay`, `essay-2`, `essay-3`... so no report or stamped copy
/// overwrites another. Compared case-insensitively for Windows/macOS.
#[derive(Debug, Default)]
pub struct OutputNames {
    used: HashSet<String>,
}

impl OutputNames {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn claim(&mut self, image: &Path) -> String {
        let stem = image
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "essay".to_string());
        let mut candidate = stem.clone();
        let mut n = 2;
        while !self.used.insert(candidate.to_lowercase()) {
            candidate = format!("{stem}-{n}");
            n += 1;
        }
        candidate
    }
}

/// `essay01` -> `essay01.txt`
pub fn report_file_name(output_stem: &str) -> String {
    format!("{output_stem}.txt")
}

/// Output stem plus the source image's extension.
pub fn image_file_name(output_stem: &str, image: &Path) -> String {
    match image.extension() {
        Some(ext) => format!("{output_stem}.{}", ext.to_string_lossy()),
        None => output_stem.to_string(),
    }
}
