mod app;
mod model;

use anyhow::Context;
use app::{configure_fonts, GraderApp};
use essay_grader::config::{self, Settings};
use essay_grader::{logging, ocr};

fn main() -> anyhow::Result<()> {
    let settings_path = config::default_settings_path().context("resolve settings path")?;
    let _guard = logging::init(&config::debug_log_path(&settings_path), false);
    let mut settings = Settings::load_or_default(&settings_path);

    let tesseract = match ocr::locate_tesseract(&mut settings, &settings_path) {
        Ok(path) => path,
        Err(err) => {
            tracing::error!("{err}");
            rfd::MessageDialog::new()
                .set_level(rfd::MessageLevel::Error)
                .set_title("Essay Grader")
                .set_description(format!(
                    "Tesseract OCR was not found.\nInstall it or set [ocr] binary_path in\n{}",
                    settings_path.display()
                ))
                .set_buttons(rfd::MessageButtons::Ok)
                .show();
            std::process::exit(1);
        }
    };

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default().with_inner_size([720.0, 640.0]),
        ..Default::default()
    };
    eframe::run_native(
        "Essay Grader",
        options,
        Box::new(move |cc| {
            configure_fonts(&cc.egui_ctx);
            Box::new(GraderApp::new(settings, settings_path, tesseract))
        }),
    )
    .map_err(|e| anyhow::anyhow!("{e}"))
}
