use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver};

use eframe::egui::{self, Color32, RichText};
use eframe::egui::{FontData, FontDefinitions, FontFamily};
use image::ImageReader;

use essay_grader::ai_provider::AiProvider;
use essay_grader::batch::{spawn_batch, BatchEvent, BatchSummary};
use essay_grader::config::Settings;
use essay_grader::error::GraderError;
use essay_grader::grader::GradingClient;
use essay_grader::schedule::Canceller;

use crate::model::{commit_for_start, FormState, RunState};

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp"];
const COST_SAVING_HELP: &str = "Cost-saving mode: DeepSeek charges less between 00:30 and 08:30. \
When enabled, a batch started outside that window waits until 00:30 before grading.";

pub struct GraderApp {
    settings: Settings,
    settings_path: PathBuf,
    tesseract: PathBuf,
    form: FormState,
    run_state: RunState,
    status: String,
    canceller: Option<Canceller>,
    batch_rx: Option<Receiver<BatchEvent>>,
    api_test_rx: Option<Receiver<UiMessage>>,
    show_settings: bool,
    show_about: bool,
    thumbs: HashMap<PathBuf, egui::TextureHandle>,
    thumb_rx: Receiver<ThumbData>,
    thumb_tx: mpsc::Sender<ThumbData>,
    thumb_inflight: HashSet<PathBuf>,
    pending_thumbs: Vec<ThumbData>,
}

enum UiMessage {
    ApiTestDone(Result<String, String>),
}

struct ThumbData {
    path: PathBuf,
    size: [usize; 2],
    pixels: Vec<u8>,
}

impl GraderApp {
    pub fn new(settings: Settings, settings_path: PathBuf, tesseract: PathBuf) -> Self {
        let (thumb_tx, thumb_rx) = mpsc::channel();
        let form = FormState {
            title: settings.prompt.title.clone(),
            rubric: settings.prompt.rubric.clone(),
            images: Vec::new(),
        };
        Self {
            settings,
            settings_path,
            tesseract,
            form,
            run_state: RunState::Idle,
            status: "Ready".to_string(),
            canceller: None,
            batch_rx: None,
            api_test_rx: None,
            show_settings: false,
            show_about: false,
            thumbs: HashMap::new(),
            thumb_rx,
            thumb_tx,
            thumb_inflight: HashSet::new(),
            pending_thumbs: Vec::new(),
        }
    }

    fn busy(&self) -> bool {
        self.run_state != RunState::Idle
    }

    fn select_images(&mut self) {
        if let Some(paths) = rfd::FileDialog::new()
            .add_filter("Images", IMAGE_EXTENSIONS)
            .pick_files()
        {
            self.form.images = paths;
            self.thumbs.clear();
            self.thumb_inflight.clear();
            self.status = self.form.selection_label();
        }
    }

    fn save_settings(&mut self) {
        match self.settings.save(&self.settings_path) {
            Ok(()) => self.status = "Settings saved".to_string(),
            Err(err) => {
                tracing::error!("Saving settings failed: {err}");
                self.status = format!("Saving settings failed: {err}");
            }
        }
    }

    fn start(&mut self) {
        let request = match commit_for_start(&self.form, &mut self.settings, &self.settings_path) {
            Ok(request) => request,
            Err(err) => {
                show_dialog(rfd::MessageLevel::Warning, "Essay Grader", &err.to_string());
                return;
            }
        };

        let (tx, rx) = mpsc::channel();
        match spawn_batch(request, &self.settings, self.tesseract.clone(), tx) {
            Ok(canceller) => {
                self.canceller = Some(canceller);
                self.batch_rx = Some(rx);
                self.run_state = RunState::Running;
                self.status = "Starting...".to_string();
            }
            Err(GraderError::Validation(err)) => {
                show_dialog(rfd::MessageLevel::Warning, "Essay Grader", &err.to_string());
            }
            Err(err) => {
                tracing::error!("Starting batch failed: {err}");
                self.status = format!("Start failed: {err}");
            }
        }
    }

    fn cancel(&mut self) {
        if let Some(canceller) = &self.canceller {
            canceller.cancel();
            self.status = "Cancelling...".to_string();
        }
    }

    fn run_api_test(&mut self) {
        let client = match GradingClient::from_settings(&self.settings) {
            Ok(client) => client,
            Err(err) => {
                self.status = format!("API test failed: {err}");
                return;
            }
        };
        let (tx, rx) = mpsc::channel();
        self.api_test_rx = Some(rx);
        self.status = "Testing API...".to_string();

        std::thread::spawn(move || {
            let _ = tx.send(UiMessage::ApiTestDone(client.test_connection_blocking()));
        });
    }

    fn finish(&mut self, summary: &BatchSummary) {
        self.run_state = RunState::Idle;
        self.canceller = None;
        self.batch_rx = None;
        self.status = "Grading complete".to_string();
        self.form.images.clear();
        self.thumbs.clear();
        show_dialog(
            rfd::MessageLevel::Info,
            "Grading complete",
            &format!(
                "All essays have been graded.\nResults saved to:\n{}",
                summary.output_dir.display()
            ),
        );
    }

    fn poll_messages(&mut self) {
        while let Ok(msg) = self.thumb_rx.try_recv() {
            self.thumb_inflight.remove(&msg.path);
            self.pending_thumbs.push(msg);
        }

        if let Some(rx) = &self.api_test_rx {
            if let Ok(UiMessage::ApiTestDone(result)) = rx.try_recv() {
                self.status = match result {
                    Ok(preview) => format!("API test succeeded: {preview}"),
                    Err(message) => message,
                };
                self.api_test_rx = None;
            }
        }

        let events: Vec<BatchEvent> = match &self.batch_rx {
            Some(rx) => rx.try_iter().collect(),
            None => Vec::new(),
        };
        for event in events {
            match event {
                BatchEvent::Waiting { until } => {
                    self.run_state = RunState::Waiting;
                    self.status = format!("Cost-saving mode: waiting until {}", until.format("%H:%M"));
                }
                BatchEvent::Started { total, .. } => {
                    self.run_state = RunState::Running;
                    self.status = format!("Grading {total} essays...");
                }
                BatchEvent::Progress { index, total, preview } => {
                    self.status = format!("Graded {}/{total}: {preview}", index + 1);
                }
                BatchEvent::Finished(summary) => self.finish(&summary),
                BatchEvent::Cancelled => {
                    self.run_state = RunState::Idle;
                    self.canceller = None;
                    self.batch_rx = None;
                    self.status = "Cancelled".to_string();
                }
                BatchEvent::Failed(message) => {
                    self.run_state = RunState::Idle;
                    self.canceller = None;
                    self.batch_rx = None;
                    self.status = format!("Grading failed: {message}");
                }
            }
        }
    }

    fn process_thumbs(&mut self, ctx: &egui::Context) {
        for msg in std::mem::take(&mut self.pending_thumbs) {
            if msg.size[0] == 0 || msg.size[1] == 0 {
                continue;
            }
            let color_image = egui::ColorImage::from_rgba_unmultiplied(msg.size, &msg.pixels);
            let name = msg.path.to_string_lossy().to_string();
            let texture = ctx.load_texture(name, color_image, egui::TextureOptions::default());
            self.thumbs.insert(msg.path, texture);
        }
    }

    fn request_thumbnail(&mut self, path: &Path) {
        if self.thumbs.contains_key(path) || self.thumb_inflight.contains(path) {
            return;
        }
        self.thumb_inflight.insert(path.to_path_buf());
        let sender = self.thumb_tx.clone();
        let path_owned = path.to_path_buf();

        std::thread::spawn(move || {
            let image = ImageReader::open(&path_owned)
                .ok()
                .and_then(|r| r.decode().ok());
            let (size, pixels) = match image {
                Some(image) => {
                    let thumb = image.thumbnail(96, 72);
                    (
                        [thumb.width() as usize, thumb.height() as usize],
                        thumb.to_rgba8().into_raw(),
                    )
                }
                None => ([0, 0], Vec::new()),
            };
            let _ = sender.send(ThumbData {
                path: path_owned,
                size,
                pixels,
            });
        });
    }

    fn render_settings(&mut self, ctx: &egui::Context) {
        let mut open = self.show_settings;
        egui::Window::new("API settings")
            .open(&mut open)
            .resizable(false)
            .collapsible(false)
            .show(ctx, |ui| {
                egui::Grid::new("api_settings").num_columns(2).show(ui, |ui| {
                    ui.label("Provider");
                    egui::ComboBox::from_id_source("provider")
                        .selected_text(self.settings.api.provider.to_string())
                        .show_ui(ui, |ui| {
                            for provider in AiProvider::ALL {
                                ui.selectable_value(&mut self.settings.api.provider, provider, provider.to_string());
                            }
                        });
                    ui.end_row();

                    ui.label("API key");
                    ui.add(egui::TextEdit::singleline(&mut self.settings.api.key).password(true));
                    ui.end_row();
                });

                ui.add_enabled(
                    self.settings.api.provider.supports_deep_think(),
                    egui::Checkbox::new(&mut self.settings.api.deep_think, "Deep think (DeepSeek only)"),
                );
                ui.horizontal(|ui| {
                    ui.checkbox(&mut self.settings.api.cost_saving, "Cost-saving mode");
                    ui.label(RichText::new("?").strong().color(Color32::from_rgb(246, 196, 69)))
                        .on_hover_text(COST_SAVING_HELP);
                });

                ui.separator();
                ui.horizontal(|ui| {
                    if ui.button("Save").clicked() {
                        self.save_settings();
                    }
                    if ui
                        .add_enabled(self.api_test_rx.is_none(), egui::Button::new("Test API"))
                        .clicked()
                    {
                        self.run_api_test();
                    }
                    if ui.button("Open usage dashboard").clicked() {
                        ctx.open_url(egui::OpenUrl::new_tab(self.settings.api.provider.usage_dashboard_url()));
                    }
                });
            });
        self.show_settings = open;
    }

    fn render_about(&mut self, ctx: &egui::Context) {
        let mut open = self.show_about;
        egui::Window::new("About")
            .open(&mut open)
            .resizable(false)
            .collapsible(false)
            .show(ctx, |ui| {
                ui.heading("Essay Grader");
                ui.label(format!("Version {}", env!("CARGO_PKG_VERSION")));
                ui.label("Reads photographed essays with Tesseract, grades them with an LLM");
                ui.label("and stamps the score on a copy of each image.");
            });
        self.show_about = open;
    }

    fn render_form(&mut self, ui: &mut egui::Ui) {
        let editable = !self.busy();

        ui.label(RichText::new("Essay title").strong());
        ui.add_enabled(
            editable,
            egui::TextEdit::multiline(&mut self.form.title)
                .desired_rows(2)
                .desired_width(f32::INFINITY),
        );
        ui.add_space(6.0);

        ui.label(RichText::new("Grading rubric").strong());
        ui.add_enabled(
            editable,
            egui::TextEdit::multiline(&mut self.form.rubric)
                .desired_rows(8)
                .desired_width(f32::INFINITY),
        );
        ui.add_space(6.0);

        ui.horizontal(|ui| {
            if ui.add_enabled(editable, egui::Button::new("Select images")).clicked() {
                self.select_images();
            }
            ui.label(self.form.selection_label());
        });

        if !self.form.images.is_empty() {
            let images = self.form.images.clone();
            egui::ScrollArea::horizontal().max_height(90.0).show(ui, |ui| {
                ui.horizontal(|ui| {
                    for path in &images {
                        match self.thumbs.get(path) {
                            Some(texture) => {
                                ui.add(egui::Image::new(texture).fit_to_exact_size(egui::vec2(96.0, 72.0)))
                                    .on_hover_text(path.display().to_string());
                            }
                            None => {
                                self.request_thumbnail(path);
                                ui.label("Loading...");
                            }
                        }
                    }
                });
            });
        }

        ui.add_space(8.0);
        ui.horizontal(|ui| {
            if ui.add_enabled(editable, egui::Button::new("Start grading")).clicked() {
                self.start();
            }
            if ui.add_enabled(self.busy(), egui::Button::new("Cancel")).clicked() {
                self.cancel();
            }
        });

        ui.separator();
        ui.label(RichText::new(&self.status).color(Color32::from_gray(170)));
    }
}

fn show_dialog(level: rfd::MessageLevel, title: &str, description: &str) {
    rfd::MessageDialog::new()
        .set_level(level)
        .set_title(title)
        .set_description(description)
        .set_buttons(rfd::MessageButtons::Ok)
        .show();
}

pub fn configure_fonts(ctx: &egui::Context) {
    let mut fonts = FontDefinitions::default();
    let candidates = [
        r"C:\Windows\Fonts\msyh.ttc",
        r"C:\Windows\Fonts\simhei.ttf",
        "/System/Library/Fonts/PingFang.ttc",
        "/System/Library/Fonts/Supplemental/Arial Unicode.ttf",
        "/usr/share/fonts/truetype/noto/NotoSansCJK-Regular.ttc",
        "/usr/share/fonts/opentype/noto/NotoSansCJK-Regular.ttc",
    ];

    for path in candidates {
        if let Ok(data) = std::fs::read(path) {
            fonts.font_data.insert("cjk_fallback".to_string(), FontData::from_owned(data));
            fonts.families
                .entry(FontFamily::Proportional)
                .or_default()
                .push("cjk_fallback".to_string());
            fonts.families
                .entry(FontFamily::Monospace)
                .or_default()
                .push("cjk_fallback".to_string());
            ctx.set_fonts(fonts);
            return;
        }
    }
}

impl eframe::App for GraderApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if self.busy() || self.api_test_rx.is_some() || !self.thumb_inflight.is_empty() {
            ctx.request_repaint_after(std::time::Duration::from_millis(200));
        }
        self.poll_messages();
        self.process_thumbs(ctx);

        egui::TopBottomPanel::top("top").show(ctx, |ui| {
            egui::menu::bar(ui, |ui| {
                ui.menu_button("Settings", |ui| {
                    if ui.button("API settings...").clicked() {
                        self.show_settings = true;
                        ui.close_menu();
                    }
                });
                ui.menu_button("Help", |ui| {
                    if ui.button("About").clicked() {
                        self.show_about = true;
                        ui.close_menu();
                    }
                });
            });
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            egui::ScrollArea::vertical().show(ui, |ui| {
                self.render_form(ui);
            });
        });

        self.render_settings(ctx);
        self.render_about(ctx);
    }
}
