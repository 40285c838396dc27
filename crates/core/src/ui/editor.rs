//! Main editor application.
//!
//! This module contains the `HatEditor` struct which implements the
//! `eframe::App` trait: upload on the left, result on the right.

use super::rendering::{draw_preview, draw_swatch, hat_color32, to_color_image};
use super::state::{GenerationEvent, Notice};
use crate::config::Config;
use crate::error::{AppError, Result};
use crate::export::{save_download, share_image, ClipboardShare, ShareOutcome};
use crate::gemini::{GeminiClient, GeneratedImage, HatRenderer};
use crate::hat::HatColor;
use crate::session::{ingest_bytes, ingest_file, GenerationTicket, Lifecycle, SessionController};
use eframe::egui;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::thread;
use std::time::Duration;

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "webp", "gif", "bmp"];

/// The hat editor window.
pub struct HatEditor {
    config: Config,
    controller: SessionController,
    output_dir: PathBuf,

    original_texture: Option<egui::TextureHandle>,
    result_texture: Option<egui::TextureHandle>,
    notice: Option<Notice>,
    /// Set when the session arrives with an image whose preview is not built yet.
    pending_preview: bool,

    rx: Receiver<GenerationEvent>,
    tx: Sender<GenerationEvent>,
}

impl HatEditor {
    /// Creates the editor around an existing session.
    ///
    /// # Arguments
    /// * `config` - Application configuration used for every request
    /// * `controller` - Session to continue (may already hold an image)
    /// * `output_dir` - Where downloads are written
    pub fn new(config: Config, controller: SessionController, output_dir: PathBuf) -> Self {
        let (tx, rx) = channel();
        let pending_preview = controller.state().original().is_some();
        Self {
            config,
            controller,
            output_dir,
            original_texture: None,
            result_texture: None,
            notice: None,
            pending_preview,
            rx,
            tx,
        }
    }

    /// Spawns the background request for `ticket`.
    ///
    /// The thread owns its own runtime and reports back through the channel.
    fn submit_request(&self, ctx: &egui::Context, ticket: GenerationTicket) {
        let tx = self.tx.clone();
        let config = self.config.clone();
        let ctx = ctx.clone();

        thread::spawn(move || {
            let result = run_ticket(&config, &ticket);
            let _ = tx.send(GenerationEvent::Finished {
                ticket_id: ticket.id(),
                result,
            });
            ctx.request_repaint();
        });
    }

    /// Applies results from the background thread.
    fn process_generation_events(&mut self, ctx: &egui::Context) {
        while let Ok(event) = self.rx.try_recv() {
            match event {
                GenerationEvent::Finished { ticket_id, result } => {
                    if self.controller.complete_generation(ticket_id, result) {
                        self.result_texture = self
                            .controller
                            .state()
                            .result()
                            .and_then(|image| load_texture(ctx, "result", &image.data));
                    }
                }
            }
        }
    }

    fn open_path(&mut self, ctx: &egui::Context, path: &Path) {
        match ingest_file(&mut self.controller, path) {
            Ok(()) => self.after_upload(ctx),
            Err(e) => self.reject_upload(e),
        }
    }

    fn open_bytes(&mut self, ctx: &egui::Context, bytes: &[u8], mime_type: &str) {
        match ingest_bytes(&mut self.controller, bytes, mime_type) {
            Ok(()) => self.after_upload(ctx),
            Err(e) => self.reject_upload(e),
        }
    }

    fn after_upload(&mut self, ctx: &egui::Context) {
        self.notice = None;
        self.result_texture = None;
        self.load_original_preview(ctx);
    }

    fn load_original_preview(&mut self, ctx: &egui::Context) {
        self.original_texture = self
            .controller
            .state()
            .original()
            .and_then(|upload| upload.bytes().ok())
            .and_then(|bytes| load_texture(ctx, "original", &bytes));
    }

    fn reject_upload(&mut self, error: AppError) {
        tracing::warn!(error = %error, "upload rejected");
        self.notice = Some(Notice::Warning(error.to_string()));
    }

    fn handle_dropped_files(&mut self, ctx: &egui::Context) {
        let dropped = ctx.input(|i| i.raw.dropped_files.clone());
        // Only the first file counts, as with the picker
        if let Some(file) = dropped.into_iter().next() {
            if let Some(path) = &file.path {
                self.open_path(ctx, path);
            } else if let Some(bytes) = &file.bytes {
                self.open_bytes(ctx, bytes, &file.mime);
            }
        }
    }

    fn start_generation(&mut self, ctx: &egui::Context) {
        if let Some(ticket) = self.controller.begin_generation() {
            self.notice = None;
            self.submit_request(ctx, ticket);
        }
    }

    fn download(&mut self) {
        let state = self.controller.state();
        let Some(image) = state.result() else {
            return;
        };
        self.notice = Some(match save_download(image, state.color(), &self.output_dir) {
            Ok(path) => Notice::Info(format!("Saved {}", path.display())),
            Err(e) => Notice::Warning(format!("Download failed: {}", e)),
        });
    }

    fn share(&mut self) {
        let Some(image) = self.controller.state().result() else {
            return;
        };
        match share_image(&mut ClipboardShare, image) {
            ShareOutcome::Shared => {
                self.notice = Some(Notice::Info("Copied to clipboard".to_string()));
            }
            ShareOutcome::Unsupported(text) => {
                self.notice = Some(Notice::Warning(text.to_string()));
            }
            // Already logged; nothing to show beyond the unsupported notice
            ShareOutcome::Failed(_) => {}
        }
    }

    /// Work done before drawing: first preview, finished requests, drops.
    fn begin_frame(&mut self, ctx: &egui::Context) {
        // Session handed in from the CLI; tried once even if it cannot decode
        if std::mem::take(&mut self.pending_preview) {
            self.load_original_preview(ctx);
        }

        self.process_generation_events(ctx);
        self.handle_dropped_files(ctx);
    }

    /// Renders the upload / customise column.
    fn render_input_ui(&mut self, ui: &mut egui::Ui, ctx: &egui::Context) {
        ui.heading("1. Upload Image");
        ui.add_space(6.0);

        let generating = self.controller.state().lifecycle() == Lifecycle::Generating;

        if let Some(texture) = &self.original_texture {
            draw_preview(ui, texture, 260.0);
        } else if self.controller.state().original().is_some() {
            ui.label("Preview unavailable for this format.");
        } else {
            ui.label("Drop a photo here or pick one from disk.");
        }

        ui.horizontal(|ui| {
            if ui.add_enabled(!generating, egui::Button::new("Choose photo…")).clicked() {
                if let Some(path) = rfd::FileDialog::new()
                    .add_filter("Images", IMAGE_EXTENSIONS)
                    .pick_file()
                {
                    self.open_path(ctx, &path);
                }
            }
            if self.controller.state().original().is_some() && ui.button("Clear").clicked() {
                self.controller.clear_image();
                self.original_texture = None;
                self.result_texture = None;
                self.notice = None;
            }
        });

        if let Some(notice) = &self.notice {
            let color = match notice {
                Notice::Info(_) => egui::Color32::LIGHT_GREEN,
                Notice::Warning(_) => egui::Color32::YELLOW,
            };
            ui.label(egui::RichText::new(notice.text()).color(color));
        }

        let state = self.controller.state();
        if state.original().is_some() && state.lifecycle() != Lifecycle::Success {
            ui.separator();
            ui.heading("2. Customize & Generate");
            ui.label("Choose Hat Color");

            let current = state.color();
            let mut picked = None;
            ui.horizontal(|ui| {
                for color in HatColor::ALL {
                    if draw_swatch(ui, color, color == current) {
                        picked = Some(color);
                    }
                }
            });
            if let Some(color) = picked {
                self.controller.select_color(color);
            }

            let color = self.controller.state().color();
            ui.horizontal(|ui| {
                ui.label("The AI will match lighting and art style to place a");
                ui.label(
                    egui::RichText::new(color.name().to_lowercase())
                        .strong()
                        .color(hat_color32(color)),
                );
                ui.label("hat.");
            });
            ui.label(format!(
                "Aspect ratio: {}",
                self.controller.state().aspect_ratio()
            ));

            let label = if generating {
                "Adding Magic..."
            } else {
                "Add Christmas Hat"
            };
            if ui.add_enabled(!generating, egui::Button::new(label)).clicked() {
                self.start_generation(ctx);
            }
        }

        if let Some(error) = self.controller.state().error() {
            ui.add_space(8.0);
            ui.label(egui::RichText::new(format!("⚠ {}", error)).color(egui::Color32::RED));
        }
    }

    /// Renders the result column.
    fn render_result_ui(&mut self, ui: &mut egui::Ui) {
        ui.heading("3. Result");
        ui.add_space(6.0);

        let lifecycle = self.controller.state().lifecycle();

        match (&self.result_texture, lifecycle) {
            (Some(texture), Lifecycle::Success) => {
                draw_preview(ui, texture, 420.0);
            }
            (None, Lifecycle::Success) => {
                ui.label("The result could not be previewed, but it can still be downloaded.");
            }
            (_, Lifecycle::Generating) => {
                ui.horizontal(|ui| {
                    ui.spinner();
                    ui.label("Painting with snowflakes...");
                });
                ui.label(egui::RichText::new("This may take a few seconds").small());
                return;
            }
            _ => {
                ui.label("Your festive transformation will appear here");
                return;
            }
        }

        ui.add_space(8.0);
        ui.horizontal(|ui| {
            if ui.button("Download").clicked() {
                self.download();
            }
            if ui.button("Share").clicked() {
                self.share();
            }
            if ui.button("Try Again").clicked() {
                self.controller.retry();
                self.result_texture = None;
            }
        });
    }
}

impl eframe::App for HatEditor {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.begin_frame(ctx);

        if self.controller.is_generating() {
            ctx.request_repaint_after(Duration::from_millis(250));
        }

        egui::SidePanel::left("input_panel")
            .resizable(false)
            .default_width(380.0)
            .show(ctx, |ui| {
                egui::ScrollArea::vertical().show(ui, |ui| {
                    self.render_input_ui(ui, ctx);
                });
            });

        egui::CentralPanel::default().show(ctx, |ui| {
            self.render_result_ui(ui);
        });
    }
}

/// Runs one request on a throwaway current-thread runtime.
fn run_ticket(config: &Config, ticket: &GenerationTicket) -> Result<GeneratedImage> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| AppError::ui(format!("Failed to create async runtime: {}", e)))?;

    let client = GeminiClient::new(config)?;
    runtime.block_on(client.render_hat(ticket.request()))
}

fn load_texture(ctx: &egui::Context, name: &str, bytes: &[u8]) -> Option<egui::TextureHandle> {
    match image::load_from_memory(bytes) {
        Ok(decoded) => Some(ctx.load_texture(
            name,
            to_color_image(&decoded),
            egui::TextureOptions::LINEAR,
        )),
        Err(e) => {
            tracing::warn!(error = %e, "cannot preview image");
            None
        }
    }
}
