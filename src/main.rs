//! Desktop shell for the Shrine downloader

use std::{collections::HashMap, time::Duration};

use eframe::{egui, App, Frame};
use egui::{Color32, ColorImage, TextureHandle, TextureOptions, ViewportCommand, Visuals};
// FileDialog for output folder selection
use rfd::FileDialog;
use tokio::runtime::Runtime;

use shrine_downloader::{
    activity_log::LogLevel,
    config::Settings,
    i18n::{Languages, LANGUAGE_CHOICES},
    logging,
    model::{JobId, JobStatus, MediaFormat},
    queue::parse_batch,
    session::{DnsState, Session},
};

/// Program entry point: loads settings, starts the runtime and launches the GUI
fn main() -> Result<(), Box<dyn std::error::Error>> {
    logging::init();

    // Workers run here; it lives until the window closes
    let rt = Runtime::new()?;

    let config_dir = std::env::current_dir()?;
    let settings = Settings::load(&config_dir)?;
    let languages = Languages::load(&settings.languages_path())?;
    let mut session = Session::new(settings, languages, rt.handle().clone())?;
    session.log_key(LogLevel::Success, "log_ready");
    let title = session.t("window_title");

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title(title.clone())
            .with_inner_size([1100.0, 680.0])
            .with_min_inner_size([1000.0, 600.0]),
        ..Default::default()
    };
    eframe::run_native(
        &title,
        options,
        Box::new(|cc| {
            cc.egui_ctx.set_visuals(Visuals::dark());
            Box::new(ShrineApp::new(session))
        }),
    )?;
    Ok(())
}

/// Application state for the GUI
struct ShrineApp {
    session: Session,
    /// Single URL field
    url_input: String,
    /// Batch text box, one URL per line
    batch_input: String,
    dns_input: String,
    format: MediaFormat,
    resolution: String,
    resolutions: Vec<String>,
    shutdown: bool,
    /// Uploaded thumbnail textures per queue row
    thumbnails: HashMap<JobId, TextureHandle>,
}

impl ShrineApp {
    fn new(session: Session) -> Self {
        let resolutions: Vec<String> = session
            .settings()
            .video
            .format_map
            .resolutions()
            .map(str::to_string)
            .collect();
        let resolution = resolutions.first().cloned().unwrap_or_else(|| "best".to_string());
        let dns_input = session.settings().dns.dns_server.clone();
        Self {
            session,
            url_input: String::new(),
            batch_input: String::new(),
            dns_input,
            format: MediaFormat::Video,
            resolution,
            resolutions,
            shutdown: false,
            thumbnails: HashMap::new(),
        }
    }

    fn add(&mut self, urls: Vec<String>) {
        if urls.is_empty() {
            return;
        }
        let resolution = (self.format == MediaFormat::Video).then(|| self.resolution.clone());
        self.session.add_urls(&urls, self.format, resolution.as_deref());
    }

    fn upload_thumbnails(&mut self, ctx: &egui::Context) {
        for (id, thumb) in self.session.take_thumbnails() {
            let image = ColorImage::from_rgba_unmultiplied(thumb.size, &thumb.rgba);
            let tex = ctx.load_texture(format!("thumb-{}", id.0), image, TextureOptions::default());
            self.thumbnails.insert(id, tex);
        }
    }

    fn language_picker(&mut self, ui: &mut egui::Ui) {
        let current = self.session.language().to_string();
        let current_name = LANGUAGE_CHOICES
            .iter()
            .find(|(code, _)| *code == current)
            .map(|(_, name)| *name)
            .unwrap_or("?");
        let mut chosen = None;
        ui.horizontal(|ui| {
            ui.label(self.session.t("lang_select"));
            egui::ComboBox::from_id_source("language")
                .selected_text(current_name)
                .show_ui(ui, |ui| {
                    for (code, name) in LANGUAGE_CHOICES {
                        if ui.selectable_label(current == code, name).clicked() {
                            chosen = Some(code);
                        }
                    }
                });
        });
        if let Some(code) = chosen {
            self.session.set_language(code);
            ui.ctx()
                .send_viewport_cmd(ViewportCommand::Title(self.session.t("window_title")));
        }
    }

    fn controls(&mut self, ui: &mut egui::Ui) {
        self.language_picker(ui);
        ui.separator();

        ui.group(|ui| {
            ui.strong(self.session.t("controls_group_title"));
            ui.add(
                egui::TextEdit::singleline(&mut self.url_input)
                    .hint_text(self.session.t("url_placeholder"))
                    .desired_width(f32::INFINITY),
            );

            ui.label(self.session.t("format_label"));
            egui::ComboBox::from_id_source("format")
                .selected_text(self.format.label())
                .show_ui(ui, |ui| {
                    for format in MediaFormat::ALL {
                        ui.selectable_value(&mut self.format, format, format.label());
                    }
                });

            // audio jobs ignore the resolution
            let is_video = self.format == MediaFormat::Video;
            ui.add_enabled_ui(is_video, |ui| {
                ui.label(self.session.t("resolution"));
                egui::ComboBox::from_id_source("resolution")
                    .selected_text(self.resolution.clone())
                    .show_ui(ui, |ui| {
                        for res in &self.resolutions {
                            ui.selectable_value(&mut self.resolution, res.clone(), res.as_str());
                        }
                    });
            });

            if ui.button(self.session.t("add_single_button")).clicked() {
                let url = self.url_input.trim().to_string();
                if !url.is_empty() {
                    self.add(vec![url]);
                    self.url_input.clear();
                }
            }
        });

        ui.group(|ui| {
            ui.strong(self.session.t("batch_group_title"));
            ui.add(
                egui::TextEdit::multiline(&mut self.batch_input)
                    .hint_text(self.session.t("batch_urls_placeholder"))
                    .desired_rows(6)
                    .desired_width(f32::INFINITY),
            );
            if ui.button(self.session.t("add_batch_button")).clicked() {
                let urls = parse_batch(&self.batch_input);
                if !urls.is_empty() {
                    self.add(urls);
                    self.batch_input.clear();
                }
            }
        });

        ui.group(|ui| {
            ui.horizontal(|ui| {
                if ui.button(self.session.t("dns_change")).clicked() {
                    let server = self.dns_input.clone();
                    self.session.change_dns(&server);
                }
                ui.add(egui::TextEdit::singleline(&mut self.dns_input).desired_width(120.0));
            });
            ui.horizontal(|ui| {
                if ui.button(self.session.t("dns_activate")).clicked() {
                    self.session.probe_dns();
                }
                let (key, color) = match self.session.dns_state() {
                    DnsState::Inactive | DnsState::Checking => ("dns_status_inactive", Color32::GRAY),
                    DnsState::Active => ("dns_status_active", Color32::from_rgb(0x2e, 0xcc, 0x71)),
                    DnsState::Failed => ("dns_status_failed", Color32::from_rgb(0xe7, 0x4c, 0x3c)),
                };
                let mut text = self.session.t(key);
                if self.session.dns_state() == DnsState::Active {
                    text = format!("{text} ➤ {}", self.session.settings().dns.dns_label);
                }
                ui.colored_label(color, text);
            });
        });
    }

    fn actions(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            if self.session.is_running() {
                if ui.button(self.session.t("stop_download")).clicked() {
                    self.session.stop();
                }
            } else if ui.button(self.session.t("start_download")).clicked() {
                self.session.start();
            }

            if ui.button(self.session.t("open_folder")).clicked() {
                self.session.open_output_folder();
            }
            if ui.button(self.session.t("choose_folder")).clicked() {
                let current = self.session.settings().output_dir.clone();
                if let Some(folder) = FileDialog::new().set_directory(&current).pick_folder() {
                    self.session.set_output_dir(folder);
                }
            }
            if ui.button(self.session.t("clear_finished")).clicked() {
                self.session.clear_finished();
            }

            if ui
                .checkbox(&mut self.shutdown, self.session.t("shutdown_checkbox"))
                .changed()
            {
                self.session.set_shutdown_when_done(self.shutdown);
            }
        });
        ui.label(self.session.settings().output_dir.display().to_string());
    }

    fn queue_table(&self, ui: &mut egui::Ui) {
        let summary = self.session.summary();
        ui.horizontal(|ui| {
            ui.heading(self.session.t("queue_group_title"));
            ui.label(format!(
                "{}/{}",
                summary.completed + summary.error,
                summary.total()
            ));
        });
        ui.separator();

        egui::ScrollArea::vertical()
            .id_source("queue_scroll")
            .auto_shrink([false; 2])
            .show(ui, |ui| {
                egui::Grid::new("queue_grid")
                    .num_columns(5)
                    .striped(true)
                    .min_row_height(95.0)
                    .show(ui, |ui| {
                        for key in ["queue_thumb", "queue_title", "queue_format", "queue_progress", "queue_status"] {
                            ui.strong(self.session.t(key));
                        }
                        ui.end_row();

                        for job in self.session.jobs() {
                            match self.thumbnails.get(&job.id) {
                                Some(tex) => {
                                    ui.image(tex);
                                }
                                None => {
                                    ui.label("-");
                                }
                            }
                            ui.add(egui::Label::new(job.display_title()).wrap(true));
                            ui.label(job.details());
                            ui.add(
                                egui::ProgressBar::new(f32::from(job.progress) / 100.0)
                                    .show_percentage()
                                    .desired_width(140.0),
                            );
                            let color = match job.status {
                                JobStatus::Completed => Color32::from_rgb(0x2e, 0xcc, 0x71),
                                JobStatus::Error => Color32::from_rgb(0xe7, 0x4c, 0x3c),
                                _ => ui.visuals().text_color(),
                            };
                            let status = self.session.status_text(job);
                            match &job.detail {
                                Some(detail) => ui.colored_label(color, status).on_hover_text(detail.as_str()),
                                None => ui.colored_label(color, status),
                            };
                            ui.end_row();
                        }
                    });
            });
    }

    fn log_panel(&mut self, ui: &mut egui::Ui) {
        let mut reset = false;
        ui.horizontal(|ui| {
            ui.strong(self.session.t("log_title"));
            if ui.button(self.session.t("reset_log")).clicked() {
                reset = true;
            }
        });
        egui::ScrollArea::vertical()
            .id_source("log_scroll")
            .stick_to_bottom(true)
            .auto_shrink([false; 2])
            .show(ui, |ui| {
                for entry in self.session.log_entries() {
                    let [r, g, b] = entry.status.rgb();
                    ui.colored_label(
                        Color32::from_rgb(r, g, b),
                        format!("{} {}", entry.timestamp.format("%H:%M:%S"), entry.message),
                    );
                }
            });
        if reset {
            self.session.reset_log();
        }
    }
}

/// GUI update loop: called each frame to redraw and handle interactions
impl App for ShrineApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut Frame) {
        // 1️⃣ Apply worker events and advance the queue
        self.session.pump();

        // 2️⃣ Upload freshly fetched thumbnails
        self.upload_thumbnails(ctx);

        // 3️⃣ Left panel: inputs, batch box, DNS
        egui::SidePanel::left("controls_panel")
            .resizable(true)
            .default_width(320.0)
            .show(ctx, |ui| self.controls(ui));

        // 4️⃣ Bottom panel: coloured activity log
        egui::TopBottomPanel::bottom("log_panel")
            .resizable(true)
            .default_height(180.0)
            .show(ctx, |ui| self.log_panel(ui));

        // 5️⃣ Main panel: queue table and actions
        egui::CentralPanel::default().show(ctx, |ui| {
            self.actions(ui);
            ui.separator();
            self.queue_table(ui);
        });

        // Request periodic repaint for progress updates
        ctx.request_repaint_after(Duration::from_millis(100));
    }
}
