//! egui front end: draws the controller's view state and turns clicks into
//! controller calls.

use std::{
    path::PathBuf,
    sync::{Arc, Mutex},
};

use eframe::{App, Frame, egui};
use egui::{ColorImage, TextureOptions};
use rfd::FileDialog;
use tokio::runtime::Handle;

use crate::api::HttpBackend;
use crate::config::Config;
use crate::controller::Controller;
use crate::model::DownloadType;
use crate::view::Panel;
use crate::thumbnail::{self, ThumbnailCache};
use crate::retrieve;

/// Something the user clicked this frame, applied after drawing
enum Action {
    GetInfo,
    Download,
    SetDownloadType(DownloadType),
    Retrieve,
    OpenFolder,
    Reset,
}

pub struct VidgrabApp {
    controller: Controller<HttpBackend>,
    runtime: Handle,
    /// Shared with the backend; also used for saving finished files
    client: reqwest::Client,
    /// Destination folder for retrieved files
    download_folder: String,
    /// Texture of the thumbnail on screen
    thumbnails: ThumbnailCache<egui::TextureHandle>,
    /// Incoming thumbnail fetch results (url, image)
    thumbnail_results: Arc<Mutex<Vec<(String, ColorImage)>>>,
}

impl VidgrabApp {
    pub fn new(config: Config, runtime: Handle) -> Self {
        let client = reqwest::Client::new();
        let backend = Arc::new(HttpBackend::with_client(client.clone(), config.server));
        Self {
            controller: Controller::new(backend, runtime.clone()),
            runtime,
            client,
            download_folder: config.download_dir.display().to_string(),
            thumbnails: ThumbnailCache::default(),
            thumbnail_results: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn apply(&mut self, action: Action) {
        match action {
            Action::GetInfo => self.controller.request_video_info(),
            Action::Download => self.controller.start_download(),
            Action::SetDownloadType(t) => self.controller.set_download_type(t),
            Action::Retrieve => {
                let Some(url) = self.controller.retrieve_file() else {
                    return;
                };
                let fallback = self
                    .controller
                    .session()
                    .job_id()
                    .unwrap_or("download")
                    .to_string();
                retrieve::spawn_retrieve(
                    &self.runtime,
                    self.client.clone(),
                    url,
                    PathBuf::from(&self.download_folder),
                    fallback,
                );
            }
            Action::OpenFolder => retrieve::open_folder(PathBuf::from(&self.download_folder)),
            Action::Reset => {
                self.controller.reset_form();
                // Release the old card's texture
                self.thumbnails.clear();
            }
        }
    }

    /// Starts a background fetch the first time a thumbnail URL is shown
    fn request_thumbnail(&mut self, ctx: &egui::Context) {
        let view = self.controller.view();
        if !view.is_visible(Panel::VideoInfo) || view.video.thumbnail.is_empty() {
            return;
        }
        let url = view.video.thumbnail.clone();
        if !self.thumbnails.want(&url) {
            return;
        }
        let results = Arc::clone(&self.thumbnail_results);
        let ctx_c = ctx.clone();
        self.runtime.spawn_blocking(move || {
            if let Some(img) = thumbnail::fetch_thumbnail(&url) {
                if let Ok(mut pending) = results.lock() {
                    pending.push((url, img));
                }
                ctx_c.request_repaint();
            }
        });
    }

    fn form_ui(&mut self, ui: &mut egui::Ui, actions: &mut Vec<Action>) {
        let form = &mut self.controller.view_mut().form;

        ui.label("Pega la URL del video de YouTube:");
        let url_edit = ui.text_edit_singleline(&mut form.url);
        if url_edit.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter)) {
            actions.push(Action::GetInfo);
        }
        if ui
            .add_enabled(form.get_info_enabled, egui::Button::new("Obtener información"))
            .clicked()
        {
            actions.push(Action::GetInfo);
        }

        ui.horizontal(|ui| {
            ui.label("Tipo de descarga:");
            let mut kind = form.download_type;
            ui.radio_value(&mut kind, DownloadType::Video, "Video");
            ui.radio_value(&mut kind, DownloadType::Audio, "Solo audio");
            if kind != form.download_type {
                actions.push(Action::SetDownloadType(kind));
            }
        });

        ui.add_enabled_ui(form.quality_enabled, |ui| {
            ui.horizontal(|ui| {
                ui.label("Calidad:");
                let selected = form
                    .quality_choices
                    .iter()
                    .find(|c| c.value == form.quality)
                    .map(|c| c.label.clone())
                    .unwrap_or_else(|| form.quality.clone());
                egui::ComboBox::from_id_source("quality_select")
                    .selected_text(selected)
                    .show_ui(ui, |ui| {
                        for choice in &form.quality_choices {
                            ui.selectable_value(&mut form.quality, choice.value.clone(), &choice.label);
                        }
                    });
            });
        });

        ui.horizontal(|ui| {
            ui.label("Carpeta de descarga:");
            ui.text_edit_singleline(&mut self.download_folder);
            if ui.button("Examinar…").clicked() {
                if let Some(folder) = FileDialog::new()
                    .set_directory(&self.download_folder)
                    .pick_folder()
                {
                    self.download_folder = folder.display().to_string();
                }
            }
        });

        if ui.button("⬇ Descargar").clicked() {
            actions.push(Action::Download);
        }
    }

    fn panel_ui(&self, ui: &mut egui::Ui, actions: &mut Vec<Action>) {
        let view = self.controller.view();
        match view.panel() {
            None => {}
            Some(Panel::Loading) => {
                ui.horizontal(|ui| {
                    ui.spinner();
                    ui.label("Obteniendo información del video…");
                });
            }
            Some(Panel::VideoInfo) => {
                let card = &view.video;
                ui.group(|ui| {
                    ui.horizontal(|ui| {
                        match self.thumbnails.get(&card.thumbnail) {
                            Some(tex) => {
                                ui.add(egui::Image::new(tex).max_width(240.0));
                            }
                            None => {
                                ui.label(&card.thumbnail_alt);
                            }
                        }
                        ui.vertical(|ui| {
                            ui.strong(&card.title);
                            ui.label(format!("Duración: {}", card.duration));
                            ui.label(format!("Canal: {}", card.channel));
                            ui.label(format!("Vistas: {}", card.views));
                            if let Some(date) = &card.upload_date {
                                ui.label(format!("Publicado: {}", date));
                            }
                        });
                    });
                });
            }
            Some(Panel::Progress) => {
                let progress = &view.progress;
                ui.add(
                    egui::ProgressBar::new((progress.bar_percent / 100.0) as f32)
                        .text(progress.text.clone()),
                );
                ui.horizontal(|ui| {
                    if self.controller.session().is_polling() {
                        ui.spinner();
                    }
                    ui.label(&progress.speed);
                    ui.label(&progress.size);
                });
                if progress.complete {
                    ui.label("✅ ¡Descarga completada!");
                    ui.horizontal(|ui| {
                        if ui.button("Descargar archivo").clicked() {
                            actions.push(Action::Retrieve);
                        }
                        if ui.button("Abrir carpeta").clicked() {
                            actions.push(Action::OpenFolder);
                        }
                    });
                }
            }
            Some(Panel::Error) => {
                ui.colored_label(egui::Color32::RED, &view.error_message);
                if ui.button("Intentar de nuevo").clicked() {
                    actions.push(Action::Reset);
                }
            }
        }
    }
}

impl App for VidgrabApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut Frame) {
        // Apply finished requests before drawing
        self.controller.pump();

        if let Ok(mut pending) = self.thumbnail_results.lock() {
            for (url, img) in pending.drain(..) {
                let tex = ctx.load_texture(&url, img, TextureOptions::default());
                self.thumbnails.fulfil(&url, tex);
            }
        }
        self.request_thumbnail(ctx);

        let mut actions = Vec::new();
        egui::CentralPanel::default().show(ctx, |ui| {
            ui.heading("Descargador de YouTube");
            self.form_ui(ui, &mut actions);
            ui.separator();
            self.panel_ui(ui, &mut actions);
        });
        for action in actions {
            self.apply(action);
        }

        // Poll results arrive off-frame
        ctx.request_repaint_after(std::time::Duration::from_millis(100));
    }
}
