//! Everything the window shows, independent of egui.
//!
//! `ViewState` is plain data: the controller mutates it, `app.rs` draws it.
//! The four result panels are mutually exclusive, so the visible one is held
//! as a single `Option<Panel>`.

use crate::format::{
    format_bytes, format_duration, format_number, format_percent, format_speed, format_upload_date,
};
use crate::model::{
    DEFAULT_QUALITY, DownloadType, JobStatus, ProgressSnapshot, QualityChoice, VideoInfo,
};

pub const MSG_EMPTY_INFO_URL: &str = "Por favor ingresa una URL válida de YouTube";
pub const MSG_EMPTY_DOWNLOAD_URL: &str = "Por favor ingresa una URL válida";
pub const MSG_INFO_FAILED: &str = "Error al obtener información del video";
pub const MSG_START_FAILED: &str = "Error al iniciar descarga";
pub const MSG_PROGRESS_FAILED: &str = "Error al obtener progreso";
pub const MSG_JOB_FAILED: &str = "Error durante la descarga";

const UNTITLED: &str = "Sin título";
const UNKNOWN_UPLOADER: &str = "Desconocido";
const THUMBNAIL_ALT: &str = "Video Thumbnail";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Panel {
    Loading,
    VideoInfo,
    Progress,
    Error,
}

/// Input controls
#[derive(Debug, Clone)]
pub struct FormState {
    pub url: String,
    /// Selected `QualityChoice::value`
    pub quality: String,
    pub quality_choices: Vec<QualityChoice>,
    pub download_type: DownloadType,
    pub quality_enabled: bool,
    /// "Get info" button; disabled while a metadata request is out
    pub get_info_enabled: bool,
}

impl Default for FormState {
    fn default() -> Self {
        Self {
            url: String::new(),
            quality: DEFAULT_QUALITY.to_string(),
            quality_choices: QualityChoice::presets(),
            download_type: DownloadType::Video,
            quality_enabled: true,
            get_info_enabled: true,
        }
    }
}

/// Video-info panel cells, already defaulted and formatted
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VideoCard {
    pub thumbnail: String,
    pub thumbnail_alt: String,
    pub title: String,
    pub duration: String,
    pub channel: String,
    pub views: String,
    pub upload_date: Option<String>,
}

/// Progress panel cells
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProgressView {
    /// Bar fill, 0..=100
    pub bar_percent: f64,
    pub text: String,
    pub speed: String,
    pub size: String,
    /// Completion indicator with the "save file" button
    pub complete: bool,
}

#[derive(Debug, Clone, Default)]
pub struct ViewState {
    pub form: FormState,
    panel: Option<Panel>,
    pub video: VideoCard,
    pub progress: ProgressView,
    pub error_message: String,
}

impl ViewState {
    pub fn panel(&self) -> Option<Panel> {
        self.panel
    }

    pub fn is_visible(&self, panel: Panel) -> bool {
        self.panel == Some(panel)
    }

    pub fn hide_all(&mut self) {
        self.panel = None;
    }

    /// Makes `panel` the only visible one
    pub fn show(&mut self, panel: Panel) {
        self.panel = Some(panel);
    }

    pub fn show_error(&mut self, message: impl Into<String>) {
        self.error_message = message.into();
        self.show(Panel::Error);
    }

    pub fn show_video_info(&mut self, info: &VideoInfo) {
        self.video = VideoCard {
            thumbnail: info.thumbnail.clone().unwrap_or_default(),
            thumbnail_alt: info.title.clone().unwrap_or_else(|| THUMBNAIL_ALT.to_string()),
            title: info.title.clone().unwrap_or_else(|| UNTITLED.to_string()),
            duration: format_duration(info.duration),
            channel: info
                .uploader
                .clone()
                .unwrap_or_else(|| UNKNOWN_UPLOADER.to_string()),
            views: format_number(info.view_count),
            upload_date: info.upload_date.as_deref().map(format_upload_date),
        };

        let mut choices = QualityChoice::presets();
        for fmt in &info.formats {
            let Some(id) = fmt.format_id.as_deref() else {
                continue;
            };
            if choices.iter().any(|c| c.value == id) {
                continue;
            }
            choices.push(QualityChoice {
                value: id.to_string(),
                label: format_choice_label(
                    fmt.quality.as_deref().unwrap_or(id),
                    fmt.ext.as_deref(),
                    fmt.filesize,
                ),
            });
        }
        self.form.quality_choices = choices;

        self.show(Panel::VideoInfo);
    }

    /// Empty progress panel for a fresh job
    pub fn begin_progress(&mut self) {
        self.progress = ProgressView {
            bar_percent: 0.0,
            text: format_percent(0.0),
            speed: String::new(),
            size: String::new(),
            complete: false,
        };
        self.show(Panel::Progress);
    }

    /// Applies one progress snapshot. Statuses other than the three known
    /// ones leave the panel as it is.
    pub fn render_snapshot(&mut self, snap: &ProgressSnapshot) {
        match snap.status {
            JobStatus::Error => {
                let message = snap
                    .error
                    .clone()
                    .filter(|m| !m.is_empty())
                    .unwrap_or_else(|| MSG_JOB_FAILED.to_string());
                self.show_error(message);
            }
            JobStatus::Completed => {
                self.progress.bar_percent = 100.0;
                self.progress.text = format_percent(100.0);
                self.progress.complete = true;
            }
            JobStatus::Downloading => {
                let Some(percent) = snap.progress else {
                    return;
                };
                self.progress.bar_percent = percent.clamp(0.0, 100.0);
                self.progress.text = format_percent(percent);
                if let Some(speed) = snap.speed.filter(|s| *s != 0.0) {
                    self.progress.speed = format_speed(Some(speed));
                }
                if let (Some(done), Some(total)) = (snap.downloaded, snap.total) {
                    if done != 0.0 && total != 0.0 {
                        self.progress.size = format!("{} / {}", format_bytes(done), format_bytes(total));
                    }
                }
            }
            JobStatus::Starting | JobStatus::Unknown => {}
        }
    }

    /// Audio-only output has no video quality to pick
    pub fn set_download_type(&mut self, download_type: DownloadType) {
        self.form.download_type = download_type;
        self.form.quality_enabled = !download_type.is_audio_only();
    }

    /// Back to the first-load look: nothing shown, defaults selected
    pub fn reset(&mut self) {
        self.hide_all();
        self.form.url.clear();
        self.form.quality = DEFAULT_QUALITY.to_string();
        self.form.quality_choices = QualityChoice::presets();
        self.set_download_type(DownloadType::Video);
    }
}

fn format_choice_label(quality: &str, ext: Option<&str>, filesize: Option<f64>) -> String {
    match (ext, filesize.filter(|s| *s > 0.0)) {
        (Some(ext), Some(size)) => format!("{} ({}, {})", quality, ext, format_bytes(size)),
        (Some(ext), None) => format!("{} ({})", quality, ext),
        (None, Some(size)) => format!("{} ({})", quality, format_bytes(size)),
        (None, None) => quality.to_string(),
    }
}
