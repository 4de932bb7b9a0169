use serde::{Deserialize, Serialize};

/// Metadata returned by `POST /api/video-info`
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct VideoInfo {
    pub title: Option<String>,
    pub thumbnail: Option<String>,
    /// Length in seconds; the extractor sometimes reports fractions
    pub duration: Option<f64>,
    pub uploader: Option<String>,
    /// Plain JSON number; some extractors report it as a float
    pub view_count: Option<f64>,
    /// Upload day as `YYYYMMDD`
    #[serde(default)]
    pub upload_date: Option<String>,
    #[serde(default)]
    pub formats: Vec<MediaFormat>,
}

/// One downloadable format advertised by the server
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct MediaFormat {
    pub format_id: Option<String>,
    pub ext: Option<String>,
    pub quality: Option<String>,
    pub filesize: Option<f64>,
}

/// Lifecycle of a server-side job as reported by `GET /api/progress/{id}`
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    /// Accepted but the worker has not picked it up yet
    Starting,
    Downloading,
    Completed,
    Error,
    #[serde(other)]
    Unknown,
}

impl JobStatus {
    /// `completed` and `error` end polling
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Error)
    }
}

/// One polled status report; each one fully replaces the previous
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ProgressSnapshot {
    pub status: JobStatus,
    /// Percent complete, 0..=100
    pub progress: Option<f64>,
    /// Bytes per second
    pub speed: Option<f64>,
    /// Byte counters arrive as plain JSON numbers, integral or not
    pub downloaded: Option<f64>,
    pub total: Option<f64>,
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct VideoInfoRequest<'a> {
    pub url: &'a str,
}

#[derive(Debug, Serialize)]
pub struct StartDownloadRequest<'a> {
    pub url: &'a str,
    pub quality: &'a str,
    pub audio_only: bool,
}

#[derive(Debug, Deserialize)]
pub struct StartDownloadResponse {
    pub download_id: String,
}

/// Body of every non-2xx API response
#[derive(Debug, Default, Deserialize)]
pub struct ErrorBody {
    pub error: Option<String>,
}

/// Radio choice between full video and audio-only output
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DownloadType {
    #[default]
    Video,
    Audio,
}

impl DownloadType {
    pub fn is_audio_only(self) -> bool {
        self == DownloadType::Audio
    }
}

/// Entry of the quality selector
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QualityChoice {
    /// Sent verbatim as `quality`
    pub value: String,
    pub label: String,
}

impl QualityChoice {
    fn preset(value: &str, label: &str) -> Self {
        Self {
            value: value.to_string(),
            label: label.to_string(),
        }
    }

    /// Selector entries available before any metadata is loaded
    pub fn presets() -> Vec<QualityChoice> {
        vec![
            Self::preset(DEFAULT_QUALITY, "Mejor calidad"),
            Self::preset("1080", "1080p"),
            Self::preset("720", "720p"),
            Self::preset("480", "480p"),
        ]
    }
}

pub const DEFAULT_QUALITY: &str = "best";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_snapshot_tolerates_missing_and_unknown_fields() {
        let snap: ProgressSnapshot =
            serde_json::from_str(r#"{"status":"starting","progress":0,"file_path":null}"#).unwrap();
        assert_eq!(snap.status, JobStatus::Starting);
        assert_eq!(snap.progress, Some(0.0));
        assert!(snap.speed.is_none());

        let snap: ProgressSnapshot = serde_json::from_str(r#"{"status":"merging"}"#).unwrap();
        assert_eq!(snap.status, JobStatus::Unknown);
        assert!(!snap.status.is_terminal());
    }

    #[test]
    fn fractional_counters_decode() {
        let snap: ProgressSnapshot = serde_json::from_str(
            r#"{"status":"downloading","progress":12.5,"downloaded":1024.0,"total":4096.5}"#,
        )
        .unwrap();
        assert_eq!(snap.downloaded, Some(1024.0));
        assert_eq!(snap.total, Some(4096.5));

        let info: VideoInfo = serde_json::from_str(r#"{"view_count":1500.0}"#).unwrap();
        assert_eq!(info.view_count, Some(1500.0));
    }

    #[test]
    fn video_info_parses_server_formats() {
        let info: VideoInfo = serde_json::from_str(
            r#"{"title":"T","duration":125,"view_count":null,
                "formats":[{"format_id":"18","ext":"mp4","quality":"360p","filesize":null,"vcodec":"avc1"}]}"#,
        )
        .unwrap();
        assert_eq!(info.duration, Some(125.0));
        assert_eq!(info.view_count, None);
        assert_eq!(info.formats.len(), 1);
        assert_eq!(info.formats[0].format_id.as_deref(), Some("18"));
    }
}
