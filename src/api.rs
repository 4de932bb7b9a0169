use std::future::Future;

use serde::de::DeserializeOwned;

use crate::error::{ApiError, Result};
use crate::model::{
    ErrorBody, ProgressSnapshot, StartDownloadRequest, StartDownloadResponse, VideoInfo,
    VideoInfoRequest,
};

/// The four endpoints of the download service.
///
/// Every call is one request/response round trip. Futures must be `Send`
/// because they run on the shared tokio runtime, not on the UI thread.
pub trait Backend: Send + Sync + 'static {
    /// `POST /api/video-info`
    fn video_info(&self, url: &str) -> impl Future<Output = Result<VideoInfo>> + Send;

    /// `POST /api/download`, yielding the new job id
    fn start_download(
        &self,
        url: &str,
        quality: &str,
        audio_only: bool,
    ) -> impl Future<Output = Result<String>> + Send;

    /// `GET /api/progress/{download_id}`
    fn progress(&self, download_id: &str) -> impl Future<Output = Result<ProgressSnapshot>> + Send;

    /// Absolute URL of `GET /api/download-file/{download_id}`
    fn file_url(&self, download_id: &str) -> String;
}

/// `Backend` over HTTP with reqwest
#[derive(Debug, Clone)]
pub struct HttpBackend {
    /// Pooled connections, shared with file retrieval
    client: reqwest::Client,
    /// Service root such as `http://127.0.0.1:5000`
    base: String,
}

impl HttpBackend {
    pub fn new(base: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base)
    }

    pub fn with_client(client: reqwest::Client, base: impl Into<String>) -> Self {
        Self {
            client,
            base: base.into(),
        }
    }

    /// Absolute URL of an API path
    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }
}

impl Backend for HttpBackend {
    async fn video_info(&self, url: &str) -> Result<VideoInfo> {
        tracing::debug!("POST /api/video-info url={}", url);
        let resp = self
            .client
            .post(self.endpoint("/api/video-info"))
            // Body: {"url": ...}
            .json(&VideoInfoRequest { url })
            .send()
            .await?;
        decode(resp).await
    }

    async fn start_download(&self, url: &str, quality: &str, audio_only: bool) -> Result<String> {
        tracing::debug!(
            "POST /api/download url={} quality={} audio_only={}",
            url,
            quality,
            audio_only
        );
        let resp = self
            .client
            .post(self.endpoint("/api/download"))
            .json(&StartDownloadRequest {
                url,
                quality,
                audio_only,
            })
            .send()
            .await?;
        // Only the job id matters; the server's "message" is ignored
        let started: StartDownloadResponse = decode(resp).await?;
        Ok(started.download_id)
    }

    async fn progress(&self, download_id: &str) -> Result<ProgressSnapshot> {
        // Called once a second; logged at trace level only
        tracing::trace!("GET /api/progress/{}", download_id);
        let resp = self
            .client
            .get(self.endpoint(&format!("/api/progress/{}", download_id)))
            .send()
            .await?;
        decode(resp).await
    }

    fn file_url(&self, download_id: &str) -> String {
        self.endpoint(&format!("/api/download-file/{}", download_id))
    }
}

async fn decode<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T> {
    let status = resp.status().as_u16();
    // Read the whole body first: error answers carry JSON too
    let body = resp.bytes().await?;
    decode_body(status, &body)
}

/// 2xx bodies decode into `T`; anything else becomes `ApiError::Server`
/// carrying the body's `error` field if it has one.
fn decode_body<T: DeserializeOwned>(status: u16, body: &[u8]) -> Result<T> {
    if !(200..300).contains(&status) {
        // A missing or non-JSON body just means no message
        let message = serde_json::from_slice::<ErrorBody>(body)
            .ok()
            .and_then(|b| b.error);
        tracing::warn!("API answered {}: {:?}", status, message);
        return Err(ApiError::Server { status, message });
    }
    Ok(serde_json::from_slice(body)?)
}
