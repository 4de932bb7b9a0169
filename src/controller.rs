//! The download page controller.
//!
//! User actions validate input, update the view and hand the network call to
//! the tokio runtime. Results come back as [`Event`]s over a channel and are
//! applied by [`Controller::pump`] on the UI thread, so the view only ever
//! changes there.

use std::sync::Arc;

use tokio::{
    runtime::Handle,
    sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel},
};

use crate::api::Backend;
use crate::error::{ApiError, Result};
use crate::model::{DownloadType, ProgressSnapshot, VideoInfo};
use crate::progress::PollHandle;
use crate::view::{
    MSG_EMPTY_DOWNLOAD_URL, MSG_EMPTY_INFO_URL, MSG_INFO_FAILED, MSG_PROGRESS_FAILED,
    MSG_START_FAILED, Panel, ViewState,
};

/// Completion of a request issued by the controller
#[derive(Debug)]
pub enum Event {
    VideoInfo(Result<VideoInfo>),
    DownloadStarted(Result<String>),
    /// Tagged with the generation of the poller that produced it
    Progress {
        generation: u64,
        result: Result<ProgressSnapshot>,
    },
}

/// Job tracking owned by the controller: at most one job id and one poller.
#[derive(Debug, Default)]
pub struct Session {
    job_id: Option<String>,
    poller: Option<PollHandle>,
    /// Bumped for every poller so late results of a replaced one are ignored
    generation: u64,
}

impl Session {
    pub fn job_id(&self) -> Option<&str> {
        self.job_id.as_deref()
    }

    pub fn is_polling(&self) -> bool {
        self.poller.is_some()
    }

    /// Reserves the generation for a new poller, cancelling the current one
    fn next_generation(&mut self) -> u64 {
        self.stop_polling();
        self.generation += 1;
        self.generation
    }

    fn install_poller(&mut self, poller: PollHandle) {
        debug_assert!(self.poller.is_none());
        debug_assert_eq!(poller.generation(), self.generation);
        self.poller = Some(poller);
    }

    fn stop_polling(&mut self) {
        if let Some(poller) = self.poller.take() {
            poller.cancel();
        }
    }

    /// True when `generation` belongs to the poller that is still running
    fn accepts(&self, generation: u64) -> bool {
        self.poller
            .as_ref()
            .is_some_and(|p| p.generation() == generation)
    }

    fn discard(&mut self) {
        self.stop_polling();
        self.job_id = None;
    }
}

pub struct Controller<B: Backend> {
    /// What the window shows
    view: ViewState,
    /// Tracked job and its poller
    session: Session,
    /// API client, shared with spawned requests
    backend: Arc<B>,
    /// Runtime the requests and the poller run on
    runtime: Handle,
    /// Cloned into every spawned request
    events_tx: UnboundedSender<Event>,
    /// Drained by `pump` on the UI thread
    events_rx: UnboundedReceiver<Event>,
}

impl<B: Backend> Controller<B> {
    pub fn new(backend: Arc<B>, runtime: Handle) -> Self {
        let (events_tx, events_rx) = unbounded_channel();
        Self {
            view: ViewState::default(),
            session: Session::default(),
            backend,
            runtime,
            events_tx,
            events_rx,
        }
    }

    pub fn view(&self) -> &ViewState {
        &self.view
    }

    /// Form fields bound directly to widgets
    pub fn view_mut(&mut self) -> &mut ViewState {
        &mut self.view
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Trimmed URL from the form; blank input never reaches the network
    fn form_url(&self) -> Result<String> {
        let url = self.view.form.url.trim();
        if url.is_empty() {
            return Err(ApiError::EmptyUrl);
        }
        Ok(url.to_string())
    }

    /// Looks up metadata for the URL in the form
    pub fn request_video_info(&mut self) {
        let url = match self.form_url() {
            Ok(url) => url,
            Err(e) => {
                self.view.show_error(e.user_message(MSG_EMPTY_INFO_URL));
                return;
            }
        };

        // Loading panel; the trigger stays disabled until the answer is applied
        self.view.show(Panel::Loading);
        self.view.form.get_info_enabled = false;
        tracing::info!("requesting video info for {}", url);

        let backend = Arc::clone(&self.backend);
        let tx = self.events_tx.clone();
        // Result comes back through the event channel
        self.runtime.spawn(async move {
            let result = backend.video_info(&url).await;
            let _ = tx.send(Event::VideoInfo(result));
        });
    }

    /// Starts a server-side job with the form's URL, quality and type
    pub fn start_download(&mut self) {
        let url = match self.form_url() {
            Ok(url) => url,
            Err(e) => {
                self.view.show_error(e.user_message(MSG_EMPTY_DOWNLOAD_URL));
                return;
            }
        };
        // Quality is sent even when the selector is disabled for audio
        let quality = self.view.form.quality.clone();
        let audio_only = self.view.form.download_type.is_audio_only();

        // Fresh 0% progress panel while the job is being created
        self.view.begin_progress();
        tracing::info!(
            "starting download of {} (quality={}, audio_only={})",
            url,
            quality,
            audio_only
        );

        let backend = Arc::clone(&self.backend);
        let tx = self.events_tx.clone();
        // The job id arrives as `Event::DownloadStarted`
        self.runtime.spawn(async move {
            let result = backend.start_download(&url, &quality, audio_only).await;
            let _ = tx.send(Event::DownloadStarted(result));
        });
    }

    /// URL of the finished file for the tracked job, if there is one
    pub fn retrieve_file(&self) -> Option<String> {
        self.session.job_id().map(|id| self.backend.file_url(id))
    }

    pub fn reset_form(&mut self) {
        tracing::debug!("form reset");
        // Cancels the poller and forgets the job id
        self.session.discard();
        self.view.reset();
    }

    pub fn set_download_type(&mut self, download_type: DownloadType) {
        self.view.set_download_type(download_type);
    }

    /// Applies every completed request. Returns how many events were handled.
    pub fn pump(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(event) = self.events_rx.try_recv() {
            self.handle_event(event);
            handled += 1;
        }
        handled
    }

    /// Waits for the next completed request without applying it
    #[cfg(test)]
    pub async fn next_event(&mut self) -> Option<Event> {
        self.events_rx.recv().await
    }

    pub fn handle_event(&mut self, event: Event) {
        match event {
            Event::VideoInfo(result) => {
                // Re-enabled on every outcome
                self.view.form.get_info_enabled = true;
                match result {
                    Ok(info) => {
                        tracing::info!("video info: {:?}", info.title);
                        self.view.show_video_info(&info);
                    }
                    Err(e) => {
                        tracing::warn!("video info failed: {}", e);
                        self.view.show_error(e.user_message(MSG_INFO_FAILED));
                    }
                }
            }
            Event::DownloadStarted(Ok(download_id)) => {
                tracing::info!("download job {} started", download_id);
                // Replaces any earlier job and its poller
                self.start_polling(download_id);
            }
            Event::DownloadStarted(Err(e)) => {
                tracing::warn!("download start failed: {}", e);
                self.view.show_error(e.user_message(MSG_START_FAILED));
            }
            Event::Progress { generation, result } => {
                // Late results of a cancelled or replaced poller
                if !self.session.accepts(generation) {
                    tracing::debug!("dropping progress from stale poller #{}", generation);
                    return;
                }
                match result {
                    Ok(snap) => {
                        // Latest snapshot only, nothing merged
                        self.view.render_snapshot(&snap);
                        // completed / error: the poller has already exited
                        if snap.status.is_terminal() {
                            tracing::info!("job finished with {:?}", snap.status);
                            self.session.stop_polling();
                        }
                    }
                    Err(e) => {
                        // No retry: a failed poll ends the flow
                        tracing::warn!("progress poll failed: {}", e);
                        self.session.stop_polling();
                        self.view.show_error(e.user_message(MSG_PROGRESS_FAILED));
                    }
                }
            }
        }
    }

    fn start_polling(&mut self, download_id: String) {
        // Cancels the old poller before the new one exists
        let generation = self.session.next_generation();
        let poller = PollHandle::spawn(
            &self.runtime,
            Arc::clone(&self.backend),
            download_id.clone(),
            generation,
            self.events_tx.clone(),
        );
        self.session.job_id = Some(download_id);
        self.session.install_poller(poller);
    }
}


#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::testing::MockBackend;
    use super::*;
    use crate::model::{JobStatus, QualityChoice};
    use crate::progress::POLL_PERIOD;
    use crate::view::MSG_JOB_FAILED;

    fn controller() -> (Controller<MockBackend>, Arc<MockBackend>) {
        let backend = Arc::new(MockBackend::default());
        (Controller::new(backend.clone(), Handle::current()), backend)
    }

    /// Receives and applies exactly one event
    async fn step(c: &mut Controller<MockBackend>) {
        let event = c.next_event().await.expect("event");
        c.handle_event(event);
    }

    async fn started(c: &mut Controller<MockBackend>) {
        c.view_mut().form.url = "https://youtu.be/abc".into();
        c.start_download();
        step(c).await;
        assert!(c.session().is_polling());
    }

    #[tokio::test]
    async fn blank_url_is_rejected_without_a_request() {
        let (mut c, backend) = controller();
        for url in ["", "   ", "\t\n"] {
            c.view_mut().form.url = url.into();
            c.request_video_info();
            assert_eq!(c.view().panel(), Some(Panel::Error));
            assert_eq!(c.view().error_message, MSG_EMPTY_INFO_URL);

            c.start_download();
            assert_eq!(c.view().panel(), Some(Panel::Error));
            assert_eq!(c.view().error_message, MSG_EMPTY_DOWNLOAD_URL);
        }
        tokio::task::yield_now().await;
        assert_eq!(backend.total_calls(), 0);
        assert_eq!(c.pump(), 0);
    }

    #[tokio::test]
    async fn video_info_renders_and_reenables_trigger() {
        let (mut c, backend) = controller();
        backend.push_info(Ok(VideoInfo {
            title: Some("T".into()),
            duration: Some(125.0),
            ..VideoInfo::default()
        }));
        c.view_mut().form.url = "  https://youtu.be/abc ".into();
        c.request_video_info();
        assert_eq!(c.view().panel(), Some(Panel::Loading));
        assert!(!c.view().form.get_info_enabled);

        step(&mut c).await;
        assert_eq!(c.view().panel(), Some(Panel::VideoInfo));
        assert_eq!(c.view().video.title, "T");
        assert_eq!(c.view().video.duration, "2:05");
        assert!(c.view().form.get_info_enabled);
        assert_eq!(backend.info_calls(), 1);
    }

    #[tokio::test]
    async fn video_info_failure_shows_server_message_or_default() {
        let (mut c, backend) = controller();
        backend.push_info(Err(ApiError::Server {
            status: 400,
            message: Some("URL debe ser de YouTube".into()),
        }));
        backend.push_info(Err(ApiError::Server {
            status: 500,
            message: None,
        }));
        c.view_mut().form.url = "https://example.com".into();

        c.request_video_info();
        step(&mut c).await;
        assert_eq!(c.view().panel(), Some(Panel::Error));
        assert_eq!(c.view().error_message, "URL debe ser de YouTube");
        assert!(c.view().form.get_info_enabled);

        c.request_video_info();
        step(&mut c).await;
        assert_eq!(c.view().error_message, MSG_INFO_FAILED);
        assert!(c.view().form.get_info_enabled);
    }

    #[tokio::test]
    async fn start_sends_form_values_and_resets_progress() {
        let (mut c, backend) = controller();
        c.view_mut().form.url = "https://youtu.be/abc".into();
        c.view_mut().form.quality = "720".into();
        c.set_download_type(DownloadType::Audio);
        c.view_mut().progress.speed = "stale".into();
        c.view_mut().progress.complete = true;

        c.start_download();
        assert_eq!(c.view().panel(), Some(Panel::Progress));
        assert_eq!(c.view().progress.text, "0%");
        assert_eq!(c.view().progress.speed, "");
        assert!(!c.view().progress.complete);

        step(&mut c).await;
        assert_eq!(c.session().job_id(), Some("job-1"));
        assert_eq!(
            backend.last_start.lock().unwrap().clone(),
            Some(("https://youtu.be/abc".to_string(), "720".to_string(), true))
        );
    }

    #[tokio::test]
    async fn start_failure_shows_error_and_tracks_nothing() {
        let (mut c, backend) = controller();
        backend.push_start(Err(ApiError::Server {
            status: 400,
            message: None,
        }));
        c.view_mut().form.url = "https://youtu.be/abc".into();
        c.start_download();
        step(&mut c).await;
        assert_eq!(c.view().panel(), Some(Panel::Error));
        assert_eq!(c.view().error_message, MSG_START_FAILED);
        assert!(!c.session().is_polling());
        assert_eq!(c.retrieve_file(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn first_poll_renders_percent_and_speed() {
        let (mut c, backend) = controller();
        let mut snap = MockBackend::snapshot(JobStatus::Downloading, Some(42.0));
        snap.speed = Some(1_048_576.0);
        backend.push_progress(Ok(snap));

        started(&mut c).await;
        step(&mut c).await;
        assert_eq!(c.view().progress.bar_percent, 42.0);
        assert_eq!(c.view().progress.text, "42%");
        assert_eq!(c.view().progress.speed, "1.00 MB/s");
        assert!(c.session().is_polling());
    }

    #[tokio::test(start_paused = true)]
    async fn completed_renders_full_and_stops() {
        let (mut c, backend) = controller();
        backend.push_progress(Ok(MockBackend::snapshot(JobStatus::Completed, Some(3.0))));

        started(&mut c).await;
        step(&mut c).await;
        assert_eq!(c.view().progress.bar_percent, 100.0);
        assert_eq!(c.view().progress.text, "100%");
        assert!(c.view().progress.complete);
        assert!(!c.session().is_polling());
        assert_eq!(
            c.retrieve_file().as_deref(),
            Some("http://backend/api/download-file/job-1")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn job_error_halts_polling() {
        let (mut c, backend) = controller();
        backend.push_progress(Ok(MockBackend::snapshot(JobStatus::Downloading, Some(10.0))));
        backend.push_progress(Ok(MockBackend::snapshot(JobStatus::Error, None)));

        started(&mut c).await;
        step(&mut c).await;
        step(&mut c).await;
        assert_eq!(c.view().panel(), Some(Panel::Error));
        assert_eq!(c.view().error_message, MSG_JOB_FAILED);
        assert!(!c.session().is_polling());

        tokio::time::sleep(POLL_PERIOD * 10).await;
        assert_eq!(backend.progress_calls(), 2);
        assert_eq!(c.pump(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn poll_failure_halts_polling() {
        let (mut c, backend) = controller();
        backend.push_progress(Err(ApiError::Server {
            status: 404,
            message: Some("ID de descarga no encontrado".into()),
        }));

        started(&mut c).await;
        step(&mut c).await;
        assert_eq!(c.view().panel(), Some(Panel::Error));
        assert_eq!(c.view().error_message, "ID de descarga no encontrado");
        assert!(!c.session().is_polling());

        tokio::time::sleep(POLL_PERIOD * 10).await;
        assert_eq!(backend.progress_calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn starting_status_keeps_polling_without_rendering() {
        let (mut c, backend) = controller();
        backend.push_progress(Ok(MockBackend::snapshot(JobStatus::Starting, Some(0.0))));
        backend.push_progress(Ok(MockBackend::snapshot(JobStatus::Unknown, Some(99.0))));

        started(&mut c).await;
        step(&mut c).await;
        step(&mut c).await;
        assert_eq!(c.view().panel(), Some(Panel::Progress));
        assert_eq!(c.view().progress.text, "0%");
        assert!(c.session().is_polling());
    }

    #[tokio::test(start_paused = true)]
    async fn stale_generation_is_ignored() {
        let (mut c, _backend) = controller();
        started(&mut c).await;
        let before = c.view().progress.clone();

        c.handle_event(Event::Progress {
            generation: 0,
            result: Ok(MockBackend::snapshot(JobStatus::Completed, None)),
        });
        assert_eq!(c.view().progress, before);
        assert!(c.session().is_polling());
    }

    #[tokio::test(start_paused = true)]
    async fn new_job_replaces_the_poller() {
        let (mut c, backend) = controller();
        backend.push_start(Ok("job-1".into()));
        backend.push_start(Ok("job-2".into()));
        started(&mut c).await;
        let first = c.session().generation;

        c.start_download();
        step(&mut c).await;
        assert_eq!(c.session().job_id(), Some("job-2"));
        assert_eq!(c.session().generation, first + 1);
        assert!(c.session().is_polling());
    }

    #[tokio::test(start_paused = true)]
    async fn reset_after_error_restores_defaults() {
        let (mut c, backend) = controller();
        backend.push_progress(Ok(MockBackend::snapshot(JobStatus::Downloading, Some(5.0))));
        started(&mut c).await;
        c.view_mut().form.quality = "480".into();
        c.set_download_type(DownloadType::Audio);
        c.view_mut().show_error("boom");

        c.reset_form();
        assert_eq!(c.view().panel(), None);
        assert_eq!(c.view().form.url, "");
        assert_eq!(c.view().form.quality, "best");
        assert_eq!(c.view().form.download_type, DownloadType::Video);
        assert!(c.view().form.quality_enabled);
        assert_eq!(c.view().form.quality_choices, QualityChoice::presets());
        assert!(!c.session().is_polling());
        assert_eq!(c.session().job_id(), None);
        assert_eq!(c.retrieve_file(), None);

        let calls = backend.progress_calls();
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(backend.progress_calls(), calls);
        // Anything already queued belongs to the cancelled poller
        c.pump();
        assert_eq!(c.view().panel(), None);
    }

    #[tokio::test]
    async fn retrieve_without_job_is_a_no_op() {
        let (c, _backend) = controller();
        assert_eq!(c.retrieve_file(), None);
    }
}
