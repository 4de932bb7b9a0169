//! Recurring progress poll for the tracked job.

use std::sync::Arc;
use std::time::Duration;

use tokio::{
    runtime::Handle,
    sync::mpsc::UnboundedSender,
    task::JoinHandle,
    time::MissedTickBehavior,
};

use crate::api::Backend;
use crate::controller::Event;

pub const POLL_PERIOD: Duration = Duration::from_secs(1);

/// The running poll task. Dropping the handle aborts it.
///
/// Requests are issued one at a time from a single task, so a tick never
/// overlaps an unfinished request; a slow response delays the next tick.
#[derive(Debug)]
pub struct PollHandle {
    generation: u64,
    task: JoinHandle<()>,
}

impl PollHandle {
    pub fn spawn<B: Backend>(
        runtime: &Handle,
        backend: Arc<B>,
        download_id: String,
        generation: u64,
        events: UnboundedSender<Event>,
    ) -> Self {
        tracing::debug!("poller #{} started for {}", generation, download_id);
        let task = runtime.spawn(async move {
            let mut ticker = tokio::time::interval(POLL_PERIOD);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // First tick is immediate; the first request goes out one period in
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let result = backend.progress(&download_id).await;
                let stop = match &result {
                    Ok(snap) => snap.status.is_terminal(),
                    Err(_) => true,
                };
                if events.send(Event::Progress { generation, result }).is_err() || stop {
                    break;
                }
            }
            tracing::debug!("poller #{} finished", generation);
        });
        Self { generation, task }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn cancel(self) {
        tracing::debug!("poller #{} cancelled", self.generation);
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}
