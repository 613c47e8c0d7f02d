//! Fixed-interval trigger for the polling pipeline.
//!
//! The first tick fires immediately at `start()`, then every `interval`
//! until `stop()` or process shutdown. Each tick spawns the poll as its own
//! task: the timer is independent of run duration, so an abnormally slow
//! cycle may overlap the next one. There is no shared mutable state between
//! cycles, so no mutual exclusion is needed.

use std::{sync::Arc, time::Duration};

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::pipeline::PollPipeline;

pub struct PollScheduler {
    pipeline: Arc<PollPipeline>,
    interval: Duration,
    state: tokio::sync::Mutex<Option<RunningPoller>>,
}

struct RunningPoller {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl PollScheduler {
    pub fn new(pipeline: Arc<PollPipeline>, interval: Duration) -> Self {
        Self {
            pipeline,
            interval,
            state: tokio::sync::Mutex::new(None),
        }
    }

    /// Start ticking. A no-op if already started.
    pub async fn start(&self) {
        let mut st = self.state.lock().await;
        if st.is_some() {
            return;
        }

        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let pipeline = Arc::clone(&self.pipeline);
        let interval = self.interval;

        let handle = tokio::spawn(async move {
            let mut tick = tokio::time::interval(interval);
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = tick.tick() => {
                        let pipeline = Arc::clone(&pipeline);
                        tokio::spawn(async move {
                            pipeline.run_once().await;
                        });
                    }
                }
            }
        });

        info!("scheduler started, polling every {:?}", interval);
        *st = Some(RunningPoller { cancel, handle });
    }

    pub async fn stop(&self) {
        if let Some(poller) = self.state.lock().await.take() {
            poller.cancel.cancel();
            poller.handle.abort();
            info!("scheduler stopped");
        }
    }
}
