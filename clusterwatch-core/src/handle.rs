//! Handle for controlling the background refresh scheduler.

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::warn;

/// Controls a scheduler started with
/// [`PollingService::start`](crate::PollingService::start).
///
/// Drop this handle to stop the scheduler, call [`stop`](Self::stop) to
/// signal it without waiting, or [`shutdown`](Self::shutdown) to signal and
/// wait until the in-flight cycle has settled.
pub struct PollerHandle {
    stop_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl PollerHandle {
    pub(crate) fn new(stop_tx: watch::Sender<bool>, task: JoinHandle<()>) -> Self {
        Self { stop_tx, task }
    }

    /// Ask the scheduler to stop issuing new cycles.
    pub fn stop(&self) {
        let _ = self.stop_tx.send(true);
    }

    /// Stop the scheduler and wait for it to exit.
    pub async fn shutdown(self) {
        self.stop();
        if let Err(err) = self.task.await {
            warn!(error = %err, "Refresh scheduler exited abnormally");
        }
    }

    /// True once the scheduler task has exited.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl std::fmt::Debug for PollerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PollerHandle")
            .field("finished", &self.is_finished())
            .finish()
    }
}
