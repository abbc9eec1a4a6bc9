//! Handle for an event source attached to a hub.

use parking_lot::Mutex;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Controls a running hub loop started by [`ChangeHub::attach`].
///
/// Dropping the handle detaches the source as well.
///
/// [`ChangeHub::attach`]: crate::ChangeHub::attach
pub struct SourceHandle {
    stop: Mutex<Option<oneshot::Sender<()>>>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl SourceHandle {
    pub(crate) fn new(stop: oneshot::Sender<()>, task: JoinHandle<()>) -> Self {
        Self {
            stop: Mutex::new(Some(stop)),
            task: Mutex::new(Some(task)),
        }
    }

    /// Stop consuming the source. Returns `false` if already detached.
    pub fn detach(&self) -> bool {
        match self.stop.lock().take() {
            Some(stop) => {
                let _ = stop.send(());
                info!("event source detached");
                true
            }
            None => false,
        }
    }

    /// Whether the hub loop is still consuming the source.
    pub fn is_attached(&self) -> bool {
        self.stop
            .lock()
            .as_ref()
            .is_some_and(|stop| !stop.is_closed())
    }

    /// Wait for the hub loop to finish. Returns immediately on later calls.
    pub async fn join(&self) {
        let task = self.task.lock().take();
        if let Some(task) = task {
            if let Err(e) = task.await {
                warn!(error = %e, "change hub task failed");
            }
        }
    }
}

impl std::fmt::Debug for SourceHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceHandle")
            .field("attached", &self.is_attached())
            .finish()
    }
}
