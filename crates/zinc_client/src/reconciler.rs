use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use zinc_core::{Msg, Task};
use zinc_logging::{zinc_debug, zinc_info, zinc_warn};

use crate::store::TaskStore;
use crate::worker::{PushReceiver, Worker, WorkerError, PUSH_CHANNEL};

/// Counters for one reconciler lifetime.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReconcilerStats {
    pub received: u64,
    pub applied: u64,
    /// Decoded but dropped by the registry's stray-event policy.
    pub suppressed: u64,
    pub malformed: u64,
}

/// Applies every push event to the store as a full replacement.
///
/// Runs until the owning scope is cancelled, the reconciler is shut down or
/// dropped, or the worker closes the channel.
pub struct EventReconciler {
    token: CancellationToken,
    handle: Option<JoinHandle<ReconcilerStats>>,
}

impl EventReconciler {
    /// Opens the worker's push channel and starts applying events.
    pub fn subscribe(
        worker: &dyn Worker,
        store: TaskStore,
        scope: &CancellationToken,
    ) -> Result<Self, WorkerError> {
        let rx = worker.subscribe(PUSH_CHANNEL)?;
        let token = scope.child_token();
        let handle = tokio::spawn(run(rx, store, token.clone()));
        zinc_info!("Subscribed to {}", PUSH_CHANNEL);
        Ok(Self {
            token,
            handle: Some(handle),
        })
    }

    pub fn is_running(&self) -> bool {
        self.handle
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Stops the subscription and waits for the loop to exit.
    pub async fn shutdown(mut self) -> ReconcilerStats {
        self.token.cancel();
        match self.handle.take() {
            Some(handle) => handle.await.unwrap_or_default(),
            None => ReconcilerStats::default(),
        }
    }
}

impl Drop for EventReconciler {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

async fn run(mut rx: PushReceiver, store: TaskStore, token: CancellationToken) -> ReconcilerStats {
    let mut stats = ReconcilerStats::default();
    loop {
        let payload = tokio::select! {
            biased;
            _ = token.cancelled() => break,
            payload = rx.recv() => match payload {
                Some(payload) => payload,
                None => {
                    zinc_info!("Push channel {} closed by worker", PUSH_CHANNEL);
                    break;
                }
            },
        };
        stats.received += 1;

        let task: Task = match serde_json::from_value(payload) {
            Ok(task) => task,
            Err(err) => {
                stats.malformed += 1;
                zinc_warn!("Dropping malformed push event: {}", err);
                continue;
            }
        };

        match store.apply(Msg::TaskPushed(task)).await {
            Ok(changes) if changes.is_empty() => stats.suppressed += 1,
            Ok(_) => stats.applied += 1,
            Err(err) => {
                zinc_debug!("Stopping reconciler: {}", err);
                break;
            }
        }
    }
    rx.close();
    zinc_info!(
        "Reconciler stopped: {} received, {} applied, {} suppressed, {} malformed",
        stats.received,
        stats.applied,
        stats.suppressed,
        stats.malformed
    );
    stats
}
