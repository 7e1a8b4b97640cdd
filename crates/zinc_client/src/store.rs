use thiserror::Error;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use zinc_core::{update, AppState, Change, ClientSettings, Msg, Task, TaskId, TaskListView};
use zinc_logging::{zinc_debug, zinc_info};

use crate::settings::SettingsStore;

const CHANGE_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("task store is closed")]
pub struct StoreClosed;

enum StoreCommand {
    Apply {
        msg: Msg,
        reply: oneshot::Sender<Vec<Change>>,
    },
    Snapshot {
        reply: oneshot::Sender<Vec<Task>>,
    },
    Lookup {
        id: TaskId,
        reply: oneshot::Sender<Option<(Task, bool)>>,
    },
    Shutdown,
}

/// Handle to the single task that owns the registry.
///
/// Every read and write is serialized through that task, so producers (the
/// gateway, the reconciler) never contend on a lock. The view published on
/// [`TaskStore::watch_view`] is recomputed after each effective mutation.
#[derive(Clone)]
pub struct TaskStore {
    cmd_tx: mpsc::UnboundedSender<StoreCommand>,
    view_rx: watch::Receiver<TaskListView>,
    change_tx: broadcast::Sender<Change>,
}

impl TaskStore {
    /// Spawns the owner task on the current tokio runtime.
    pub fn spawn(settings: SettingsStore) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let state = AppState::with_settings(&settings.current());
        let (view_tx, view_rx) = watch::channel(state.view(settings.use_gpu()));
        let (change_tx, _) = broadcast::channel(CHANGE_CAPACITY);
        let settings_rx = settings.subscribe();

        tokio::spawn(run(
            state,
            settings,
            settings_rx,
            cmd_rx,
            view_tx,
            change_tx.clone(),
        ));

        Self {
            cmd_tx,
            view_rx,
            change_tx,
        }
    }

    /// Applies `msg` and resolves with the changes it produced.
    pub async fn apply(&self, msg: Msg) -> Result<Vec<Change>, StoreClosed> {
        let (reply, rx) = oneshot::channel();
        self.send(StoreCommand::Apply { msg, reply })?;
        rx.await.map_err(|_| StoreClosed)
    }

    pub async fn snapshot(&self) -> Result<Vec<Task>, StoreClosed> {
        let (reply, rx) = oneshot::channel();
        self.send(StoreCommand::Snapshot { reply })?;
        rx.await.map_err(|_| StoreClosed)
    }

    pub async fn get(&self, id: &str) -> Result<Option<Task>, StoreClosed> {
        Ok(self.lookup(id).await?.map(|(task, _)| task))
    }

    pub async fn is_confirmed(&self, id: &str) -> Result<Option<bool>, StoreClosed> {
        Ok(self.lookup(id).await?.map(|(_, confirmed)| confirmed))
    }

    async fn lookup(&self, id: &str) -> Result<Option<(Task, bool)>, StoreClosed> {
        let (reply, rx) = oneshot::channel();
        self.send(StoreCommand::Lookup {
            id: id.to_string(),
            reply,
        })?;
        rx.await.map_err(|_| StoreClosed)
    }

    /// Latest derived view.
    pub fn view(&self) -> TaskListView {
        self.view_rx.borrow().clone()
    }

    pub fn watch_view(&self) -> watch::Receiver<TaskListView> {
        self.view_rx.clone()
    }

    pub fn subscribe_changes(&self) -> broadcast::Receiver<Change> {
        self.change_tx.subscribe()
    }

    pub fn is_closed(&self) -> bool {
        self.cmd_tx.is_closed()
    }

    /// Stops the owner task; later calls fail with [`StoreClosed`].
    pub fn shutdown(&self) {
        let _ = self.cmd_tx.send(StoreCommand::Shutdown);
    }

    fn send(&self, command: StoreCommand) -> Result<(), StoreClosed> {
        self.cmd_tx.send(command).map_err(|_| StoreClosed)
    }
}

async fn run(
    mut state: AppState,
    settings: SettingsStore,
    mut settings_rx: watch::Receiver<ClientSettings>,
    mut cmd_rx: mpsc::UnboundedReceiver<StoreCommand>,
    view_tx: watch::Sender<TaskListView>,
    change_tx: broadcast::Sender<Change>,
) {
    loop {
        tokio::select! {
            command = cmd_rx.recv() => {
                let Some(command) = command else { break };
                match command {
                    StoreCommand::Apply { msg, reply } => {
                        let (next, changes) = update(std::mem::take(&mut state), msg);
                        state = next;
                        if state.consume_dirty() {
                            view_tx.send_replace(state.view(settings.use_gpu()));
                            for change in &changes {
                                // No subscribers is fine.
                                let _ = change_tx.send(change.clone());
                            }
                        }
                        let _ = reply.send(changes);
                    }
                    StoreCommand::Snapshot { reply } => {
                        let _ = reply.send(state.registry().snapshot());
                    }
                    StoreCommand::Lookup { id, reply } => {
                        let registry = state.registry();
                        let found = registry
                            .get(&id)
                            .cloned()
                            .zip(registry.is_confirmed(&id));
                        let _ = reply.send(found);
                    }
                    StoreCommand::Shutdown => break,
                }
            }
            Ok(()) = settings_rx.changed() => {
                let use_gpu = settings_rx.borrow_and_update().use_gpu;
                zinc_debug!("Settings changed, recomputing task view (use_gpu={})", use_gpu);
                view_tx.send_replace(state.view(use_gpu));
            }
        }
    }
    cmd_rx.close();
    zinc_info!("Task store stopped with {} task(s)", state.registry().len());
}
