#![allow(dead_code)]

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Once};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::{mpsc, Notify};
use tokio_util::sync::CancellationToken;
use zinc_client::{
    CommandGateway, PushReceiver, SettingsStore, TaskStore, Worker, WorkerError,
};
use zinc_core::{
    DownloadRequest, LocalTranscriptionRequest, Task, TaskId, TaskListView,
    TranscriptionSettingsPatch,
};

pub fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(zinc_logging::initialize_for_tests);
}

/// Scriptable worker: records calls, fails on demand, and lets tests push
/// raw payloads.
pub struct FakeWorker {
    calls: Mutex<Vec<String>>,
    failure: Mutex<Option<WorkerError>>,
    gate: Mutex<Option<Arc<Notify>>>,
    snapshot: Mutex<Vec<Task>>,
    requests: Mutex<Vec<DownloadRequest>>,
    next_id: AtomicU64,
    push_tx: Mutex<Option<mpsc::UnboundedSender<Value>>>,
    push_rx: Mutex<Option<PushReceiver>>,
}

impl FakeWorker {
    pub fn new() -> Arc<Self> {
        let (tx, rx) = mpsc::unbounded_channel();
        Arc::new(Self {
            calls: Mutex::new(Vec::new()),
            failure: Mutex::new(None),
            gate: Mutex::new(None),
            snapshot: Mutex::new(Vec::new()),
            requests: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
            push_tx: Mutex::new(Some(tx)),
            push_rx: Mutex::new(Some(rx)),
        })
    }

    /// The next worker call fails with `err`.
    pub fn fail_next(&self, err: WorkerError) {
        *self.failure.lock().unwrap() = Some(err);
    }

    pub fn set_snapshot(&self, tasks: Vec<Task>) {
        *self.snapshot.lock().unwrap() = tasks;
    }

    /// Every later call waits for a permit on the returned handle before answering.
    pub fn hold_calls(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.gate.lock().unwrap() = Some(Arc::clone(&gate));
        gate
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn last_request(&self) -> Option<DownloadRequest> {
        self.requests.lock().unwrap().last().cloned()
    }

    pub fn push(&self, payload: Value) -> bool {
        match self.push_tx.lock().unwrap().as_ref() {
            Some(tx) => tx.send(payload).is_ok(),
            None => false,
        }
    }

    pub fn push_task(&self, task: &Task) -> bool {
        self.push(serde_json::to_value(task).unwrap())
    }

    pub fn push_is_open(&self) -> bool {
        self.push_tx
            .lock()
            .unwrap()
            .as_ref()
            .is_some_and(|tx| !tx.is_closed())
    }

    pub fn close_push(&self) {
        self.push_tx.lock().unwrap().take();
    }

    async fn call(&self, name: &str) -> Result<(), WorkerError> {
        self.calls.lock().unwrap().push(name.to_string());
        let gate = self.gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        match self.failure.lock().unwrap().take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn allocate_id(&self) -> TaskId {
        format!("job-{}", self.next_id.fetch_add(1, Ordering::Relaxed))
    }
}

#[async_trait]
impl Worker for FakeWorker {
    async fn start_download(&self, request: &DownloadRequest) -> Result<TaskId, WorkerError> {
        self.requests.lock().unwrap().push(request.clone());
        self.call("start_download").await?;
        Ok(self.allocate_id())
    }

    async fn cancel_download(&self, _id: &str) -> Result<(), WorkerError> {
        self.call("cancel_download").await
    }

    async fn clear_download(&self, _id: &str) -> Result<(), WorkerError> {
        self.call("clear_download").await
    }

    async fn clear_completed_downloads(&self) -> Result<(), WorkerError> {
        self.call("clear_completed_downloads").await
    }

    async fn get_downloads(&self) -> Result<Vec<Task>, WorkerError> {
        self.call("get_downloads").await?;
        Ok(self.snapshot.lock().unwrap().clone())
    }

    async fn add_local_transcription(
        &self,
        _request: &LocalTranscriptionRequest,
    ) -> Result<TaskId, WorkerError> {
        self.call("add_local_transcription").await?;
        Ok(self.allocate_id())
    }

    async fn start_local_transcription(&self, _id: &str) -> Result<(), WorkerError> {
        self.call("start_local_transcription").await
    }

    async fn update_transcription_settings(
        &self,
        _id: &str,
        _patch: &TranscriptionSettingsPatch,
    ) -> Result<(), WorkerError> {
        self.call("update_transcription_settings").await
    }

    fn subscribe(&self, _channel: &str) -> Result<PushReceiver, WorkerError> {
        self.push_rx
            .lock()
            .unwrap()
            .take()
            .ok_or_else(|| WorkerError::Rejected("already subscribed".to_string()))
    }
}

pub struct Harness {
    pub worker: Arc<FakeWorker>,
    pub store: TaskStore,
    pub settings: SettingsStore,
    pub scope: CancellationToken,
    pub gateway: CommandGateway,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_settings(SettingsStore::default())
    }

    pub fn with_settings(settings: SettingsStore) -> Self {
        init_logging();
        let worker = FakeWorker::new();
        let store = TaskStore::spawn(settings.clone());
        let scope = CancellationToken::new();
        let gateway = CommandGateway::new(
            worker.clone() as Arc<dyn Worker>,
            store.clone(),
            settings.clone(),
            scope.clone(),
        );
        Self {
            worker,
            store,
            settings,
            scope,
            gateway,
        }
    }
}

pub fn task(id: &str, kind: &str, status: &str) -> Task {
    serde_json::from_value(json!({
        "id": id,
        "task_type": kind,
        "status": status,
        "progress": 42.0,
        "title": format!("title {id}"),
        "url": format!("https://example.com/{id}"),
    }))
    .unwrap()
}

/// Waits until the published view satisfies `done`.
pub async fn wait_for_view(
    store: &TaskStore,
    done: impl Fn(&TaskListView) -> bool,
) -> TaskListView {
    let mut rx = store.watch_view();
    tokio::time::timeout(Duration::from_secs(60), async {
        loop {
            let view = rx.borrow_and_update().clone();
            if done(&view) {
                return view;
            }
            rx.changed().await.unwrap();
        }
    })
    .await
    .expect("view condition not reached in time")
}

pub async fn wait_until(condition: impl Fn() -> bool) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !condition() {
            tokio::task::yield_now().await;
        }
    })
    .await
    .expect("condition not reached in time")
}
