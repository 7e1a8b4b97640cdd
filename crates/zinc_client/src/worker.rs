use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;
use zinc_core::{
    DownloadRequest, LocalTranscriptionRequest, Task, TaskId, TranscriptionSettingsPatch,
};

/// Name of the worker's task update stream.
pub const PUSH_CHANNEL: &str = "download-progress";

/// One raw task payload per event, keyed by its own `id` field.
pub type PushReceiver = mpsc::UnboundedReceiver<serde_json::Value>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorkerError {
    /// The worker refused the call (bad arguments, wrong task state).
    #[error("worker rejected the request: {0}")]
    Rejected(String),
    #[error("task not found: {0}")]
    NotFound(TaskId),
    /// The worker process could not be reached or launched.
    #[error("worker unavailable: {0}")]
    Unavailable(String),
}

/// Job-lifecycle calls on the external worker process.
///
/// Every method resolves once the worker has answered; none of them touch
/// client state. Progress arrives separately on the push channel.
#[async_trait]
pub trait Worker: Send + Sync {
    async fn start_download(&self, request: &DownloadRequest) -> Result<TaskId, WorkerError>;

    async fn cancel_download(&self, id: &str) -> Result<(), WorkerError>;

    async fn clear_download(&self, id: &str) -> Result<(), WorkerError>;

    async fn clear_completed_downloads(&self) -> Result<(), WorkerError>;

    /// Startup hydration snapshot.
    async fn get_downloads(&self) -> Result<Vec<Task>, WorkerError>;

    async fn add_local_transcription(
        &self,
        request: &LocalTranscriptionRequest,
    ) -> Result<TaskId, WorkerError>;

    async fn start_local_transcription(&self, id: &str) -> Result<(), WorkerError>;

    async fn update_transcription_settings(
        &self,
        id: &str,
        patch: &TranscriptionSettingsPatch,
    ) -> Result<(), WorkerError>;

    /// Opens the named push stream.
    fn subscribe(&self, channel: &str) -> Result<PushReceiver, WorkerError>;
}
