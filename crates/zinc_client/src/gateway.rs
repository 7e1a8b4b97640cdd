use std::sync::Arc;

use thiserror::Error;
use tokio_util::sync::CancellationToken;
use zinc_core::{
    Change, DownloadRequest, LocalTranscriptionRequest, Msg, Task, TaskId,
    TranscriptionSettingsPatch,
};
use zinc_logging::{zinc_debug, zinc_info, zinc_warn};

use crate::settings::SettingsStore;
use crate::store::TaskStore;
use crate::worker::{Worker, WorkerError};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    #[error(transparent)]
    Worker(#[from] WorkerError),
    /// Rejected locally; the worker was never contacted.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

/// Issues worker calls and turns their acknowledgements into registry writes.
///
/// Nothing is written before the worker answers. After it answers, the write
/// only happens while the owning scope is alive.
#[derive(Clone)]
pub struct CommandGateway {
    worker: Arc<dyn Worker>,
    store: TaskStore,
    settings: SettingsStore,
    scope: CancellationToken,
}

impl CommandGateway {
    pub fn new(
        worker: Arc<dyn Worker>,
        store: TaskStore,
        settings: SettingsStore,
        scope: CancellationToken,
    ) -> Self {
        Self {
            worker,
            store,
            settings,
            scope,
        }
    }

    /// Loads the worker's current task list into the registry.
    pub async fn hydrate(&self) -> Result<usize, GatewayError> {
        let tasks = self
            .worker
            .get_downloads()
            .await
            .map_err(|err| rejected("get_downloads", err))?;
        let count = tasks.len();
        zinc_info!("Hydrating {} task(s) from worker", count);
        self.commit("get_downloads", Msg::Hydrated(tasks)).await;
        Ok(count)
    }

    /// Submits a download. Without per-request subtitle settings the
    /// configured defaults apply.
    pub async fn submit_download(&self, mut request: DownloadRequest) -> Result<TaskId, GatewayError> {
        require("download url", &request.url)?;
        if request.subtitle_settings.is_none() {
            request.subtitle_settings =
                request.effective_subtitles(&self.settings.current().transcription);
        }

        let id = self
            .worker
            .start_download(&request)
            .await
            .map_err(|err| rejected("start_download", err))?;
        zinc_info!("Download {} accepted for {}", id, request.url);

        let task = Task::pending_download(
            id.clone(),
            &request,
            &self.settings.current().transcription,
        );
        self.commit("start_download", Msg::SubmissionAccepted(task))
            .await;
        Ok(id)
    }

    pub async fn submit_local_transcription(
        &self,
        path: &str,
        engine: &str,
        model: &str,
        style: &str,
    ) -> Result<TaskId, GatewayError> {
        require("file path", path)?;
        let request = LocalTranscriptionRequest::new(path, engine, model, style);

        let id = self
            .worker
            .add_local_transcription(&request)
            .await
            .map_err(|err| rejected("add_local_transcription", err))?;
        zinc_info!("Local transcription {} added for {}", id, path);

        let task = Task::pending_local_transcription(id.clone(), &request);
        self.commit("add_local_transcription", Msg::SubmissionAccepted(task))
            .await;
        Ok(id)
    }

    pub async fn start_local_transcription(&self, id: &str) -> Result<(), GatewayError> {
        require("task id", id)?;
        self.worker
            .start_local_transcription(id)
            .await
            .map_err(|err| rejected("start_local_transcription", err))?;
        zinc_info!("Local transcription {} started", id);
        self.commit(
            "start_local_transcription",
            Msg::TranscriptionStarted { id: id.to_string() },
        )
        .await;
        Ok(())
    }

    /// Best effort: a later push from the worker may still override the
    /// cancelled mark.
    pub async fn cancel(&self, id: &str) -> Result<(), GatewayError> {
        require("task id", id)?;
        self.worker
            .cancel_download(id)
            .await
            .map_err(|err| rejected("cancel_download", err))?;
        zinc_info!("Cancel acknowledged for {}", id);
        self.commit(
            "cancel_download",
            Msg::CancelAcknowledged { id: id.to_string() },
        )
        .await;
        Ok(())
    }

    pub async fn delete(&self, id: &str) -> Result<(), GatewayError> {
        require("task id", id)?;
        self.worker
            .clear_download(id)
            .await
            .map_err(|err| rejected("clear_download", err))?;
        zinc_info!("Task {} deleted", id);
        self.commit(
            "clear_download",
            Msg::DeleteAcknowledged { id: id.to_string() },
        )
        .await;
        Ok(())
    }

    /// Removes every finished task, judged by the local records once the
    /// worker has answered. Returns the removed ids.
    pub async fn clear_completed(&self) -> Result<Vec<TaskId>, GatewayError> {
        self.worker
            .clear_completed_downloads()
            .await
            .map_err(|err| rejected("clear_completed_downloads", err))?;
        let removed: Vec<TaskId> = self
            .commit("clear_completed_downloads", Msg::ClearCompletedAcknowledged)
            .await
            .into_iter()
            .map(|change| change.id().to_string())
            .collect();
        zinc_info!("Cleared {} finished task(s)", removed.len());
        Ok(removed)
    }

    pub async fn update_transcription_settings(
        &self,
        id: &str,
        patch: TranscriptionSettingsPatch,
    ) -> Result<(), GatewayError> {
        require("task id", id)?;
        self.worker
            .update_transcription_settings(id, &patch)
            .await
            .map_err(|err| rejected("update_transcription_settings", err))?;
        zinc_info!("Transcription settings updated for {}", id);
        self.commit(
            "update_transcription_settings",
            Msg::TranscriptionSettingsUpdated {
                id: id.to_string(),
                patch,
            },
        )
        .await;
        Ok(())
    }

    async fn commit(&self, operation: &str, msg: Msg) -> Vec<Change> {
        if self.scope.is_cancelled() {
            zinc_debug!("Scope ended; skipping local update after {}", operation);
            return Vec::new();
        }
        match self.store.apply(msg).await {
            Ok(changes) => changes,
            Err(err) => {
                zinc_debug!("Skipping local update after {}: {}", operation, err);
                Vec::new()
            }
        }
    }
}

fn require(what: &str, value: &str) -> Result<(), GatewayError> {
    if value.trim().is_empty() {
        return Err(GatewayError::InvalidRequest(format!("{what} is empty")));
    }
    Ok(())
}

fn rejected(operation: &str, err: WorkerError) -> GatewayError {
    zinc_warn!("Worker call {} failed: {}", operation, err);
    err.into()
}
