use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{mpsc, watch, Mutex};
use url::Url;
use zinc_core::{
    DownloadRequest, LocalTranscriptionRequest, Phase, Stage, StatusToken, Task, TaskId, TaskKind,
    TranscriptionDefaults, TranscriptionSettingsPatch,
};
use zinc_logging::{zinc_debug, zinc_error, zinc_info, zinc_warn};

use crate::worker::{PushReceiver, Worker, WorkerError, PUSH_CHANNEL};

/// Pacing of the simulated jobs.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationSettings {
    pub step_delay: Duration,
    pub download_steps: u32,
    /// Steps per transcription stage.
    pub stage_steps: u32,
    pub throughput_mib: f64,
    /// Makes every transcription fail in its `transcribing` stage.
    pub fail_transcription: bool,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            step_delay: Duration::from_millis(250),
            download_steps: 20,
            stage_steps: 4,
            throughput_mib: 3.5,
            fail_transcription: false,
        }
    }
}

const TRANSCRIPTION_STAGES: [Stage; 3] = [Stage::Extracting, Stage::Transcribing, Stage::Embedding];

struct Job {
    task: Task,
    seq: u64,
    cancel: Option<watch::Sender<bool>>,
}

enum StageOutcome {
    Done,
    Cancelled,
    Failed(String),
}

struct Shared {
    simulation: SimulationSettings,
    next_id: AtomicU64,
    jobs: Mutex<HashMap<TaskId, Job>>,
    push_tx: mpsc::UnboundedSender<serde_json::Value>,
    push_rx: StdMutex<Option<PushReceiver>>,
}

/// In-process worker that walks jobs through the same status sequence as
/// the real downloader, on a timer.
#[derive(Clone)]
pub struct LocalWorker {
    shared: Arc<Shared>,
}

impl LocalWorker {
    pub fn new(simulation: SimulationSettings) -> Self {
        let (push_tx, push_rx) = mpsc::unbounded_channel();
        Self {
            shared: Arc::new(Shared {
                simulation,
                next_id: AtomicU64::new(1),
                jobs: Mutex::new(HashMap::new()),
                push_tx,
                push_rx: StdMutex::new(Some(push_rx)),
            }),
        }
    }
}

impl Default for LocalWorker {
    fn default() -> Self {
        Self::new(SimulationSettings::default())
    }
}

#[async_trait]
impl Worker for LocalWorker {
    async fn start_download(&self, request: &DownloadRequest) -> Result<TaskId, WorkerError> {
        validate_url(&request.url)?;
        let (id, seq) = self.shared.allocate_id();
        // Subtitles only when the request asks for them.
        let task = Task::pending_download(id.clone(), request, &TranscriptionDefaults::default());
        let (cancel_tx, cancel_rx) = watch::channel(false);

        self.shared.insert(task, seq, Some(cancel_tx)).await;
        zinc_info!("Queued download {} for {}", id, request.url);

        tokio::spawn(run_download(
            Arc::clone(&self.shared),
            id.clone(),
            request.clone(),
            cancel_rx,
        ));
        Ok(id)
    }

    async fn cancel_download(&self, id: &str) -> Result<(), WorkerError> {
        let cancelled = {
            let mut jobs = self.shared.jobs.lock().await;
            match jobs.get_mut(id) {
                Some(job) => {
                    if let Some(cancel) = job.cancel.take() {
                        let _ = cancel.send(true);
                    }
                    job.task.status = Phase::Cancelled.into();
                    Some(job.task.clone())
                }
                None => None,
            }
        };
        match cancelled {
            Some(task) => {
                zinc_info!("Cancelled {}", id);
                self.shared.emit(&task);
            }
            None => zinc_debug!("Cancel for unknown task {}", id),
        }
        Ok(())
    }

    async fn clear_download(&self, id: &str) -> Result<(), WorkerError> {
        if self.shared.jobs.lock().await.remove(id).is_some() {
            zinc_info!("Removed {}", id);
        }
        Ok(())
    }

    async fn clear_completed_downloads(&self) -> Result<(), WorkerError> {
        let mut jobs = self.shared.jobs.lock().await;
        let before = jobs.len();
        jobs.retain(|_, job| !job.task.is_terminal());
        zinc_info!("Removed {} finished task(s)", before - jobs.len());
        Ok(())
    }

    async fn get_downloads(&self) -> Result<Vec<Task>, WorkerError> {
        let jobs = self.shared.jobs.lock().await;
        let mut listed: Vec<&Job> = jobs.values().collect();
        listed.sort_by(|a, b| b.seq.cmp(&a.seq));
        Ok(listed.into_iter().map(|job| job.task.clone()).collect())
    }

    async fn add_local_transcription(
        &self,
        request: &LocalTranscriptionRequest,
    ) -> Result<TaskId, WorkerError> {
        if !Path::new(&request.file_path).is_file() {
            return Err(WorkerError::Rejected(format!(
                "file not found: {}",
                request.file_path
            )));
        }
        let (id, seq) = self.shared.allocate_id();
        let task = Task::pending_local_transcription(id.clone(), request);
        self.shared.insert(task, seq, None).await;
        zinc_info!("Added local transcription {} for {}", id, request.file_path);
        Ok(id)
    }

    async fn start_local_transcription(&self, id: &str) -> Result<(), WorkerError> {
        let (cancel_tx, cancel_rx) = watch::channel(false);
        let task = {
            let mut jobs = self.shared.jobs.lock().await;
            let job = jobs
                .get_mut(id)
                .ok_or_else(|| WorkerError::NotFound(id.to_string()))?;
            if job.task.kind != TaskKind::LocalTranscribe {
                return Err(WorkerError::Rejected(
                    "not a local transcription task".to_string(),
                ));
            }
            if job.task.phase() != Phase::Pending {
                return Err(WorkerError::Rejected(format!(
                    "task is not pending, status: {}",
                    job.task.status
                )));
            }
            job.cancel = Some(cancel_tx);
            job.task.status = StatusToken::transcribing(Stage::Extracting);
            job.task.clone()
        };
        self.shared.emit(&task);

        tokio::spawn(run_local_transcription(
            Arc::clone(&self.shared),
            id.to_string(),
            cancel_rx,
        ));
        Ok(())
    }

    async fn update_transcription_settings(
        &self,
        id: &str,
        patch: &TranscriptionSettingsPatch,
    ) -> Result<(), WorkerError> {
        let task = {
            let mut jobs = self.shared.jobs.lock().await;
            let job = jobs
                .get_mut(id)
                .ok_or_else(|| WorkerError::NotFound(id.to_string()))?;
            if job.task.phase() != Phase::Pending {
                return Err(WorkerError::Rejected(
                    "can only update settings for pending tasks".to_string(),
                ));
            }
            if let Some(engine) = &patch.engine {
                job.task.transcription_engine = Some(engine.clone());
            }
            if let Some(model) = &patch.model {
                job.task.whisper_model = Some(model.clone());
            }
            if let Some(style) = &patch.style {
                job.task.transcription_style = Some(style.clone());
            }
            job.task.clone()
        };
        self.shared.emit(&task);
        Ok(())
    }

    fn subscribe(&self, channel: &str) -> Result<PushReceiver, WorkerError> {
        if channel != PUSH_CHANNEL {
            return Err(WorkerError::Rejected(format!("unknown channel {channel}")));
        }
        let mut slot = self
            .shared
            .push_rx
            .lock()
            .map_err(|_| WorkerError::Unavailable("push channel lock poisoned".to_string()))?;
        slot.take()
            .ok_or_else(|| WorkerError::Rejected(format!("{channel} already has a subscriber")))
    }
}

impl Shared {
    fn allocate_id(&self) -> (TaskId, u64) {
        let seq = self.next_id.fetch_add(1, Ordering::Relaxed);
        (format!("task-{seq}"), seq)
    }

    async fn insert(&self, task: Task, seq: u64, cancel: Option<watch::Sender<bool>>) {
        self.emit(&task);
        self.jobs
            .lock()
            .await
            .insert(task.id.clone(), Job { task, seq, cancel });
    }

    fn emit(&self, task: &Task) {
        match serde_json::to_value(task) {
            Ok(payload) => {
                if self.push_tx.send(payload).is_err() {
                    zinc_debug!("No push subscriber for {}", task.id);
                }
            }
            Err(err) => zinc_error!("Failed to encode task {}: {}", task.id, err),
        }
    }

    /// Edits a live task and publishes it. Finished or removed tasks are left
    /// alone and `false` is returned.
    async fn advance(&self, id: &str, edit: impl FnOnce(&mut Task)) -> bool {
        let task = {
            let mut jobs = self.jobs.lock().await;
            let Some(job) = jobs.get_mut(id) else {
                return false;
            };
            if job.task.is_terminal() {
                return false;
            }
            edit(&mut job.task);
            job.task.clone()
        };
        self.emit(&task);
        true
    }

    async fn complete(&self, id: &str, warning: Option<String>) {
        let completed = self
            .advance(id, |task| {
                task.status = Phase::Completed.into();
                task.progress = 100.0;
                task.speed = None;
                task.eta = None;
                task.error = warning;
            })
            .await;
        if completed {
            zinc_info!("Task {} completed", id);
        }
    }

    async fn fail(&self, id: &str, message: String) {
        zinc_error!("Task {} failed: {}", id, message);
        let failed = self
            .advance(id, |task| {
                task.status = Phase::Error.into();
                task.error = Some(message);
            })
            .await;
        if !failed {
            zinc_debug!("Task {} already finished, keeping its status", id);
        }
    }

    async fn release(&self, id: &str) {
        if let Some(job) = self.jobs.lock().await.get_mut(id) {
            job.cancel = None;
        }
    }

    /// Waits one step. `false` once the job was cancelled or removed.
    async fn pause(&self, cancel: &mut watch::Receiver<bool>) -> bool {
        tokio::select! {
            _ = tokio::time::sleep(self.simulation.step_delay) => !*cancel.borrow(),
            changed = cancel.changed() => changed.is_ok() && !*cancel.borrow(),
        }
    }

    async fn transcribe(&self, id: &str, cancel: &mut watch::Receiver<bool>) -> StageOutcome {
        let steps = self.simulation.stage_steps.max(1);
        for stage in TRANSCRIPTION_STAGES {
            for step in 1..=steps {
                if !self.pause(cancel).await {
                    return StageOutcome::Cancelled;
                }
                if self.simulation.fail_transcription && stage == Stage::Transcribing {
                    return StageOutcome::Failed("speech model could not be loaded".to_string());
                }
                let progress = f64::from(step) * 100.0 / f64::from(steps);
                let advanced = self
                    .advance(id, |task| {
                        task.status = StatusToken::transcribing(stage.clone());
                        task.transcription_progress = Some(progress);
                        task.transcription_message = Some(stage.message().to_string());
                    })
                    .await;
                if !advanced {
                    return StageOutcome::Cancelled;
                }
            }
        }
        StageOutcome::Done
    }
}

async fn run_download(
    shared: Arc<Shared>,
    id: TaskId,
    request: DownloadRequest,
    mut cancel: watch::Receiver<bool>,
) {
    download(&shared, &id, &request, &mut cancel).await;
    shared.release(&id).await;
}

async fn download(
    shared: &Shared,
    id: &str,
    request: &DownloadRequest,
    cancel: &mut watch::Receiver<bool>,
) {
    let simulation = &shared.simulation;
    let steps = simulation.download_steps.max(1);
    let output = output_file(id, request);
    for step in 1..=steps {
        if !shared.pause(cancel).await {
            zinc_debug!("Download {} stopped at step {}", id, step);
            return;
        }
        let progress = f64::from(step) * 100.0 / f64::from(steps);
        let remaining = simulation.step_delay * (steps - step);
        let advanced = shared
            .advance(id, |task| {
                task.status = Phase::Downloading.into();
                task.progress = progress;
                task.speed = Some(format!("{:.1}MiB/s", simulation.throughput_mib));
                task.eta = Some(format_clock(remaining));
                task.output_path = Some(output.clone());
            })
            .await;
        if !advanced {
            return;
        }
    }

    let wants_subtitles = request
        .subtitle_settings
        .as_ref()
        .is_some_and(|settings| settings.enabled)
        && !is_audio_only(&request.format);
    if !wants_subtitles {
        shared.complete(id, None).await;
        return;
    }

    match shared.transcribe(id, cancel).await {
        StageOutcome::Done => shared.complete(id, None).await,
        StageOutcome::Cancelled => {}
        StageOutcome::Failed(reason) => {
            // The media itself is usable; report the subtitle failure as a warning.
            zinc_warn!("Subtitle generation failed for {}: {}", id, reason);
            shared
                .complete(id, Some(format!("Subtitle generation failed: {reason}")))
                .await;
        }
    }
}

async fn run_local_transcription(
    shared: Arc<Shared>,
    id: TaskId,
    mut cancel: watch::Receiver<bool>,
) {
    match shared.transcribe(&id, &mut cancel).await {
        StageOutcome::Done => shared.complete(&id, None).await,
        StageOutcome::Cancelled => zinc_debug!("Transcription {} stopped", id),
        StageOutcome::Failed(reason) => {
            shared
                .fail(&id, format!("Transcription failed: {reason}"))
                .await
        }
    }
    shared.release(&id).await;
}

fn validate_url(raw: &str) -> Result<(), WorkerError> {
    let url = Url::parse(raw)
        .map_err(|err| WorkerError::Rejected(format!("invalid url {raw}: {err}")))?;
    match url.scheme() {
        "http" | "https" => Ok(()),
        scheme => Err(WorkerError::Rejected(format!(
            "unsupported url scheme {scheme}"
        ))),
    }
}

/// `quality` part of a `quality:container` format string.
fn quality(format: &str) -> &str {
    format.split(':').next().unwrap_or(format)
}

fn is_audio_only(format: &str) -> bool {
    matches!(quality(format), "audio" | "mp3")
}

fn output_file(id: &str, request: &DownloadRequest) -> String {
    let container = match request.format.split_once(':') {
        Some((_, container)) if !container.is_empty() => container,
        _ if is_audio_only(&request.format) => "mp3",
        _ => "mp4",
    };
    let stem: String = request
        .title
        .chars()
        .map(|c| if matches!(c, '/' | '\\' | ':') { '_' } else { c })
        .collect();
    let stem = if stem.trim().is_empty() { id } else { stem.trim() };
    format!("{stem}.{container}")
}

fn format_clock(remaining: Duration) -> String {
    let secs = remaining.as_secs();
    format!("{:02}:{:02}", secs / 60, secs % 60)
}
