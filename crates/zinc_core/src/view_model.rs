use crate::registry::TaskRegistry;
use crate::status::{Phase, Status};
use crate::task::{Task, TaskId, TaskKind};

/// Derived lists over a registry snapshot, recomputed after every change.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TaskListView {
    /// All tasks, newest first.
    pub ordered: Vec<TaskRowView>,
    pub active: Vec<TaskRowView>,
    pub completed: Vec<TaskRowView>,
    /// Gates the "clear completed" affordance.
    pub has_completed: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TaskRowView {
    pub id: TaskId,
    pub kind: TaskKind,
    pub title: String,
    pub phase: Phase,
    pub status: Status,
    /// Stage message while transcribing.
    pub stage_message: Option<&'static str>,
    pub progress: f64,
    pub transcription_progress: Option<f64>,
    pub speed: Option<String>,
    pub eta: Option<String>,
    /// Estimated transcription time for tasks that will or do transcribe.
    pub transcription_eta: Option<String>,
    pub output_path: Option<String>,
    /// False until the worker has confirmed the latest local write.
    pub confirmed: bool,
}

impl TaskRowView {
    fn new(task: &Task, confirmed: bool, use_gpu: bool) -> Self {
        let phase = task.phase();
        let stage_message = (phase == Phase::Transcribing).then(|| task.status.describe());
        let transcription_eta = match phase {
            Phase::Pending | Phase::Downloading | Phase::Transcribing => {
                task.transcription_eta(use_gpu)
            }
            Phase::Completed | Phase::Error | Phase::Cancelled => None,
        };
        Self {
            id: task.id.clone(),
            kind: task.kind,
            title: task.title.clone(),
            phase,
            status: task.state(),
            stage_message,
            progress: task.progress,
            transcription_progress: task.transcription_progress,
            speed: task.speed.clone(),
            eta: task.eta.clone(),
            transcription_eta,
            output_path: task.output_path.clone(),
            confirmed,
        }
    }

    /// Completed with a warning is a degraded success, not a failure.
    pub fn warning(&self) -> Option<&str> {
        match &self.status {
            Status::Completed { warning } => warning.as_deref(),
            _ => None,
        }
    }
}

impl TaskListView {
    pub fn from_registry(registry: &TaskRegistry, use_gpu: bool) -> Self {
        let mut view = Self::default();
        for (task, confirmed) in registry.entries() {
            let row = TaskRowView::new(task, confirmed, use_gpu);
            if task.is_active() {
                view.active.push(row.clone());
            }
            if task.is_completed() {
                view.completed.push(row.clone());
            }
            view.ordered.push(row);
        }
        view.has_completed = !view.completed.is_empty();
        view
    }

    pub fn find(&self, id: &str) -> Option<&TaskRowView> {
        self.ordered.iter().find(|row| row.id == id)
    }
}

/// Tasks still in flight, in input order.
pub fn active_tasks(tasks: &[Task]) -> Vec<&Task> {
    tasks.iter().filter(|task| task.is_active()).collect()
}

/// Tasks that finished successfully (warnings included), in input order.
pub fn completed_tasks(tasks: &[Task]) -> Vec<&Task> {
    tasks.iter().filter(|task| task.is_completed()).collect()
}

pub fn has_completed(tasks: &[Task]) -> bool {
    tasks.iter().any(Task::is_completed)
}
