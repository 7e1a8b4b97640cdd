use crate::task::{Task, TaskId, TranscriptionSettingsPatch};

#[derive(Debug, Clone, PartialEq)]
pub enum Msg {
    /// Startup snapshot from the worker, in the worker's order.
    Hydrated(Vec<Task>),
    /// Authoritative task payload from the push channel.
    TaskPushed(Task),
    /// The worker accepted a new job and returned its id.
    SubmissionAccepted(Task),
    /// The worker began processing a pending local transcription.
    TranscriptionStarted { id: TaskId },
    /// The worker acknowledged a cancel request.
    CancelAcknowledged { id: TaskId },
    /// The worker deleted the task.
    DeleteAcknowledged { id: TaskId },
    /// The worker cleared its finished tasks.
    ClearCompletedAcknowledged,
    /// The worker stored new transcription settings for a pending task.
    TranscriptionSettingsUpdated {
        id: TaskId,
        patch: TranscriptionSettingsPatch,
    },
    /// Fallback for placeholder wiring.
    NoOp,
}
