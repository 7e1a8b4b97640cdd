//! Zinc core: task model, status tokens, estimates and the pure task registry.
mod change;
pub mod estimate;
mod msg;
mod registry;
mod settings;
mod state;
mod status;
mod task;
mod update;
mod view_model;

pub use change::Change;
pub use msg::Msg;
pub use registry::{TaskRegistry, UpsertOutcome};
pub use settings::{ClientSettings, StrayEventPolicy, TranscriptionDefaults};
pub use state::AppState;
pub use status::{
    describe, parse_status, Phase, Stage, Status, StatusParseError, StatusToken,
    FALLBACK_STAGE_MESSAGE,
};
pub use task::{
    title_from_path, DownloadRequest, LocalTranscriptionRequest, SubtitleSettings, Task, TaskId,
    TaskKind, TranscriptionSettingsPatch,
};
pub use update::update;
pub use view_model::{active_tasks, completed_tasks, has_completed, TaskListView, TaskRowView};
