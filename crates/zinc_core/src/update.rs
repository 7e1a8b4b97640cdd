use zinc_logging::{zinc_debug, zinc_warn};

use crate::registry::UpsertOutcome;
use crate::status::Phase;
use crate::{AppState, Change, Msg, Task, TaskId};

/// Pure update function: applies a message to state and returns the resulting changes.
pub fn update(mut state: AppState, msg: Msg) -> (AppState, Vec<Change>) {
    let changes = match msg {
        Msg::Hydrated(tasks) => {
            // Insert oldest-last so the registry lists the snapshot in the worker's order.
            tasks
                .into_iter()
                .rev()
                .filter_map(|task| reconcile(&mut state, task))
                .collect()
        }
        Msg::TaskPushed(task) => reconcile(&mut state, task).into_iter().collect(),
        Msg::SubmissionAccepted(task) => {
            let registry = state.registry_mut();
            if registry.is_confirmed(&task.id) == Some(true) {
                // The worker's own event beat the acknowledgement; keep it.
                zinc_debug!("Submission {} already confirmed, skipping optimistic insert", task.id);
                Vec::new()
            } else {
                let id = task.id.clone();
                outcome_change(registry.upsert(task), id)
                    .into_iter()
                    .collect()
            }
        }
        Msg::TranscriptionStarted { id } => {
            let registry = state.registry_mut();
            match registry.get(&id).map(Task::phase) {
                Some(Phase::Pending) => {
                    registry.patch(&id, Task::mark_transcription_started);
                    vec![Change::Patched { id }]
                }
                Some(phase) => {
                    zinc_debug!("Task {} already {}, keeping worker status", id, phase);
                    Vec::new()
                }
                None => missing(&id),
            }
        }
        Msg::CancelAcknowledged { id } => {
            let patched = state.registry_mut().patch(&id, |task| {
                task.status = Phase::Cancelled.into();
            });
            if patched {
                vec![Change::Patched { id }]
            } else {
                missing(&id)
            }
        }
        Msg::DeleteAcknowledged { id } => match state.registry_mut().delete(&id) {
            Some(_) => vec![Change::Removed { id }],
            None => missing(&id),
        },
        Msg::ClearCompletedAcknowledged => state
            .registry_mut()
            .delete_where(Task::is_terminal)
            .into_iter()
            .map(|id| Change::Removed { id })
            .collect(),
        Msg::TranscriptionSettingsUpdated { id, patch } => {
            if state.registry_mut().patch(&id, |task| task.apply_settings(&patch)) {
                vec![Change::Patched { id }]
            } else {
                missing(&id)
            }
        }
        Msg::NoOp => Vec::new(),
    };

    if !changes.is_empty() {
        state.mark_dirty();
    }
    (state, changes)
}

fn reconcile(state: &mut AppState, task: Task) -> Option<Change> {
    let registry = state.registry_mut();
    if let Some(existing) = registry.get(&task.id) {
        if existing.kind != task.kind {
            zinc_warn!(
                "Task {} changed kind from {:?} to {:?}",
                task.id,
                existing.kind,
                task.kind
            );
        }
    }
    let id = task.id.clone();
    let outcome = registry.reconcile(task);
    if outcome == UpsertOutcome::Suppressed {
        zinc_debug!("Dropped push event for removed task {}", id);
    }
    outcome_change(outcome, id)
}

fn outcome_change(outcome: UpsertOutcome, id: TaskId) -> Option<Change> {
    match outcome {
        UpsertOutcome::Inserted => Some(Change::Inserted { id }),
        UpsertOutcome::Replaced => Some(Change::Replaced { id }),
        UpsertOutcome::Suppressed => None,
    }
}

fn missing(id: &str) -> Vec<Change> {
    zinc_warn!("Acknowledgement for unknown task {}", id);
    Vec::new()
}
