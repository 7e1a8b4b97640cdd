use crate::registry::TaskRegistry;
use crate::settings::ClientSettings;
use crate::view_model::TaskListView;

/// Client-side task state: the registry plus a render-coalescing flag.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AppState {
    registry: TaskRegistry,
    dirty: bool,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_settings(settings: &ClientSettings) -> Self {
        Self {
            registry: TaskRegistry::new(settings.stray_events, settings.tombstone_capacity),
            dirty: false,
        }
    }

    pub fn registry(&self) -> &TaskRegistry {
        &self.registry
    }

    pub(crate) fn registry_mut(&mut self) -> &mut TaskRegistry {
        &mut self.registry
    }

    pub fn view(&self, use_gpu: bool) -> TaskListView {
        TaskListView::from_registry(&self.registry, use_gpu)
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Returns whether anything changed since the last call, and resets the flag.
    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }
}
