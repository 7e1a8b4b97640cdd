use std::sync::Arc;

use tokio::sync::watch;
use zinc_core::ClientSettings;

/// Shared, explicitly constructed settings handle.
///
/// Clones observe the same value; [`SettingsStore::subscribe`] lets a
/// component react to edits.
#[derive(Debug, Clone)]
pub struct SettingsStore {
    tx: Arc<watch::Sender<ClientSettings>>,
}

impl SettingsStore {
    pub fn new(settings: ClientSettings) -> Self {
        let (tx, _rx) = watch::channel(settings);
        Self { tx: Arc::new(tx) }
    }

    pub fn current(&self) -> ClientSettings {
        self.tx.borrow().clone()
    }

    pub fn use_gpu(&self) -> bool {
        self.tx.borrow().use_gpu
    }

    pub fn update(&self, edit: impl FnOnce(&mut ClientSettings)) {
        self.tx.send_modify(edit);
    }

    pub fn subscribe(&self) -> watch::Receiver<ClientSettings> {
        self.tx.subscribe()
    }
}

impl Default for SettingsStore {
    fn default() -> Self {
        Self::new(ClientSettings::default())
    }
}
