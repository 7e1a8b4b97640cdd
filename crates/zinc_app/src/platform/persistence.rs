use std::fs;
use std::path::Path;

use zinc_client::AtomicFileWriter;
use zinc_core::ClientSettings;
use zinc_logging::{zinc_error, zinc_info, zinc_warn};

/// Reads settings from `path`. Missing or unreadable files yield defaults.
pub(crate) fn load_settings(path: &Path) -> ClientSettings {
    let content = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            zinc_info!("No settings file at {:?}, using defaults", path);
            return ClientSettings::default();
        }
        Err(err) => {
            zinc_warn!("Failed to read settings from {:?}: {}", path, err);
            return ClientSettings::default();
        }
    };

    match ron::from_str(&content) {
        Ok(settings) => {
            zinc_info!("Loaded settings from {:?}", path);
            settings
        }
        Err(err) => {
            zinc_warn!("Failed to parse settings from {:?}: {}", path, err);
            ClientSettings::default()
        }
    }
}

pub(crate) fn save_settings(path: &Path, settings: &ClientSettings) {
    let pretty = ron::ser::PrettyConfig::new();
    let content = match ron::ser::to_string_pretty(settings, pretty) {
        Ok(text) => text,
        Err(err) => {
            zinc_error!("Failed to serialize settings: {}", err);
            return;
        }
    };

    let writer = AtomicFileWriter::new(path.to_path_buf());
    if let Err(err) = writer.write(&content) {
        zinc_error!("Failed to write settings to {:?}: {}", path, err);
    }
}
