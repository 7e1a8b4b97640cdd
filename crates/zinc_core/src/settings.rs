use serde::{Deserialize, Serialize};

/// What to do with a push event for an id the user already removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrayEventPolicy {
    /// Drop events for recently removed ids.
    #[default]
    Suppress,
    /// Re-insert the task, as a plain upsert would.
    Resurrect,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscriptionDefaults {
    pub generate_subtitles: bool,
    pub engine: String,
    pub model: String,
    pub style: String,
}

impl Default for TranscriptionDefaults {
    fn default() -> Self {
        Self {
            generate_subtitles: false,
            engine: "whisper_cpp".to_string(),
            model: "base".to_string(),
            style: "sentence".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientSettings {
    pub transcription: TranscriptionDefaults,
    /// Hardware mode assumed for transcription estimates.
    pub use_gpu: bool,
    pub stray_events: StrayEventPolicy,
    /// Removed ids remembered for stray-event suppression.
    pub tombstone_capacity: usize,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            transcription: TranscriptionDefaults::default(),
            use_gpu: true,
            stray_events: StrayEventPolicy::Suppress,
            tombstone_capacity: 256,
        }
    }
}
