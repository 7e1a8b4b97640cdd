use serde::{Deserialize, Deserializer, Serialize};

use crate::estimate;
use crate::settings::TranscriptionDefaults;
use crate::status::{Phase, Stage, Status, StatusToken};

/// Opaque id assigned by the worker on submission.
pub type TaskId = String;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    Download,
    LocalTranscribe,
}

/// One background job as pushed by the worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    #[serde(rename = "task_type", alias = "kind")]
    pub kind: TaskKind,
    pub status: StatusToken,
    #[serde(default)]
    pub progress: f64,
    #[serde(default)]
    pub speed: Option<String>,
    #[serde(default)]
    pub eta: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub url: Option<String>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub thumbnail: Option<String>,
    #[serde(default)]
    pub format: String,
    #[serde(default)]
    pub output_path: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub duration: Option<f64>,
    #[serde(default)]
    pub whisper_model: Option<String>,
    #[serde(default)]
    pub transcription_engine: Option<String>,
    #[serde(default)]
    pub transcription_style: Option<String>,
    #[serde(default)]
    pub transcription_progress: Option<f64>,
    #[serde(default)]
    pub transcription_message: Option<String>,
    #[serde(default)]
    pub source_path: Option<String>,
}

impl Task {
    /// Optimistic record for a download the worker just accepted.
    pub fn pending_download(
        id: TaskId,
        request: &DownloadRequest,
        defaults: &TranscriptionDefaults,
    ) -> Self {
        let subtitles = request.effective_subtitles(defaults);
        Self {
            id,
            kind: TaskKind::Download,
            status: StatusToken::new(Phase::Pending),
            progress: 0.0,
            speed: None,
            eta: None,
            url: Some(request.url.clone()),
            title: request.title.clone(),
            thumbnail: request.thumbnail.clone(),
            format: request.format.clone(),
            output_path: None,
            error: None,
            duration: request.duration,
            whisper_model: subtitles.as_ref().map(|s| s.model.clone()),
            transcription_engine: subtitles.as_ref().map(|s| s.engine.clone()),
            transcription_style: subtitles.map(|s| s.style),
            transcription_progress: None,
            transcription_message: None,
            source_path: None,
        }
    }

    /// Optimistic record for a local file; the source doubles as the output target.
    pub fn pending_local_transcription(id: TaskId, request: &LocalTranscriptionRequest) -> Self {
        Self {
            id,
            kind: TaskKind::LocalTranscribe,
            status: StatusToken::new(Phase::Pending),
            progress: 0.0,
            speed: None,
            eta: None,
            url: None,
            title: request.title.clone(),
            thumbnail: None,
            format: String::new(),
            output_path: Some(request.file_path.clone()),
            error: None,
            duration: None,
            whisper_model: Some(request.model.clone()),
            transcription_engine: Some(request.engine.clone()),
            transcription_style: Some(request.style.clone()),
            transcription_progress: None,
            transcription_message: None,
            source_path: Some(request.file_path.clone()),
        }
    }

    pub fn phase(&self) -> Phase {
        self.status.phase()
    }

    pub fn state(&self) -> Status {
        Status::from_parts(&self.status, self.error.as_deref())
    }

    pub fn is_terminal(&self) -> bool {
        self.phase().is_terminal()
    }

    /// Downloads waiting or in flight, and anything transcribing.
    pub fn is_active(&self) -> bool {
        match self.phase() {
            Phase::Pending | Phase::Downloading => self.kind == TaskKind::Download,
            Phase::Transcribing => true,
            Phase::Completed | Phase::Error | Phase::Cancelled => false,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.phase() == Phase::Completed
    }

    /// Estimated transcription time, when the media length and engine/model are known.
    pub fn transcription_eta(&self, use_gpu: bool) -> Option<String> {
        let duration = self.duration?;
        let engine = self.transcription_engine.as_deref()?;
        let model = self.whisper_model.as_deref()?;
        Some(estimate::estimate(duration, engine, model, use_gpu))
    }

    pub(crate) fn apply_settings(&mut self, patch: &TranscriptionSettingsPatch) {
        if let Some(engine) = &patch.engine {
            self.transcription_engine = Some(engine.clone());
        }
        if let Some(model) = &patch.model {
            self.whisper_model = Some(model.clone());
        }
        if let Some(style) = &patch.style {
            self.transcription_style = Some(style.clone());
        }
    }

    pub(crate) fn mark_transcription_started(&mut self) {
        self.status = StatusToken::transcribing(Stage::Extracting);
    }
}

fn empty_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.is_empty()))
}

/// Per-download subtitle generation choice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubtitleSettings {
    pub enabled: bool,
    pub engine: String,
    pub model: String,
    /// `"word"` or `"sentence"`.
    pub style: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DownloadRequest {
    pub url: String,
    /// `quality` or `quality:container`, interpreted by the worker.
    pub format: String,
    pub title: String,
    pub thumbnail: Option<String>,
    pub subtitle_settings: Option<SubtitleSettings>,
    pub duration: Option<f64>,
}

impl DownloadRequest {
    pub fn new(url: impl Into<String>, format: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            format: format.into(),
            title: title.into(),
            thumbnail: None,
            subtitle_settings: None,
            duration: None,
        }
    }

    /// Subtitle settings that apply to this request: its own if given,
    /// otherwise the client defaults. `None` when subtitles are off.
    pub fn effective_subtitles(&self, defaults: &TranscriptionDefaults) -> Option<SubtitleSettings> {
        match &self.subtitle_settings {
            Some(settings) if settings.enabled => Some(settings.clone()),
            Some(_) => None,
            None if defaults.generate_subtitles => Some(SubtitleSettings {
                enabled: true,
                engine: defaults.engine.clone(),
                model: defaults.model.clone(),
                style: defaults.style.clone(),
            }),
            None => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalTranscriptionRequest {
    pub file_path: String,
    pub title: String,
    pub engine: String,
    pub model: String,
    pub style: String,
}

impl LocalTranscriptionRequest {
    /// Builds a request titled after the final segment of `file_path`.
    pub fn new(
        file_path: impl Into<String>,
        engine: impl Into<String>,
        model: impl Into<String>,
        style: impl Into<String>,
    ) -> Self {
        let file_path = file_path.into();
        let title = title_from_path(&file_path);
        Self {
            file_path,
            title,
            engine: engine.into(),
            model: model.into(),
            style: style.into(),
        }
    }
}

/// Final path segment, accepting both separators since the worker may run on Windows.
pub fn title_from_path(path: &str) -> String {
    path.trim_end_matches(['/', '\\'])
        .rsplit(['/', '\\'])
        .next()
        .filter(|segment| !segment.is_empty())
        .unwrap_or(path)
        .to_string()
}

/// Fields to change on a pending transcription; `None` leaves a field as is.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptionSettingsPatch {
    pub engine: Option<String>,
    pub model: Option<String>,
    pub style: Option<String>,
}

impl TranscriptionSettingsPatch {
    pub fn is_empty(&self) -> bool {
        self.engine.is_none() && self.model.is_none() && self.style.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_is_last_segment() {
        assert_eq!(title_from_path("/home/me/clips/talk.mp4"), "talk.mp4");
        assert_eq!(title_from_path(r"C:\Videos\talk.mkv"), "talk.mkv");
        assert_eq!(title_from_path("talk.mp4"), "talk.mp4");
        assert_eq!(title_from_path("/media/dir/"), "dir");
    }
}
