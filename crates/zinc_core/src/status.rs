use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Message shown for a transcription stage the client does not know about.
pub const FALLBACK_STAGE_MESSAGE: &str = "Generating subtitles...";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StatusParseError {
    #[error("empty status token")]
    Empty,
    #[error("unknown status phase `{0}`")]
    UnknownPhase(String),
}

/// Top-level status category of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Pending,
    Downloading,
    Transcribing,
    Completed,
    Error,
    Cancelled,
}

impl Phase {
    pub const ALL: [Phase; 6] = [
        Phase::Pending,
        Phase::Downloading,
        Phase::Transcribing,
        Phase::Completed,
        Phase::Error,
        Phase::Cancelled,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Pending => "pending",
            Phase::Downloading => "downloading",
            Phase::Transcribing => "transcribing",
            Phase::Completed => "completed",
            Phase::Error => "error",
            Phase::Cancelled => "cancelled",
        }
    }

    /// Terminal phases are final from the worker's side; the client does not enforce it.
    pub fn is_terminal(self) -> bool {
        matches!(self, Phase::Completed | Phase::Error | Phase::Cancelled)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Phase {
    type Err = StatusParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Phase::ALL
            .into_iter()
            .find(|phase| phase.as_str() == s)
            .ok_or_else(|| StatusParseError::UnknownPhase(s.to_string()))
    }
}

/// Pipeline step inside the transcribing phase. Unknown steps are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Stage {
    Extracting,
    Transcribing,
    Embedding,
    Finalizing,
    Other(String),
}

impl Stage {
    pub fn as_str(&self) -> &str {
        match self {
            Stage::Extracting => "extracting",
            Stage::Transcribing => "transcribing",
            Stage::Embedding => "embedding",
            Stage::Finalizing => "finalizing",
            Stage::Other(raw) => raw,
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            Stage::Extracting => "Extracting audio...",
            Stage::Transcribing => "Transcribing...",
            Stage::Embedding => "Embedding subtitles...",
            Stage::Finalizing => "Finalizing...",
            Stage::Other(_) => FALLBACK_STAGE_MESSAGE,
        }
    }
}

impl From<&str> for Stage {
    fn from(raw: &str) -> Self {
        match raw {
            "extracting" => Stage::Extracting,
            "transcribing" => Stage::Transcribing,
            "embedding" => Stage::Embedding,
            "finalizing" => Stage::Finalizing,
            other => Stage::Other(other.to_string()),
        }
    }
}

/// Decoded `phase` or `phase:substage` token.
///
/// The substage is only interpreted under [`Phase::Transcribing`]; for any other
/// phase it is carried through untouched so the token re-encodes identically.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct StatusToken {
    phase: Phase,
    substage: Option<String>,
}

impl StatusToken {
    pub fn new(phase: Phase) -> Self {
        Self {
            phase,
            substage: None,
        }
    }

    pub fn transcribing(stage: Stage) -> Self {
        Self {
            phase: Phase::Transcribing,
            substage: Some(stage.as_str().to_string()),
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn substage(&self) -> Option<&str> {
        self.substage.as_deref()
    }

    /// Stage of a transcribing task; `None` for other phases or a bare `transcribing`.
    pub fn stage(&self) -> Option<Stage> {
        match self.phase {
            Phase::Transcribing => self.substage.as_deref().map(Stage::from),
            _ => None,
        }
    }

    pub fn describe(&self) -> &'static str {
        describe(self.phase, self.substage())
    }
}

impl From<Phase> for StatusToken {
    fn from(phase: Phase) -> Self {
        StatusToken::new(phase)
    }
}

impl fmt::Display for StatusToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.substage {
            Some(substage) => write!(f, "{}:{}", self.phase, substage),
            None => f.write_str(self.phase.as_str()),
        }
    }
}

impl FromStr for StatusToken {
    type Err = StatusParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_status(s)
    }
}

impl TryFrom<String> for StatusToken {
    type Error = StatusParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        parse_status(&value)
    }
}

impl From<StatusToken> for String {
    fn from(token: StatusToken) -> Self {
        token.to_string()
    }
}

/// Splits a status token on its first `:`. The phase must be known; the
/// substage is free-form.
pub fn parse_status(token: &str) -> Result<StatusToken, StatusParseError> {
    if token.is_empty() {
        return Err(StatusParseError::Empty);
    }
    let (phase, substage) = match token.split_once(':') {
        Some((phase, substage)) => (phase, Some(substage.to_string())),
        None => (token, None),
    };
    Ok(StatusToken {
        phase: phase.parse()?,
        substage,
    })
}

/// Display message for a transcription substage. Never fails.
pub fn describe(phase: Phase, substage: Option<&str>) -> &'static str {
    match (phase, substage) {
        (Phase::Transcribing, Some(raw)) => Stage::from(raw).message(),
        _ => FALLBACK_STAGE_MESSAGE,
    }
}

/// A task's status with the two dimensions of the wire token made explicit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    Pending,
    Downloading,
    Transcribing(Option<Stage>),
    /// A warning marks a usable result whose optional post-processing failed.
    Completed { warning: Option<String> },
    Error { message: String },
    Cancelled,
}

impl Status {
    pub fn from_parts(token: &StatusToken, error: Option<&str>) -> Self {
        match token.phase() {
            Phase::Pending => Status::Pending,
            Phase::Downloading => Status::Downloading,
            Phase::Transcribing => Status::Transcribing(token.stage()),
            Phase::Completed => Status::Completed {
                warning: error.map(str::to_string),
            },
            Phase::Error => Status::Error {
                message: error.unwrap_or("unknown error").to_string(),
            },
            Phase::Cancelled => Status::Cancelled,
        }
    }

    pub fn phase(&self) -> Phase {
        match self {
            Status::Pending => Phase::Pending,
            Status::Downloading => Phase::Downloading,
            Status::Transcribing(_) => Phase::Transcribing,
            Status::Completed { .. } => Phase::Completed,
            Status::Error { .. } => Phase::Error,
            Status::Cancelled => Phase::Cancelled,
        }
    }
}
