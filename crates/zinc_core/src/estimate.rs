//! Transcription time estimates from per-engine, per-model throughput.
//!
//! Speeds are multiples of real time: a multiplier of 16 transcribes one
//! minute of media in under four seconds. Used for display only.

/// Multiplier used when the engine or the model is not in the table.
pub const FALLBACK_MULTIPLIER: f64 = 5.0;

/// Fixed worker startup cost added to every estimate.
pub const STARTUP_OVERHEAD_SECS: u64 = 10;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelSpeed {
    pub speed_gpu: f64,
    pub speed_cpu: f64,
}

impl ModelSpeed {
    const fn new(speed_gpu: f64, speed_cpu: f64) -> Self {
        Self {
            speed_gpu,
            speed_cpu,
        }
    }

    pub fn for_mode(&self, use_gpu: bool) -> f64 {
        if use_gpu {
            self.speed_gpu
        } else {
            self.speed_cpu
        }
    }
}

type EngineSpeeds = (&'static str, &'static [(&'static str, ModelSpeed)]);

const SPEED_TABLE: &[EngineSpeeds] = &[
    (
        "whisper_rs",
        &[
            ("tiny", ModelSpeed::new(32.0, 8.0)),
            ("base", ModelSpeed::new(16.0, 4.0)),
            ("small", ModelSpeed::new(6.0, 2.0)),
            ("medium", ModelSpeed::new(2.0, 0.5)),
            ("large-v3", ModelSpeed::new(1.0, 0.2)),
        ],
    ),
    (
        "whisper_cpp",
        &[
            ("tiny", ModelSpeed::new(12.0, 8.0)),
            ("base", ModelSpeed::new(8.0, 5.0)),
            ("small", ModelSpeed::new(4.0, 2.5)),
        ],
    ),
    (
        "moonshine",
        &[
            ("tiny", ModelSpeed::new(50.0, 15.0)),
            ("base", ModelSpeed::new(30.0, 10.0)),
        ],
    ),
    ("parakeet", &[("0.6b", ModelSpeed::new(12.0, 5.0))]),
];

pub fn model_speed(engine: &str, model: &str) -> Option<ModelSpeed> {
    SPEED_TABLE
        .iter()
        .find(|(id, _)| *id == engine)
        .and_then(|(_, models)| models.iter().find(|(id, _)| *id == model))
        .map(|(_, speed)| *speed)
}

/// Real-time multiple for the engine/model pair. Never fails.
pub fn multiplier(engine: &str, model: &str, use_gpu: bool) -> f64 {
    model_speed(engine, model)
        .map(|speed| speed.for_mode(use_gpu))
        .filter(|value| value.is_finite() && *value > 0.0)
        .unwrap_or(FALLBACK_MULTIPLIER)
}

pub fn estimate_seconds(duration_secs: f64, engine: &str, model: &str, use_gpu: bool) -> u64 {
    let duration = if duration_secs.is_finite() && duration_secs > 0.0 {
        duration_secs
    } else {
        0.0
    };
    // Float-to-int casts saturate, so huge durations land on u64::MAX.
    let work = (duration / multiplier(engine, model, use_gpu)).ceil() as u64;
    work.saturating_add(STARTUP_OVERHEAD_SECS)
}

/// Formats the estimate as `~Ns` below a minute and `~Mm` (rounded up) above.
pub fn estimate(duration_secs: f64, engine: &str, model: &str, use_gpu: bool) -> String {
    format_estimate(estimate_seconds(duration_secs, engine, model, use_gpu))
}

fn format_estimate(seconds: u64) -> String {
    if seconds < 60 {
        format!("~{seconds}s")
    } else {
        format!("~{}m", seconds.div_ceil(60))
    }
}
