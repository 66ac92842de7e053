use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::shared::constants::{
    DEFAULT_ABSENCE_GRACE_SECONDS, DEFAULT_CLIP_DURATION_SECONDS, DEFAULT_CLIP_FPS,
    DEFAULT_EVENT_COOLDOWN_SECONDS,
};

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("absence grace must be a positive number of seconds, got {0}")]
    AbsenceGrace(f64),
    #[error("event cooldown must be a positive number of seconds, got {0}")]
    EventCooldown(f64),
    #[error("clip duration must be a positive number of seconds, got {0}")]
    ClipDuration(f64),
    #[error("clip fps must be a whole number of at least 1, got {0}")]
    ClipFps(f64),
    #[error("frame skip must be at least 1, got {0}")]
    FrameSkip(usize),
}

/// Per-session tracker settings. Fixed once the session starts.
#[derive(Clone, Debug)]
pub struct PresenceConfig {
    pub absence_grace_seconds: f64,
    pub event_cooldown_seconds: f64,
    pub save_snapshots: bool,
    pub save_clips: bool,
    pub clip_duration_seconds: f64,
    pub clip_fps: f64,
    pub snapshots_dir: PathBuf,
    pub clips_dir: PathBuf,
}

impl Default for PresenceConfig {
    fn default() -> Self {
        Self {
            absence_grace_seconds: DEFAULT_ABSENCE_GRACE_SECONDS,
            event_cooldown_seconds: DEFAULT_EVENT_COOLDOWN_SECONDS,
            save_snapshots: true,
            save_clips: true,
            clip_duration_seconds: DEFAULT_CLIP_DURATION_SECONDS,
            clip_fps: DEFAULT_CLIP_FPS,
            snapshots_dir: PathBuf::from("outputs/snapshots"),
            clips_dir: PathBuf::from("outputs/clips"),
        }
    }
}

fn positive(value: f64) -> bool {
    value.is_finite() && value > 0.0
}

/// Clips are encoded at an integer frame rate.
fn whole_fps(value: f64) -> bool {
    value.is_finite() && value >= 1.0 && value.fract() == 0.0
}

impl PresenceConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !positive(self.absence_grace_seconds) {
            return Err(ConfigError::AbsenceGrace(self.absence_grace_seconds));
        }
        if !positive(self.event_cooldown_seconds) {
            return Err(ConfigError::EventCooldown(self.event_cooldown_seconds));
        }
        if self.save_clips {
            if !positive(self.clip_duration_seconds) {
                return Err(ConfigError::ClipDuration(self.clip_duration_seconds));
            }
            if !whole_fps(self.clip_fps) {
                return Err(ConfigError::ClipFps(self.clip_fps));
            }
        }
        Ok(())
    }

    /// Grace and cooldown as durations. Only meaningful after `validate`.
    pub(crate) fn windows(&self) -> Result<(Duration, Duration), ConfigError> {
        let grace = Duration::try_from_secs_f64(self.absence_grace_seconds)
            .map_err(|_| ConfigError::AbsenceGrace(self.absence_grace_seconds))?;
        let cooldown = Duration::try_from_secs_f64(self.event_cooldown_seconds)
            .map_err(|_| ConfigError::EventCooldown(self.event_cooldown_seconds))?;
        Ok((grace, cooldown))
    }
}
