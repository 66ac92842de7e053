use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::presence::domain::presence_config::PresenceConfig;
use crate::shared::constants::{
    DEFAULT_ABSENCE_GRACE_SECONDS, DEFAULT_CAPTURE_FPS, DEFAULT_CAPTURE_HEIGHT,
    DEFAULT_CAPTURE_WIDTH, DEFAULT_CLIP_DURATION_SECONDS, DEFAULT_CLIP_FPS, DEFAULT_CONFIDENCE,
    DEFAULT_EVENT_COOLDOWN_SECONDS, DEFAULT_IOU_THRESHOLD, DEFAULT_LOG_FILE_NAME, PERSON_CLASS_ID,
};
use crate::video::domain::video_reader::CaptureSource;

pub const BOT_TOKEN_ENV: &str = "TELEGRAM_BOT_TOKEN";
pub const CHAT_ID_ENV: &str = "TELEGRAM_CHAT_ID";

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("failed to read settings from {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid settings file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to write settings to {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to serialize settings: {0}")]
    Serialize(#[source] serde_json::Error),
    #[error("could not determine config directory")]
    NoConfigDir,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraSettings {
    pub source: String,
    pub input_format: Option<String>,
    pub width: u32,
    pub height: u32,
    pub fps: u32,
}

impl Default for CameraSettings {
    fn default() -> Self {
        let (source, input_format) = default_camera();
        Self {
            source: source.to_string(),
            input_format: Some(input_format.to_string()),
            width: DEFAULT_CAPTURE_WIDTH,
            height: DEFAULT_CAPTURE_HEIGHT,
            fps: DEFAULT_CAPTURE_FPS,
        }
    }
}

#[cfg(target_os = "macos")]
fn default_camera() -> (&'static str, &'static str) {
    ("0", "avfoundation")
}

#[cfg(target_os = "windows")]
fn default_camera() -> (&'static str, &'static str) {
    ("video=Integrated Camera", "dshow")
}

#[cfg(not(any(target_os = "macos", target_os = "windows")))]
fn default_camera() -> (&'static str, &'static str) {
    ("/dev/video0", "v4l2")
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionSettings {
    pub model_path: Option<PathBuf>,
    pub confidence: f64,
    pub iou_threshold: f64,
    pub person_class_id: usize,
    pub frame_skip: usize,
}

impl Default for DetectionSettings {
    fn default() -> Self {
        Self {
            model_path: None,
            confidence: DEFAULT_CONFIDENCE,
            iou_threshold: DEFAULT_IOU_THRESHOLD,
            person_class_id: PERSON_CLASS_ID,
            frame_skip: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventSettings {
    pub absence_grace_seconds: f64,
    pub event_cooldown_seconds: f64,
}

impl Default for EventSettings {
    fn default() -> Self {
        Self {
            absence_grace_seconds: DEFAULT_ABSENCE_GRACE_SECONDS,
            event_cooldown_seconds: DEFAULT_EVENT_COOLDOWN_SECONDS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputSettings {
    pub base_dir: PathBuf,
    /// Defaults to `<base_dir>/snapshots`.
    pub snapshots_dir: Option<PathBuf>,
    /// Defaults to `<base_dir>/clips`.
    pub clips_dir: Option<PathBuf>,
    pub logs_dir: PathBuf,
    pub log_file_name: String,
    pub save_snapshots: bool,
    pub save_clips: bool,
    pub clip_duration_seconds: f64,
    pub clip_fps: f64,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from("outputs"),
            snapshots_dir: None,
            clips_dir: None,
            logs_dir: PathBuf::from("logs"),
            log_file_name: DEFAULT_LOG_FILE_NAME.to_string(),
            save_snapshots: true,
            save_clips: true,
            clip_duration_seconds: DEFAULT_CLIP_DURATION_SECONDS,
            clip_fps: DEFAULT_CLIP_FPS,
        }
    }
}

impl OutputSettings {
    pub fn snapshots_dir(&self) -> PathBuf {
        self.snapshots_dir
            .clone()
            .unwrap_or_else(|| self.base_dir.join("snapshots"))
    }

    pub fn clips_dir(&self) -> PathBuf {
        self.clips_dir
            .clone()
            .unwrap_or_else(|| self.base_dir.join("clips"))
    }

    pub fn log_path(&self) -> PathBuf {
        self.logs_dir.join(&self.log_file_name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationSettings {
    pub telegram_bot_token: Option<String>,
    pub telegram_chat_id: Option<String>,
    pub timeout_seconds: u64,
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            telegram_bot_token: None,
            telegram_chat_id: None,
            timeout_seconds: 10,
        }
    }
}

impl NotificationSettings {
    /// Token and chat id, when both are set and non-empty.
    pub fn telegram_credentials(&self) -> Option<(String, String)> {
        let token = self.telegram_bot_token.as_deref().filter(|t| !t.is_empty())?;
        let chat = self.telegram_chat_id.as_deref().filter(|c| !c.is_empty())?;
        Some((token.to_string(), chat.to_string()))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorSettings {
    pub camera: CameraSettings,
    pub detection: DetectionSettings,
    pub events: EventSettings,
    pub outputs: OutputSettings,
    pub notifications: NotificationSettings,
}

impl MonitorSettings {
    /// `<config_dir>/Watchpost/settings.json`.
    pub fn default_path() -> Result<PathBuf, SettingsError> {
        dirs::config_dir()
            .map(|d| d.join("Watchpost").join("settings.json"))
            .ok_or(SettingsError::NoConfigDir)
    }

    /// Reads settings from `path`. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let json = match fs::read_to_string(path) {
            Ok(json) => json,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => {
                return Err(SettingsError::Read {
                    path: path.to_path_buf(),
                    source: e,
                })
            }
        };
        serde_json::from_str(&json).map_err(|e| SettingsError::Parse {
            path: path.to_path_buf(),
            source: e,
        })
    }

    pub fn save(&self, path: &Path) -> Result<(), SettingsError> {
        let write_err = |e: std::io::Error| SettingsError::Write {
            path: path.to_path_buf(),
            source: e,
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(write_err)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(SettingsError::Serialize)?;
        fs::write(path, json).map_err(write_err)
    }

    /// Overrides Telegram credentials from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_env_from(|key| std::env::var(key).ok());
    }

    pub fn apply_env_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(token) = lookup(BOT_TOKEN_ENV).filter(|v| !v.is_empty()) {
            self.notifications.telegram_bot_token = Some(token);
        }
        if let Some(chat) = lookup(CHAT_ID_ENV).filter(|v| !v.is_empty()) {
            self.notifications.telegram_chat_id = Some(chat);
        }
    }

    pub fn presence_config(&self) -> PresenceConfig {
        PresenceConfig {
            absence_grace_seconds: self.events.absence_grace_seconds,
            event_cooldown_seconds: self.events.event_cooldown_seconds,
            save_snapshots: self.outputs.save_snapshots,
            save_clips: self.outputs.save_clips,
            clip_duration_seconds: self.outputs.clip_duration_seconds,
            clip_fps: self.outputs.clip_fps,
            snapshots_dir: self.outputs.snapshots_dir(),
            clips_dir: self.outputs.clips_dir(),
        }
    }

    pub fn capture_source(&self) -> CaptureSource {
        CaptureSource {
            location: self.camera.source.clone(),
            input_format: self.camera.input_format.clone(),
            width: self.camera.width,
            height: self.camera.height,
            fps: self.camera.fps,
        }
    }
}
