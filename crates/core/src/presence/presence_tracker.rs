use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::notification::domain::notification_sink::NotificationSink;
use crate::presence::domain::presence_config::{ConfigError, PresenceConfig};
use crate::presence::domain::presence_state::{PresenceState, Transition};
use crate::recording::domain::clip_recorder::ClipRecorder;
use crate::session::domain::event_log::EventLog;
use crate::shared::constants::FILE_TIMESTAMP_FORMAT;
use crate::shared::detection::{confidence_summary, Detection};
use crate::shared::frame::Frame;
use crate::video::domain::image_writer::ImageWriter;
use crate::video::domain::video_writer::VideoWriterFactory;

/// Turns per-frame detections into debounced arrival events.
///
/// `handle` must be called once per frame, in capture order, from a single
/// thread. Each confirmed arrival logs the detections, saves a snapshot,
/// starts a clip (unless one is still recording) and dispatches a
/// notification. The open clip is fed every frame until it reaches its
/// target length, whatever happens to presence in the meantime.
pub struct PresenceTracker {
    config: PresenceConfig,
    state: PresenceState,
    active_clip: Option<ClipRecorder>,
    writer_factory: VideoWriterFactory,
    image_writer: Box<dyn ImageWriter>,
    notifier: Box<dyn NotificationSink>,
    event_log: Box<dyn EventLog>,
    session_started_at: DateTime<Utc>,
    last_transition: Transition,
    events_fired: usize,
    clips_saved: usize,
    shut_down: bool,
}

impl PresenceTracker {
    pub fn new(
        config: PresenceConfig,
        writer_factory: VideoWriterFactory,
        image_writer: Box<dyn ImageWriter>,
        notifier: Box<dyn NotificationSink>,
        event_log: Box<dyn EventLog>,
        session_started_at: DateTime<Utc>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let (grace, cooldown) = config.windows()?;

        Ok(Self {
            config,
            state: PresenceState::new(grace, cooldown),
            active_clip: None,
            writer_factory,
            image_writer,
            notifier,
            event_log,
            session_started_at,
            last_transition: Transition::None,
            events_fired: 0,
            clips_saved: 0,
            shut_down: false,
        })
    }

    pub fn start(&mut self) {
        self.event_log.info("Security camera session started.");
        self.notifier.send_session_start();
    }

    /// Processes one frame. Returns true while a person is present or a
    /// clip is still recording.
    pub fn handle(&mut self, frame: &Frame, detections: &[Detection], now: Duration) -> bool {
        self.feed_active_clip(frame);

        self.last_transition = self.state.observe(!detections.is_empty(), now);
        match self.last_transition {
            Transition::Arrived => self.fire_event(frame, detections, now),
            Transition::Departed => {
                self.event_log
                    .info("Person left the frame, monitoring resumed.");
            }
            Transition::ArrivalSuppressed => {
                log::debug!("Arrival at {:.2}s suppressed by cooldown", now.as_secs_f64());
            }
            Transition::None => {}
        }

        self.is_alert_active()
    }

    /// Finalizes any open clip and closes the session. Later calls do nothing.
    pub fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }
        self.shut_down = true;

        if let Some(mut clip) = self.active_clip.take() {
            match clip.close() {
                Ok(()) => {
                    self.clips_saved += 1;
                    self.event_log.info(&format!(
                        "Clip finalized on shutdown: {} ({} frames)",
                        clip.path().display(),
                        clip.frames_written()
                    ));
                }
                Err(e) => self.event_log.warning(&e.to_string()),
            }
        }
        self.event_log.info("Security camera session ended.");
        self.notifier.send_session_end();
    }

    /// Saves the current frame on operator request, outside any event.
    /// Returns the path when the image was written.
    pub fn save_manual_snapshot(&mut self, frame: &Frame, now: Duration) -> Option<PathBuf> {
        let stamp = self.wall_time(now).format(FILE_TIMESTAMP_FORMAT).to_string();
        let path = self.config.snapshots_dir.join(format!("manual_{stamp}.jpg"));
        self.save_image(frame, &path, "Manual snapshot").then_some(path)
    }

    pub fn is_alert_active(&self) -> bool {
        self.state.is_present() || self.active_clip.is_some()
    }

    pub fn is_present(&self) -> bool {
        self.state.is_present()
    }

    pub fn has_active_clip(&self) -> bool {
        self.active_clip.is_some()
    }

    /// Transition produced by the most recent `handle` call.
    pub fn outcome(&self) -> Transition {
        self.last_transition
    }

    pub fn state(&self) -> &PresenceState {
        &self.state
    }

    pub fn events_fired(&self) -> usize {
        self.events_fired
    }

    pub fn clips_saved(&self) -> usize {
        self.clips_saved
    }

    /// Wall-clock time of an offset into the session.
    pub fn wall_time(&self, now: Duration) -> DateTime<Utc> {
        let offset = chrono::Duration::from_std(now).unwrap_or_else(|_| chrono::Duration::zero());
        self.session_started_at + offset
    }

    fn feed_active_clip(&mut self, frame: &Frame) {
        let Some(clip) = self.active_clip.as_mut() else {
            return;
        };
        match clip.write(frame) {
            Ok(()) if clip.is_finished() => self.finish_clip(),
            Ok(()) => {}
            Err(e) => {
                self.event_log
                    .warning(&format!("Clip recording stopped early: {e}"));
                self.finish_clip();
            }
        }
    }

    fn finish_clip(&mut self) {
        let Some(mut clip) = self.active_clip.take() else {
            return;
        };
        match clip.close() {
            Ok(()) => {
                self.clips_saved += 1;
                self.event_log
                    .info(&format!("Clip saved: {}", clip.path().display()));
            }
            Err(e) => self.event_log.warning(&e.to_string()),
        }
    }

    fn fire_event(&mut self, frame: &Frame, detections: &[Detection], now: Duration) {
        let wall_time = self.wall_time(now);
        let stamp = wall_time.format(FILE_TIMESTAMP_FORMAT).to_string();
        self.events_fired += 1;

        self.event_log.info(&format!(
            "PERSON DETECTED | count={} | confidences=[{}]",
            detections.len(),
            confidence_summary(detections)
        ));

        if self.config.save_snapshots {
            let path = self.config.snapshots_dir.join(format!("snapshot_{stamp}.jpg"));
            self.save_image(frame, &path, "Snapshot");
        }

        if self.config.save_clips {
            if self.active_clip.is_none() {
                self.start_clip(frame, self.config.clips_dir.join(format!("clip_{stamp}.mp4")));
            } else {
                self.event_log
                    .info("Previous clip still recording, no new clip started.");
            }
        }

        self.notifier.send_arrival_alert(frame, detections, wall_time);
    }

    fn save_image(&mut self, frame: &Frame, path: &Path, what: &str) -> bool {
        match self.image_writer.write(path, frame) {
            Ok(()) => {
                self.event_log
                    .info(&format!("{what} saved: {}", path.display()));
                true
            }
            Err(e) => {
                self.event_log.warning(&format!(
                    "{what} could not be saved to {}: {e}",
                    path.display()
                ));
                false
            }
        }
    }

    fn start_clip(&mut self, frame: &Frame, path: PathBuf) {
        let opened = ClipRecorder::open(
            (self.writer_factory)(),
            &path,
            frame.dimensions(),
            self.config.clip_fps,
            self.config.clip_duration_seconds,
        );
        let mut clip = match opened {
            Ok(clip) => clip,
            Err(e) => {
                self.event_log
                    .warning(&format!("{e}; continuing without a clip for this event"));
                return;
            }
        };

        if let Err(e) = clip.write(frame) {
            self.event_log
                .warning(&format!("Clip recording stopped early: {e}"));
            return;
        }

        self.event_log.info(&format!(
            "Recording clip ({}s): {}",
            self.config.clip_duration_seconds,
            path.display()
        ));
        self.active_clip = Some(clip);
        if self.active_clip.as_ref().is_some_and(ClipRecorder::is_finished) {
            self.finish_clip();
        }
    }
}
