use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam_channel::Receiver;

use crate::presence::presence_tracker::PresenceTracker;
use crate::session::domain::control_command::{adjust_confidence, ControlCommand};
use crate::shared::constants::DEFAULT_CONFIDENCE;
use crate::video::domain::video_reader::{CaptureSource, VideoReader};

use super::frame_scheduler::FrameScheduler;
use super::session_stats::SessionStats;

const READ_RETRY_DELAY: Duration = Duration::from_millis(50);
const MAX_CONSECUTIVE_READ_FAILURES: usize = 200;

/// Counters reported when a session ends.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SessionSummary {
    pub frames_read: usize,
    pub frames_processed: usize,
    pub read_failures: usize,
    pub detector_runs: usize,
    pub events_fired: usize,
    pub clips_saved: usize,
}

/// Monotonic offset since the session started.
pub type SessionClock = Box<dyn FnMut() -> Duration + Send>;

/// Drives one monitoring session: capture, scheduled detection, presence
/// tracking and operator commands, strictly one frame at a time.
///
/// Single-use: `run` takes the reader, so a second call fails.
pub struct MonitorSessionUseCase {
    reader: Option<Box<dyn VideoReader>>,
    scheduler: FrameScheduler,
    tracker: PresenceTracker,
    commands: Option<Receiver<ControlCommand>>,
    cancelled: Arc<AtomicBool>,
    clock: Option<SessionClock>,
    stats: SessionStats,
    paused: bool,
    max_consecutive_read_failures: usize,
}

enum LoopExit {
    Finished,
    Failed(String),
}

impl MonitorSessionUseCase {
    pub fn new(
        reader: Box<dyn VideoReader>,
        scheduler: FrameScheduler,
        tracker: PresenceTracker,
        commands: Option<Receiver<ControlCommand>>,
        cancelled: Option<Arc<AtomicBool>>,
    ) -> Self {
        Self {
            reader: Some(reader),
            scheduler,
            tracker,
            commands,
            cancelled: cancelled.unwrap_or_else(|| Arc::new(AtomicBool::new(false))),
            clock: None,
            stats: SessionStats::default(),
            paused: false,
            max_consecutive_read_failures: MAX_CONSECUTIVE_READ_FAILURES,
        }
    }

    /// Replaces the wall clock used for `now`.
    pub fn with_clock(mut self, clock: SessionClock) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn run(
        &mut self,
        source: &CaptureSource,
    ) -> Result<SessionSummary, Box<dyn std::error::Error>> {
        let mut reader = self.reader.take().ok_or("Session already executed")?;
        let metadata = reader.open(source)?;
        log::info!(
            "Capturing {} at {}x{} @ {:.0} fps",
            source.location,
            metadata.width,
            metadata.height,
            metadata.fps
        );

        let started = Instant::now();
        let mut clock = self
            .clock
            .take()
            .unwrap_or_else(|| Box::new(move || started.elapsed()));

        self.tracker.start();
        let mut summary = SessionSummary::default();
        let exit = self.run_loop(&mut *reader, &mut *clock, &mut summary);
        self.tracker.shutdown();
        reader.close();

        summary.detector_runs = self.scheduler.detector_runs();
        summary.events_fired = self.tracker.events_fired();
        summary.clips_saved = self.tracker.clips_saved();
        self.stats.log_summary();

        match exit {
            LoopExit::Finished => Ok(summary),
            LoopExit::Failed(message) => Err(message.into()),
        }
    }

    fn run_loop(
        &mut self,
        reader: &mut dyn VideoReader,
        clock: &mut (dyn FnMut() -> Duration + Send),
        summary: &mut SessionSummary,
    ) -> LoopExit {
        let mut consecutive_failures = 0;
        let mut alert_active = false;
        let mut frames = reader.frames();

        loop {
            if self.cancelled.load(Ordering::Relaxed) {
                log::info!("Session cancelled");
                return LoopExit::Finished;
            }

            let frame = match frames.next() {
                None => {
                    log::info!("End of stream");
                    return LoopExit::Finished;
                }
                Some(Err(e)) => {
                    summary.read_failures += 1;
                    consecutive_failures += 1;
                    if consecutive_failures >= self.max_consecutive_read_failures {
                        return LoopExit::Failed(format!(
                            "capture failed {consecutive_failures} times in a row: {e}"
                        ));
                    }
                    log::warn!("Failed to read frame, retrying: {e}");
                    std::thread::sleep(READ_RETRY_DELAY);
                    continue;
                }
                Some(Ok(frame)) => frame,
            };
            consecutive_failures = 0;
            summary.frames_read += 1;
            let now = clock();

            for command in self.pending_commands() {
                match command {
                    ControlCommand::Quit => {
                        log::info!("Quit requested, shutting down");
                        return LoopExit::Finished;
                    }
                    ControlCommand::ManualSnapshot => {
                        self.tracker.save_manual_snapshot(&frame, now);
                    }
                    other => self.apply_command(other),
                }
            }

            if self.paused {
                continue;
            }

            let detect_start = Instant::now();
            let detections = self.scheduler.detections_for(&frame).to_vec();
            self.stats.timing("detect", detect_start.elapsed());

            let track_start = Instant::now();
            let active = self.tracker.handle(&frame, &detections, now);
            self.stats.timing("track", track_start.elapsed());

            if active != alert_active {
                alert_active = active;
                log::debug!("Alert {}", if active { "raised" } else { "cleared" });
            }

            summary.frames_processed += 1;
            let fps = self.stats.tick();
            if summary.frames_processed % 300 == 0 {
                log::debug!("Processing at {fps:.1} fps");
            }
        }
    }

    fn pending_commands(&self) -> Vec<ControlCommand> {
        self.commands
            .as_ref()
            .map(|rx| rx.try_iter().collect())
            .unwrap_or_default()
    }

    fn apply_command(&mut self, command: ControlCommand) {
        match command {
            ControlCommand::TogglePause => {
                self.paused = !self.paused;
                if self.paused {
                    log::info!("Paused. Send 'p' again to resume.");
                } else {
                    log::info!("Resumed.");
                }
            }
            ControlCommand::RaiseConfidence | ControlCommand::LowerConfidence => {
                let current = self.scheduler.confidence().unwrap_or(DEFAULT_CONFIDENCE);
                let next = adjust_confidence(current, command);
                self.scheduler.set_confidence(next);
                log::info!("Confidence threshold set to {:.0}%", next * 100.0);
            }
            ControlCommand::ManualSnapshot | ControlCommand::Quit => {}
        }
    }
}
