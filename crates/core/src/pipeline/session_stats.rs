use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

const DEFAULT_FPS_WINDOW: usize = 30;

/// Running totals for one named stage, in milliseconds.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct StageTiming {
    pub runs: usize,
    pub total_ms: f64,
    pub max_ms: f64,
}

impl StageTiming {
    fn record(&mut self, ms: f64) {
        self.runs += 1;
        self.total_ms += ms;
        self.max_ms = self.max_ms.max(ms);
    }

    pub fn avg_ms(&self) -> f64 {
        if self.runs == 0 {
            return 0.0;
        }
        self.total_ms / self.runs as f64
    }
}

/// Frame-rate and per-stage timing for one monitoring session.
///
/// FPS is measured over the most recent `window` frames. Stage timings are
/// kept as running totals so memory stays flat however long the camera runs.
pub struct SessionStats {
    window: usize,
    frame_times: VecDeque<Instant>,
    timings: HashMap<String, StageTiming>,
    start_time: Instant,
    total_frames: usize,
}

impl SessionStats {
    pub fn new(window: usize) -> Self {
        Self {
            window: window.max(2),
            frame_times: VecDeque::new(),
            timings: HashMap::new(),
            start_time: Instant::now(),
            total_frames: 0,
        }
    }

    /// Records a frame at `at` and returns the rolling FPS.
    pub fn tick_at(&mut self, at: Instant) -> f64 {
        self.total_frames += 1;
        self.frame_times.push_back(at);
        while self.frame_times.len() > self.window {
            self.frame_times.pop_front();
        }
        self.fps()
    }

    pub fn tick(&mut self) -> f64 {
        self.tick_at(Instant::now())
    }

    pub fn fps(&self) -> f64 {
        let (Some(first), Some(last)) = (self.frame_times.front(), self.frame_times.back()) else {
            return 0.0;
        };
        let span = last.duration_since(*first).as_secs_f64();
        if span <= 0.0 {
            return 0.0;
        }
        (self.frame_times.len() - 1) as f64 / span
    }

    /// Record how long a named stage took for one frame.
    pub fn timing(&mut self, stage: &str, duration: Duration) {
        let ms = duration.as_secs_f64() * 1000.0;
        match self.timings.get_mut(stage) {
            Some(timing) => timing.record(ms),
            None => {
                let mut timing = StageTiming::default();
                timing.record(ms);
                self.timings.insert(stage.to_string(), timing);
            }
        }
    }

    pub fn timings_for(&self, stage: &str) -> Option<&StageTiming> {
        self.timings.get(stage)
    }

    pub fn total_frames(&self) -> usize {
        self.total_frames
    }

    /// Returns the formatted summary, or `None` if no frame was recorded.
    pub fn summary_string(&self) -> Option<String> {
        if self.total_frames == 0 {
            return None;
        }

        let elapsed = self.start_time.elapsed().as_secs_f64();
        let mut lines = vec![format!(
            "Session summary ({} frames, {elapsed:.1}s):",
            self.total_frames
        )];

        let mut stages: Vec<_> = self.timings.keys().collect();
        stages.sort();
        for stage in stages {
            let timing = &self.timings[stage];
            lines.push(format!(
                "  {stage:8}: avg {:6.1}ms  max {:6.1}ms  total {:7.0}ms  ({} runs)",
                timing.avg_ms(),
                timing.max_ms,
                timing.total_ms,
                timing.runs
            ));
        }

        if elapsed > 0.0 {
            lines.push(format!(
                "  Throughput: {:.1} fps",
                self.total_frames as f64 / elapsed
            ));
        }

        Some(lines.join("\n"))
    }

    pub fn log_summary(&self) {
        if let Some(text) = self.summary_string() {
            log::info!("\n\n{text}");
        }
    }
}

impl Default for SessionStats {
    fn default() -> Self {
        Self::new(DEFAULT_FPS_WINDOW)
    }
}
