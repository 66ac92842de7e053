use crate::detection::domain::person_detector::PersonDetector;
use crate::presence::domain::presence_config::ConfigError;
use crate::shared::detection::Detection;
use crate::shared::frame::Frame;

/// Runs the detector every `frame_skip` frames and reuses the last result
/// in between.
///
/// Every frame still goes through `detections_for`, so callers can feed the
/// tracker unconditionally. A detector failure at runtime keeps the
/// previous detections rather than stopping the loop.
pub struct FrameScheduler {
    detector: Box<dyn PersonDetector>,
    frame_skip: usize,
    frame_count: usize,
    last_detections: Vec<Detection>,
    detector_runs: usize,
    detector_failures: usize,
}

impl FrameScheduler {
    pub fn new(detector: Box<dyn PersonDetector>, frame_skip: usize) -> Result<Self, ConfigError> {
        if frame_skip < 1 {
            return Err(ConfigError::FrameSkip(frame_skip));
        }
        Ok(Self {
            detector,
            frame_skip,
            frame_count: 0,
            last_detections: Vec::new(),
            detector_runs: 0,
            detector_failures: 0,
        })
    }

    /// Whether the next call to `detections_for` will invoke the detector.
    pub fn detects_next(&self) -> bool {
        self.frame_count % self.frame_skip == 0
    }

    pub fn detections_for(&mut self, frame: &Frame) -> &[Detection] {
        if self.detects_next() {
            self.detector_runs += 1;
            match self.detector.detect(frame) {
                Ok(detections) => self.last_detections = detections,
                Err(e) => {
                    self.detector_failures += 1;
                    log::warn!(
                        "Detection failed on frame {}, reusing previous result: {e}",
                        frame.index()
                    );
                }
            }
        }
        self.frame_count += 1;
        &self.last_detections
    }

    pub fn set_confidence(&mut self, confidence: f64) {
        self.detector.set_confidence(confidence);
    }

    pub fn confidence(&self) -> Option<f64> {
        self.detector.confidence()
    }

    pub fn frame_count(&self) -> usize {
        self.frame_count
    }

    pub fn detector_runs(&self) -> usize {
        self.detector_runs
    }

    pub fn detector_failures(&self) -> usize {
        self.detector_failures
    }
}
