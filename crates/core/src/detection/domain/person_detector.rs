use crate::shared::detection::Detection;
use crate::shared::frame::Frame;

/// Domain interface for single-class (person) detection.
///
/// The presence pipeline treats implementations as opaque: a frame goes in,
/// the boxes for the class of interest come out.
pub trait PersonDetector: Send {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<Detection>, Box<dyn std::error::Error>>;

    /// Adjust the minimum confidence while the session is running.
    fn set_confidence(&mut self, _confidence: f64) {}

    fn confidence(&self) -> Option<f64> {
        None
    }
}
