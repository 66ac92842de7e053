use std::path::Path;

use crate::shared::frame::Frame;

/// Persists single frames as still images.
pub trait ImageWriter: Send {
    /// Writes a frame to `path`; the format follows the file extension.
    fn write(&self, path: &Path, frame: &Frame) -> Result<(), Box<dyn std::error::Error>>;
}
