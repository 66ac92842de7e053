use std::path::Path;

use crate::shared::frame::Frame;
use crate::shared::video_metadata::VideoMetadata;

/// Abstracts clip encoding so recording does not depend on a specific
/// codec library.
pub trait VideoWriter: Send {
    fn open(
        &mut self,
        path: &Path,
        metadata: &VideoMetadata,
    ) -> Result<(), Box<dyn std::error::Error>>;

    fn write(&mut self, frame: &Frame) -> Result<(), Box<dyn std::error::Error>>;

    /// Flushes and finalizes the file. Calling it again is a no-op.
    fn close(&mut self) -> Result<(), Box<dyn std::error::Error>>;
}

/// Produces a fresh, unopened writer for every clip.
pub type VideoWriterFactory = Box<dyn Fn() -> Box<dyn VideoWriter> + Send>;
