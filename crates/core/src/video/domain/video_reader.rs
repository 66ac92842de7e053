use crate::shared::frame::Frame;
use crate::shared::video_metadata::VideoMetadata;

/// Where frames come from and what to ask the device for.
#[derive(Clone, Debug, PartialEq)]
pub struct CaptureSource {
    /// Device path, file path or stream URL.
    pub location: String,
    /// Input device format (`v4l2`, `avfoundation`, `dshow`). `None` lets
    /// the demuxer probe files and URLs.
    pub input_format: Option<String>,
    /// Requested capture resolution; devices may clamp it.
    pub width: u32,
    pub height: u32,
    pub fps: u32,
}

/// Reads frames from a camera, stream or file, in capture order.
pub trait VideoReader: Send {
    /// Opens the source and returns the geometry it actually delivers.
    fn open(&mut self, source: &CaptureSource) -> Result<VideoMetadata, Box<dyn std::error::Error>>;

    /// Returns an iterator over frames. An `Err` item is a failed read that
    /// the caller may skip; `None` means the source is exhausted.
    fn frames(
        &mut self,
    ) -> Box<dyn Iterator<Item = Result<Frame, Box<dyn std::error::Error>>> + '_>;

    /// Releases any resources held by the reader.
    fn close(&mut self);
}
