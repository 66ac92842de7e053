/// Geometry and cadence of a video stream, either as reported by a capture
/// source or as requested from an encoder.
#[derive(Clone, Debug, PartialEq)]
pub struct VideoMetadata {
    pub width: u32,
    pub height: u32,
    pub fps: f64,
    /// Empty when the stream is produced locally (e.g. an encoded clip).
    pub codec: String,
}

impl VideoMetadata {
    pub fn new(width: u32, height: u32, fps: f64) -> Self {
        Self {
            width,
            height,
            fps,
            codec: String::new(),
        }
    }

    /// Frame rate rounded to a whole number, falling back to `default` for
    /// sources that report 0 or garbage.
    pub fn whole_fps_or(&self, default: i32) -> i32 {
        let fps = self.fps.round();
        if fps.is_finite() && fps >= 1.0 {
            fps as i32
        } else {
            default
        }
    }
}
