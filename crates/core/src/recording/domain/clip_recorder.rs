use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::shared::frame::Frame;
use crate::shared::video_metadata::VideoMetadata;
use crate::video::domain::video_writer::VideoWriter;

#[derive(Error, Debug)]
pub enum ClipError {
    #[error("failed to open clip {path}: {message}")]
    Open { path: PathBuf, message: String },
    #[error("frame size {actual:?} does not match clip {path} opened at {expected:?}")]
    FrameSizeMismatch {
        path: PathBuf,
        expected: (u32, u32),
        actual: (u32, u32),
    },
    #[error("failed to write frame to clip {path}: {message}")]
    Write { path: PathBuf, message: String },
    #[error("failed to finalize clip {path}: {message}")]
    Close { path: PathBuf, message: String },
}

/// Number of frames a clip of `duration_seconds` holds at `fps`.
///
/// Never less than one, so the trigger frame always lands in the clip.
pub fn target_frame_count(duration_seconds: f64, fps: f64) -> usize {
    let frames = (duration_seconds * fps).round();
    if frames.is_finite() && frames >= 1.0 {
        frames as usize
    } else {
        1
    }
}

/// One fixed-length recording session.
///
/// Accepts frames until `target_frames` have been written, after which
/// further writes are ignored. The frame size is fixed when the clip opens.
pub struct ClipRecorder {
    writer: Box<dyn VideoWriter>,
    path: PathBuf,
    dimensions: (u32, u32),
    target_frames: usize,
    frames_written: usize,
    closed: bool,
}

impl ClipRecorder {
    pub fn open(
        mut writer: Box<dyn VideoWriter>,
        path: &Path,
        dimensions: (u32, u32),
        fps: f64,
        duration_seconds: f64,
    ) -> Result<Self, ClipError> {
        let metadata = VideoMetadata::new(dimensions.0, dimensions.1, fps);
        writer.open(path, &metadata).map_err(|e| ClipError::Open {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        Ok(Self {
            writer,
            path: path.to_path_buf(),
            dimensions,
            target_frames: target_frame_count(duration_seconds, fps),
            frames_written: 0,
            closed: false,
        })
    }

    /// Appends a frame. A no-op once the clip is finished or closed.
    pub fn write(&mut self, frame: &Frame) -> Result<(), ClipError> {
        if self.closed || self.is_finished() {
            return Ok(());
        }
        if frame.dimensions() != self.dimensions {
            return Err(ClipError::FrameSizeMismatch {
                path: self.path.clone(),
                expected: self.dimensions,
                actual: frame.dimensions(),
            });
        }

        self.writer.write(frame).map_err(|e| ClipError::Write {
            path: self.path.clone(),
            message: e.to_string(),
        })?;
        self.frames_written += 1;
        Ok(())
    }

    pub fn is_finished(&self) -> bool {
        self.frames_written >= self.target_frames
    }

    /// Finalizes the file. Safe to call more than once.
    pub fn close(&mut self) -> Result<(), ClipError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.writer.close().map_err(|e| ClipError::Close {
            path: self.path.clone(),
            message: e.to_string(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn frames_written(&self) -> usize {
        self.frames_written
    }

    pub fn target_frames(&self) -> usize {
        self.target_frames
    }
}

impl Drop for ClipRecorder {
    fn drop(&mut self) {
        if !self.closed {
            if let Err(e) = self.close() {
                log::warn!("{e}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct WriterLog {
        opened: Option<(PathBuf, u32, u32, f64)>,
        written: Vec<usize>,
        close_calls: usize,
    }

    struct RecordingWriter {
        log: Arc<Mutex<WriterLog>>,
        fail_open: bool,
    }

    impl VideoWriter for RecordingWriter {
        fn open(
            &mut self,
            path: &Path,
            metadata: &VideoMetadata,
        ) -> Result<(), Box<dyn std::error::Error>> {
            if self.fail_open {
                return Err("disk full".into());
            }
            self.log.lock().unwrap().opened = Some((
                path.to_path_buf(),
                metadata.width,
                metadata.height,
                metadata.fps,
            ));
            Ok(())
        }

        fn write(&mut self, frame: &Frame) -> Result<(), Box<dyn std::error::Error>> {
            self.log.lock().unwrap().written.push(frame.index());
            Ok(())
        }

        fn close(&mut self) -> Result<(), Box<dyn std::error::Error>> {
            self.log.lock().unwrap().close_calls += 1;
            Ok(())
        }
    }

    fn recorder(duration: f64, fps: f64) -> (ClipRecorder, Arc<Mutex<WriterLog>>) {
        let log = Arc::new(Mutex::new(WriterLog::default()));
        let writer = RecordingWriter {
            log: log.clone(),
            fail_open: false,
        };
        let clip = ClipRecorder::open(
            Box::new(writer),
            Path::new("clips/clip.mp4"),
            (64, 48),
            fps,
            duration,
        )
        .unwrap();
        (clip, log)
    }

    #[rstest]
    #[case(2.0, 10.0, 20)]
    #[case(8.0, 20.0, 160)]
    #[case(0.25, 10.0, 3)]
    #[case(0.01, 10.0, 1)]
    fn test_target_frame_count(#[case] duration: f64, #[case] fps: f64, #[case] expected: usize) {
        assert_eq!(target_frame_count(duration, fps), expected);
    }

    #[test]
    fn test_open_passes_geometry_to_writer() {
        let (clip, log) = recorder(2.0, 10.0);
        let opened = log.lock().unwrap().opened.clone().unwrap();
        assert_eq!(opened.0, PathBuf::from("clips/clip.mp4"));
        assert_eq!((opened.1, opened.2), (64, 48));
        approx::assert_relative_eq!(opened.3, 10.0);
        assert_eq!(clip.target_frames(), 20);
        assert_eq!(clip.path(), Path::new("clips/clip.mp4"));
    }

    #[test]
    fn test_open_failure_is_clip_error() {
        let writer = RecordingWriter {
            log: Arc::new(Mutex::new(WriterLog::default())),
            fail_open: true,
        };
        let result = ClipRecorder::open(
            Box::new(writer),
            Path::new("clip.mp4"),
            (64, 48),
            10.0,
            2.0,
        );
        assert!(matches!(result, Err(ClipError::Open { .. })));
    }

    #[test]
    fn test_finishes_after_exact_frame_count() {
        let (mut clip, log) = recorder(2.0, 10.0);
        for i in 0..19 {
            clip.write(&Frame::filled(64, 48, 0, i)).unwrap();
            assert!(!clip.is_finished());
        }
        clip.write(&Frame::filled(64, 48, 0, 19)).unwrap();
        assert!(clip.is_finished());
        assert_eq!(log.lock().unwrap().written.len(), 20);
    }

    #[test]
    fn test_write_after_finish_is_noop() {
        let (mut clip, log) = recorder(0.2, 10.0);
        for i in 0..5 {
            clip.write(&Frame::filled(64, 48, 0, i)).unwrap();
        }
        assert_eq!(clip.frames_written(), 2);
        assert_eq!(log.lock().unwrap().written, vec![0, 1]);
    }

    #[test]
    fn test_mismatched_frame_is_rejected() {
        let (mut clip, log) = recorder(2.0, 10.0);
        let err = clip.write(&Frame::filled(32, 24, 0, 0)).unwrap_err();
        assert!(matches!(
            err,
            ClipError::FrameSizeMismatch {
                expected: (64, 48),
                actual: (32, 24),
                ..
            }
        ));
        assert!(log.lock().unwrap().written.is_empty());
    }

    #[test]
    fn test_close_is_idempotent_and_drop_does_not_reclose() {
        let (mut clip, log) = recorder(2.0, 10.0);
        clip.close().unwrap();
        clip.close().unwrap();
        drop(clip);
        assert_eq!(log.lock().unwrap().close_calls, 1);
    }

    #[test]
    fn test_drop_finalizes_open_clip() {
        let (clip, log) = recorder(2.0, 10.0);
        drop(clip);
        assert_eq!(log.lock().unwrap().close_calls, 1);
    }

    #[test]
    fn test_write_after_close_is_noop() {
        let (mut clip, log) = recorder(2.0, 10.0);
        clip.close().unwrap();
        clip.write(&Frame::filled(64, 48, 0, 0)).unwrap();
        assert!(log.lock().unwrap().written.is_empty());
    }
}
