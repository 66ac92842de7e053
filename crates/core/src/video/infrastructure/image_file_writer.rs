use std::path::Path;

use crate::shared::constants::JPEG_QUALITY;
use crate::shared::frame::Frame;
use crate::video::domain::image_writer::ImageWriter;

/// Writes snapshots to disk using the `image` crate.
///
/// JPEG files use [`JPEG_QUALITY`], the same setting as alert photos; other
/// formats are chosen by extension.
pub struct ImageFileWriter;

impl ImageFileWriter {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ImageFileWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageWriter for ImageFileWriter {
    fn write(&self, path: &Path, frame: &Frame) -> Result<(), Box<dyn std::error::Error>> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        if is_jpeg(path) {
            std::fs::write(path, encode_jpeg(frame, JPEG_QUALITY)?)?;
            return Ok(());
        }

        let img = image::RgbImage::from_raw(frame.width(), frame.height(), frame.data().to_vec())
            .ok_or("Failed to create image from frame data")?;
        img.save(path)?;
        Ok(())
    }
}

fn is_jpeg(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("jpg") || ext.eq_ignore_ascii_case("jpeg"))
}

/// Encodes a frame as in-memory JPEG bytes.
pub fn encode_jpeg(frame: &Frame, quality: u8) -> Result<Vec<u8>, image::ImageError> {
    let mut buf = Vec::new();
    let mut encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut buf, quality);
    encoder.encode(
        frame.data(),
        frame.width(),
        frame.height(),
        image::ExtendedColorType::Rgb8,
    )?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_frame(width: u32, height: u32, r: u8, g: u8, b: u8) -> Frame {
        let mut data = Vec::with_capacity((width * height * 3) as usize);
        for _ in 0..(width * height) {
            data.extend_from_slice(&[r, g, b]);
        }
        Frame::new(data, width, height, 3, 0)
    }

    #[test]
    fn test_write_jpeg_snapshot_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("outputs/snapshots/snapshot.jpg");
        let frame = make_frame(64, 48, 50, 100, 200);

        ImageFileWriter::new().write(&path, &frame).unwrap();

        let img = image::open(&path).unwrap();
        assert_eq!(img.width(), 64);
        assert_eq!(img.height(), 48);
    }

    #[test]
    fn test_jpeg_snapshot_matches_alert_encoding() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snapshot.JPG");
        let frame = make_frame(32, 24, 10, 140, 220);

        ImageFileWriter::new().write(&path, &frame).unwrap();

        let on_disk = std::fs::read(&path).unwrap();
        assert_eq!(on_disk, encode_jpeg(&frame, JPEG_QUALITY).unwrap());
    }

    #[test]
    fn test_png_roundtrip_preserves_pixels() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.png");
        let frame = make_frame(8, 8, 50, 100, 200);

        ImageFileWriter::new().write(&path, &frame).unwrap();

        let img = image::open(&path).unwrap().to_rgb8();
        assert_eq!(img.get_pixel(0, 0).0, [50, 100, 200]);
    }

    #[test]
    fn test_encode_jpeg_produces_jpeg_magic() {
        let frame = make_frame(16, 16, 128, 128, 128);
        let bytes = encode_jpeg(&frame, 85).unwrap();
        assert!(bytes.len() > 4);
        assert_eq!(&bytes[..2], &[0xFF, 0xD8]);
    }

    #[test]
    fn test_write_to_unwritable_location_returns_error() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, b"x").unwrap();
        let frame = make_frame(4, 4, 0, 0, 0);

        // A regular file where a directory is needed.
        let result = ImageFileWriter::new().write(&blocker.join("snap.jpg"), &frame);
        assert!(result.is_err());
    }
}
