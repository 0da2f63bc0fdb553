use std::path::Path;

use crate::media::domain::image_writer::ImageWriter;
use crate::shared::frame::Frame;

/// Saves frames with the `image` crate, creating missing directories.
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
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let img = frame
            .to_rgb_image()
            .ok_or("Only RGB frames can be saved as images")?;
        img.save(path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid(width: u32, height: u32, rgb: [u8; 3]) -> Frame {
        Frame::from_rgb_image(image::RgbImage::from_pixel(width, height, image::Rgb(rgb)), 1)
    }

    #[test]
    fn test_write_round_trips_pixels() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("anno").join("0001.png");
        ImageFileWriter::new()
            .write(&path, &solid(12, 7, [50, 100, 200]))
            .unwrap();

        let img = image::open(&path).unwrap().to_rgb8();
        assert_eq!(img.dimensions(), (12, 7));
        assert_eq!(img.get_pixel(3, 3).0, [50, 100, 200]);
    }

    #[test]
    fn test_grayscale_frame_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let frame = Frame::new(vec![0u8; 16], 4, 4, 1, 1);
        assert!(ImageFileWriter::new()
            .write(&dir.path().join("g.png"), &frame)
            .is_err());
    }

    #[test]
    fn test_unknown_extension_is_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(ImageFileWriter::new()
            .write(&dir.path().join("out.unknownext"), &solid(2, 2, [0, 0, 0]))
            .is_err());
    }
}
