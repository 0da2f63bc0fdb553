use std::fs;
use std::path::{Path, PathBuf};

use crate::media::domain::frame_source::FrameSource;
use crate::shared::constants::IMAGE_EXTENSIONS;
use crate::shared::frame::Frame;
use crate::shared::source_metadata::SourceMetadata;

/// Reads a directory of images, or a single image, as an ordered frame
/// sequence.
///
/// Directories are walked recursively and files are sorted by full path, so
/// `a/2.jpg` precedes `b/1.jpg`. Frames are decoded lazily with the `image`
/// crate and indexed from 1 in that order.
pub struct ImageDirectoryReader {
    paths: Vec<PathBuf>,
}

impl ImageDirectoryReader {
    pub fn new() -> Self {
        Self { paths: Vec::new() }
    }
}

impl Default for ImageDirectoryReader {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameSource for ImageDirectoryReader {
    fn open(&mut self, path: &Path) -> Result<SourceMetadata, Box<dyn std::error::Error>> {
        let paths = if path.is_dir() {
            let mut found = Vec::new();
            collect_images(path, &mut found)?;
            found.sort();
            found
        } else if path.is_file() {
            if !is_image(path) {
                return Err(format!("Not a supported image file: {}", path.display()).into());
            }
            vec![path.to_path_buf()]
        } else {
            return Err(format!("Input not found: {}", path.display()).into());
        };

        log::info!("Found {} images under {}", paths.len(), path.display());
        self.paths = paths;
        Ok(SourceMetadata {
            total_frames: self.paths.len(),
            source_path: Some(path.to_path_buf()),
            frame_paths: self.paths.clone(),
        })
    }

    fn frames(
        &mut self,
    ) -> Box<dyn Iterator<Item = Result<Frame, Box<dyn std::error::Error>>> + '_> {
        Box::new(self.paths.iter().enumerate().map(
            |(i, path)| -> Result<Frame, Box<dyn std::error::Error>> {
                let img = image::open(path)
                    .map_err(|e| format!("Cannot decode {}: {e}", path.display()))?;
                Ok(Frame::from_rgb_image(img.to_rgb8(), i + 1))
            },
        ))
    }

    fn close(&mut self) {
        self.paths.clear();
    }
}

fn collect_images(dir: &Path, out: &mut Vec<PathBuf>) -> std::io::Result<()> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            collect_images(&path, out)?;
        } else if is_image(&path) {
            out.push(path);
        }
    }
    Ok(())
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn save_image(path: &Path, w: u32, h: u32, rgb: [u8; 3]) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        image::RgbImage::from_pixel(w, h, image::Rgb(rgb))
            .save(path)
            .unwrap();
    }

    #[test]
    fn test_directory_is_walked_recursively_in_path_order() {
        let dir = tempfile::tempdir().unwrap();
        save_image(&dir.path().join("b").join("1.png"), 4, 4, [0, 0, 0]);
        save_image(&dir.path().join("a").join("2.png"), 4, 4, [0, 0, 0]);
        save_image(&dir.path().join("c.PNG"), 4, 4, [0, 0, 0]);
        fs::write(dir.path().join("readme.txt"), "skip me").unwrap();

        let mut reader = ImageDirectoryReader::new();
        let metadata = reader.open(dir.path()).unwrap();
        assert_eq!(metadata.total_frames, 3);
        let names: Vec<String> = (1..=3).filter_map(|i| metadata.frame_name(i)).collect();
        assert_eq!(names, vec!["2.png", "1.png", "c.PNG"]);
    }

    #[test]
    fn test_frames_are_indexed_from_one() {
        let dir = tempfile::tempdir().unwrap();
        save_image(&dir.path().join("1.png"), 6, 3, [10, 20, 30]);
        save_image(&dir.path().join("2.png"), 6, 3, [40, 50, 60]);

        let mut reader = ImageDirectoryReader::new();
        reader.open(dir.path()).unwrap();
        let frames: Vec<Frame> = reader.frames().map(|f| f.unwrap()).collect();

        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].index(), 1);
        assert_eq!(frames[1].index(), 2);
        assert_eq!((frames[0].width(), frames[0].height()), (6, 3));
        assert_eq!(&frames[1].data()[..3], &[40, 50, 60]);
    }

    #[test]
    fn test_single_image_is_one_frame() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("only.jpg");
        save_image(&path, 8, 8, [200, 200, 200]);

        let mut reader = ImageDirectoryReader::new();
        let metadata = reader.open(&path).unwrap();
        assert_eq!(metadata.total_frames, 1);
        assert_eq!(reader.frames().count(), 1);
    }

    #[test]
    fn test_corrupt_image_yields_error_item() {
        let dir = tempfile::tempdir().unwrap();
        save_image(&dir.path().join("1.png"), 4, 4, [0, 0, 0]);
        fs::write(dir.path().join("2.png"), b"garbage").unwrap();

        let mut reader = ImageDirectoryReader::new();
        reader.open(dir.path()).unwrap();
        let results: Vec<_> = reader.frames().collect();
        assert!(results[0].is_ok());
        assert!(results[1].is_err());
    }

    #[test]
    fn test_missing_input_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut reader = ImageDirectoryReader::new();
        assert!(reader.open(&dir.path().join("absent")).is_err());
    }

    #[test]
    fn test_empty_directory_has_no_frames() {
        let dir = tempfile::tempdir().unwrap();
        let mut reader = ImageDirectoryReader::new();
        let metadata = reader.open(dir.path()).unwrap();
        assert_eq!(metadata.total_frames, 0);
        assert_eq!(reader.frames().count(), 0);
    }

    #[test]
    fn test_close_forgets_paths() {
        let dir = tempfile::tempdir().unwrap();
        save_image(&dir.path().join("1.png"), 4, 4, [0, 0, 0]);
        let mut reader = ImageDirectoryReader::new();
        reader.open(dir.path()).unwrap();
        reader.close();
        assert_eq!(reader.frames().count(), 0);
    }
}
