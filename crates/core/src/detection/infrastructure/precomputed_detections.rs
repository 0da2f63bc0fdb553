use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::detection::domain::detection::Detection;
use crate::detection::domain::person_detector::PersonDetector;
use crate::shared::frame::Frame;

/// Replays detections stored in a JSON file instead of running a model.
///
/// The file maps frame index to that frame's detections:
///
/// ```json
/// { "1": [ { "xyxy": [10, 20, 110, 220], "conf": 0.91, "cls": 0, "name": "person" } ] }
/// ```
///
/// Frames missing from the file have no detections.
pub struct PrecomputedDetections {
    by_frame: HashMap<usize, Vec<Detection>>,
}

impl PrecomputedDetections {
    pub fn from_path(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let text = fs::read_to_string(path)
            .map_err(|e| format!("Cannot read detections file {}: {e}", path.display()))?;
        let detections = Self::from_json(&text)
            .map_err(|e| format!("Invalid detections file {}: {e}", path.display()))?;
        log::info!(
            "Loaded precomputed detections for {} frames from {}",
            detections.by_frame.len(),
            path.display()
        );
        Ok(detections)
    }

    pub fn from_json(text: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let raw: HashMap<String, Vec<Detection>> = serde_json::from_str(text)?;
        let mut by_frame = HashMap::with_capacity(raw.len());
        for (key, detections) in raw {
            let index: usize = key
                .trim()
                .parse()
                .map_err(|_| format!("frame key {key:?} is not a frame index"))?;
            by_frame.insert(index, detections);
        }
        Ok(Self { by_frame })
    }

    pub fn frame_count(&self) -> usize {
        self.by_frame.len()
    }
}

impl PersonDetector for PrecomputedDetections {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<Detection>, Box<dyn std::error::Error>> {
        Ok(self
            .by_frame
            .get(&frame.index())
            .cloned()
            .unwrap_or_default())
    }
}
