use crate::analysis::domain::orientation::OrientationLabel;
use crate::shared::bbox::BoundingBox;
use crate::shared::frame::Frame;

/// Brightness heuristic for head orientation.
///
/// The top slice of a person box is taken as the head. A bright slice
/// (hair, forehead, face turned to the camera) reads as up; a dark one
/// (desk, notebook, top of a lowered head) as down. This is a proxy, not
/// pose estimation: lighting shifts bias it directly.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegionClassifier {
    head_region_ratio: f64,
    brightness_threshold: f64,
}

impl RegionClassifier {
    pub fn new(head_region_ratio: f64, brightness_threshold: f64) -> Self {
        Self {
            head_region_ratio,
            brightness_threshold,
        }
    }

    pub fn classify(&self, frame: &Frame, bbox: &BoundingBox) -> OrientationLabel {
        classify(
            frame,
            bbox,
            self.head_region_ratio,
            self.brightness_threshold,
        )
    }
}

/// Labels the head of the person in `bbox` as up, down, or unknown.
///
/// Unknown means the head slice has no pixels inside the frame.
pub fn classify(
    frame: &Frame,
    bbox: &BoundingBox,
    head_region_ratio: f64,
    brightness_threshold: f64,
) -> OrientationLabel {
    let Some(head) = head_region(frame, bbox, head_region_ratio) else {
        return OrientationLabel::Unknown;
    };
    if mean_brightness(frame, &head) >= brightness_threshold {
        OrientationLabel::Up
    } else {
        OrientationLabel::Down
    }
}

/// Head slice of `bbox`, clipped to the frame.
pub fn head_region(frame: &Frame, bbox: &BoundingBox, ratio: f64) -> Option<BoundingBox> {
    bbox.top_slice(ratio)?
        .clamp_to(frame.width(), frame.height())
}

/// Mean HSV value channel over `region`, normalized to `[0, 1]`.
///
/// HSV value is the per-pixel channel maximum. `region` must lie inside the
/// frame and be non-empty.
fn mean_brightness(frame: &Frame, region: &BoundingBox) -> f64 {
    let pixels = frame.as_ndarray();
    let mut total = 0.0;
    for row in region.y1..region.y2 {
        for col in region.x1..region.x2 {
            let px = pixels.slice(ndarray::s![row as usize, col as usize, ..]);
            let value = px.iter().copied().max().unwrap_or(0);
            total += value as f64 / 255.0;
        }
    }
    total / region.area() as f64
}
