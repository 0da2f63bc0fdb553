use crate::shared::bbox::BoundingBox;
use crate::shared::frame::Frame;

/// Domain interface for locating faces inside an image, typically a crop of
/// one person box.
///
/// Boxes are in the pixel coordinates of `frame`. Sessions are stateful,
/// hence `&mut self`.
pub trait FaceDetector: Send {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<BoundingBox>, Box<dyn std::error::Error>>;
}

/// The face with the largest area; the first one wins ties.
pub fn largest_face(faces: &[BoundingBox]) -> Option<BoundingBox> {
    faces
        .iter()
        .copied()
        .fold(None, |best: Option<BoundingBox>, face| match best {
            Some(b) if b.area() >= face.area() => Some(b),
            _ => Some(face),
        })
}
