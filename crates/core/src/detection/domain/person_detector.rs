use crate::detection::domain::detection::Detection;
use crate::shared::frame::Frame;

/// Domain interface for the upstream object detector.
///
/// Implementations may keep state between frames, hence `&mut self`.
/// Returned order must be reproducible for identical input: it fixes the
/// detection indices used in ephemeral identity keys.
pub trait PersonDetector: Send {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<Detection>, Box<dyn std::error::Error>>;
}
