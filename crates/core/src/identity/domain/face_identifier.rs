use crate::shared::bbox::BoundingBox;
use crate::shared::frame::Frame;

/// Boundary to a face-identification backend.
///
/// Returns the matched person's name, or `None` when no confident match
/// exists. Training, gallery loading and model files are the
/// implementation's business and happen before the first call. Backends
/// may hold inference sessions, hence `&mut self`.
pub trait FaceIdentifier: Send {
    fn identify(
        &mut self,
        frame: &Frame,
        bbox: &BoundingBox,
    ) -> Result<Option<String>, Box<dyn std::error::Error>>;
}
