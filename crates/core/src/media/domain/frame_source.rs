use std::path::Path;

use crate::shared::frame::Frame;
use crate::shared::source_metadata::SourceMetadata;

/// Supplies the frames of one analysis run in chronological order.
///
/// Frames carry 1-based indices assigned by the source; the pipeline never
/// renumbers them, so sampling with a stride leaves gaps in the sequence.
pub trait FrameSource: Send {
    /// Opens an input (an image directory, a single image, or a video).
    fn open(&mut self, path: &Path) -> Result<SourceMetadata, Box<dyn std::error::Error>>;

    /// Frames in order. A frame that fails to decode yields an `Err` item;
    /// the caller decides whether to skip it.
    fn frames(
        &mut self,
    ) -> Box<dyn Iterator<Item = Result<Frame, Box<dyn std::error::Error>>> + '_>;

    fn close(&mut self);
}
