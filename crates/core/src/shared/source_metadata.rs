use std::path::PathBuf;

/// What a frame source knows about its input once opened.
#[derive(Clone, Debug, PartialEq)]
pub struct SourceMetadata {
    pub total_frames: usize,
    pub source_path: Option<PathBuf>,
    /// One entry per frame, in frame order. Frame `i` (1-based) is
    /// `frame_paths[i - 1]`.
    pub frame_paths: Vec<PathBuf>,
}

impl SourceMetadata {
    /// File name of the given 1-based frame, if the source has one.
    pub fn frame_name(&self, index: usize) -> Option<String> {
        index
            .checked_sub(1)
            .and_then(|i| self.frame_paths.get(i))
            .and_then(|p| p.file_name())
            .map(|n| n.to_string_lossy().into_owned())
    }
}
