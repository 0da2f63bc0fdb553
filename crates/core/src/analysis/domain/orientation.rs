use std::fmt;

use serde::{Deserialize, Serialize};

/// Coarse head orientation of one person in one frame.
///
/// `Unknown` is a measurement gap (no head region could be extracted). It is
/// never folded into `Down`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrientationLabel {
    Up,
    Down,
    Unknown,
}

impl OrientationLabel {
    /// Instantaneous head-up sample: 1.0 for up, 0.0 for down, none for unknown.
    pub fn rate(self) -> Option<f64> {
        match self {
            OrientationLabel::Up => Some(1.0),
            OrientationLabel::Down => Some(0.0),
            OrientationLabel::Unknown => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            OrientationLabel::Up => "up",
            OrientationLabel::Down => "down",
            OrientationLabel::Unknown => "unknown",
        }
    }
}

impl fmt::Display for OrientationLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
