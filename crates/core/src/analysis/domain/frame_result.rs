use serde::Serialize;

use crate::analysis::domain::orientation::OrientationLabel;
use crate::identity::domain::identity_key::IdentityKey;
use crate::shared::bbox::BoundingBox;

/// One analyzed person in one frame.
///
/// Field names on the wire follow the export contract: `id`, `head`,
/// `head_up_rate`, `head_up_rate_smooth`, `xyxy`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndividualRecord {
    pub frame: usize,
    #[serde(rename = "id")]
    pub identity: IdentityKey,
    #[serde(rename = "head")]
    pub orientation: OrientationLabel,
    /// 1.0 up, 0.0 down, `None` when the orientation is unknown.
    #[serde(rename = "head_up_rate")]
    pub instantaneous_rate: Option<f64>,
    /// Window mean for this identity; `None` until it holds a sample.
    #[serde(rename = "head_up_rate_smooth")]
    pub smoothed_rate: Option<f64>,
    #[serde(rename = "xyxy")]
    pub bbox: BoundingBox,
}

/// Aggregate head-up statistics for one frame plus its per-person records.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrameResult {
    pub frame: usize,
    pub persons: usize,
    pub head_up: usize,
    pub head_down: usize,
    /// `head_up / max(1, persons)`. Persons with an unknown orientation stay
    /// in the denominator, so one up and one unknown reads 0.5, the same as
    /// one up and one down.
    pub head_up_rate: f64,
    pub head_up_rate_smooth: f64,
    pub individuals: Vec<IndividualRecord>,
    /// Identities tracked by the session after this frame.
    pub identities_count: usize,
}

impl FrameResult {
    /// Persons whose orientation could not be measured.
    pub fn head_unknown(&self) -> usize {
        self.persons - self.head_up - self.head_down
    }
}
