use serde::{Deserialize, Serialize};

/// Axis-aligned pixel box in `xyxy` form: `[x1, y1)` × `[x2, y2)`.
///
/// Serializes as the bare array `[x1, y1, x2, y2]`, matching the `xyxy`
/// layout detectors emit. A box with `x2 <= x1` or `y2 <= y1` is degenerate;
/// nothing downstream treats that as an error.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "[i32; 4]", into = "[i32; 4]")]
pub struct BoundingBox {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

impl BoundingBox {
    pub fn new(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Saturates at `i32::MAX` for boxes wider than any frame.
    pub fn width(&self) -> i32 {
        span(self.x1, self.x2)
    }

    pub fn height(&self) -> i32 {
        span(self.y1, self.y2)
    }

    pub fn area(&self) -> i64 {
        self.width() as i64 * self.height() as i64
    }

    pub fn is_degenerate(&self) -> bool {
        self.x2 <= self.x1 || self.y2 <= self.y1
    }

    /// Top slice of the box: full width, height `max(1, round(h * ratio))`,
    /// anchored at the top edge.
    ///
    /// Returns `None` for degenerate boxes.
    pub fn top_slice(&self, ratio: f64) -> Option<BoundingBox> {
        if self.is_degenerate() {
            return None;
        }
        let slice_h = ((self.height() as f64 * ratio).round() as i32).max(1);
        Some(BoundingBox {
            y2: self.y1.saturating_add(slice_h.min(self.height())),
            ..*self
        })
    }

    /// Intersection with a `width` × `height` frame, or `None` when nothing
    /// of the box lies inside it.
    pub fn clamp_to(&self, width: u32, height: u32) -> Option<BoundingBox> {
        let w = width.min(i32::MAX as u32) as i32;
        let h = height.min(i32::MAX as u32) as i32;
        let clamped = BoundingBox {
            x1: self.x1.clamp(0, w),
            y1: self.y1.clamp(0, h),
            x2: self.x2.clamp(0, w),
            y2: self.y2.clamp(0, h),
        };
        if clamped.is_degenerate() {
            None
        } else {
            Some(clamped)
        }
    }
}

fn span(from: i32, to: i32) -> i32 {
    (to as i64 - from as i64).clamp(0, i32::MAX as i64) as i32
}

impl From<[i32; 4]> for BoundingBox {
    fn from(xyxy: [i32; 4]) -> Self {
        Self::new(xyxy[0], xyxy[1], xyxy[2], xyxy[3])
    }
}

impl From<BoundingBox> for [i32; 4] {
    fn from(b: BoundingBox) -> Self {
        [b.x1, b.y1, b.x2, b.y2]
    }
}
