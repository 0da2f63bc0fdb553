use ndarray::s;

use crate::analysis::domain::frame_result::IndividualRecord;
use crate::analysis::domain::orientation::OrientationLabel;
use crate::shared::bbox::BoundingBox;
use crate::shared::frame::Frame;

pub const UP_COLOR: [u8; 3] = [0, 200, 0];
pub const DOWN_COLOR: [u8; 3] = [220, 0, 0];
pub const UNKNOWN_COLOR: [u8; 3] = [128, 128, 128];

pub fn orientation_color(orientation: OrientationLabel) -> [u8; 3] {
    match orientation {
        OrientationLabel::Up => UP_COLOR,
        OrientationLabel::Down => DOWN_COLOR,
        OrientationLabel::Unknown => UNKNOWN_COLOR,
    }
}

/// Outlines each person box in its orientation color, in place.
pub struct BoxAnnotator {
    thickness: u32,
}

impl BoxAnnotator {
    pub fn new(thickness: u32) -> Self {
        Self {
            thickness: thickness.max(1),
        }
    }

    pub fn annotate(&self, frame: &mut Frame, individuals: &[IndividualRecord]) {
        for record in individuals {
            // Degenerate boxes still get a 1px mark where possible.
            let bbox = BoundingBox::new(
                record.bbox.x1,
                record.bbox.y1,
                record.bbox.x2.max(record.bbox.x1.saturating_add(1)),
                record.bbox.y2.max(record.bbox.y1.saturating_add(1)),
            );
            if let Some(clamped) = bbox.clamp_to(frame.width(), frame.height()) {
                self.outline(frame, &clamped, orientation_color(record.orientation));
            }
        }
    }

    fn outline(&self, frame: &mut Frame, bbox: &BoundingBox, color: [u8; 3]) {
        let channels = frame.channels() as usize;
        let t = self.thickness as i32;
        let (x1, y1, x2, y2) = (bbox.x1, bbox.y1, bbox.x2, bbox.y2);
        let edges = [
            (x1, y1, x2, (y1 + t).min(y2)),
            (x1, (y2 - t).max(y1), x2, y2),
            (x1, y1, (x1 + t).min(x2), y2),
            ((x2 - t).max(x1), y1, x2, y2),
        ];

        let mut pixels = frame.as_ndarray_mut();
        for (ex1, ey1, ex2, ey2) in edges {
            let mut band = pixels.slice_mut(s![ey1 as usize..ey2 as usize, ex1 as usize..ex2 as usize, ..]);
            for mut px in band.lanes_mut(ndarray::Axis(2)) {
                for c in 0..channels {
                    px[c] = color[c.min(2)];
                }
            }
        }
    }
}

impl Default for BoxAnnotator {
    fn default() -> Self {
        Self::new(2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::domain::identity_key::IdentityKey;

    fn blank(width: u32, height: u32) -> Frame {
        Frame::new(vec![255u8; (width * height * 3) as usize], width, height, 3, 1)
    }

    fn record(bbox: BoundingBox, orientation: OrientationLabel) -> IndividualRecord {
        IndividualRecord {
            frame: 1,
            identity: IdentityKey::ephemeral(1, 0),
            orientation,
            instantaneous_rate: orientation.rate(),
            smoothed_rate: orientation.rate(),
            bbox,
        }
    }

    fn pixel(frame: &Frame, x: usize, y: usize) -> [u8; 3] {
        let px = frame.as_ndarray();
        [px[[y, x, 0]], px[[y, x, 1]], px[[y, x, 2]]]
    }

    #[test]
    fn test_outline_color_follows_orientation() {
        let mut frame = blank(40, 40);
        let annotator = BoxAnnotator::new(1);
        annotator.annotate(
            &mut frame,
            &[
                record(BoundingBox::new(0, 0, 10, 10), OrientationLabel::Up),
                record(BoundingBox::new(20, 0, 30, 10), OrientationLabel::Down),
                record(BoundingBox::new(0, 20, 10, 30), OrientationLabel::Unknown),
            ],
        );
        assert_eq!(pixel(&frame, 0, 0), UP_COLOR);
        assert_eq!(pixel(&frame, 29, 9), DOWN_COLOR);
        assert_eq!(pixel(&frame, 5, 20), UNKNOWN_COLOR);
    }

    #[test]
    fn test_interior_is_untouched() {
        let mut frame = blank(40, 40);
        BoxAnnotator::new(2).annotate(
            &mut frame,
            &[record(BoundingBox::new(5, 5, 25, 25), OrientationLabel::Up)],
        );
        assert_eq!(pixel(&frame, 15, 15), [255, 255, 255]);
        assert_eq!(pixel(&frame, 6, 15), UP_COLOR);
        assert_eq!(pixel(&frame, 4, 4), [255, 255, 255]);
    }

    #[test]
    fn test_boxes_outside_frame_are_clipped() {
        let mut frame = blank(20, 20);
        BoxAnnotator::default().annotate(
            &mut frame,
            &[
                record(BoundingBox::new(-10, -10, 5, 5), OrientationLabel::Down),
                record(BoundingBox::new(100, 100, 120, 120), OrientationLabel::Up),
            ],
        );
        assert_eq!(pixel(&frame, 0, 4), DOWN_COLOR);
        assert_eq!(pixel(&frame, 19, 19), [255, 255, 255]);
    }
}
