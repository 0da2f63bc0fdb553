/// BlazeFace (short-range) face detector using ONNX Runtime via `ort`.
///
/// Runs on a crop of one person box and returns face boxes in that crop's
/// pixels. Faces below `min_size` on either side are dropped.
use std::path::Path;

use crate::detection::domain::face_detector::FaceDetector;
use crate::shared::bbox::BoundingBox;
use crate::shared::frame::Frame;

const INPUT_SIZE: u32 = 128;
const NUM_ANCHORS: usize = 896;
/// Box deltas plus six keypoints per anchor.
const REGRESSOR_STRIDE: usize = 16;

pub const DEFAULT_FACE_CONFIDENCE: f64 = 0.5;
pub const DEFAULT_FACE_IOU: f64 = 0.3;
pub const DEFAULT_MIN_FACE_SIZE: i32 = 30;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlazefaceSettings {
    pub confidence: f64,
    pub iou: f64,
    pub min_size: i32,
}

impl Default for BlazefaceSettings {
    fn default() -> Self {
        Self {
            confidence: DEFAULT_FACE_CONFIDENCE,
            iou: DEFAULT_FACE_IOU,
            min_size: DEFAULT_MIN_FACE_SIZE,
        }
    }
}

pub struct OnnxBlazefaceDetector {
    session: ort::session::Session,
    settings: BlazefaceSettings,
    anchors: Vec<[f32; 2]>,
}

impl OnnxBlazefaceDetector {
    pub fn new(
        model_path: &Path,
        settings: BlazefaceSettings,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let session = ort::session::Session::builder()?.commit_from_file(model_path)?;
        log::info!("Loaded face detector {}", model_path.display());
        Ok(Self {
            session,
            settings,
            anchors: generate_anchors(),
        })
    }
}

impl FaceDetector for OnnxBlazefaceDetector {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<BoundingBox>, Box<dyn std::error::Error>> {
        if frame.width() == 0 || frame.height() == 0 {
            return Ok(Vec::new());
        }
        let input_value = ort::value::Tensor::from_array(preprocess(frame, INPUT_SIZE))?;
        let outputs = self.session.run(ort::inputs![input_value])?;

        // [1, 896, 16] regressors, [1, 896, 1] scores
        if outputs.len() < 2 {
            return Err(format!("BlazeFace model expected 2 outputs, got {}", outputs.len()).into());
        }
        let regressors = outputs[0].try_extract_array::<f32>()?;
        let scores = outputs[1].try_extract_array::<f32>()?;
        let regressors = regressors.as_slice().ok_or("Cannot get regressor slice")?;
        let scores = scores.as_slice().ok_or("Cannot get score slice")?;

        let mut candidates = decode(
            regressors,
            scores,
            &self.anchors,
            self.settings.confidence,
            frame.width(),
            frame.height(),
        );
        let faces = nms(&mut candidates, self.settings.iou)
            .into_iter()
            .map(|c| c.to_bbox())
            .filter(|b| b.width() >= self.settings.min_size && b.height() >= self.settings.min_size)
            .collect::<Vec<_>>();
        log::debug!("BlazeFace found {} face(s)", faces.len());
        Ok(faces)
    }
}

/// Nearest-neighbour resize to `size × size`, `[0, 1]` NCHW float32.
fn preprocess(frame: &Frame, size: u32) -> ndarray::Array4<f32> {
    let src = frame.as_ndarray();
    let (src_h, src_w) = (frame.height() as usize, frame.width() as usize);
    let s = size as usize;
    let gray = frame.channels() < 3;

    ndarray::Array4::from_shape_fn((1, 3, s, s), |(_, c, y, x)| {
        let sy = (((y as f64 + 0.5) * src_h as f64 / s as f64) as usize).min(src_h - 1);
        let sx = (((x as f64 + 0.5) * src_w as f64 / s as f64) as usize).min(src_w - 1);
        src[[sy, sx, if gray { 0 } else { c }]] as f32 / 255.0
    })
}

/// Anchor centers in unit coordinates: a 16×16 grid with 2 anchors per cell,
/// then an 8×8 grid with 6.
fn generate_anchors() -> Vec<[f32; 2]> {
    let mut anchors = Vec::with_capacity(NUM_ANCHORS);
    for (stride, per_cell) in [(8usize, 2usize), (16, 6)] {
        let grid = INPUT_SIZE as usize / stride;
        for y in 0..grid {
            for x in 0..grid {
                let center = [
                    (x as f32 + 0.5) / grid as f32,
                    (y as f32 + 0.5) / grid as f32,
                ];
                anchors.extend(std::iter::repeat(center).take(per_cell));
            }
        }
    }
    anchors
}

#[derive(Clone, Copy, Debug)]
struct Candidate {
    x1: f64,
    y1: f64,
    x2: f64,
    y2: f64,
    score: f64,
}

impl Candidate {
    fn area(&self) -> f64 {
        (self.x2 - self.x1).max(0.0) * (self.y2 - self.y1).max(0.0)
    }

    fn to_bbox(self) -> BoundingBox {
        BoundingBox::new(
            self.x1.round() as i32,
            self.y1.round() as i32,
            self.x2.round() as i32,
            self.y2.round() as i32,
        )
    }
}

/// Anchor-relative boxes above `confidence`, scaled to a `width × height`
/// image and clipped to it.
fn decode(
    regressors: &[f32],
    scores: &[f32],
    anchors: &[[f32; 2]],
    confidence: f64,
    width: u32,
    height: u32,
) -> Vec<Candidate> {
    let (w, h) = (width as f64, height as f64);
    let unit = INPUT_SIZE as f64;

    scores
        .iter()
        .zip(anchors)
        .enumerate()
        .filter_map(|(i, (&raw, anchor))| {
            let score = sigmoid(raw) as f64;
            let reg = regressors.get(i * REGRESSOR_STRIDE..i * REGRESSOR_STRIDE + 4)?;
            if score < confidence {
                return None;
            }
            let cx = anchor[0] as f64 + reg[0] as f64 / unit;
            let cy = anchor[1] as f64 + reg[1] as f64 / unit;
            let half_w = reg[2] as f64 / unit / 2.0;
            let half_h = reg[3] as f64 / unit / 2.0;
            Some(Candidate {
                x1: ((cx - half_w) * w).clamp(0.0, w),
                y1: ((cy - half_h) * h).clamp(0.0, h),
                x2: ((cx + half_w) * w).clamp(0.0, w),
                y2: ((cy + half_h) * h).clamp(0.0, h),
                score,
            })
        })
        .collect()
}

fn nms(candidates: &mut [Candidate], iou_thresh: f64) -> Vec<Candidate> {
    candidates.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    let mut keep: Vec<Candidate> = Vec::new();
    for c in candidates.iter() {
        if keep.iter().all(|k| iou(k, c) <= iou_thresh) {
            keep.push(*c);
        }
    }
    keep
}

fn iou(a: &Candidate, b: &Candidate) -> f64 {
    let overlap = Candidate {
        x1: a.x1.max(b.x1),
        y1: a.y1.max(b.y1),
        x2: a.x2.min(b.x2),
        y2: a.y2.min(b.y2),
        score: 0.0,
    };
    let inter = overlap.area();
    if inter == 0.0 {
        return 0.0;
    }
    inter / (a.area() + b.area() - inter)
}

fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn candidate(x1: f64, y1: f64, x2: f64, y2: f64, score: f64) -> Candidate {
        Candidate { x1, y1, x2, y2, score }
    }

    // ── Preprocessing ────────────────────────────────────────────────

    #[test]
    fn test_preprocess_resizes_to_input() {
        let frame = Frame::new(vec![255u8; 40 * 70 * 3], 40, 70, 3, 0);
        let tensor = preprocess(&frame, INPUT_SIZE);
        assert_eq!(tensor.shape(), &[1, 3, 128, 128]);
        assert_relative_eq!(tensor[[0, 2, 127, 127]], 1.0);
    }

    #[test]
    fn test_anchor_layout() {
        let anchors = generate_anchors();
        assert_eq!(anchors.len(), NUM_ANCHORS);
        assert_relative_eq!(anchors[0][0], 0.5 / 16.0);
        assert_eq!(anchors[0], anchors[1]);
        assert_relative_eq!(anchors[512][0], 0.5 / 8.0);
    }

    // ── Decoding ─────────────────────────────────────────────────────

    #[test]
    fn test_decode_scales_to_image() {
        let mut regressors = vec![0.0f32; 2 * REGRESSOR_STRIDE];
        regressors[2] = 64.0;
        regressors[3] = 64.0;
        let scores = [5.0f32, -5.0];
        let anchors = [[0.5f32, 0.5], [0.2, 0.2]];

        let found = decode(&regressors, &scores, &anchors, 0.5, 100, 200);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].to_bbox(), BoundingBox::new(25, 50, 75, 150));
    }

    #[test]
    fn test_decode_clips_to_image() {
        let mut regressors = vec![0.0f32; REGRESSOR_STRIDE];
        regressors[2] = 256.0;
        regressors[3] = 256.0;
        let found = decode(&regressors, &[5.0], &[[0.5, 0.5]], 0.5, 60, 60);
        assert_eq!(found[0].to_bbox(), BoundingBox::new(0, 0, 60, 60));
    }

    #[test]
    fn test_decode_ignores_truncated_regressors() {
        let found = decode(&[0.0; 3], &[5.0], &[[0.5, 0.5]], 0.5, 10, 10);
        assert!(found.is_empty());
    }

    // ── NMS ──────────────────────────────────────────────────────────

    #[test]
    fn test_nms_keeps_best_of_overlapping() {
        let mut faces = vec![
            candidate(5.0, 5.0, 105.0, 105.0, 0.7),
            candidate(0.0, 0.0, 100.0, 100.0, 0.9),
            candidate(200.0, 200.0, 250.0, 250.0, 0.8),
        ];
        let kept = nms(&mut faces, 0.3);
        assert_eq!(kept.len(), 2);
        assert_relative_eq!(kept[0].score, 0.9);
        assert_relative_eq!(kept[1].score, 0.8);
    }

    #[test]
    fn test_sigmoid() {
        assert_relative_eq!(sigmoid(0.0), 0.5);
        assert!(sigmoid(10.0) > 0.999);
        assert!(sigmoid(-10.0) < 0.001);
    }
}
