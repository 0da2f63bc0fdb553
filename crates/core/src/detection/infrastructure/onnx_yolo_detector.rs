/// YOLOv8 person detector using ONNX Runtime via `ort`.
///
/// Handles letterbox preprocessing, inference, and class-aware NMS. Boxes are
/// mapped back to frame pixels and returned in descending confidence order,
/// which is stable for identical input.
use std::path::Path;

use crate::detection::domain::detection::Detection;
use crate::detection::domain::person_detector::PersonDetector;
use crate::shared::bbox::BoundingBox;
use crate::shared::constants::PERSON_CLASS_ID;
use crate::shared::frame::Frame;

/// Fallback model input resolution when the model doesn't specify dimensions.
const DEFAULT_INPUT_SIZE: u32 = 640;

pub const DEFAULT_CONFIDENCE: f64 = 0.25;
pub const DEFAULT_IOU: f64 = 0.45;
pub const DEFAULT_MAX_DET: usize = 1000;

/// Post-processing knobs for [`OnnxYoloPersonDetector`].
#[derive(Debug, Clone, PartialEq)]
pub struct YoloSettings {
    pub confidence: f64,
    pub iou: f64,
    pub max_det: usize,
    /// Class ids to keep; `None` keeps every class.
    pub classes: Option<Vec<u32>>,
}

impl Default for YoloSettings {
    fn default() -> Self {
        Self {
            confidence: DEFAULT_CONFIDENCE,
            iou: DEFAULT_IOU,
            max_det: DEFAULT_MAX_DET,
            classes: Some(vec![PERSON_CLASS_ID]),
        }
    }
}

pub struct OnnxYoloPersonDetector {
    session: ort::session::Session,
    settings: YoloSettings,
    input_size: u32,
}

impl OnnxYoloPersonDetector {
    /// Load a YOLOv8 ONNX model.
    ///
    /// The input resolution is read from the model's NCHW input shape, falling
    /// back to 640 if the shape is dynamic.
    pub fn new(model_path: &Path, settings: YoloSettings) -> Result<Self, Box<dyn std::error::Error>> {
        let session = ort::session::Session::builder()?
            .with_execution_providers(platform_execution_providers())?
            .commit_from_file(model_path)?;

        let input_size = session
            .inputs()
            .first()
            .and_then(|input| match input.dtype() {
                ort::value::ValueType::Tensor { shape, .. } if shape.len() >= 4 && shape[2] > 0 => {
                    Some(shape[2] as u32)
                }
                _ => None,
            })
            .unwrap_or(DEFAULT_INPUT_SIZE);

        log::info!(
            "Loaded person detector {} (input {input_size}px, {})",
            model_path.display(),
            PLATFORM_ACCELERATOR
        );
        Ok(Self {
            session,
            settings,
            input_size,
        })
    }
}

impl PersonDetector for OnnxYoloPersonDetector {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<Detection>, Box<dyn std::error::Error>> {
        let (input_tensor, geometry) = letterbox(frame, self.input_size);

        let input_value = ort::value::Tensor::from_array(input_tensor)?;
        let outputs = self.session.run(ort::inputs![input_value])?;
        if outputs.len() == 0 {
            return Err("YOLO model produced no outputs".into());
        }
        let tensor = outputs[0].try_extract_array::<f32>()?;
        let shape = tensor.shape().to_vec();
        let data = tensor.as_slice().ok_or("Cannot get tensor slice")?;

        let mut candidates = parse_output(data, &shape, &self.settings, &geometry)?;
        let kept = nms(&mut candidates, self.settings.iou, self.settings.max_det);

        Ok(kept
            .into_iter()
            .filter_map(|d| d.into_detection(frame.width(), frame.height()))
            .collect())
    }
}

#[cfg(target_os = "macos")]
const PLATFORM_ACCELERATOR: &str = "CoreML";
#[cfg(target_os = "windows")]
const PLATFORM_ACCELERATOR: &str = "DirectML";
#[cfg(not(any(target_os = "macos", target_os = "windows")))]
const PLATFORM_ACCELERATOR: &str = "CPU";

/// CoreML on macOS, DirectML on Windows; ort falls back to CPU when the
/// provider is unavailable.
fn platform_execution_providers() -> Vec<ort::execution_providers::ExecutionProviderDispatch> {
    #[cfg(target_os = "macos")]
    {
        vec![ort::execution_providers::CoreMLExecutionProvider::default().build()]
    }
    #[cfg(target_os = "windows")]
    {
        vec![ort::execution_providers::DirectMLExecutionProvider::default().build()]
    }
    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    {
        Vec::new()
    }
}

// ---------------------------------------------------------------------------
// Preprocessing
// ---------------------------------------------------------------------------

/// Letterbox scale and padding, used to map boxes back to the frame.
#[derive(Debug, Clone, Copy)]
struct LetterboxGeometry {
    scale: f64,
    pad_x: u32,
    pad_y: u32,
}

/// Letterbox-resize a frame to `target_size` × `target_size`, NCHW float32.
fn letterbox(frame: &Frame, target_size: u32) -> (ndarray::Array4<f32>, LetterboxGeometry) {
    let fw = frame.width() as f64;
    let fh = frame.height() as f64;
    let target = target_size as f64;

    let scale = (target / fw).min(target / fh);
    let new_w = ((fw * scale).round() as u32).min(target_size);
    let new_h = ((fh * scale).round() as u32).min(target_size);
    let pad_x = (target_size - new_w) / 2;
    let pad_y = (target_size - new_h) / 2;

    // 114 gray padding
    let gray = 114.0f32 / 255.0;
    let mut tensor =
        ndarray::Array4::<f32>::from_elem((1, 3, target_size as usize, target_size as usize), gray);

    let src = frame.as_ndarray();
    let src_h = frame.height() as usize;
    let src_w = frame.width() as usize;
    let last_channel = frame.channels() as usize - 1;

    for y in 0..new_h as usize {
        let src_y = ((y as f64 / scale) as usize).min(src_h - 1);
        for x in 0..new_w as usize {
            let src_x = ((x as f64 / scale) as usize).min(src_w - 1);
            let ty = pad_y as usize + y;
            let tx = pad_x as usize + x;
            for c in 0..3 {
                tensor[[0, c, ty, tx]] = src[[src_y, src_x, c.min(last_channel)]] as f32 / 255.0;
            }
        }
    }

    (
        tensor,
        LetterboxGeometry {
            scale,
            pad_x,
            pad_y,
        },
    )
}

// ---------------------------------------------------------------------------
// Post-processing
// ---------------------------------------------------------------------------

#[derive(Clone, Debug)]
struct RawDetection {
    x1: f64,
    y1: f64,
    x2: f64,
    y2: f64,
    confidence: f64,
    class_id: u32,
}

impl RawDetection {
    fn xyxy(&self) -> [f64; 4] {
        [self.x1, self.y1, self.x2, self.y2]
    }

    /// Rounds to pixels and clamps to the frame; `None` if nothing remains.
    fn into_detection(self, width: u32, height: u32) -> Option<Detection> {
        let bbox = BoundingBox::new(
            self.x1.round() as i32,
            self.y1.round() as i32,
            self.x2.round() as i32,
            self.y2.round() as i32,
        )
        .clamp_to(width, height)?;
        let detection = Detection::new(bbox, self.confidence, self.class_id);
        Some(if self.class_id == PERSON_CLASS_ID {
            detection.with_name("person")
        } else {
            detection
        })
    }
}

/// Decodes a YOLOv8 head of shape `[1, 4 + nc, N]`, channels first.
///
/// Each candidate takes its best-scoring class. Candidates below the
/// confidence threshold or outside the class whitelist are dropped.
fn parse_output(
    data: &[f32],
    shape: &[usize],
    settings: &YoloSettings,
    geometry: &LetterboxGeometry,
) -> Result<Vec<RawDetection>, Box<dyn std::error::Error>> {
    if shape.len() != 3 || shape[0] != 1 {
        return Err(format!("Unexpected YOLO output shape: {shape:?}").into());
    }
    let (num_feats, num_dets) = (shape[1], shape[2]);
    if num_feats < 5 {
        return Err(format!("YOLO output has no class scores: {shape:?}").into());
    }
    if data.len() < num_dets * num_feats {
        return Err("YOLO output is shorter than its shape".into());
    }

    let value = |det: usize, feat: usize| data[feat * num_dets + det] as f64;

    let mut candidates = Vec::new();
    for i in 0..num_dets {
        let (class_id, confidence) = (4..num_feats)
            .map(|f| ((f - 4) as u32, value(i, f)))
            .fold((0u32, f64::NEG_INFINITY), |best, cur| {
                if cur.1 > best.1 {
                    cur
                } else {
                    best
                }
            });

        if confidence < settings.confidence {
            continue;
        }
        if let Some(classes) = &settings.classes {
            if !classes.contains(&class_id) {
                continue;
            }
        }

        let (cx, cy, w, h) = (value(i, 0), value(i, 1), value(i, 2), value(i, 3));
        let unpad_x = |x: f64| (x - geometry.pad_x as f64) / geometry.scale;
        let unpad_y = |y: f64| (y - geometry.pad_y as f64) / geometry.scale;

        candidates.push(RawDetection {
            x1: unpad_x(cx - w / 2.0),
            y1: unpad_y(cy - h / 2.0),
            x2: unpad_x(cx + w / 2.0),
            y2: unpad_y(cy + h / 2.0),
            confidence,
            class_id,
        });
    }
    Ok(candidates)
}

/// Greedy class-aware NMS: boxes only suppress boxes of the same class.
fn nms(dets: &mut [RawDetection], iou_thresh: f64, max_det: usize) -> Vec<RawDetection> {
    dets.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut keep = Vec::new();
    let mut suppressed = vec![false; dets.len()];

    for i in 0..dets.len() {
        if keep.len() >= max_det {
            break;
        }
        if suppressed[i] {
            continue;
        }
        keep.push(dets[i].clone());
        for j in (i + 1)..dets.len() {
            if suppressed[j] || dets[j].class_id != dets[i].class_id {
                continue;
            }
            if bbox_iou(&dets[i].xyxy(), &dets[j].xyxy()) > iou_thresh {
                suppressed[j] = true;
            }
        }
    }
    keep
}

fn bbox_iou(a: &[f64; 4], b: &[f64; 4]) -> f64 {
    let x1 = a[0].max(b[0]);
    let y1 = a[1].max(b[1]);
    let x2 = a[2].min(b[2]);
    let y2 = a[3].min(b[3]);

    let inter = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
    if inter == 0.0 {
        return 0.0;
    }
    let area_a = (a[2] - a[0]) * (a[3] - a[1]);
    let area_b = (b[2] - b[0]) * (b[3] - b[1]);
    inter / (area_a + area_b - inter)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const IDENTITY: LetterboxGeometry = LetterboxGeometry {
        scale: 1.0,
        pad_x: 0,
        pad_y: 0,
    };

    fn raw(x1: f64, conf: f64, class_id: u32) -> RawDetection {
        RawDetection {
            x1,
            y1: 0.0,
            x2: x1 + 100.0,
            y2: 100.0,
            confidence: conf,
            class_id,
        }
    }

    /// Builds a `[1, 4 + nc, N]` tensor from per-candidate rows.
    fn channels_first(rows: &[Vec<f32>]) -> (Vec<f32>, Vec<usize>) {
        let n = rows.len();
        let feats = rows[0].len();
        let mut data = vec![0.0; n * feats];
        for (i, row) in rows.iter().enumerate() {
            for (f, v) in row.iter().enumerate() {
                data[f * n + i] = *v;
            }
        }
        (data, vec![1, feats, n])
    }

    // ── Letterbox ────────────────────────────────────────────────────

    #[test]
    fn test_letterbox_preserves_aspect_ratio() {
        let frame = Frame::new(vec![128u8; 200 * 100 * 3], 200, 100, 3, 0);
        let (tensor, geometry) = letterbox(&frame, 640);

        assert_eq!(tensor.shape(), &[1, 3, 640, 640]);
        assert_relative_eq!(geometry.scale, 3.2, epsilon = 0.01);
        assert_eq!(geometry.pad_x, 0);
        assert_eq!(geometry.pad_y, 160);
    }

    #[test]
    fn test_letterbox_values_normalized() {
        let frame = Frame::new(vec![255u8; 100 * 50 * 3], 100, 50, 3, 0);
        let (tensor, geometry) = letterbox(&frame, 640);

        let y = geometry.pad_y as usize + 1;
        assert_relative_eq!(tensor[[0, 0, y, 1]], 1.0, epsilon = 0.01);
        assert_relative_eq!(tensor[[0, 0, 0, 0]], 114.0 / 255.0, epsilon = 0.01);
    }

    // ── Output parsing ───────────────────────────────────────────────

    #[test]
    fn test_parse_picks_best_class_and_filters() {
        // cx, cy, w, h, person, chair
        let (data, shape) = channels_first(&[
            vec![50.0, 50.0, 20.0, 40.0, 0.9, 0.1],
            vec![150.0, 50.0, 20.0, 40.0, 0.2, 0.8],
            vec![250.0, 50.0, 20.0, 40.0, 0.1, 0.1],
        ]);
        let settings = YoloSettings::default();
        let dets = parse_output(&data, &shape, &settings, &IDENTITY).unwrap();

        assert_eq!(dets.len(), 1);
        assert_eq!(dets[0].class_id, 0);
        assert_relative_eq!(dets[0].x1, 40.0, epsilon = 1e-6);
        assert_relative_eq!(dets[0].y1, 30.0, epsilon = 1e-6);
        assert_relative_eq!(dets[0].x2, 60.0, epsilon = 1e-6);
        assert_relative_eq!(dets[0].y2, 70.0, epsilon = 1e-6);
    }

    #[test]
    fn test_parse_all_classes_keeps_non_person() {
        let (data, shape) = channels_first(&[
            vec![50.0, 50.0, 20.0, 40.0, 0.9, 0.1],
            vec![150.0, 50.0, 20.0, 40.0, 0.2, 0.8],
        ]);
        let settings = YoloSettings {
            classes: None,
            ..Default::default()
        };
        let dets = parse_output(&data, &shape, &settings, &IDENTITY).unwrap();
        let classes: Vec<u32> = dets.iter().map(|d| d.class_id).collect();
        assert_eq!(classes, vec![0, 1]);
    }

    #[test]
    fn test_parse_undoes_letterbox() {
        let (data, shape) = channels_first(&[vec![320.0, 320.0, 64.0, 64.0, 0.9]]);
        let geometry = LetterboxGeometry {
            scale: 3.2,
            pad_x: 0,
            pad_y: 160,
        };
        let dets = parse_output(&data, &shape, &YoloSettings::default(), &geometry).unwrap();
        assert_relative_eq!(dets[0].x1, 90.0, epsilon = 1e-6);
        assert_relative_eq!(dets[0].y1, 40.0, epsilon = 1e-6);
    }

    #[test]
    fn test_parse_rejects_bad_shape() {
        let result = parse_output(&[0.0; 4], &[4], &YoloSettings::default(), &IDENTITY);
        assert!(result.is_err());
    }

    // ── NMS ──────────────────────────────────────────────────────────

    #[test]
    fn test_nms_suppresses_overlapping_same_class() {
        let mut dets = vec![raw(0.0, 0.8, 0), raw(5.0, 0.9, 0)];
        let kept = nms(&mut dets, 0.45, DEFAULT_MAX_DET);
        assert_eq!(kept.len(), 1);
        assert_relative_eq!(kept[0].confidence, 0.9);
    }

    #[test]
    fn test_nms_is_class_aware() {
        let mut dets = vec![raw(0.0, 0.9, 0), raw(5.0, 0.8, 56)];
        assert_eq!(nms(&mut dets, 0.45, DEFAULT_MAX_DET).len(), 2);
    }

    #[test]
    fn test_nms_caps_at_max_det() {
        let mut dets = vec![raw(0.0, 0.9, 0), raw(500.0, 0.8, 0), raw(1000.0, 0.7, 0)];
        let kept = nms(&mut dets, 0.45, 2);
        assert_eq!(kept.len(), 2);
        assert_relative_eq!(kept[1].confidence, 0.8);
    }

    #[test]
    fn test_into_detection_clamps_and_names_persons() {
        let det = RawDetection {
            x1: -5.4,
            y1: 10.6,
            x2: 250.0,
            y2: 90.0,
            confidence: 0.7,
            class_id: 0,
        }
        .into_detection(200, 100)
        .unwrap();
        assert_eq!(det.bbox, BoundingBox::new(0, 11, 200, 90));
        assert_eq!(det.class_name.as_deref(), Some("person"));
    }

    #[test]
    fn test_into_detection_outside_frame_is_dropped() {
        let det = RawDetection {
            x1: 300.0,
            y1: 0.0,
            x2: 400.0,
            y2: 50.0,
            confidence: 0.7,
            class_id: 0,
        };
        assert!(det.into_detection(200, 100).is_none());
    }

    #[test]
    fn test_bbox_iou_perfect_and_disjoint() {
        let b = [0.0, 0.0, 10.0, 10.0];
        assert_relative_eq!(bbox_iou(&b, &b), 1.0);
        assert_eq!(bbox_iou(&b, &[20.0, 20.0, 30.0, 30.0]), 0.0);
    }
}
