use serde::{Deserialize, Serialize};

use crate::shared::bbox::BoundingBox;

/// One box from the upstream object detector.
///
/// `class_id` is the canonical class identifier; `class_name` is display
/// only and never consulted when filtering for persons.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    #[serde(rename = "xyxy")]
    pub bbox: BoundingBox,
    #[serde(rename = "conf", default = "full_confidence")]
    pub confidence: f64,
    #[serde(rename = "cls")]
    pub class_id: u32,
    #[serde(rename = "name", default, skip_serializing_if = "Option::is_none")]
    pub class_name: Option<String>,
}

fn full_confidence() -> f64 {
    1.0
}

impl Detection {
    pub fn new(bbox: BoundingBox, confidence: f64, class_id: u32) -> Self {
        Self {
            bbox,
            confidence,
            class_id,
            class_name: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.class_name = Some(name.into());
        self
    }
}

/// Detections of class `person_class_id`, in their original order.
pub fn filter_persons(detections: &[Detection], person_class_id: u32) -> Vec<&Detection> {
    detections
        .iter()
        .filter(|d| d.class_id == person_class_id)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn det(class_id: u32, x1: i32) -> Detection {
        Detection::new(BoundingBox::new(x1, 0, x1 + 10, 20), 0.9, class_id)
    }

    #[test]
    fn test_filter_keeps_order_of_persons() {
        let detections = vec![det(0, 1), det(56, 2), det(0, 3), det(0, 4)];
        let persons = filter_persons(&detections, 0);
        let xs: Vec<i32> = persons.iter().map(|d| d.bbox.x1).collect();
        assert_eq!(xs, vec![1, 3, 4]);
    }

    #[test]
    fn test_filter_ignores_class_name() {
        let detections = vec![det(3, 0).with_name("person")];
        assert!(filter_persons(&detections, 0).is_empty());
    }

    #[test]
    fn test_filter_empty() {
        assert!(filter_persons(&[], 0).is_empty());
    }

    #[test]
    fn test_deserializes_detector_layout() {
        let json = r#"{"xyxy": [1, 2, 30, 40], "conf": 0.8, "cls": 0, "name": "person"}"#;
        let d: Detection = serde_json::from_str(json).unwrap();
        assert_eq!(d.bbox, BoundingBox::new(1, 2, 30, 40));
        assert_eq!(d.class_id, 0);
        assert_eq!(d.class_name.as_deref(), Some("person"));
    }

    #[test]
    fn test_confidence_defaults_to_one() {
        let d: Detection = serde_json::from_str(r#"{"xyxy": [0, 0, 1, 1], "cls": 2}"#).unwrap();
        assert_eq!(d.confidence, 1.0);
        assert!(d.class_name.is_none());
    }
}
