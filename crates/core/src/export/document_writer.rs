use std::fs;
use std::path::Path;

use serde::Serialize;

use crate::export::export_error::{ensure_parent_dir, ExportError};

/// Which part of a result log a JSON export covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentScope {
    /// Every record, as a JSON array.
    FullLog,
    /// Only the most recent record, as a single JSON object.
    LatestRecord,
}

/// Writes `records` as pretty-printed JSON, scoped by `scope`.
///
/// Non-ASCII identity names are written as-is.
pub fn write_json<T: Serialize>(
    path: &Path,
    records: &[T],
    scope: DocumentScope,
) -> Result<(), ExportError> {
    let json = match scope {
        DocumentScope::FullLog => serde_json::to_string_pretty(records),
        DocumentScope::LatestRecord => {
            let latest = records.last().ok_or(ExportError::EmptyLog)?;
            serde_json::to_string_pretty(latest)
        }
    }
    .map_err(|source| ExportError::Json {
        path: path.to_path_buf(),
        source,
    })?;

    ensure_parent_dir(path)?;
    fs::write(path, json).map_err(|source| ExportError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    log::debug!("Wrote JSON {} ({scope:?})", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::domain::frame_result::{FrameResult, IndividualRecord};
    use crate::analysis::domain::orientation::OrientationLabel;
    use crate::identity::domain::identity_key::IdentityKey;
    use crate::shared::bbox::BoundingBox;

    fn individual(frame: usize) -> IndividualRecord {
        IndividualRecord {
            frame,
            identity: IdentityKey::resolved("李雷").unwrap(),
            orientation: OrientationLabel::Up,
            instantaneous_rate: Some(1.0),
            smoothed_rate: Some(0.8),
            bbox: BoundingBox::new(1, 2, 3, 4),
        }
    }

    fn result(frame: usize) -> FrameResult {
        FrameResult {
            frame,
            persons: 1,
            head_up: 1,
            head_down: 0,
            head_up_rate: 1.0,
            head_up_rate_smooth: 0.9,
            individuals: vec![individual(frame)],
            identities_count: 1,
        }
    }

    fn read(path: &Path) -> serde_json::Value {
        serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
    }

    #[test]
    fn test_full_log_is_array_of_frame_results() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("log.json");
        write_json(&path, &[result(1), result(2)], DocumentScope::FullLog).unwrap();

        let value = read(&path);
        let frames = value.as_array().unwrap();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[1]["frame"], 2);
        for field in [
            "frame",
            "persons",
            "head_up",
            "head_down",
            "head_up_rate",
            "head_up_rate_smooth",
            "individuals",
            "identities_count",
        ] {
            assert!(frames[0].get(field).is_some(), "missing {field}");
        }
    }

    #[test]
    fn test_latest_record_is_single_object() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("latest.json");
        write_json(&path, &[result(1), result(7)], DocumentScope::LatestRecord).unwrap();

        let value = read(&path);
        assert!(value.is_object());
        assert_eq!(value["frame"], 7);
    }

    #[test]
    fn test_individual_record_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("person.json");
        write_json(&path, &[individual(3)], DocumentScope::LatestRecord).unwrap();

        let value = read(&path);
        assert_eq!(value["frame"], 3);
        assert_eq!(value["id"], "李雷");
        assert_eq!(value["head"], "up");
        assert_eq!(value["head_up_rate"], 1.0);
        assert_eq!(value["head_up_rate_smooth"], 0.8);
        assert_eq!(value["xyxy"], serde_json::json!([1, 2, 3, 4]));
    }

    #[test]
    fn test_non_ascii_is_not_escaped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("person.json");
        write_json(&path, &[individual(1)], DocumentScope::FullLog).unwrap();
        assert!(fs::read_to_string(&path).unwrap().contains("李雷"));
    }

    #[test]
    fn test_latest_of_empty_log_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("latest.json");
        let empty: [FrameResult; 0] = [];
        let result = write_json(&path, &empty, DocumentScope::LatestRecord);
        assert!(matches!(result, Err(ExportError::EmptyLog)));
        assert!(!path.exists());
    }

    #[test]
    fn test_full_log_of_empty_log_is_empty_array() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sub").join("log.json");
        let empty: [FrameResult; 0] = [];
        write_json(&path, &empty, DocumentScope::FullLog).unwrap();
        assert_eq!(read(&path), serde_json::json!([]));
    }
}
