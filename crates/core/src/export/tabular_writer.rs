use std::path::Path;

use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::analysis::domain::frame_result::{FrameResult, IndividualRecord};
use crate::export::export_error::{ensure_parent_dir, ExportError};
use crate::shared::constants::{GLOBAL_CSV_COLUMNS, INDIVIDUAL_CSV_COLUMNS};

/// One line of the global CSV. Field order is the column order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlobalRow {
    pub frame: usize,
    pub persons: usize,
    pub head_up: usize,
    pub head_down: usize,
    pub head_up_rate: f64,
    pub head_up_rate_smooth: f64,
}

impl From<&FrameResult> for GlobalRow {
    fn from(r: &FrameResult) -> Self {
        Self {
            frame: r.frame,
            persons: r.persons,
            head_up: r.head_up,
            head_down: r.head_down,
            head_up_rate: r.head_up_rate,
            head_up_rate_smooth: r.head_up_rate_smooth,
        }
    }
}

/// One line of the per-identity CSV. Rates of unmeasured heads are empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndividualRow {
    pub frame: usize,
    pub id: String,
    pub head: String,
    pub head_up_rate: Option<f64>,
    pub head_up_rate_smooth: Option<f64>,
}

impl From<&IndividualRecord> for IndividualRow {
    fn from(r: &IndividualRecord) -> Self {
        Self {
            frame: r.frame,
            id: r.identity.to_string(),
            head: r.orientation.to_string(),
            head_up_rate: r.instantaneous_rate,
            head_up_rate_smooth: r.smoothed_rate,
        }
    }
}

/// Writes `frame, persons, head_up, head_down, head_up_rate, head_up_rate_smooth`.
pub fn write_global_csv(path: &Path, results: &[FrameResult]) -> Result<(), ExportError> {
    write_rows(path, GLOBAL_CSV_COLUMNS, results.iter().map(GlobalRow::from))
}

/// Writes `frame, id, head, head_up_rate, head_up_rate_smooth`.
pub fn write_individual_csv(path: &Path, records: &[IndividualRecord]) -> Result<(), ExportError> {
    write_rows(
        path,
        INDIVIDUAL_CSV_COLUMNS,
        records.iter().map(IndividualRow::from),
    )
}

pub fn read_global_csv(path: &Path) -> Result<Vec<GlobalRow>, ExportError> {
    read_rows(path)
}

pub fn read_individual_csv(path: &Path) -> Result<Vec<IndividualRow>, ExportError> {
    read_rows(path)
}

/// Header is written explicitly so an empty log still yields a valid table.
fn write_rows<R: Serialize>(
    path: &Path,
    columns: &[&str],
    rows: impl Iterator<Item = R>,
) -> Result<(), ExportError> {
    ensure_parent_dir(path)?;
    let csv_err = |source| ExportError::Csv {
        path: path.to_path_buf(),
        source,
    };

    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)
        .map_err(csv_err)?;
    writer.write_record(columns).map_err(csv_err)?;
    for row in rows {
        writer.serialize(row).map_err(csv_err)?;
    }
    writer.flush().map_err(|source| ExportError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    log::debug!("Wrote CSV {}", path.display());
    Ok(())
}

fn read_rows<R: DeserializeOwned>(path: &Path) -> Result<Vec<R>, ExportError> {
    let csv_err = |source| ExportError::Csv {
        path: path.to_path_buf(),
        source,
    };
    let mut reader = csv::Reader::from_path(path).map_err(csv_err)?;
    reader
        .deserialize()
        .collect::<Result<Vec<R>, _>>()
        .map_err(csv_err)
}
