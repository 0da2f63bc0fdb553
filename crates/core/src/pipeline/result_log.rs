use std::path::Path;

use crate::analysis::domain::frame_result::{FrameResult, IndividualRecord};
use crate::export::document_writer::{write_json, DocumentScope};
use crate::export::export_error::ExportError;
use crate::export::tabular_writer::{write_global_csv, write_individual_csv};

/// Append-only record of a session's frame results, in analysis order.
///
/// Exports read from the log and never modify it, so a failed export leaves
/// it intact.
#[derive(Debug, Default, Clone)]
pub struct ResultLog {
    results: Vec<FrameResult>,
}

impl ResultLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, result: FrameResult) {
        self.results.push(result);
    }

    pub fn results(&self) -> &[FrameResult] {
        &self.results
    }

    pub fn latest(&self) -> Option<&FrameResult> {
        self.results.last()
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Every per-person record, frame by frame.
    pub fn individuals(&self) -> Vec<IndividualRecord> {
        self.results
            .iter()
            .flat_map(|r| r.individuals.iter().cloned())
            .collect()
    }

    pub fn export_global_csv(&self, path: &Path) -> Result<(), ExportError> {
        write_global_csv(path, &self.results)
    }

    pub fn export_individual_csv(&self, path: &Path) -> Result<(), ExportError> {
        write_individual_csv(path, &self.individuals())
    }

    pub fn export_json(&self, path: &Path, scope: DocumentScope) -> Result<(), ExportError> {
        write_json(path, &self.results, scope)
    }
}
