pub mod document_writer;
pub mod export_error;
pub mod tabular_writer;
