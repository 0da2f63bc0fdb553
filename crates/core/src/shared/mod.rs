pub mod bbox;
pub mod config;
pub mod constants;
pub mod frame;
pub mod source_metadata;
