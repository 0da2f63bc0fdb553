pub mod domain;
pub mod frame_aggregator;
