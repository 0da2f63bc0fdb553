pub mod analysis_state;
pub mod frame_result;
pub mod orientation;
pub mod region_classifier;
pub mod sliding_window;
