pub mod analysis_logger;
pub mod analyze_frames_use_case;
pub mod result_log;
