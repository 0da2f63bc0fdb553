/// COCO class id the stock YOLO detectors assign to "person".
pub const PERSON_CLASS_ID: u32 = 0;

/// Sentinel a face identifier uses for "no confident match".
pub const UNKNOWN_IDENTITY: &str = "Unknown";

pub const DEFAULT_WINDOW_SIZE: usize = 15;
pub const DEFAULT_HEAD_REGION_RATIO: f64 = 0.2;
pub const DEFAULT_BRIGHTNESS_THRESHOLD: f64 = 0.35;
pub const DEFAULT_UNKNOWN_THRESHOLD: f64 = 60.0;

pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "tiff", "tif", "webp"];

/// Container extensions handed to the video reader.
pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "avi", "mov", "mkv", "webm", "m4v", "wmv", "flv"];

/// Column order of the global tabular export.
pub const GLOBAL_CSV_COLUMNS: &[&str] = &[
    "frame",
    "persons",
    "head_up",
    "head_down",
    "head_up_rate",
    "head_up_rate_smooth",
];

/// Column order of the per-identity tabular export.
pub const INDIVIDUAL_CSV_COLUMNS: &[&str] =
    &["frame", "id", "head", "head_up_rate", "head_up_rate_smooth"];
