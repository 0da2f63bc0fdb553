pub mod detection;
pub mod face_detector;
pub mod person_detector;
