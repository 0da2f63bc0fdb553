pub mod onnx_blazeface_detector;
pub mod onnx_yolo_detector;
pub mod precomputed_detections;
