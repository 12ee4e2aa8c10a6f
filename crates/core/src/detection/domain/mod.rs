pub mod detection_parameter;
pub mod face_detector;
pub mod tunable_detector;
