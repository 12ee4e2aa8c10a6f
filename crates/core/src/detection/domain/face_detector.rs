use crate::detection::domain::detection_parameter::DetectionParameter;
use crate::shared::frame::Frame;
use crate::shared::region::Region;

/// Domain interface for face detection.
///
/// The face count of a frame is the number of returned regions. A detector
/// is immutable with respect to its sensitivity; see [`FaceDetectorFactory`].
pub trait FaceDetector: Send {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<Region>, Box<dyn std::error::Error>>;
}

/// Builds detectors for a given sensitivity.
///
/// Reconstruction through `retune` is the only way to change the parameter of
/// a running detector. Implementations reject parameters outside their
/// acceptable domain with an error.
pub trait FaceDetectorFactory: Send {
    fn retune(
        &self,
        parameter: DetectionParameter,
    ) -> Result<Box<dyn FaceDetector>, Box<dyn std::error::Error>>;
}
