use crate::detection::domain::detection_parameter::DetectionParameter;
use crate::detection::domain::face_detector::{FaceDetector, FaceDetectorFactory};
use crate::shared::booth_error::BoothError;
use crate::shared::frame::Frame;
use crate::shared::region::Region;

/// The face-detection capability shared by calibration and capture.
///
/// Pairs the active detector with the parameter it was built from. A new
/// parameter only becomes active once the factory has accepted it; on
/// rejection the previous detector and parameter stay in place.
pub struct TunableDetector {
    factory: Box<dyn FaceDetectorFactory>,
    detector: Box<dyn FaceDetector>,
    parameter: DetectionParameter,
}

impl TunableDetector {
    pub fn new(
        factory: Box<dyn FaceDetectorFactory>,
        parameter: DetectionParameter,
    ) -> Result<Self, BoothError> {
        let detector = build(factory.as_ref(), parameter)?;
        Ok(Self {
            factory,
            detector,
            parameter,
        })
    }

    pub fn parameter(&self) -> DetectionParameter {
        self.parameter
    }

    /// Rebuilds the detector with `parameter`.
    pub fn retune(&mut self, parameter: DetectionParameter) -> Result<(), BoothError> {
        self.detector = build(self.factory.as_ref(), parameter)?;
        self.parameter = parameter;
        log::debug!("Detector retuned to {parameter}");
        Ok(())
    }

    pub fn detect(&mut self, frame: &Frame) -> Result<Vec<Region>, Box<dyn std::error::Error>> {
        self.detector.detect(frame)
    }

    /// Face count on `frame`, with detector failures counted as no faces.
    pub fn count_faces(&mut self, frame: &Frame) -> usize {
        match self.detector.detect(frame) {
            Ok(regions) => regions.len(),
            Err(e) => {
                log::warn!("Face detection failed on frame {}: {e}", frame.index());
                0
            }
        }
    }
}

fn build(
    factory: &dyn FaceDetectorFactory,
    parameter: DetectionParameter,
) -> Result<Box<dyn FaceDetector>, BoothError> {
    factory
        .retune(parameter)
        .map_err(|e| BoothError::DetectorRejectedParameter {
            parameter: parameter.value(),
            reason: e.to_string(),
        })
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    use super::*;

    pub fn face(x: i32) -> Region {
        Region {
            x,
            y: 0,
            width: 10,
            height: 10,
            score: 0.9,
        }
    }

    /// Replays a fixed sequence of face counts (the last one repeats),
    /// shared across every detector the factory builds.
    #[derive(Clone)]
    pub struct SequenceFactory {
        pub counts: Arc<Mutex<VecDeque<Option<usize>>>>,
        pub built_with: Arc<Mutex<Vec<f64>>>,
        pub reject_above: Option<f64>,
    }

    impl SequenceFactory {
        /// `None` entries make the detector fail on that call.
        pub fn new(counts: &[Option<usize>]) -> Self {
            Self {
                counts: Arc::new(Mutex::new(counts.iter().copied().collect())),
                built_with: Arc::new(Mutex::new(Vec::new())),
                reject_above: None,
            }
        }

        pub fn constant(count: usize) -> Self {
            Self::new(&[Some(count)])
        }
    }

    struct SequenceDetector {
        counts: Arc<Mutex<VecDeque<Option<usize>>>>,
    }

    impl FaceDetector for SequenceDetector {
        fn detect(&mut self, _frame: &Frame) -> Result<Vec<Region>, Box<dyn std::error::Error>> {
            let mut counts = self.counts.lock().unwrap();
            let next = if counts.len() > 1 {
                counts.pop_front().flatten()
            } else {
                counts.front().copied().flatten()
            };
            match next {
                Some(n) => Ok((0..n).map(|i| face(i as i32 * 20)).collect()),
                None => Err("detector failure".into()),
            }
        }
    }

    impl FaceDetectorFactory for SequenceFactory {
        fn retune(
            &self,
            parameter: DetectionParameter,
        ) -> Result<Box<dyn FaceDetector>, Box<dyn std::error::Error>> {
            if let Some(limit) = self.reject_above {
                if parameter.value() > limit {
                    return Err(format!("parameter {parameter} above {limit}").into());
                }
            }
            self.built_with.lock().unwrap().push(parameter.value());
            Ok(Box::new(SequenceDetector {
                counts: self.counts.clone(),
            }))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::SequenceFactory;
    use super::*;

    fn param(v: f64) -> DetectionParameter {
        DetectionParameter::new(v).unwrap()
    }

    fn frame() -> Frame {
        Frame::filled(4, 4, [0, 0, 0], 0)
    }

    #[test]
    fn test_new_builds_initial_detector() {
        let factory = SequenceFactory::constant(2);
        let built = factory.built_with.clone();
        let mut detector = TunableDetector::new(Box::new(factory), param(0.8)).unwrap();
        assert_eq!(*built.lock().unwrap(), vec![0.8]);
        assert_eq!(detector.count_faces(&frame()), 2);
    }

    #[test]
    fn test_retune_reconstructs_detector() {
        let factory = SequenceFactory::constant(1);
        let built = factory.built_with.clone();
        let mut detector = TunableDetector::new(Box::new(factory), param(0.8)).unwrap();
        detector.retune(param(0.5)).unwrap();
        assert_eq!(detector.parameter(), param(0.5));
        assert_eq!(built.lock().unwrap().len(), 2);
    }

    #[test]
    fn test_rejected_retune_keeps_previous_parameter() {
        let mut factory = SequenceFactory::constant(1);
        factory.reject_above = Some(1.0);
        let mut detector = TunableDetector::new(Box::new(factory), param(0.8)).unwrap();

        let result = detector.retune(param(1.5));

        assert!(matches!(
            result,
            Err(BoothError::DetectorRejectedParameter { .. })
        ));
        assert_eq!(detector.parameter(), param(0.8));
    }

    #[test]
    fn test_count_faces_treats_failure_as_zero() {
        let factory = SequenceFactory::new(&[None, Some(3)]);
        let mut detector = TunableDetector::new(Box::new(factory), param(0.8)).unwrap();
        assert_eq!(detector.count_faces(&frame()), 0);
        assert_eq!(detector.count_faces(&frame()), 3);
    }
}
