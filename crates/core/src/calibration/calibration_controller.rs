use std::cmp::Ordering;

use crate::config::domain::booth_config::KEY_FACE_DETECTION_COEFF;
use crate::config::domain::config_store::ConfigStore;
use crate::detection::domain::detection_parameter::DetectionParameter;
use crate::detection::domain::tunable_detector::TunableDetector;
use crate::shared::booth_error::BoothError;
use crate::shared::constants::CALIBRATION_SECONDS;
use crate::shared::frame::Frame;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CalibrationState {
    Idle,
    Calibrating {
        expected_faces: usize,
        comparisons_made: usize,
    },
}

/// What a single calibration frame did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CalibrationStep {
    /// No session is running; the frame was not looked at.
    Ignored,
    /// No usable detection on this frame; parameter untouched.
    Skipped { comparisons_made: usize },
    /// Observed count matched the expectation; parameter untouched.
    Held {
        comparisons_made: usize,
        parameter: DetectionParameter,
    },
    /// Parameter moved one step and the detector was rebuilt.
    Adjusted {
        comparisons_made: usize,
        observed_faces: usize,
        parameter: DetectionParameter,
    },
    /// Comparison budget exhausted: parameter persisted, session over.
    Completed { parameter: DetectionParameter },
}

/// Tunes the shared detector's sensitivity until its face count on live
/// frames matches the number of people the operator says are in view.
///
/// Each mismatching frame moves the parameter by a constant 10% step: down
/// when too few faces are found, up when too many. The session runs for a
/// fixed number of frames and keeps whatever value it last reached.
pub struct CalibrationController {
    comparison_limit: usize,
    state: CalibrationState,
}

impl CalibrationController {
    pub fn new(comparison_limit: usize) -> Result<Self, BoothError> {
        if comparison_limit == 0 {
            return Err(BoothError::InvalidInput(
                "comparison limit must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            comparison_limit,
            state: CalibrationState::Idle,
        })
    }

    /// Budget of [`CALIBRATION_SECONDS`] worth of frames at `fps`.
    pub fn for_frame_rate(fps: f64) -> Result<Self, BoothError> {
        if !fps.is_finite() || fps <= 0.0 {
            return Err(BoothError::InvalidInput(format!(
                "frame rate must be positive, got {fps}"
            )));
        }
        let limit = (fps.ceil() as usize)
            .checked_mul(CALIBRATION_SECONDS)
            .ok_or_else(|| BoothError::InvalidInput(format!("frame rate {fps} is too high")))?;
        Self::new(limit)
    }

    pub fn comparison_limit(&self) -> usize {
        self.comparison_limit
    }

    pub fn is_calibrating(&self) -> bool {
        matches!(self.state, CalibrationState::Calibrating { .. })
    }

    pub fn comparisons_made(&self) -> usize {
        match self.state {
            CalibrationState::Calibrating {
                comparisons_made, ..
            } => comparisons_made,
            CalibrationState::Idle => 0,
        }
    }

    /// Starts (or restarts) a session for `expected_faces` people.
    pub fn begin(&mut self, expected_faces: usize) -> Result<(), BoothError> {
        if expected_faces == 0 {
            return Err(BoothError::InvalidInput(
                "expected face count must be at least 1".to_string(),
            ));
        }
        self.state = CalibrationState::Calibrating {
            expected_faces,
            comparisons_made: 0,
        };
        log::info!(
            "Calibrating for {expected_faces} face(s) over {} frames",
            self.comparison_limit
        );
        Ok(())
    }

    /// Ends the session without persisting anything.
    pub fn abort(&mut self) {
        if self.is_calibrating() {
            log::info!("Calibration aborted");
        }
        self.state = CalibrationState::Idle;
    }

    /// Processes one live frame.
    ///
    /// A frame past the comparison budget is not sampled: it only triggers
    /// persisting the current parameter under `face_detection_coeff`.
    pub fn on_frame(
        &mut self,
        frame: &Frame,
        detector: &mut TunableDetector,
        config: &mut dyn ConfigStore,
    ) -> Result<CalibrationStep, BoothError> {
        let CalibrationState::Calibrating {
            expected_faces,
            comparisons_made,
        } = self.state
        else {
            return Ok(CalibrationStep::Ignored);
        };

        let comparisons_made = comparisons_made + 1;
        self.state = CalibrationState::Calibrating {
            expected_faces,
            comparisons_made,
        };

        if comparisons_made > self.comparison_limit {
            return self.complete(detector.parameter(), config);
        }

        let observed_faces = match detector.detect(frame) {
            Ok(regions) if !regions.is_empty() => regions.len(),
            Ok(_) => return Ok(CalibrationStep::Skipped { comparisons_made }),
            Err(e) => {
                log::debug!("Calibration frame {} skipped: {e}", frame.index());
                return Ok(CalibrationStep::Skipped { comparisons_made });
            }
        };

        let current = detector.parameter();
        let next = match expected_faces.cmp(&observed_faces) {
            Ordering::Greater => current.relaxed(),
            Ordering::Less => current.tightened(),
            Ordering::Equal => {
                return Ok(CalibrationStep::Held {
                    comparisons_made,
                    parameter: current,
                })
            }
        };

        if let Err(e) = detector.retune(next) {
            log::warn!("Calibration aborted: {e}");
            self.state = CalibrationState::Idle;
            return Err(e);
        }

        log::debug!(
            "Calibration {comparisons_made}/{}: expected {expected_faces}, saw {observed_faces}, parameter {current} -> {next}",
            self.comparison_limit
        );
        Ok(CalibrationStep::Adjusted {
            comparisons_made,
            observed_faces,
            parameter: next,
        })
    }

    fn complete(
        &mut self,
        parameter: DetectionParameter,
        config: &mut dyn ConfigStore,
    ) -> Result<CalibrationStep, BoothError> {
        self.state = CalibrationState::Idle;
        config.set(KEY_FACE_DETECTION_COEFF, &parameter.to_string());
        config.persist()?;
        log::info!("Calibration finished: {KEY_FACE_DETECTION_COEFF} = {parameter}");
        Ok(CalibrationStep::Completed { parameter })
    }
}
