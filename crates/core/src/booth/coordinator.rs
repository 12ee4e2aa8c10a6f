use crate::calibration::calibration_controller::{CalibrationController, CalibrationStep};
use crate::capture::capture_session::{CaptureSession, TickOutcome, TriggerOutcome};
use crate::config::domain::config_store::ConfigStore;
use crate::detection::domain::tunable_detector::TunableDetector;
use crate::shared::booth_error::BoothError;
use crate::shared::frame::Frame;
use crate::video::domain::frame_source::FrameSource;

/// Owns everything the calibration controller and the capture session
/// share: the frame source, the detector, the configuration store and the
/// latest live frame.
///
/// Calibration and capture never run at the same time. All methods are
/// called from the single event-loop thread, one tick at a time.
pub struct Booth {
    source: Box<dyn FrameSource>,
    detector: TunableDetector,
    config: Box<dyn ConfigStore>,
    calibration: CalibrationController,
    capture: CaptureSession,
    live_frame: Option<Frame>,
}

impl Booth {
    /// `source` must already be open.
    pub fn new(
        source: Box<dyn FrameSource>,
        detector: TunableDetector,
        config: Box<dyn ConfigStore>,
        calibration: CalibrationController,
        capture: CaptureSession,
    ) -> Self {
        Self {
            source,
            detector,
            config,
            calibration,
            capture,
            live_frame: None,
        }
    }

    pub fn start_calibration(&mut self, expected_faces: usize) -> Result<(), BoothError> {
        if self.capture.is_running() {
            return Err(BoothError::SessionBusy { active: "capture" });
        }
        self.calibration.begin(expected_faces)
    }

    pub fn trigger_capture(&mut self) -> Result<TriggerOutcome, BoothError> {
        if self.calibration.is_calibrating() {
            return Err(BoothError::SessionBusy {
                active: "calibration",
            });
        }
        Ok(self.capture.trigger())
    }

    /// Pulls the next live frame and, while calibrating, feeds it to the
    /// calibration controller.
    pub fn on_frame_tick(&mut self) -> Result<CalibrationStep, BoothError> {
        self.live_frame = self.source.read_frame();
        let Some(frame) = self.live_frame.as_ref() else {
            log::debug!("Frame source produced no frame");
            return Ok(CalibrationStep::Ignored);
        };
        self.calibration
            .on_frame(frame, &mut self.detector, self.config.as_mut())
    }

    /// Advances the capture countdown against the current live frame.
    pub fn on_countdown_tick(&mut self) -> Result<TickOutcome, BoothError> {
        self.capture
            .advance(self.live_frame.as_ref(), &mut self.detector)
    }

    #[cfg(test)]
    pub(crate) fn is_calibrating(&self) -> bool {
        self.calibration.is_calibrating()
    }

    pub fn is_capturing(&self) -> bool {
        self.capture.is_running()
    }

    pub fn capture_status(&self) -> &str {
        self.capture.status()
    }

    #[cfg(test)]
    pub(crate) fn live_frame(&self) -> Option<&Frame> {
        self.live_frame.as_ref()
    }

    #[cfg(test)]
    pub(crate) fn config(&self) -> &dyn ConfigStore {
        self.config.as_ref()
    }

    /// Tears the booth down. Callers stop their tick timers first; this then
    /// releases the frame source before the session state is dropped.
    /// An unfinished calibration is discarded without persisting.
    pub fn shutdown(mut self) {
        self.source.release();
        self.calibration.abort();
        self.capture.cancel();
        self.live_frame = None;
        log::info!("Booth shut down");
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    use super::*;

    /// Plays back a script of frames (`None` = unavailable); once the script
    /// is exhausted every read produces a fresh frame.
    #[derive(Clone, Default)]
    pub struct ScriptedSource {
        pub script: Arc<Mutex<VecDeque<Option<u8>>>>,
        pub reads: Arc<Mutex<usize>>,
        pub releases: Arc<Mutex<usize>>,
    }

    impl ScriptedSource {
        pub fn new(script: &[Option<u8>]) -> Self {
            Self {
                script: Arc::new(Mutex::new(script.iter().copied().collect())),
                ..Self::default()
            }
        }
    }

    impl FrameSource for ScriptedSource {
        fn open(&mut self) -> Result<(), Box<dyn std::error::Error>> {
            Ok(())
        }

        fn read_frame(&mut self) -> Option<Frame> {
            if *self.releases.lock().unwrap() > 0 {
                return None;
            }
            let mut reads = self.reads.lock().unwrap();
            let index = *reads;
            *reads += 1;
            let value = self
                .script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Some(index as u8))?;
            Some(Frame::filled(4, 4, [value, 0, 0], index))
        }

        fn nominal_fps(&self) -> Option<f64> {
            Some(30.0)
        }

        fn release(&mut self) {
            *self.releases.lock().unwrap() += 1;
        }
    }
}
