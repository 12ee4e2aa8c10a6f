use std::path::PathBuf;

use crate::capture::output_namer::OutputNamer;
use crate::capture::shot::Shot;
use crate::capture::status_messages::StatusMessages;
use crate::compositing::domain::shot_compositor::ShotCompositor;
use crate::detection::domain::tunable_detector::TunableDetector;
use crate::shared::booth_error::BoothError;
use crate::shared::frame::Frame;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureState {
    /// No countdown running; waiting for a start trigger.
    Idle,
    /// Triggered; the first tick has not arrived yet.
    Armed,
    Counting,
    /// Handing the completed shot list to the compositor.
    Finalizing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerOutcome {
    Started,
    AlreadyRunning,
}

/// What a single countdown tick did.
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    /// The session is idle; the tick had no effect.
    Ignored,
    Countdown { remaining: u32 },
    /// Countdown is at zero but no frame was available; retried next tick.
    WaitingForFrame,
    ShotTaken {
        shots_taken: usize,
        face_count: usize,
        status: String,
    },
    /// Last shot taken and handed off; the session is idle again.
    Completed { output: PathBuf, status: String },
}

/// Timed multi-shot capture.
///
/// A trigger arms a countdown of `countdown_limit` ticks. Each time it runs
/// out, a deep copy of the current frame is stored together with its face
/// count and the countdown restarts. After `session_target` shots the list is
/// handed by value to the compositor and the session goes back to idle.
pub struct CaptureSession {
    state: CaptureState,
    session_target: usize,
    countdown_limit: u32,
    countdown_remaining: u32,
    shots: Vec<Shot>,
    messages: StatusMessages,
    compositor: Box<dyn ShotCompositor>,
    namer: Box<dyn OutputNamer>,
}

impl CaptureSession {
    pub fn new(
        session_target: usize,
        countdown_limit: u32,
        compositor: Box<dyn ShotCompositor>,
        namer: Box<dyn OutputNamer>,
    ) -> Result<Self, BoothError> {
        if session_target == 0 {
            return Err(BoothError::InvalidInput(
                "shots per session must be at least 1".to_string(),
            ));
        }
        if countdown_limit == 0 {
            return Err(BoothError::InvalidInput(
                "countdown must be at least 1 tick".to_string(),
            ));
        }
        Ok(Self {
            state: CaptureState::Idle,
            session_target,
            countdown_limit,
            countdown_remaining: 0,
            shots: Vec::with_capacity(session_target),
            messages: StatusMessages::default(),
            compositor,
            namer,
        })
    }

    #[cfg(test)]
    pub(crate) fn state(&self) -> CaptureState {
        self.state
    }

    /// Whether the countdown timer should be running.
    pub fn is_running(&self) -> bool {
        matches!(self.state, CaptureState::Armed | CaptureState::Counting)
    }

    #[cfg(test)]
    pub(crate) fn shots_taken(&self) -> usize {
        self.shots.len()
    }

    #[cfg(test)]
    pub(crate) fn countdown_remaining(&self) -> u32 {
        self.countdown_remaining
    }

    pub fn status(&self) -> &str {
        self.messages.for_shots(self.shots.len())
    }

    /// Starts a session. At most one runs at a time; triggering a running
    /// session changes nothing.
    pub fn trigger(&mut self) -> TriggerOutcome {
        if self.state != CaptureState::Idle {
            return TriggerOutcome::AlreadyRunning;
        }
        self.shots.clear();
        self.countdown_remaining = self.countdown_limit;
        self.state = CaptureState::Armed;
        log::info!(
            "Capture session started: {} shot(s), {} tick countdown",
            self.session_target,
            self.countdown_limit
        );
        TriggerOutcome::Started
    }

    /// Drops any shots taken so far and returns to idle.
    pub fn cancel(&mut self) {
        if self.is_running() {
            log::info!("Capture session cancelled after {} shot(s)", self.shots.len());
        }
        self.shots.clear();
        self.countdown_remaining = 0;
        self.state = CaptureState::Idle;
    }

    /// Advances the session by one tick. `frame` is the live frame at the
    /// time of the tick, if the source delivered one.
    pub fn advance(
        &mut self,
        frame: Option<&Frame>,
        detector: &mut TunableDetector,
    ) -> Result<TickOutcome, BoothError> {
        match self.state {
            CaptureState::Idle | CaptureState::Finalizing => return Ok(TickOutcome::Ignored),
            CaptureState::Armed => self.state = CaptureState::Counting,
            CaptureState::Counting => {}
        }

        self.countdown_remaining = self.countdown_remaining.saturating_sub(1);
        if self.countdown_remaining > 0 {
            return Ok(TickOutcome::Countdown {
                remaining: self.countdown_remaining,
            });
        }

        let shot = match capture(frame, detector) {
            Ok(shot) => shot,
            Err(BoothError::FrameUnavailable) => {
                log::warn!("No frame available at capture time; retrying next tick");
                return Ok(TickOutcome::WaitingForFrame);
            }
            Err(e) => return Err(e),
        };
        let face_count = shot.face_count;
        self.shots.push(shot);
        self.countdown_remaining = self.countdown_limit;
        let status = self.status().to_string();
        log::info!(
            "Shot {}/{} taken ({face_count} face(s))",
            self.shots.len(),
            self.session_target
        );

        if self.shots.len() == self.session_target {
            let output = self.finalize()?;
            return Ok(TickOutcome::Completed { output, status });
        }

        Ok(TickOutcome::ShotTaken {
            shots_taken: self.shots.len(),
            face_count,
            status,
        })
    }

    fn finalize(&mut self) -> Result<PathBuf, BoothError> {
        self.state = CaptureState::Finalizing;
        let shots = std::mem::take(&mut self.shots);
        let output = self.namer.next_output();
        let result = self.compositor.compose(shots, &output);

        self.countdown_remaining = 0;
        self.state = CaptureState::Idle;

        match result {
            Ok(()) => {
                log::info!("Session composed to {}", output.display());
                Ok(output)
            }
            Err(e) => Err(BoothError::Compose {
                path: output.display().to_string(),
                reason: e.to_string(),
            }),
        }
    }
}

/// Deep-copies `frame` and counts faces on that exact copy.
fn capture(frame: Option<&Frame>, detector: &mut TunableDetector) -> Result<Shot, BoothError> {
    let frame = frame.ok_or(BoothError::FrameUnavailable)?.clone();
    let face_count = detector.count_faces(&frame);
    Ok(Shot { frame, face_count })
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::path::Path;
    use std::sync::{Arc, Mutex};

    use super::*;

    #[derive(Clone, Default)]
    pub struct RecordingCompositor {
        pub calls: Arc<Mutex<Vec<(Vec<Shot>, PathBuf)>>>,
        pub fail: bool,
    }

    impl ShotCompositor for RecordingCompositor {
        fn compose(
            &mut self,
            shots: Vec<Shot>,
            output_path: &Path,
        ) -> Result<(), Box<dyn std::error::Error>> {
            self.calls
                .lock()
                .unwrap()
                .push((shots, output_path.to_path_buf()));
            if self.fail {
                return Err("disk full".into());
            }
            Ok(())
        }
    }

    pub struct FixedNamer;

    impl OutputNamer for FixedNamer {
        fn next_output(&mut self) -> PathBuf {
            PathBuf::from("out/session.png")
        }
    }
}
