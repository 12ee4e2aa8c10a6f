use std::ops::ControlFlow;
use std::time::{Duration, Instant};

use crossbeam_channel::{never, select, tick, Receiver};

use crate::booth::coordinator::Booth;
use crate::calibration::calibration_controller::CalibrationStep;
use crate::capture::capture_session::{TickOutcome, TriggerOutcome};
use crate::shared::booth_error::BoothError;

/// Operator input delivered to the event loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Calibrate for this many people in view.
    Calibrate(usize),
    /// Start a capture session (ignored while one is running).
    Trigger,
    Quit,
}

/// Something the loop wants the front end to know about.
#[derive(Debug)]
pub enum BoothEvent {
    CalibrationStarted { expected_faces: usize },
    Calibration(CalibrationStep),
    CaptureStarted { status: String },
    Capture(TickOutcome),
    /// A command or tick failed; the loop keeps running.
    Error(BoothError),
}

/// Timer periods for the two ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopTiming {
    pub frame_interval: Duration,
    pub countdown_interval: Duration,
}

impl LoopTiming {
    /// Frame tick at `1000 / fps` ms rounded up, countdown tick every second.
    pub fn for_fps(fps: f64) -> Result<Self, BoothError> {
        if !fps.is_finite() || fps <= 0.0 {
            return Err(BoothError::InvalidInput(format!(
                "frame rate must be positive, got {fps}"
            )));
        }
        Ok(Self {
            frame_interval: Duration::from_millis((1000.0 / fps).ceil() as u64),
            countdown_interval: Duration::from_secs(1),
        })
    }
}

/// Runs the booth on the calling thread until `Quit`, a closed command
/// channel, or `on_event` breaks.
///
/// Each tick runs to completion before the next one is selected. The
/// countdown timer exists only while a capture session is running. On exit
/// both timers are dropped before the booth is shut down.
pub fn run<F>(mut booth: Booth, commands: &Receiver<Command>, timing: LoopTiming, mut on_event: F)
where
    F: FnMut(&BoothEvent) -> ControlFlow<()>,
{
    let frame_ticker = tick(timing.frame_interval);
    let mut countdown_ticker: Receiver<Instant> = never();

    loop {
        let event = select! {
            recv(commands) -> command => match command {
                Ok(Command::Quit) | Err(_) => break,
                Ok(Command::Calibrate(expected_faces)) => {
                    match booth.start_calibration(expected_faces) {
                        Ok(()) => Some(BoothEvent::CalibrationStarted { expected_faces }),
                        Err(e) => Some(BoothEvent::Error(e)),
                    }
                }
                Ok(Command::Trigger) => match booth.trigger_capture() {
                    Ok(TriggerOutcome::Started) => {
                        countdown_ticker = tick(timing.countdown_interval);
                        Some(BoothEvent::CaptureStarted {
                            status: booth.capture_status().to_string(),
                        })
                    }
                    Ok(TriggerOutcome::AlreadyRunning) => None,
                    Err(e) => Some(BoothEvent::Error(e)),
                },
            },
            recv(frame_ticker) -> _ => match booth.on_frame_tick() {
                Ok(CalibrationStep::Ignored) => None,
                Ok(step) => Some(BoothEvent::Calibration(step)),
                Err(e) => Some(BoothEvent::Error(e)),
            },
            recv(countdown_ticker) -> _ => {
                let outcome = booth.on_countdown_tick();
                if !booth.is_capturing() {
                    countdown_ticker = never();
                }
                match outcome {
                    Ok(TickOutcome::Ignored) => None,
                    Ok(outcome) => Some(BoothEvent::Capture(outcome)),
                    Err(e) => Some(BoothEvent::Error(e)),
                }
            },
        };

        if let Some(event) = event {
            if on_event(&event).is_break() {
                break;
            }
        }
    }

    drop(countdown_ticker);
    drop(frame_ticker);
    booth.shutdown();
}
