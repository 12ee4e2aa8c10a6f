use thiserror::Error;

use crate::config::domain::config_store::ConfigError;

/// Errors surfaced by the calibration controller, the capture session and
/// the booth coordinator.
#[derive(Error, Debug)]
pub enum BoothError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("detector rejected parameter {parameter}: {reason}")]
    DetectorRejectedParameter { parameter: f64, reason: String },

    #[error("no frame available from the frame source")]
    FrameUnavailable,

    #[error("another {active} session is already running")]
    SessionBusy { active: &'static str },

    #[error("failed to persist configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("failed to compose {path}: {reason}")]
    Compose { path: String, reason: String },
}
