use std::fmt;
use std::str::FromStr;

use crate::shared::booth_error::BoothError;

/// Multiplier applied when the detector finds fewer faces than expected.
pub const RELAX_FACTOR: f64 = 0.9;
/// Multiplier applied when the detector finds more faces than expected.
pub const TIGHTEN_FACTOR: f64 = 1.1;

/// Scalar sensitivity handed to the face detector when it is constructed.
///
/// For BlazeFace this is the minimum detection confidence, conventionally in
/// `(0, 1]`. Only positivity and finiteness are enforced here; whether a
/// value is acceptable is up to the detector factory.
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd)]
pub struct DetectionParameter(f64);

impl DetectionParameter {
    pub fn new(value: f64) -> Result<Self, BoothError> {
        if !value.is_finite() || value <= 0.0 {
            return Err(BoothError::InvalidInput(format!(
                "detection parameter must be a positive finite number, got {value}"
            )));
        }
        Ok(Self(value))
    }

    pub fn value(self) -> f64 {
        self.0
    }

    /// Lower threshold: detector accepts weaker candidates.
    pub fn relaxed(self) -> Self {
        Self(self.0 * RELAX_FACTOR)
    }

    /// Higher threshold: detector rejects weaker candidates.
    pub fn tightened(self) -> Self {
        Self(self.0 * TIGHTEN_FACTOR)
    }
}

impl fmt::Display for DetectionParameter {
    /// Shortest representation that parses back to the identical `f64`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for DetectionParameter {
    type Err = BoothError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = s.trim().parse::<f64>().map_err(|e| {
            BoothError::InvalidInput(format!("invalid detection parameter '{s}': {e}"))
        })?;
        Self::new(value)
    }
}
