use std::path::Path;

use crate::capture::shot::Shot;

/// Turns a finished session's shots into a single output image.
///
/// Receives the shots by value in capture order.
pub trait ShotCompositor: Send {
    fn compose(
        &mut self,
        shots: Vec<Shot>,
        output_path: &Path,
    ) -> Result<(), Box<dyn std::error::Error>>;
}
