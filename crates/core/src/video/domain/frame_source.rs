use crate::shared::frame::Frame;

/// A live source of RGB frames, typically a camera.
///
/// Implementations handle device and codec details while the booth works
/// with the abstract [`Frame`] type.
pub trait FrameSource: Send {
    /// Acquires the underlying device or file.
    fn open(&mut self) -> Result<(), Box<dyn std::error::Error>>;

    /// Returns the next frame, or `None` when no frame can be produced right
    /// now (not opened, device hiccup, end of a non-looping clip).
    fn read_frame(&mut self) -> Option<Frame>;

    /// Frame rate advertised by the source, if it knows one.
    fn nominal_fps(&self) -> Option<f64>;

    /// Releases the device. Reads after release yield `None`.
    fn release(&mut self);
}
