use crate::shared::frame::Frame;

/// One captured picture and the number of faces detected on it at the
/// moment of capture.
#[derive(Clone, Debug, PartialEq)]
pub struct Shot {
    pub frame: Frame,
    pub face_count: usize,
}
