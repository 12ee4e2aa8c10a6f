//! Photo booth core: a self-calibrating face detector, a timed multi-shot
//! capture session, and the strip compositor that turns a session into a
//! printable sheet.

pub mod booth;
pub mod calibration;
pub mod capture;
pub mod compositing;
pub mod config;
pub mod detection;
pub mod shared;
pub mod video;
