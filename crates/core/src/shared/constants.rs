pub const BLAZEFACE_MODEL_NAME: &str = "blazeface_short_range.onnx";

/// Application directory name under the platform config/cache/picture dirs.
pub const APP_DIR_NAME: &str = "PhotoBooth";
pub const CONFIG_FILE_NAME: &str = "booth.cfg";

/// Detector sensitivity used before any calibration has been persisted.
pub const DEFAULT_FACE_DETECTION_COEFF: f64 = 0.8;

/// Seconds of live frames one calibration session samples.
pub const CALIBRATION_SECONDS: usize = 10;

pub const DEFAULT_FPS: f64 = 30.0;
pub const DEFAULT_SHOTS_PER_SESSION: usize = 3;
/// Countdown ticks (seconds) before each shot.
pub const DEFAULT_COUNTDOWN_TICKS: u32 = 3;

/// Border around and between shots in a composed strip, in pixels.
pub const STRIP_BORDER_PX: u32 = 10;
/// Upper bound on how many times a strip is repeated on the printed sheet.
pub const MAX_STRIP_COPIES: usize = 6;

pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "tiff", "tif", "webp"];
