use std::path::PathBuf;

use crate::config::domain::config_store::{ConfigError, ConfigStore};
use crate::detection::domain::detection_parameter::DetectionParameter;
use crate::shared::constants::{
    APP_DIR_NAME, DEFAULT_FACE_DETECTION_COEFF, DEFAULT_SHOTS_PER_SESSION,
};

pub const KEY_FACE_DETECTION_COEFF: &str = "face_detection_coeff";
pub const KEY_CAMERA_INDEX: &str = "camera_index";
pub const KEY_IMAGES_SESSION: &str = "images_session";
pub const KEY_MAIN_FOLDER: &str = "main_folder";
pub const KEY_OPEN_ON_SAVE: &str = "open_on_save";
pub const KEY_STAMP_FILEPATH: &str = "stamp_filepath";
pub const KEY_FILTER_FILEPATH: &str = "filter_filepath";

/// Entries written when no usable settings file exists.
pub fn default_entries() -> Vec<(&'static str, String)> {
    vec![
        (
            KEY_FACE_DETECTION_COEFF,
            DEFAULT_FACE_DETECTION_COEFF.to_string(),
        ),
        (KEY_CAMERA_INDEX, "0".to_string()),
        (KEY_IMAGES_SESSION, DEFAULT_SHOTS_PER_SESSION.to_string()),
        (
            KEY_MAIN_FOLDER,
            default_main_folder().to_string_lossy().into_owned(),
        ),
        (KEY_OPEN_ON_SAVE, "False".to_string()),
        (KEY_STAMP_FILEPATH, String::new()),
        (KEY_FILTER_FILEPATH, String::new()),
    ]
}

/// Where composed strips are saved unless configured otherwise.
pub fn default_main_folder() -> PathBuf {
    dirs::picture_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR_NAME)
}

/// Typed snapshot of the booth settings.
#[derive(Debug, Clone, PartialEq)]
pub struct BoothConfig {
    pub face_detection_coeff: DetectionParameter,
    pub camera_index: u32,
    pub images_per_session: usize,
    pub main_folder: PathBuf,
    pub open_on_save: bool,
    pub stamp_path: Option<PathBuf>,
    pub filter_path: Option<PathBuf>,
}

impl BoothConfig {
    /// Reads every setting, falling back to its default when absent.
    pub fn from_store(store: &dyn ConfigStore) -> Result<Self, ConfigError> {
        let face_detection_coeff = match store.get(KEY_FACE_DETECTION_COEFF) {
            Some(v) => v
                .parse::<DetectionParameter>()
                .map_err(|_| invalid(KEY_FACE_DETECTION_COEFF, &v))?,
            None => DetectionParameter::new(DEFAULT_FACE_DETECTION_COEFF)
                .map_err(|_| invalid(KEY_FACE_DETECTION_COEFF, "default"))?,
        };

        let camera_index = parse_or(store, KEY_CAMERA_INDEX, 0u32)?;

        let images_per_session = parse_or(store, KEY_IMAGES_SESSION, DEFAULT_SHOTS_PER_SESSION)?;
        if images_per_session == 0 {
            return Err(invalid(KEY_IMAGES_SESSION, "0"));
        }

        let main_folder = non_empty(store, KEY_MAIN_FOLDER)
            .map(PathBuf::from)
            .unwrap_or_else(default_main_folder);

        let open_on_save = match store.get(KEY_OPEN_ON_SAVE) {
            Some(v) => parse_bool(&v).ok_or_else(|| invalid(KEY_OPEN_ON_SAVE, &v))?,
            None => false,
        };

        Ok(Self {
            face_detection_coeff,
            camera_index,
            images_per_session,
            main_folder,
            open_on_save,
            stamp_path: non_empty(store, KEY_STAMP_FILEPATH).map(PathBuf::from),
            filter_path: non_empty(store, KEY_FILTER_FILEPATH).map(PathBuf::from),
        })
    }
}

fn parse_or<T: std::str::FromStr>(
    store: &dyn ConfigStore,
    key: &str,
    default: T,
) -> Result<T, ConfigError> {
    match store.get(key) {
        Some(v) => v.trim().parse::<T>().map_err(|_| invalid(key, &v)),
        None => Ok(default),
    }
}

fn non_empty(store: &dyn ConfigStore, key: &str) -> Option<String> {
    store.get(key).filter(|v| !v.trim().is_empty())
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => None,
    }
}

fn invalid(key: &str, value: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    }
}
