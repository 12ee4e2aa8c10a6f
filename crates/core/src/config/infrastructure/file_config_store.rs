use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::domain::booth_config::default_entries;
use crate::config::domain::config_store::{ConfigError, ConfigStore};
use crate::shared::constants::{APP_DIR_NAME, CONFIG_FILE_NAME};

/// Settings persisted as `key,value` lines in a plain text file.
///
/// Only the first comma on a line separates key from value, so values may
/// contain commas. Blank lines are ignored.
pub struct FileConfigStore {
    path: PathBuf,
    entries: BTreeMap<String, String>,
}

impl FileConfigStore {
    /// Platform config location, e.g. `~/.config/PhotoBooth/booth.cfg`.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join(APP_DIR_NAME).join(CONFIG_FILE_NAME))
    }

    /// Loads the settings file, writing defaults when it is missing or
    /// cannot be parsed.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            match Self::read(path) {
                Ok(store) => return Ok(store),
                Err(e) => log::warn!("{e}; recreating settings with defaults"),
            }
        } else {
            log::info!("No settings at {}; writing defaults", path.display());
        }

        let mut store = Self::with_defaults(path);
        store.persist()?;
        Ok(store)
    }

    fn with_defaults(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            entries: default_entries()
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
        }
    }

    fn read(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self {
            path: path.to_path_buf(),
            entries: parse(path, &content)?,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn parse(path: &Path, content: &str) -> Result<BTreeMap<String, String>, ConfigError> {
    let mut entries = BTreeMap::new();
    for (i, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let (key, value) = line
            .split_once(',')
            .filter(|(key, _)| !key.trim().is_empty())
            .ok_or_else(|| ConfigError::Malformed {
                path: path.to_path_buf(),
                line: i + 1,
                content: line.to_string(),
            })?;
        entries.insert(key.trim().to_string(), value.to_string());
    }
    Ok(entries)
}

impl ConfigStore for FileConfigStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) {
        self.entries.insert(key.to_string(), value.to_string());
    }

    fn persist(&mut self) -> Result<(), ConfigError> {
        let write_err = |source| ConfigError::Write {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(write_err)?;
        }
        let content: String = self
            .entries
            .iter()
            .map(|(k, v)| format!("{k},{v}\n"))
            .collect();
        fs::write(&self.path, content).map_err(write_err)?;
        log::debug!("Settings saved to {}", self.path.display());
        Ok(())
    }

    fn entries(&self) -> Vec<(String, String)> {
        self.entries
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::domain::booth_config::{KEY_FACE_DETECTION_COEFF, KEY_IMAGES_SESSION};
    use tempfile::TempDir;

    #[test]
    fn test_load_missing_file_writes_defaults() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("nested").join("booth.cfg");

        let store = FileConfigStore::load(&path).unwrap();

        assert!(path.exists());
        assert_eq!(store.get(KEY_FACE_DETECTION_COEFF).as_deref(), Some("0.8"));
        assert_eq!(store.get(KEY_IMAGES_SESSION).as_deref(), Some("3"));
    }

    #[test]
    fn test_set_is_not_visible_on_disk_until_persist() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("booth.cfg");
        let mut store = FileConfigStore::load(&path).unwrap();

        store.set(KEY_FACE_DETECTION_COEFF, "0.5");
        let reloaded = FileConfigStore::load(&path).unwrap();
        assert_eq!(reloaded.get(KEY_FACE_DETECTION_COEFF).as_deref(), Some("0.8"));

        store.persist().unwrap();
        let reloaded = FileConfigStore::load(&path).unwrap();
        assert_eq!(reloaded.get(KEY_FACE_DETECTION_COEFF).as_deref(), Some("0.5"));
    }

    #[test]
    fn test_values_may_contain_commas() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("booth.cfg");
        fs::write(&path, "stamp_filepath,/tmp/a,b.png\n").unwrap();

        let store = FileConfigStore::load(&path).unwrap();

        assert_eq!(store.get("stamp_filepath").as_deref(), Some("/tmp/a,b.png"));
    }

    #[test]
    fn test_empty_values_survive_round_trip() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("booth.cfg");
        let mut store = FileConfigStore::load(&path).unwrap();
        store.set("filter_filepath", "");
        store.persist().unwrap();

        let reloaded = FileConfigStore::load(&path).unwrap();
        assert_eq!(reloaded.get("filter_filepath").as_deref(), Some(""));
    }

    #[test]
    fn test_malformed_file_is_replaced_with_defaults() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("booth.cfg");
        fs::write(&path, "this line has no separator\n").unwrap();

        let store = FileConfigStore::load(&path).unwrap();

        assert_eq!(store.get(KEY_FACE_DETECTION_COEFF).as_deref(), Some("0.8"));
        let on_disk = fs::read_to_string(&path).unwrap();
        assert!(on_disk.contains("face_detection_coeff,0.8"));
    }

    #[test]
    fn test_parse_reports_line_number() {
        let err = parse(Path::new("x.cfg"), "a,1\n\nbroken\n").unwrap_err();
        assert!(matches!(err, ConfigError::Malformed { line: 3, .. }));
    }

    #[test]
    fn test_default_path_is_app_specific() {
        if let Some(path) = FileConfigStore::default_path() {
            assert!(path.ends_with(Path::new(APP_DIR_NAME).join(CONFIG_FILE_NAME)));
        }
    }
}
