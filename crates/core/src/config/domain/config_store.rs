use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed line {line} in {path}: '{content}'")]
    Malformed {
        path: PathBuf,
        line: usize,
        content: String,
    },
    #[error("invalid value for {key}: '{value}'")]
    InvalidValue { key: String, value: String },
}

/// Flat key/value settings with explicit persistence.
///
/// `set` only changes the in-memory view; nothing reaches storage until
/// `persist` is called.
pub trait ConfigStore: Send {
    fn get(&self, key: &str) -> Option<String>;

    fn set(&mut self, key: &str, value: &str);

    fn persist(&mut self) -> Result<(), ConfigError>;

    /// All entries in key order.
    fn entries(&self) -> Vec<(String, String)>;
}
