use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use crate::config::domain::config_store::{ConfigError, ConfigStore};

/// In-memory store that records every persisted snapshot.
#[derive(Default)]
pub struct MemoryConfigStore {
    entries: BTreeMap<String, String>,
    pub persisted: Arc<Mutex<Vec<BTreeMap<String, String>>>>,
}

impl MemoryConfigStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ConfigStore for MemoryConfigStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) {
        self.entries.insert(key.to_string(), value.to_string());
    }

    fn persist(&mut self) -> Result<(), ConfigError> {
        self.persisted.lock().unwrap().push(self.entries.clone());
        Ok(())
    }

    fn entries(&self) -> Vec<(String, String)> {
        self.entries
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}
