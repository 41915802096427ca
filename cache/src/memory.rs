use crate::{CacheError, PreferenceStore};
use std::collections::HashMap;
use std::sync::Mutex;

/// Preference store that lives only as long as the process.
///
/// Used when no durable storage could be opened, so the gallery keeps working
/// in a degraded, in-memory mode.
#[derive(Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.values.lock().map(|v| v.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl PreferenceStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let values = self
            .values
            .lock()
            .map_err(|_| CacheError::Other("Poisoned lock".into()))?;
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), CacheError> {
        self.values
            .lock()
            .map_err(|_| CacheError::Other("Poisoned lock".into()))?
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), CacheError> {
        self.values
            .lock()
            .map_err(|_| CacheError::Other("Poisoned lock".into()))?
            .remove(key);
        Ok(())
    }
}
