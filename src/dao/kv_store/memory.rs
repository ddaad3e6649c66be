use std::{
    collections::BTreeMap,
    sync::{Mutex, MutexGuard},
};

use crate::dao::storage::{KeyValueStore, StorageResult};

/// Volatile store used by tests and throwaway sessions.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Keys currently present, sorted.
    pub fn keys(&self) -> Vec<String> {
        self.entries().keys().cloned().collect()
    }

    fn entries(&self) -> MutexGuard<'_, BTreeMap<String, String>> {
        // A panic while holding the lock cannot leave a half-written map.
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries().get(key).cloned()
    }

    fn set(&self, key: &str, value: String) -> StorageResult<()> {
        self.entries().insert(key.to_owned(), value);
        Ok(())
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        self.entries().remove(key);
        Ok(())
    }

    fn clear(&self) -> StorageResult<()> {
        self.entries().clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_get_remove_clear() {
        let store = MemoryStore::new();
        assert_eq!(store.get("a"), None);

        store.set("a", "1".into()).unwrap();
        store.set("b", "2".into()).unwrap();
        assert_eq!(store.get("a").as_deref(), Some("1"));

        store.remove("a").unwrap();
        store.remove("a").unwrap();
        assert_eq!(store.keys(), ["b"]);

        store.clear().unwrap();
        assert!(store.keys().is_empty());
    }
}
