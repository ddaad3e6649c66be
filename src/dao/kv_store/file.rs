use std::{
    collections::BTreeMap,
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::{Mutex, MutexGuard},
};

use tracing::{debug, info, warn};

use crate::dao::storage::{KeyValueStore, StorageError, StorageResult};

/// Key/value store kept as a single JSON object on disk.
///
/// Every write rewrites the whole file through a temporary sibling and a rename, so
/// a crash leaves either the previous or the new content, never a torn file.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, String>>,
}

impl FileStore {
    /// Open the store at `path`, starting empty when the file is missing or unreadable.
    pub fn open(path: impl Into<PathBuf>) -> StorageResult<Self> {
        let path = path.into();
        let entries = match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<BTreeMap<String, String>>(&contents) {
                Ok(entries) => {
                    debug!(path = %path.display(), keys = entries.len(), "loaded store");
                    entries
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "store file is malformed; starting empty"
                    );
                    BTreeMap::new()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(path = %path.display(), "store file not found; starting empty");
                BTreeMap::new()
            }
            Err(err) => {
                return Err(StorageError::unavailable(
                    format!("failed to read store file `{}`", path.display()),
                    err,
                ));
            }
        };

        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    /// Location of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn entries(&self) -> MutexGuard<'_, BTreeMap<String, String>> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn flush(&self, entries: &BTreeMap<String, String>) -> StorageResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| {
                StorageError::unavailable(
                    format!("failed to create directory `{}`", parent.display()),
                    source,
                )
            })?;
        }

        let payload = serde_json::to_string_pretty(entries).map_err(|source| {
            StorageError::unavailable("failed to encode store".into(), source)
        })?;

        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, payload).map_err(|source| {
            StorageError::unavailable(format!("failed to write `{}`", tmp.display()), source)
        })?;
        fs::rename(&tmp, &self.path).map_err(|source| {
            StorageError::unavailable(
                format!("failed to replace `{}`", self.path.display()),
                source,
            )
        })
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries().get(key).cloned()
    }

    fn set(&self, key: &str, value: String) -> StorageResult<()> {
        let mut entries = self.entries();
        let previous = entries.insert(key.to_owned(), value);
        if let Err(err) = self.flush(&entries) {
            match previous {
                Some(old) => entries.insert(key.to_owned(), old),
                None => entries.remove(key),
            };
            return Err(err);
        }
        Ok(())
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        let mut entries = self.entries();
        let Some(previous) = entries.remove(key) else {
            return Ok(());
        };
        if let Err(err) = self.flush(&entries) {
            entries.insert(key.to_owned(), previous);
            return Err(err);
        }
        Ok(())
    }

    fn clear(&self) -> StorageResult<()> {
        let mut entries = self.entries();
        let previous = std::mem::take(&mut *entries);
        if let Err(err) = self.flush(&entries) {
            *entries = previous;
            return Err(err);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn scratch_path() -> PathBuf {
        std::env::temp_dir()
            .join(format!("beatdate-{}", Uuid::new_v4()))
            .join("store.json")
    }

    #[test]
    fn values_survive_reopen() {
        let path = scratch_path();
        {
            let store = FileStore::open(&path).unwrap();
            store.set("session", "{\"version\":1}".into()).unwrap();
            store.set("auth_tokens", "secret".into()).unwrap();
            store.remove("auth_tokens").unwrap();
        }

        let reopened = FileStore::open(&path).unwrap();
        assert_eq!(reopened.get("session").as_deref(), Some("{\"version\":1}"));
        assert_eq!(reopened.get("auth_tokens"), None);

        reopened.clear().unwrap();
        assert_eq!(FileStore::open(&path).unwrap().get("session"), None);

        let _ = fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn malformed_file_starts_empty() {
        let path = scratch_path();
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "not json").unwrap();

        let store = FileStore::open(&path).unwrap();
        assert_eq!(store.get("anything"), None);
        store.set("k", "v".into()).unwrap();
        assert_eq!(FileStore::open(&path).unwrap().get("k").as_deref(), Some("v"));

        let _ = fs::remove_dir_all(path.parent().unwrap());
    }
}
