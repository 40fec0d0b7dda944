//! Key-value persistence boundary.
//!
//! The session only ever stores the serialized [`Identity`] under
//! [`USER_KEY`]; values are trusted as-is, there is no schema versioning.
//!
//! [`Identity`]: crate::Identity

use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

use crate::ResultEngine;

/// Key under which the onboarded identity is persisted.
pub const USER_KEY: &str = "agroUser";

pub trait KeyValueStore {
    fn get(&self, key: &str) -> ResultEngine<Option<String>>;
    fn set(&mut self, key: &str, value: String) -> ResultEngine<()>;
    fn remove(&mut self, key: &str) -> ResultEngine<()>;
}

/// Process-local store, lost on exit.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    entries: BTreeMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> ResultEngine<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: String) -> ResultEngine<()> {
        self.entries.insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&mut self, key: &str) -> ResultEngine<()> {
        self.entries.remove(key);
        Ok(())
    }
}

/// All entries in one JSON object on disk, rewritten on every change.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    entries: BTreeMap<String, String>,
}

impl JsonFileStore {
    /// Loads `path`, or starts empty when the file does not exist yet.
    pub fn open(path: impl AsRef<Path>) -> ResultEngine<Self> {
        let path = path.as_ref().to_path_buf();
        let entries = if path.exists() {
            let raw = fs::read_to_string(&path)?;
            if raw.trim().is_empty() {
                BTreeMap::new()
            } else {
                serde_json::from_str(&raw)?
            }
        } else {
            BTreeMap::new()
        };
        tracing::debug!("opened state file {} ({} keys)", path.display(), entries.len());
        Ok(Self { path, entries })
    }

    fn flush(&self) -> ResultEngine<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, serde_json::to_string_pretty(&self.entries)?)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> ResultEngine<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: String) -> ResultEngine<()> {
        self.entries.insert(key.to_string(), value);
        self.flush()
    }

    fn remove(&mut self, key: &str) -> ResultEngine<()> {
        if self.entries.remove(key).is_some() {
            self.flush()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;
    use crate::EngineError;

    fn temp_path() -> PathBuf {
        std::env::temp_dir()
            .join("agro_tests")
            .join(format!("state_{}.json", Uuid::new_v4()))
    }

    #[test]
    fn memory_store_roundtrip() {
        let mut store = MemoryStore::new();
        assert_eq!(store.get(USER_KEY).unwrap(), None);
        store.set(USER_KEY, "{}".to_string()).unwrap();
        assert_eq!(store.get(USER_KEY).unwrap().as_deref(), Some("{}"));
        store.remove(USER_KEY).unwrap();
        assert_eq!(store.get(USER_KEY).unwrap(), None);
    }

    #[test]
    fn file_store_survives_reopen() {
        let path = temp_path();
        let mut store = JsonFileStore::open(&path).unwrap();
        store.set(USER_KEY, "{\"name\":\"Budi\"}".to_string()).unwrap();

        let reopened = JsonFileStore::open(&path).unwrap();
        assert_eq!(
            reopened.get(USER_KEY).unwrap().as_deref(),
            Some("{\"name\":\"Budi\"}")
        );

        let mut reopened = reopened;
        reopened.remove(USER_KEY).unwrap();
        assert_eq!(JsonFileStore::open(&path).unwrap().get(USER_KEY).unwrap(), None);
        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn corrupt_file_is_an_error() {
        let path = temp_path();
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "not json").unwrap();
        assert!(matches!(JsonFileStore::open(&path), Err(EngineError::Json(_))));
        fs::remove_file(&path).unwrap();
    }
}
