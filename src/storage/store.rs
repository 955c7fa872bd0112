// src/storage/store.rs
//! Durable key-value backends for client-local persistence.
//!
//! Client storage is unauthenticated and readable by anything running in
//! the same origin; callers must only ever write public material through
//! these backends.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::PathBuf;
use std::sync::Mutex;

/// Client-local string storage.
///
/// Implementations must make `put` atomic: a concurrent or subsequent
/// `get` observes either the previous value or the new one, never a
/// partial write.
pub trait StorageBackend: Send + Sync {
    fn get(&self, key: &str) -> io::Result<Option<String>>;
    fn put(&self, key: &str, value: &str) -> io::Result<()>;
    fn remove(&self, key: &str) -> io::Result<()>;
}

/// Volatile in-memory store.
///
/// Used in tests and in embedders that manage their own persistence.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore::default()
    }
}

impl StorageBackend for MemoryStore {
    fn get(&self, key: &str) -> io::Result<Option<String>> {
        Ok(self.entries.lock().unwrap().get(key).cloned())
    }

    fn put(&self, key: &str, value: &str) -> io::Result<()> {
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> io::Result<()> {
        self.entries.lock().unwrap().remove(key);
        Ok(())
    }
}

/// One file per key under a directory.
///
/// Writes go through a sibling temp file and an atomic rename, so a
/// reader never observes a torn record even if the process dies
/// mid-write.
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Creates the directory if needed and opens the store.
    pub fn new(dir: impl Into<PathBuf>) -> io::Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(FileStore { dir })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(key)
    }
}

impl StorageBackend for FileStore {
    fn get(&self, key: &str) -> io::Result<Option<String>> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn put(&self, key: &str, value: &str) -> io::Result<()> {
        let tmp = self.dir.join(format!("{}.tmp", key));
        fs::write(&tmp, value)?;
        fs::rename(tmp, self.path_for(key))
    }

    fn remove(&self, key: &str) -> io::Result<()> {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_store_round_trips_and_removes() {
        let store = MemoryStore::new();
        assert_eq!(store.get("k").unwrap(), None);

        store.put("k", "v1").unwrap();
        assert_eq!(store.get("k").unwrap(), Some("v1".to_string()));

        store.put("k", "v2").unwrap();
        assert_eq!(store.get("k").unwrap(), Some("v2".to_string()));

        store.remove("k").unwrap();
        assert_eq!(store.get("k").unwrap(), None);
        // Removing again is a no-op
        store.remove("k").unwrap();
    }

    #[test]
    fn file_store_persists_across_instances() {
        let dir = std::env::temp_dir().join(format!(
            "passkey-wallet-store-{}-{}",
            std::process::id(),
            rand::random::<u32>()
        ));

        {
            let store = FileStore::new(&dir).unwrap();
            store.put("session", r#"{"isAuthenticated":true}"#).unwrap();
        }

        let reopened = FileStore::new(&dir).unwrap();
        assert_eq!(
            reopened.get("session").unwrap(),
            Some(r#"{"isAuthenticated":true}"#.to_string())
        );
        reopened.remove("session").unwrap();
        assert_eq!(reopened.get("session").unwrap(), None);

        std::fs::remove_dir_all(&dir).ok();
    }
}
