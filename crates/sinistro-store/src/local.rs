//! Local key-value persistence.
//!
//! The local store is a flat string-to-string map with synchronous,
//! per-key atomic reads and writes:
//!
//! | Operation | Meaning |
//! |-----------|---------|
//! | `read(key)` | value or `None` |
//! | `write(key, value)` | upsert |
//! | `remove(key)` | delete, absent is fine |
//! | `keys()` | every key, any order |
//!
//! [`MemoryKv`] keeps everything in a map; [`FileKv`] keeps one JSON file
//! per key in a directory and writes through a temp file plus rename.

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::StoreError;

/// Synchronous local key-value persistence.
pub trait LocalKv {
    /// Read the value at `key`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the medium fails.
    fn read(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Store `value` at `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the medium fails.
    fn write(&mut self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Delete `key`. Deleting an absent key succeeds.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the medium fails.
    fn remove(&mut self, key: &str) -> Result<(), StoreError>;

    /// Every key currently stored.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the medium fails.
    fn keys(&self) -> Result<Vec<String>, StoreError>;
}

/// In-memory local store.
#[derive(Debug, Clone, Default)]
pub struct MemoryKv {
    entries: BTreeMap<String, String>,
    writes: usize,
}

impl MemoryKv {
    /// Create an empty store.
    pub const fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
            writes: 0,
        }
    }

    /// Number of `write` and `remove` calls served so far.
    pub const fn write_count(&self) -> usize {
        self.writes
    }
}

impl LocalKv for MemoryKv {
    fn read(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.get(key).cloned())
    }

    fn write(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.writes = self.writes.saturating_add(1);
        self.entries.insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        self.writes = self.writes.saturating_add(1);
        self.entries.remove(key);
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.entries.keys().cloned().collect())
    }
}

/// Directory-backed local store: one `<key>.json` file per key.
#[derive(Debug, Clone)]
pub struct FileKv {
    dir: PathBuf,
}

const EXTENSION: &str = "json";

impl FileKv {
    /// Open (creating if needed) a store rooted at `dir`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] if the directory cannot be created.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        tracing::debug!(dir = %dir.display(), "opened local file store");
        Ok(Self { dir })
    }

    /// Root directory of the store.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StoreError> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(StoreError::InvalidStorageKey(key.to_owned()));
        }
        Ok(self.dir.join(format!("{key}.{EXTENSION}")))
    }
}

impl LocalKv for FileKv {
    fn read(&self, key: &str) -> Result<Option<String>, StoreError> {
        match fs::read_to_string(self.path_for(key)?) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        let path = self.path_for(key)?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, value)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        match fs::remove_file(self.path_for(key)?) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn keys(&self) -> Result<Vec<String>, StoreError> {
        let mut keys = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(EXTENSION) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                keys.push(stem.to_owned());
            }
        }
        keys.sort();
        Ok(keys)
    }
}
