//! Persisted key/value store (the local-storage equivalent).
//!
//! The manager keeps two entries here: the serialized user record and the
//! last-activity instant. Absence or corruption of either means "logged out",
//! so adapters report corruption as an empty store rather than an error.
//!
//! # File Format
//!
//! ```json
//! {
//!   "user": "{\"id\":42,...}",
//!   "lastActivity": "1700000000000"
//! }
//! ```
//!
//! # Atomic Writes
//!
//! `FileStorage` writes through a temp file + rename so a reader (another tab,
//! the routing gate) never observes a half-written file.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use tempfile::NamedTempFile;
use tracing::warn;

use crate::error::{Result, SessionError};

pub trait SessionStorage {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&mut self, key: &str, value: &str) -> Result<()>;
    fn remove(&mut self, key: &str) -> Result<()>;
}

/// In-memory store. Clones share entries, which lets a test (or a second
/// manager standing in for a reloaded tab) observe what the manager wrote.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    entries: Rc<RefCell<BTreeMap<String, String>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> BTreeMap<String, String> {
        self.entries.borrow().clone()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }
}

impl SessionStorage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.borrow().get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.entries
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        self.entries.borrow_mut().remove(key);
        Ok(())
    }
}

/// JSON-file store. Every read goes to disk so writes from another process
/// sharing the file are visible to the next expiry check.
#[derive(Debug, Clone)]
pub struct FileStorage {
    file_path: PathBuf,
}

impl FileStorage {
    pub fn new(file_path: &Path) -> Self {
        Self {
            file_path: file_path.to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.file_path
    }

    fn load(&self) -> Result<BTreeMap<String, String>> {
        let content = match fs_err::read_to_string(&self.file_path) {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Ok(BTreeMap::new());
            }
            Err(err) => {
                return Err(SessionError::Io {
                    context: "read local storage".to_string(),
                    source: err,
                })
            }
        };

        if content.trim().is_empty() {
            return Ok(BTreeMap::new());
        }

        match serde_json::from_str::<BTreeMap<String, String>>(&content) {
            Ok(entries) => Ok(entries),
            Err(err) => {
                warn!(
                    path = %self.file_path.display(),
                    error = %err,
                    "Local storage file is corrupt; treating as empty"
                );
                Ok(BTreeMap::new())
            }
        }
    }

    fn save(&self, entries: &BTreeMap<String, String>) -> Result<()> {
        let content = serde_json::to_string_pretty(entries).map_err(|err| SessionError::Json {
            context: "serialize local storage".to_string(),
            source: err,
        })?;

        write_atomic(&self.file_path, &content, "local storage")
    }
}

/// Writes `content` to `path` through a temp file in the same directory.
pub(crate) fn write_atomic(path: &Path, content: &str, what: &str) -> Result<()> {
    let parent_dir = path
        .parent()
        .ok_or_else(|| SessionError::storage(format!("save {}", what), "path has no parent"))?;
    fs_err::create_dir_all(parent_dir).map_err(|err| SessionError::Io {
        context: format!("create {} dir", what),
        source: err,
    })?;

    let mut temp_file = NamedTempFile::new_in(parent_dir).map_err(|err| SessionError::Io {
        context: format!("create temp {} file", what),
        source: err,
    })?;
    temp_file
        .write_all(content.as_bytes())
        .and_then(|_| temp_file.flush())
        .map_err(|err| SessionError::Io {
            context: format!("write temp {} file", what),
            source: err,
        })?;
    temp_file.persist(path).map_err(|err| SessionError::Io {
        context: format!("commit {} file", what),
        source: err.error,
    })?;
    Ok(())
}

impl SessionStorage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.load()?.remove(key))
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let mut entries = self.load()?;
        entries.insert(key.to_string(), value.to_string());
        self.save(&entries)
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        let mut entries = self.load()?;
        if entries.remove(key).is_none() {
            return Ok(());
        }
        self.save(&entries)
    }
}
