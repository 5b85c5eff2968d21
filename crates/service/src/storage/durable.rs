//! Durable key-value storage the session store persists through.
//!
//! The contract mirrors a browser's local storage: string keys, string
//! values, synchronous calls. Values are whatever the caller serialized.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

use tracing::{debug, warn};

use crate::errors::ServiceError;

/// Key-value persistence that survives process restarts.
pub trait DurableStorage: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, ServiceError>;
    fn set(&self, key: &str, value: &str) -> Result<(), ServiceError>;
    fn remove(&self, key: &str) -> Result<(), ServiceError>;
}

fn poisoned() -> ServiceError {
    ServiceError::Storage("storage lock poisoned".into())
}

/// In-process storage; survives store re-creation but not process exit.
#[derive(Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DurableStorage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, ServiceError> {
        let entries = self.entries.lock().map_err(|_| poisoned())?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), ServiceError> {
        let mut entries = self.entries.lock().map_err(|_| poisoned())?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), ServiceError> {
        let mut entries = self.entries.lock().map_err(|_| poisoned())?;
        entries.remove(key);
        Ok(())
    }
}

/// Storage backed by one JSON object on disk (`{key: value}`).
///
/// Every write rewrites the file through a sibling temp file and a rename,
/// so a crash mid-write leaves either the old or the new contents.
pub struct FileStorage {
    entries: Mutex<HashMap<String, String>>,
    file_path: PathBuf,
}

impl FileStorage {
    /// Open storage at `path`. A missing file starts empty; an unreadable one
    /// is logged and treated as empty until the next write replaces it.
    pub fn open<P: Into<PathBuf>>(path: P) -> Result<Self, ServiceError> {
        let file_path = path.into();
        if let Some(parent) = file_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(ServiceError::storage)?;
            }
        }
        let entries = match std::fs::read(&file_path) {
            Ok(bytes) => serde_json::from_slice(&bytes).unwrap_or_else(|e| {
                warn!(path = %file_path.display(), error = %e, "unreadable storage file; starting empty");
                HashMap::new()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => return Err(ServiceError::storage(e)),
        };
        debug!(path = %file_path.display(), keys = entries.len(), "file storage opened");
        Ok(Self { entries: Mutex::new(entries), file_path })
    }

    fn flush(&self, entries: &HashMap<String, String>) -> Result<(), ServiceError> {
        let data = serde_json::to_vec_pretty(entries)?;
        let tmp = self.file_path.with_extension("tmp");
        std::fs::write(&tmp, data).map_err(ServiceError::storage)?;
        std::fs::rename(&tmp, &self.file_path).map_err(ServiceError::storage)?;
        Ok(())
    }
}

impl DurableStorage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>, ServiceError> {
        let entries = self.entries.lock().map_err(|_| poisoned())?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), ServiceError> {
        let mut entries = self.entries.lock().map_err(|_| poisoned())?;
        entries.insert(key.to_string(), value.to_string());
        self.flush(&entries)
    }

    fn remove(&self, key: &str) -> Result<(), ServiceError> {
        let mut entries = self.entries.lock().map_err(|_| poisoned())?;
        if entries.remove(key).is_some() {
            self.flush(&entries)?;
        }
        Ok(())
    }
}
