//! File-backed store with JSON snapshot persistence
//!
//! The whole map is held in memory between `open` and `close`; `close` and
//! `flush` write it back as a single JSON object, via a temp file and an
//! atomic rename so a crash mid-write leaves the previous snapshot intact.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use crate::error::{Error, Result};
use crate::store::Store;

#[derive(Debug, Default)]
struct Inner {
    entries: BTreeMap<String, String>,
    dirty: bool,
}

/// Key-value store persisted as a JSON snapshot file.
#[derive(Debug, Clone)]
pub struct FsStore {
    path: PathBuf,
    inner: Arc<RwLock<Inner>>,
}

impl FsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            inner: Arc::new(RwLock::new(Inner::default())),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write the snapshot now if there are unpersisted changes.
    pub fn flush(&self) -> Result<()> {
        let mut inner = self.inner.write();
        if inner.dirty {
            Self::persist(&mut inner, &self.path)?;
        }
        Ok(())
    }

    fn persist(inner: &mut Inner, path: &Path) -> Result<()> {
        let json = serde_json::to_string(&inner.entries)
            .map_err(|e| Error::Serialization(e.to_string()))?;
        let tmp = path.with_extension("tmp");
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, path)?;
        inner.dirty = false;
        debug!(path = %path.display(), entries = inner.entries.len(), "snapshot written");
        Ok(())
    }
}

impl Store for FsStore {
    fn open(&self) -> Result<()> {
        let mut inner = self.inner.write();
        if self.path.exists() {
            let data = std::fs::read_to_string(&self.path)?;
            inner.entries = serde_json::from_str(&data).map_err(|e| {
                Error::Serialization(format!("snapshot {}: {e}", self.path.display()))
            })?;
        } else {
            inner.entries.clear();
        }
        inner.dirty = false;
        Ok(())
    }

    fn close(&self) -> Result<()> {
        self.flush()
    }

    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.inner.read().entries.get(key).cloned())
    }

    fn put(&self, key: &str, value: &str) -> Result<()> {
        let mut inner = self.inner.write();
        inner.entries.insert(key.to_string(), value.to_string());
        inner.dirty = true;
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<()> {
        let mut inner = self.inner.write();
        inner.entries.remove(key);
        inner.dirty = true;
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        let mut inner = self.inner.write();
        inner.entries.clear();
        inner.dirty = true;
        Ok(())
    }
}
