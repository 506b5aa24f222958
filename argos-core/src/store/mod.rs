//! Store facade over the backing key-value store
//!
//! The engine only needs a tiny surface: persistent open/close, point
//! get/put/delete, and a whole-map clear. Ordering of keys is not required
//! for correctness; the core never iterates.
//!
//! Methods take `&self` and implementations handle their own interior
//! mutability, so a quiesced index can serve concurrent readers. Writer
//! serialization stays the caller's responsibility: index updates are
//! read-modify-write cycles with no store-level transaction.

mod fs;
mod memory;

pub use fs::FsStore;
pub use memory::MemoryStore;

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Interface the engine expects from the backing key-value store.
pub trait Store {
    /// Acquire persistent resources. Called by `Engine::open_index`.
    fn open(&self) -> Result<()>;

    /// Release persistent resources, flushing pending state.
    fn close(&self) -> Result<()>;

    fn get(&self, key: &str) -> Result<Option<String>>;

    fn put(&self, key: &str, value: &str) -> Result<()>;

    fn delete(&self, key: &str) -> Result<()>;

    /// Remove every entry.
    fn clear(&self) -> Result<()>;
}

/// Configuration-surface description of a backing store: an identifier
/// plus its constructor arguments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum StoreSpec {
    /// Shared in-memory map; contents live as long as the process.
    Memory,
    /// JSON snapshot file loaded on open and written back on close.
    File { path: PathBuf },
}

impl StoreSpec {
    /// Construct the described backend. Nothing touches disk until
    /// `open` is called.
    pub fn build(&self) -> AnyStore {
        match self {
            StoreSpec::Memory => AnyStore::Memory(MemoryStore::new()),
            StoreSpec::File { path } => AnyStore::File(FsStore::new(path.clone())),
        }
    }
}

/// Enum dispatch over the bundled backends.
#[derive(Debug, Clone)]
pub enum AnyStore {
    Memory(MemoryStore),
    File(FsStore),
}

impl Store for AnyStore {
    fn open(&self) -> Result<()> {
        match self {
            AnyStore::Memory(s) => s.open(),
            AnyStore::File(s) => s.open(),
        }
    }

    fn close(&self) -> Result<()> {
        match self {
            AnyStore::Memory(s) => s.close(),
            AnyStore::File(s) => s.close(),
        }
    }

    fn get(&self, key: &str) -> Result<Option<String>> {
        match self {
            AnyStore::Memory(s) => s.get(key),
            AnyStore::File(s) => s.get(key),
        }
    }

    fn put(&self, key: &str, value: &str) -> Result<()> {
        match self {
            AnyStore::Memory(s) => s.put(key, value),
            AnyStore::File(s) => s.put(key, value),
        }
    }

    fn delete(&self, key: &str) -> Result<()> {
        match self {
            AnyStore::Memory(s) => s.delete(key),
            AnyStore::File(s) => s.delete(key),
        }
    }

    fn clear(&self) -> Result<()> {
        match self {
            AnyStore::Memory(s) => s.clear(),
            AnyStore::File(s) => s.clear(),
        }
    }
}
