//! Argos - a persistent free-text search engine over a key-value store
//!
//! The engine packs an inverted index into a flat map of string keys to
//! string values and ranks results with the Okapi BM25 model:
//! - Store trait for pluggable ordered key-value backends (memory, file)
//! - Lexical pipeline (heuristics, tokenize, stop filter, stem) shared by
//!   the indexing and query paths
//! - Packed textual record codec for term, per-document, and global records
//! - Document registry with monotonic id allocation and free-slot reuse
//! - BM25 scorer with callback-driven result emission
//!
//! The engine is single-threaded and synchronous: every store access is a
//! plain blocking call, and no background work runs on other threads.
//! Writers must be serialized externally; two engines writing to the same
//! store concurrently may interleave read-modify-write cycles and corrupt
//! term records. Concurrent readers over a quiesced index are safe.

pub mod analysis;
pub mod codec;
pub mod engine;
pub mod error;
pub mod indexer;
pub mod registry;
pub mod searcher;
pub mod store;

// Re-exports from analysis
pub use analysis::{Pipeline, Stage, StageKind, StopSet};

// Re-exports from codec
pub use codec::{DocRecord, Globals, Posting, TermRecord};

// Re-exports from store
pub use store::{AnyStore, FsStore, MemoryStore, Store, StoreSpec};

// Re-exports from query-side types
pub use searcher::{Bm25Params, Query, SearchHit};

// Re-exports from the engine facade
pub use engine::{Engine, EngineConfig};

pub use error::{Error, Result};

/// Internal document identifier, allocated from 1 upward.
pub type DocId = u32;
/// Number of occurrences of a term within one document.
pub type TermFreq = u32;
/// BM25 relevance score.
pub type Score = f32;
