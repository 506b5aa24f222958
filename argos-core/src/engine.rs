//! Engine facade
//!
//! Ties a backing store, a lexical pipeline, and BM25 parameters into the
//! public indexing and search surface. Configuration is captured once at
//! construction as an immutable value; the same pipeline analyzes both
//! documents and queries so recall is symmetric.
//!
//! The engine is single-threaded: callers serialize writers externally.
//! Opening two engines over the same store and writing from both is
//! undefined and can corrupt term records.

use std::ops::ControlFlow;

use serde::{Deserialize, Serialize};

use crate::analysis::{Pipeline, StageKind, StopSet};
use crate::codec::Globals;
use crate::error::Result;
use crate::indexer;
use crate::registry;
use crate::searcher::{self, Bm25Params, Query, SearchHit};
use crate::store::{AnyStore, Store, StoreSpec};
use crate::{DocId, Score};

/// Engine construction options.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Lexical stages in application order; empty means the default
    /// heuristics, tokenize, stop, stem.
    #[serde(default)]
    pub filters: Vec<StageKind>,
    /// Replacement stop-list source: whitespace-separated words, `#`
    /// lines are comments. `None` keeps the built-in English list.
    #[serde(default)]
    pub stop_list: Option<String>,
    /// BM25 overrides.
    #[serde(default)]
    pub params: Bm25Params,
}

/// A persistent free-text search engine over a key-value store.
pub struct Engine<S: Store> {
    store: S,
    pipeline: Pipeline,
    params: Bm25Params,
}

impl Engine<AnyStore> {
    /// Build an engine from a store description plus options.
    pub fn from_spec(spec: &StoreSpec, config: EngineConfig) -> Self {
        Self::new(spec.build(), config)
    }
}

impl<S: Store> Engine<S> {
    /// Build an engine over `store` with the given options.
    pub fn new(store: S, config: EngineConfig) -> Self {
        let stop_set = match &config.stop_list {
            Some(source) => StopSet::from_source(source),
            None => StopSet::builtin(),
        };
        let kinds: &[StageKind] = if config.filters.is_empty() {
            &StageKind::DEFAULT
        } else {
            &config.filters
        };
        Self {
            store,
            pipeline: Pipeline::from_kinds(kinds, stop_set),
            params: config.params,
        }
    }

    /// Default configuration: standard pipeline, default BM25 parameters.
    pub fn with_store(store: S) -> Self {
        Self::new(store, EngineConfig::default())
    }

    /// Escape hatch for user-supplied stages.
    pub fn with_pipeline(store: S, pipeline: Pipeline, params: Bm25Params) -> Self {
        Self {
            store,
            pipeline,
            params,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    pub fn params(&self) -> Bm25Params {
        self.params
    }

    /// Acquire the store's persistent resources.
    pub fn open_index(&self) -> Result<()> {
        self.store.open()
    }

    /// Release the store's persistent resources.
    pub fn close_index(&self) -> Result<()> {
        self.store.close()
    }

    /// Run `f` between open and close, closing on every exit path. The
    /// close error is reported only when `f` itself succeeded.
    pub fn scoped<T>(&self, f: impl FnOnce(&Self) -> Result<T>) -> Result<T> {
        self.open_index()?;
        let outcome = f(self);
        let closed = self.close_index();
        match outcome {
            Ok(value) => closed.map(|()| value),
            Err(e) => Err(e),
        }
    }

    /// Wipe the index. The next document gets id 1.
    pub fn clear_index(&self) -> Result<()> {
        registry::clear(&self.store)
    }

    /// Corpus counters. `EmptyIndex` before the first document.
    pub fn globals(&self) -> Result<Globals> {
        registry::globals(&self.store)
    }

    /// Index `text` under a caller-chosen key. The key must be new;
    /// re-indexing fails with `AlreadyIndexed` and changes nothing.
    pub fn index_document(&self, caller_key: &str, text: &str) -> Result<DocId> {
        indexer::index_document(&self.store, &self.pipeline, caller_key, text)
    }

    /// Ranked search; `limit == 0` returns all matches.
    pub fn search(&self, query: impl Into<Query>, limit: usize) -> Result<Vec<SearchHit>> {
        searcher::search(&self.store, &self.pipeline, &self.params, query.into(), limit)
    }

    /// Callback-driven search: the visitor sees `(caller_key, score,
    /// doc_id)` best-first and breaks to stop emission.
    pub fn search_with_callback<F>(&self, query: impl Into<Query>, visit: F) -> Result<()>
    where
        F: FnMut(&str, Score, DocId) -> ControlFlow<()>,
    {
        searcher::search_with_callback(&self.store, &self.pipeline, &self.params, query.into(), visit)
    }
}
