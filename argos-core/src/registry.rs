//! Document registry
//!
//! Owns the global counters, the caller-key reverse lookup, and document
//! id allocation. Ids are handed out from 1 upward unless the free list
//! is non-empty, in which case the head slot is reused and the list is
//! popped. No public operation populates the list today (deletion is
//! reserved); the allocator still honors it so legacy indexes with freed
//! slots keep working.

use tracing::trace;

use crate::codec::{self, decode_free_slot, doc_key, lookup_key, Globals, GLOBAL_KEY};
use crate::error::{Error, Result};
use crate::store::Store;
use crate::DocId;

/// Read the global record. `EmptyIndex` when no document was ever indexed.
pub fn globals<S: Store>(store: &S) -> Result<Globals> {
    match store.get(GLOBAL_KEY)? {
        Some(value) => Globals::decode(&value),
        None => Err(Error::EmptyIndex),
    }
}

/// Resolve a caller key to its doc id, if indexed.
pub fn lookup<S: Store>(store: &S, caller_key: &str) -> Result<Option<DocId>> {
    match store.get(&lookup_key(caller_key))? {
        Some(value) => codec::parse_decimal(&value)
            .map(Some)
            .ok_or_else(|| {
                Error::Corruption(format!("lookup record for {caller_key:?}: bad id {value:?}"))
            }),
        None => Ok(None),
    }
}

/// Allocate a doc id for a new caller key and fold `doc_size` into the
/// corpus totals.
///
/// Fails with `AlreadyIndexed` before touching anything when the key is
/// taken, so a rejected call leaves the index unchanged.
pub fn allocate<S: Store>(store: &S, caller_key: &str, doc_size: u64) -> Result<DocId> {
    if lookup(store, caller_key)?.is_some() {
        return Err(Error::AlreadyIndexed(caller_key.to_string()));
    }

    let mut globals = match store.get(GLOBAL_KEY)? {
        Some(value) => Globals::decode(&value)?,
        None => Globals::default(),
    };

    let doc_id = match globals.free_head {
        Some(head) => {
            let key = doc_key(head);
            let slot = store.get(&key)?.ok_or_else(|| {
                Error::Corruption(format!("free list points at missing slot {key:?}"))
            })?;
            globals.free_head = decode_free_slot(&key, &slot)?;
            head
        }
        None => {
            globals.doc_count += 1;
            globals.doc_count
        }
    };
    globals.total_terms += doc_size;

    store.put(GLOBAL_KEY, &globals.encode())?;
    store.put(&lookup_key(caller_key), &doc_id.to_string())?;

    trace!(doc_id, doc_size, "allocated document id");
    Ok(doc_id)
}

/// Drop every entry. The next allocation restarts from id 1.
pub fn clear<S: Store>(store: &S) -> Result<()> {
    store.clear()
}
