//! Indexing write path
//!
//! Turns one (caller key, text) pair into a doc id, one posting appended
//! per distinct term, and a per-document record. Writes for a document
//! are not transactional: a store failure mid-sequence surfaces as-is and
//! the caller decides whether to rebuild. No retry happens here.

use rustc_hash::FxHashMap;
use tracing::debug;

use crate::analysis::Pipeline;
use crate::codec::{doc_key, DocRecord, TermRecord};
use crate::error::Result;
use crate::registry;
use crate::store::Store;
use crate::{DocId, TermFreq};

/// Count term occurrences, keeping discovery order so the encoded records
/// are byte-stable across runs.
fn count_terms(terms: Vec<String>) -> Vec<(String, TermFreq)> {
    let mut counts: Vec<(String, TermFreq)> = Vec::new();
    let mut slots: FxHashMap<String, usize> = FxHashMap::default();
    for term in terms {
        match slots.get(&term) {
            Some(&slot) => counts[slot].1 += 1,
            None => {
                slots.insert(term.clone(), counts.len());
                counts.push((term, 1));
            }
        }
    }
    counts
}

/// Index one document under a caller-chosen key.
///
/// Fails with `AlreadyIndexed` when the key is taken; allocation aborts
/// before any write, so the index is left unchanged in that case.
pub fn index_document<S: Store>(
    store: &S,
    pipeline: &Pipeline,
    caller_key: &str,
    text: &str,
) -> Result<DocId> {
    let terms = pipeline.run(&[text]);
    let doc_size = terms.len() as u64;
    let counts = count_terms(terms);

    let doc_id = registry::allocate(store, caller_key, doc_size)?;

    for (term, count) in &counts {
        let mut record = match store.get(term)? {
            Some(value) => TermRecord::decode(term, &value)?,
            None => TermRecord::default(),
        };
        record.append(doc_id, *count);
        store.put(term, &record.encode())?;
    }

    let distinct_terms = counts.len();
    let record = DocRecord {
        terms: counts,
        doc_size,
        caller_key: caller_key.to_string(),
    };
    store.put(&doc_key(doc_id), &record.encode())?;

    debug!(doc_id, doc_size, distinct_terms, "indexed document");
    Ok(doc_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::GLOBAL_KEY;
    use crate::error::Error;
    use crate::store::MemoryStore;

    fn engine_parts() -> (MemoryStore, Pipeline) {
        (MemoryStore::new(), Pipeline::standard())
    }

    #[test]
    fn test_counts_preserve_discovery_order() {
        let counts = count_terms(
            ["b", "a", "b", "c", "a", "b"]
                .into_iter()
                .map(String::from)
                .collect(),
        );
        assert_eq!(
            counts,
            vec![
                ("b".to_string(), 3),
                ("a".to_string(), 2),
                ("c".to_string(), 1),
            ]
        );
    }

    #[test]
    fn test_index_document_writes_all_record_families() {
        let (store, pipeline) = engine_parts();
        let doc_id = index_document(&store, &pipeline, "k1", "crazy crazy world").unwrap();
        assert_eq!(doc_id, 1);

        assert_eq!(store.get(GLOBAL_KEY).unwrap(), Some("1,3,".to_string()));
        assert_eq!(store.get("\tk1").unwrap(), Some("1".to_string()));
        assert_eq!(store.get(" 1").unwrap(), Some("crazi=2;world:3,k1".to_string()));
        assert_eq!(store.get("crazi").unwrap(), Some("1=2:2".to_string()));
        assert_eq!(store.get("world").unwrap(), Some("1:1".to_string()));
    }

    #[test]
    fn test_postings_accumulate_in_insertion_order() {
        let (store, pipeline) = engine_parts();
        index_document(&store, &pipeline, "k1", "world").unwrap();
        index_document(&store, &pipeline, "k2", "world world").unwrap();
        index_document(&store, &pipeline, "k3", "world").unwrap();

        assert_eq!(store.get("world").unwrap(), Some("1;2=2;3:4".to_string()));
    }

    #[test]
    fn test_stop_word_only_document_still_allocates() {
        let (store, pipeline) = engine_parts();
        let doc_id = index_document(&store, &pipeline, "noise", "the and of").unwrap();
        assert_eq!(doc_id, 1);
        assert_eq!(store.get(GLOBAL_KEY).unwrap(), Some("1,0,".to_string()));
        assert_eq!(store.get(" 1").unwrap(), Some(":0,noise".to_string()));
    }

    #[test]
    fn test_duplicate_caller_key_leaves_index_unchanged() {
        let (store, pipeline) = engine_parts();
        index_document(&store, &pipeline, "k1", "hello world").unwrap();
        let world_before = store.get("world").unwrap();

        let err = index_document(&store, &pipeline, "k1", "other text").unwrap_err();
        assert!(matches!(err, Error::AlreadyIndexed(_)));
        assert_eq!(store.get("world").unwrap(), world_before);
        assert_eq!(store.get(GLOBAL_KEY).unwrap(), Some("1,2,".to_string()));
    }

    #[test]
    fn test_records_are_byte_stable_across_rebuilds() {
        let (store, pipeline) = engine_parts();
        index_document(&store, &pipeline, "k1", "cruel crazy beautiful world").unwrap();
        let doc = store.get(" 1").unwrap();
        let crazi = store.get("crazi").unwrap();

        store.clear().unwrap();
        index_document(&store, &pipeline, "k1", "cruel crazy beautiful world").unwrap();
        assert_eq!(store.get(" 1").unwrap(), doc);
        assert_eq!(store.get("crazi").unwrap(), crazi);
    }
}
