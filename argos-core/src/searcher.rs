//! BM25 scoring and result emission
//!
//! Implements the Okapi BM25 ranking of Robertson et al. (TREC-4) over the
//! packed term records: IDF with no smoothing, term-frequency saturation
//! on both the document side (`k1`) and the query side (`k3`), and
//! document-length normalization (`b`). The accumulated score of each
//! document is divided by the number of distinct query terms, counting
//! terms absent from the index. That final division is not textbook BM25
//! but is part of the engine's observable ranking; changing it is a
//! breaking change.
//!
//! Scoring is stateless across calls; the document-length cache lives for
//! one query.

use std::ops::ControlFlow;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::analysis::Pipeline;
use crate::codec::{doc_key, DocRecord, TermRecord};
use crate::error::{Error, Result};
use crate::registry;
use crate::store::Store;
use crate::{DocId, Score};

/// BM25 tuning parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bm25Params {
    /// Document-side term frequency saturation (typically 1.2-2.0).
    pub k1: f32,
    /// Length normalization strength: 0 ignores document length, 1
    /// normalizes fully.
    pub b: f32,
    /// Query-side term frequency saturation.
    pub k3: f32,
}

impl Default for Bm25Params {
    fn default() -> Self {
        Self {
            k1: 1.2,
            b: 0.75,
            k3: 7.0,
        }
    }
}

impl Bm25Params {
    /// Range checks, run at query entry before any store read.
    pub fn validate(&self) -> Result<()> {
        if !self.k1.is_finite() || self.k1 < 0.0 {
            return Err(Error::Precondition(format!("k1 must be >= 0, got {}", self.k1)));
        }
        if !self.k3.is_finite() || self.k3 < 0.0 {
            return Err(Error::Precondition(format!("k3 must be >= 0, got {}", self.k3)));
        }
        if !self.b.is_finite() || !(0.0..=1.0).contains(&self.b) {
            return Err(Error::Precondition(format!(
                "b must be within [0, 1], got {}",
                self.b
            )));
        }
        Ok(())
    }
}

/// A query is either raw text, analyzed through the engine's pipeline, or
/// a pre-analyzed term sequence used as-is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Query {
    Text(String),
    Terms(Vec<String>),
}

impl From<&str> for Query {
    fn from(text: &str) -> Self {
        Query::Text(text.to_string())
    }
}

impl From<String> for Query {
    fn from(text: String) -> Self {
        Query::Text(text)
    }
}

impl From<Vec<String>> for Query {
    fn from(terms: Vec<String>) -> Self {
        Query::Terms(terms)
    }
}

/// One ranked result.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    /// The caller-chosen key, returned verbatim.
    pub caller_key: String,
    pub score: Score,
    pub doc_id: DocId,
}

/// Distinct query terms with their in-query frequencies, discovery order.
fn count_query_terms(terms: Vec<String>) -> Vec<(String, u32)> {
    let mut counts: Vec<(String, u32)> = Vec::new();
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

/// Score every document matching the query and emit results best-first.
///
/// The visitor receives `(caller_key, score, doc_id)` per result and
/// returns `ControlFlow::Break(())` to stop emission; the scoring pass is
/// already complete at that point.
pub fn search_with_callback<S, F>(
    store: &S,
    pipeline: &Pipeline,
    params: &Bm25Params,
    query: Query,
    mut visit: F,
) -> Result<()>
where
    S: Store,
    F: FnMut(&str, Score, DocId) -> ControlFlow<()>,
{
    params.validate()?;

    let terms = match query {
        Query::Text(text) => pipeline.run(&[&text]),
        Query::Terms(terms) => {
            if terms.iter().any(String::is_empty) {
                return Err(Error::BadQuery("the empty string is never a term".to_string()));
            }
            terms
        }
    };
    let query_counts = count_query_terms(terms);

    let globals = registry::globals(store)?;
    let doc_count = globals.doc_count as f32;
    let avg_len = globals.total_terms as f32 / doc_count;

    // Distinct query terms, counting ones absent from the index: the
    // accumulated sums are averaged over all of them.
    let distinct = query_counts.len() as f32;

    let mut scores: FxHashMap<DocId, Score> = FxHashMap::default();
    let mut len_cache: FxHashMap<DocId, u64> = FxHashMap::default();

    for (term, qf) in &query_counts {
        let Some(value) = store.get(term)? else {
            continue;
        };
        let record = TermRecord::decode(term, &value)?;

        let df = record.df() as f32;
        let idf = (doc_count / df).ln();
        let qf = *qf as f32;
        let qtf = qf * (params.k3 + 1.0) / (qf + params.k3);

        for posting in &record.postings {
            let len = match len_cache.get(&posting.doc_id) {
                Some(&len) => len,
                None => {
                    let key = doc_key(posting.doc_id);
                    let value = store.get(&key)?.ok_or_else(|| {
                        Error::Corruption(format!(
                            "term record {term:?} posts doc {} with no record at {key:?}",
                            posting.doc_id
                        ))
                    })?;
                    let len = DocRecord::doc_size_of(&key, &value)?;
                    len_cache.insert(posting.doc_id, len);
                    len
                }
            };

            let norm = (1.0 - params.b) + params.b * len as f32 / avg_len;
            let tf_raw = posting.count as f32;
            let tf = tf_raw * (params.k1 + 1.0) / (tf_raw + params.k1 * norm);
            *scores.entry(posting.doc_id).or_insert(0.0) += tf * idf * qtf;
        }
    }

    let mut ranked: Vec<(DocId, Score)> = scores
        .into_iter()
        .map(|(doc_id, score)| (doc_id, score / distinct))
        .collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));

    debug!(
        terms = query_counts.len(),
        hits = ranked.len(),
        "query scored"
    );

    for (doc_id, score) in ranked {
        let key = doc_key(doc_id);
        let value = store.get(&key)?.ok_or_else(|| {
            Error::Corruption(format!("ranked doc {doc_id} has no record at {key:?}"))
        })?;
        let caller_key = DocRecord::caller_key_of(&key, &value)?;
        if visit(caller_key, score, doc_id).is_break() {
            break;
        }
    }

    Ok(())
}

/// Collect up to `limit` ranked results; `limit == 0` means all of them.
pub fn search<S: Store>(
    store: &S,
    pipeline: &Pipeline,
    params: &Bm25Params,
    query: Query,
    limit: usize,
) -> Result<Vec<SearchHit>> {
    let mut hits = Vec::new();
    search_with_callback(store, pipeline, params, query, |caller_key, score, doc_id| {
        hits.push(SearchHit {
            caller_key: caller_key.to_string(),
            score,
            doc_id,
        });
        if limit != 0 && hits.len() >= limit {
            ControlFlow::Break(())
        } else {
            ControlFlow::Continue(())
        }
    })?;
    Ok(hits)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indexer::index_document;
    use crate::store::MemoryStore;

    fn corpus() -> (MemoryStore, Pipeline) {
        let store = MemoryStore::new();
        let pipeline = Pipeline::standard();
        for (key, text) in [
            ("1", "Hello world"),
            ("2", "World in motion"),
            ("3", "Cruel crazy beautiful world"),
            ("4", "Hey crazy"),
        ] {
            index_document(&store, &pipeline, key, text).unwrap();
        }
        (store, pipeline)
    }

    fn keys(hits: &[SearchHit]) -> Vec<&str> {
        hits.iter().map(|h| h.caller_key.as_str()).collect()
    }

    #[test]
    fn test_params_validation() {
        assert!(Bm25Params::default().validate().is_ok());
        assert!(Bm25Params { k1: -0.1, ..Default::default() }.validate().is_err());
        assert!(Bm25Params { k3: -1.0, ..Default::default() }.validate().is_err());
        assert!(Bm25Params { b: 1.5, ..Default::default() }.validate().is_err());
        assert!(Bm25Params { b: f32::NAN, ..Default::default() }.validate().is_err());
    }

    #[test]
    fn test_invalid_params_fail_before_any_read() {
        // An empty store would give EmptyIndex; Precondition must win.
        let store = MemoryStore::new();
        let pipeline = Pipeline::standard();
        let params = Bm25Params { b: 2.0, ..Default::default() };
        let err = search(&store, &pipeline, &params, "world".into(), 0).unwrap_err();
        assert!(matches!(err, Error::Precondition(_)));
    }

    #[test]
    fn test_search_on_empty_index() {
        let store = MemoryStore::new();
        let pipeline = Pipeline::standard();
        let err = search(&store, &pipeline, &Bm25Params::default(), "anything".into(), 10)
            .unwrap_err();
        assert!(matches!(err, Error::EmptyIndex));
    }

    #[test]
    fn test_shorter_documents_rank_higher() {
        let (store, pipeline) = corpus();
        let hits = search(&store, &pipeline, &Bm25Params::default(), "world".into(), 10).unwrap();
        assert_eq!(keys(&hits), vec!["2", "1", "3"]);
        assert!(hits[0].score > hits[1].score);
        assert!(hits[1].score > hits[2].score);
    }

    #[test]
    fn test_scores_are_finite_and_positive() {
        let (store, pipeline) = corpus();
        let hits = search(&store, &pipeline, &Bm25Params::default(), "crazy world".into(), 0)
            .unwrap();
        assert!(!hits.is_empty());
        for hit in &hits {
            assert!(hit.score.is_finite());
            assert!(hit.score > 0.0);
        }
    }

    #[test]
    fn test_b_zero_ignores_document_length() {
        let (store, pipeline) = corpus();
        let params = Bm25Params { b: 0.0, ..Default::default() };
        let hits = search(&store, &pipeline, &params, "world".into(), 0).unwrap();
        // Equal tf and idf everywhere; docs 1, 2, 3 tie and order falls
        // back to ascending doc id.
        assert_eq!(keys(&hits), vec!["1", "2", "3"]);
        assert!((hits[0].score - hits[2].score).abs() < 1e-6);
    }

    #[test]
    fn test_unmatched_terms_dilute_the_average() {
        let (store, pipeline) = corpus();
        let params = Bm25Params::default();
        let alone = search(&store, &pipeline, &params, "crazy".into(), 0).unwrap();
        // "xylophone" stems to a term with no postings; T doubles.
        let diluted = search(&store, &pipeline, &params, "crazy xylophone".into(), 0).unwrap();

        assert_eq!(keys(&alone), keys(&diluted));
        for (a, d) in alone.iter().zip(&diluted) {
            assert!((d.score - a.score / 2.0).abs() < 1e-6);
        }
    }

    #[test]
    fn test_term_sequence_query_skips_the_pipeline() {
        let (store, pipeline) = corpus();
        // Pre-analyzed terms are looked up verbatim, no pipeline pass.
        let hits = search(
            &store,
            &pipeline,
            &Bm25Params::default(),
            vec!["crazi".to_string()].into(),
            0,
        )
        .unwrap();
        assert_eq!(keys(&hits), vec!["4", "3"]);
    }

    #[test]
    fn test_empty_term_in_sequence_is_a_bad_query() {
        let (store, pipeline) = corpus();
        let err = search(
            &store,
            &pipeline,
            &Bm25Params::default(),
            vec!["crazi".to_string(), String::new()].into(),
            0,
        )
        .unwrap_err();
        assert!(matches!(err, Error::BadQuery(_)));
    }

    #[test]
    fn test_callback_early_stop() {
        let (store, pipeline) = corpus();
        let mut seen = Vec::new();
        search_with_callback(
            &store,
            &pipeline,
            &Bm25Params::default(),
            "world".into(),
            |caller_key, _score, _doc_id| {
                seen.push(caller_key.to_string());
                ControlFlow::Break(())
            },
        )
        .unwrap();
        assert_eq!(seen, vec!["2"]);
    }

    #[test]
    fn test_limit_zero_returns_everything() {
        let (store, pipeline) = corpus();
        let all = search(&store, &pipeline, &Bm25Params::default(), "world".into(), 0).unwrap();
        let capped = search(&store, &pipeline, &Bm25Params::default(), "world".into(), 2).unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(capped.len(), 2);
        assert_eq!(keys(&capped), vec!["2", "1"]);
    }

    #[test]
    fn test_missing_posting_target_is_corruption() {
        let (store, pipeline) = corpus();
        store.delete(&doc_key(2)).unwrap();
        let err = search(&store, &pipeline, &Bm25Params::default(), "world".into(), 0)
            .unwrap_err();
        assert!(matches!(err, Error::Corruption(_)));
    }
}
