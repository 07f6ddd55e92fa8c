/*!
Scoring framework.

A [`Similarity`] splits its work into three stages:

1. `compute_weight` runs once per query over collection-level
   statistics and produces a [`SimWeight`].
2. The weight takes part in two-pass query normalization
   (`value_for_normalization`, then `normalize`).
3. `sim_scorer` binds the weight to one segment's norms and yields the
   per-document hot path, [`SimScorer::score`].

Concrete families: TF-IDF, BM25 (with the L/+/ATIRE/Mod variants),
divergence-from-randomness, information-based, language models,
divergence-from-independence, plus the multi- and per-field
combinators.
*/

mod basic;
mod bm25;
mod dfi;
mod dfr;
mod explanation;
mod ib;
mod lm;
mod multi;
mod norm;
mod tfidf;

pub use self::basic::{BasicStats, BasicStatsWeight, SimilarityBase};
pub use self::bm25::{Bm25Similarity, Bm25Variant};
pub use self::dfi::{DfiSimilarity, Independence};
pub use self::dfr::{AfterEffect, BasicModel, DfrSimilarity, Normalization};
pub use self::explanation::Explanation;
pub use self::ib::{DistributionModel, IbSimilarity, LambdaModel};
pub use self::lm::{
    CollectionModel, DefaultCollectionModel, LmAbsoluteDiscountingSimilarity,
    LmDirichletSimilarity, LmHiemstraSimilarity, LmJelinekMercerSimilarity,
    LmPitmanYorProcessSimilarity, LmStats, LmTwoStageSimilarity, XSqrAMSimilarity,
};
pub use self::multi::{MultiSimilarity, PerFieldSimilarity};
pub use self::norm::{decode_norm, encode_norm, float_to_byte315, byte315_to_float, Norms};
pub use self::tfidf::DefaultSimilarity;

use std::any::Any;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use crate::{DocId, ErrorKind, Result, Score};

/// Field-wide statistics of one indexed field.
#[derive(Debug, Clone)]
pub struct CollectionStatistics {
    pub field: String,
    pub max_doc: i64,
    pub doc_count: i64,
    pub sum_total_term_freq: i64,
    pub sum_doc_freq: i64,
}

/// Statistics of one term.
#[derive(Debug, Clone)]
pub struct TermStatistics {
    pub term: Vec<u8>,
    pub doc_freq: i64,
    pub total_term_freq: i64,
}

/// Accumulated state of inverting one field of one document; input to
/// [`Similarity::compute_norm`].
#[derive(Debug, Clone)]
pub struct FieldInvertState {
    pub field_name: String,
    /// Number of tokens.
    pub length: u32,
    /// Number of tokens with a position increment of 0.
    pub num_overlap: u32,
    pub boost: f32,
}

impl FieldInvertState {
    pub fn new(field_name: &str) -> FieldInvertState {
        FieldInvertState {
            field_name: field_name.to_string(),
            length: 0,
            num_overlap: 0,
            boost: 1.0,
        }
    }
}

/// Collection-level scoring state of one query leaf.
pub trait SimWeight: Send {
    /// Contribution to the query norm; typically the squared raw
    /// weight.
    fn value_for_normalization(&self) -> f32;

    /// Second normalization pass: receives the query norm and any
    /// boost of enclosing queries.
    fn normalize(&mut self, query_norm: f32, top_level_boost: f32);

    fn as_any(&self) -> &dyn Any;
}

/// Per-segment, per-document scoring hot path.
pub trait SimScorer {
    fn score(&self, doc: DocId, freq: f32) -> Score;

    /// Factor for sloppy-phrase matches `distance` positions apart.
    fn compute_slop_factor(&self, distance: i32) -> f32 {
        1.0 / (distance as f32 + 1.0)
    }

    /// Factor from a payload at a given position; 1 by default.
    fn compute_payload_factor(&self, _doc: DocId, _start: i32, _end: i32, _payload: &[u8]) -> f32 {
        1.0
    }

    fn explain(&self, doc: DocId, freq: &Explanation) -> Explanation {
        let mut result = Explanation::new(
            self.score(doc, freq.value()),
            format!("score(doc={}, freq={}), with freq of:", doc, freq.value()),
        );
        result.add_detail(freq.clone());
        result
    }
}

/// Defines how terms are weighted and documents scored.
pub trait Similarity: Send + Sync {
    /// Scoring factor rewarding documents matching more of the
    /// optional boolean clauses.
    fn coord(&self, _overlap: usize, _max_overlap: usize) -> f32 {
        1.0
    }

    /// Normalization value for a query given the sum of squared leaf
    /// weights.
    fn query_norm(&self, _sum_of_squared_weights: f32) -> f32 {
        1.0
    }

    /// Index-time per-field-per-document norm byte.
    fn compute_norm(&self, state: &FieldInvertState) -> u8;

    fn compute_weight(
        &self,
        query_boost: f32,
        collection_stats: &CollectionStatistics,
        term_stats: &[TermStatistics],
    ) -> Box<dyn SimWeight>;

    /// Binds the weight to a segment's norms.
    fn sim_scorer(
        &self,
        weight: &dyn SimWeight,
        norms: Option<Norms>,
    ) -> Result<Box<dyn SimScorer>>;
}

lazy_static! {
    static ref DEFAULT_SIMILARITY: RwLock<Arc<dyn Similarity>> =
        RwLock::new(Arc::new(DefaultSimilarity::default()));
    static ref DEFAULT_SIMILARITY_SEALED: AtomicBool = AtomicBool::new(false);
}

/// The process-wide similarity used by searchers that were not handed
/// an explicit one. Reading it seals the hook.
pub fn default_similarity() -> Arc<dyn Similarity> {
    DEFAULT_SIMILARITY_SEALED.store(true, Ordering::Release);
    Arc::clone(&DEFAULT_SIMILARITY.read().expect("similarity hook poisoned"))
}

/// Replaces the process-wide default similarity. Only allowed before
/// the first searcher is constructed.
pub fn set_default_similarity(similarity: Arc<dyn Similarity>) -> Result<()> {
    if DEFAULT_SIMILARITY_SEALED.load(Ordering::Acquire) {
        return Err(ErrorKind::InvalidArgument(
            "default similarity cannot change after a searcher has used it".to_string(),
        )
        .into());
    }
    *DEFAULT_SIMILARITY.write().expect("similarity hook poisoned") = similarity;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Shared by the per-family test modules: normalizing twice with
    /// `(qn, 1)` then `(1, 1)` must equal normalizing once.
    pub(crate) fn assert_normalization_idempotent(similarity: &dyn Similarity) {
        let collection_stats = CollectionStatistics {
            field: "body".to_string(),
            max_doc: 100,
            doc_count: 100,
            sum_total_term_freq: 10_000,
            sum_doc_freq: 8_000,
        };
        let term_stats = [TermStatistics {
            term: b"tide".to_vec(),
            doc_freq: 7,
            total_term_freq: 23,
        }];

        let mut once = similarity.compute_weight(1.0, &collection_stats, &term_stats);
        let query_norm = similarity.query_norm(once.value_for_normalization());
        once.normalize(query_norm, 1.0);
        let scorer_once = similarity.sim_scorer(&*once, None).unwrap();

        let mut twice = similarity.compute_weight(1.0, &collection_stats, &term_stats);
        twice.normalize(query_norm, 1.0);
        twice.normalize(1.0, 1.0);
        let scorer_twice = similarity.sim_scorer(&*twice, None).unwrap();

        for freq in [1.0f32, 2.0, 10.0] {
            let a = scorer_once.score(0, freq);
            let b = scorer_twice.score(0, freq);
            assert!(
                (a - b).abs() < 1e-6,
                "normalization not idempotent: {} vs {}",
                a,
                b
            );
        }
    }

    #[test]
    fn test_slop_factor_at_zero_distance() {
        let sim = DefaultSimilarity::default();
        let stats = CollectionStatistics {
            field: "f".to_string(),
            max_doc: 1,
            doc_count: 1,
            sum_total_term_freq: 1,
            sum_doc_freq: 1,
        };
        let ts = [TermStatistics {
            term: b"x".to_vec(),
            doc_freq: 1,
            total_term_freq: 1,
        }];
        let weight = sim.compute_weight(1.0, &stats, &ts);
        let scorer = sim.sim_scorer(&*weight, None).unwrap();
        assert_eq!(scorer.compute_slop_factor(0), 1.0);
        assert!(scorer.compute_slop_factor(3) < 1.0);
    }
}
