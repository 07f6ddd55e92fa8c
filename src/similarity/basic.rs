//! Shared skeleton of the formula-driven similarities (DFR, IB, DFI).
//!
//! These families only differ in one function of `(stats, freq,
//! docLen)`; everything else — stats filling, weight normalization,
//! norm codec, per-doc scoring — is identical and lives here. The
//! [`impl_similarity_base!`] macro stamps the `Similarity` impl onto
//! each concrete family.

use std::any::Any;

use crate::similarity::{
    byte315_to_float, float_to_byte315, CollectionStatistics, Explanation, Norms, SimWeight,
    TermStatistics,
};

/// The statistics every formula-driven model works from.
#[derive(Debug, Clone)]
pub struct BasicStats {
    pub field: String,
    pub number_of_documents: i64,
    pub number_of_field_tokens: i64,
    pub avg_field_length: f32,
    pub doc_freq: i64,
    pub total_term_freq: i64,
    pub query_boost: f32,
    pub top_level_boost: f32,
    /// Product of the query boost and the top-level boost.
    pub total_boost: f32,
}

impl BasicStats {
    pub fn new(field: &str, query_boost: f32) -> BasicStats {
        BasicStats {
            field: field.to_string(),
            number_of_documents: 0,
            number_of_field_tokens: 0,
            avg_field_length: 0.0,
            doc_freq: 0,
            total_term_freq: 0,
            query_boost,
            top_level_boost: 1.0,
            total_boost: query_boost,
        }
    }

    pub fn fill(
        &mut self,
        collection_stats: &CollectionStatistics,
        term_stats: &TermStatistics,
    ) {
        let number_of_documents = collection_stats.max_doc;
        let doc_freq = term_stats.doc_freq;
        let mut total_term_freq = term_stats.total_term_freq;
        if total_term_freq == -1 {
            // codec did not supply it: substitute docFreq
            total_term_freq = doc_freq;
        }
        let sum_total_term_freq = collection_stats.sum_total_term_freq;
        let (number_of_field_tokens, avg_field_length) = if sum_total_term_freq <= 0 {
            // field does not exist; negative values would turn into
            // NaN/Inf in several models
            (doc_freq, 1.0)
        } else {
            (
                sum_total_term_freq,
                sum_total_term_freq as f32 / number_of_documents as f32,
            )
        };
        self.number_of_documents = number_of_documents;
        self.number_of_field_tokens = number_of_field_tokens;
        self.avg_field_length = avg_field_length;
        self.doc_freq = doc_freq;
        self.total_term_freq = total_term_freq;
    }
}

/// SimWeight over one `BasicStats` per query term.
pub struct BasicStatsWeight {
    pub stats: Vec<BasicStats>,
}

impl SimWeight for BasicStatsWeight {
    fn value_for_normalization(&self) -> f32 {
        let sum: f32 = self
            .stats
            .iter()
            .map(|stats| stats.query_boost * stats.query_boost)
            .sum();
        sum / self.stats.len().max(1) as f32
    }

    fn normalize(&mut self, _query_norm: f32, top_level_boost: f32) {
        for stats in &mut self.stats {
            stats.top_level_boost = top_level_boost;
            stats.total_boost = stats.query_boost * top_level_boost;
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// One function of `(stats, freq, docLen)` defines the whole model.
pub trait SimilarityBase: Clone + Send + Sync + 'static {
    fn score_from_stats(&self, stats: &BasicStats, freq: f32, doc_len: f32) -> f32;

    /// Extra detail nodes for `explain`.
    fn explain_from_stats(
        &self,
        _stats: &BasicStats,
        _freq: f32,
        _doc_len: f32,
    ) -> Vec<Explanation> {
        Vec::new()
    }
}

pub struct BasicSimScorer<S: SimilarityBase> {
    pub sim: S,
    pub stats: Vec<BasicStats>,
    pub norms: Option<Norms>,
}

impl<S: SimilarityBase> BasicSimScorer<S> {
    /// Decodes the norm byte back into the document length.
    pub fn doc_len(&self, doc: crate::DocId) -> f32 {
        match &self.norms {
            None => 1.0,
            Some(norms) => {
                let decoded = byte315_to_float(norms.byte(doc));
                if decoded == 0.0 {
                    1.0
                } else {
                    1.0 / (decoded * decoded)
                }
            }
        }
    }
}

impl<S: SimilarityBase> crate::similarity::SimScorer for BasicSimScorer<S> {
    fn score(&self, doc: crate::DocId, freq: f32) -> crate::Score {
        let doc_len = self.doc_len(doc);
        self.stats
            .iter()
            .map(|stats| self.sim.score_from_stats(stats, freq, doc_len))
            .sum()
    }

    fn explain(&self, doc: crate::DocId, freq: &Explanation) -> Explanation {
        let doc_len = self.doc_len(doc);
        let mut result = Explanation::new(
            self.score(doc, freq.value()),
            format!("score(doc={}, freq={}), computed from:", doc, freq.value()),
        );
        result.add_detail(freq.clone());
        for stats in &self.stats {
            for detail in self.sim.explain_from_stats(stats, freq.value(), doc_len) {
                result.add_detail(detail);
            }
        }
        result
    }
}

/// Shared `compute_norm`: `boost / sqrt(length)`, overlaps discounted.
pub fn compute_norm_default(state: &crate::similarity::FieldInvertState, discount_overlaps: bool) -> u8 {
    let num_terms = if discount_overlaps {
        state.length - state.num_overlap
    } else {
        state.length
    };
    float_to_byte315(state.boost / (num_terms.max(1) as f32).sqrt())
}

/// Implements `Similarity` for a type implementing [`SimilarityBase`].
macro_rules! impl_similarity_base {
    ($name:ty) => {
        impl crate::similarity::Similarity for $name {
            fn compute_norm(&self, state: &crate::similarity::FieldInvertState) -> u8 {
                crate::similarity::basic::compute_norm_default(state, true)
            }

            fn compute_weight(
                &self,
                query_boost: f32,
                collection_stats: &crate::similarity::CollectionStatistics,
                term_stats: &[crate::similarity::TermStatistics],
            ) -> Box<dyn crate::similarity::SimWeight> {
                let stats = term_stats
                    .iter()
                    .map(|ts| {
                        let mut stats = crate::similarity::BasicStats::new(
                            &collection_stats.field,
                            query_boost,
                        );
                        stats.fill(collection_stats, ts);
                        stats
                    })
                    .collect();
                Box::new(crate::similarity::BasicStatsWeight { stats })
            }

            fn sim_scorer(
                &self,
                weight: &dyn crate::similarity::SimWeight,
                norms: Option<crate::similarity::Norms>,
            ) -> crate::Result<Box<dyn crate::similarity::SimScorer>> {
                let stats = weight
                    .as_any()
                    .downcast_ref::<crate::similarity::BasicStatsWeight>()
                    .ok_or_else(|| {
                        crate::ErrorKind::InvalidArgument(
                            "weight is not a BasicStatsWeight".to_string(),
                        )
                    })?;
                Ok(Box::new(crate::similarity::basic::BasicSimScorer {
                    sim: self.clone(),
                    stats: stats.stats.clone(),
                    norms,
                }))
            }
        }
    };
}

pub(crate) use impl_similarity_base;

#[cfg(test)]
mod tests {
    use super::BasicStats;
    use crate::similarity::{CollectionStatistics, TermStatistics};

    #[test]
    fn test_fill_substitutes_missing_stats() {
        let mut stats = BasicStats::new("ghost", 1.0);
        stats.fill(
            &CollectionStatistics {
                field: "ghost".to_string(),
                max_doc: 10,
                doc_count: 0,
                sum_total_term_freq: -1,
                sum_doc_freq: -1,
            },
            &TermStatistics {
                term: b"x".to_vec(),
                doc_freq: 3,
                total_term_freq: -1,
            },
        );
        assert_eq!(stats.total_term_freq, 3);
        assert_eq!(stats.number_of_field_tokens, 3);
        assert_eq!(stats.avg_field_length, 1.0);
    }
}
