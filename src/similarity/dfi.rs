//! Divergence from independence: parameter-free and non-parametric.
//!
//! The expected frequency under independence is
//! `(F + 1) · dl / (fieldTokens + 1)`; a document scores 0 when the
//! observed frequency does not exceed it. Stop words should stay in
//! the index for this model to do its job.

use crate::similarity::basic::impl_similarity_base;
use crate::similarity::{BasicStats, Explanation, SimilarityBase};

/// Measures of divergence from independence.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Independence {
    ChiSquared,
    Saturated,
    Standardized,
}

impl Independence {
    pub fn score(&self, freq: f32, expected: f32) -> f32 {
        match self {
            Independence::ChiSquared => (freq - expected) * (freq - expected) / expected,
            Independence::Saturated => (freq - expected) / expected,
            Independence::Standardized => (freq - expected) / expected.sqrt(),
        }
    }
}

#[derive(Clone)]
pub struct DfiSimilarity {
    pub independence: Independence,
}

impl DfiSimilarity {
    pub fn new(independence: Independence) -> DfiSimilarity {
        DfiSimilarity { independence }
    }
}

impl Default for DfiSimilarity {
    fn default() -> DfiSimilarity {
        DfiSimilarity::new(Independence::ChiSquared)
    }
}

impl SimilarityBase for DfiSimilarity {
    fn score_from_stats(&self, stats: &BasicStats, freq: f32, doc_len: f32) -> f32 {
        let expected = (stats.total_term_freq as f32 + 1.0) * doc_len
            / (stats.number_of_field_tokens as f32 + 1.0);
        if freq <= expected {
            return 0.0;
        }
        let measure = self.independence.score(freq, expected);
        stats.total_boost * (f64::from(measure) + 1.0).log2() as f32
    }

    fn explain_from_stats(&self, stats: &BasicStats, freq: f32, doc_len: f32) -> Vec<Explanation> {
        let expected = (stats.total_term_freq as f32 + 1.0) * doc_len
            / (stats.number_of_field_tokens as f32 + 1.0);
        vec![
            Explanation::new(expected, "expected frequency under independence"),
            Explanation::new(freq, "observed frequency"),
        ]
    }
}

impl_similarity_base!(DfiSimilarity);

#[cfg(test)]
mod tests {
    use super::{DfiSimilarity, Independence};
    use crate::similarity::basic::BasicStats;
    use crate::similarity::tests::assert_normalization_idempotent;
    use crate::similarity::SimilarityBase;

    fn stats() -> BasicStats {
        let mut stats = BasicStats::new("body", 1.0);
        stats.number_of_documents = 100;
        stats.number_of_field_tokens = 10_000;
        stats.avg_field_length = 100.0;
        stats.doc_freq = 50;
        stats.total_term_freq = 200;
        stats
    }

    #[test]
    fn test_at_or_below_expected_scores_zero() {
        let sim = DfiSimilarity::default();
        let stats = stats();
        // expected = 201 * 100 / 10001 ≈ 2.01
        assert_eq!(sim.score_from_stats(&stats, 2.0, 100.0), 0.0);
        assert!(sim.score_from_stats(&stats, 5.0, 100.0) > 0.0);
    }

    #[test]
    fn test_measures_are_ordered_for_surprising_frequencies() {
        let (freq, expected) = (10.0, 2.0);
        assert!(
            Independence::ChiSquared.score(freq, expected)
                > Independence::Standardized.score(freq, expected)
        );
        assert!(
            Independence::Standardized.score(freq, expected)
                > Independence::Saturated.score(freq, expected)
        );
    }

    #[test]
    fn test_normalization_idempotent() {
        assert_normalization_idempotent(&DfiSimilarity::default());
    }
}
