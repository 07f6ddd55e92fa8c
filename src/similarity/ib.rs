//! Information-based models (Clinchant & Gaussier).
//!
//! `score = boost · -log Prob(X >= tfn | lambda)` with an orthogonal
//! choice of distribution, lambda estimator, and the DFR length
//! normalizations.

use crate::similarity::basic::impl_similarity_base;
use crate::similarity::{BasicStats, Explanation, Normalization, SimilarityBase};

/// Probabilistic distribution modeling term occurrence.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DistributionModel {
    /// Log-logistic.
    LL,
    /// Smoothed power-law.
    SPL,
}

impl DistributionModel {
    pub fn score(&self, tfn: f32, lambda: f32) -> f32 {
        match self {
            DistributionModel::LL => -(lambda / (tfn + lambda)).ln(),
            DistributionModel::SPL => {
                let lambda = if lambda == 1.0 { 0.99 } else { lambda };
                let (tfn, lambda) = (f64::from(tfn), f64::from(lambda));
                (-((lambda.powf(tfn / (tfn + 1.0)) - lambda) / (1.0 - lambda)).ln()) as f32
            }
        }
    }
}

/// Estimator of the distribution's lambda parameter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LambdaModel {
    /// `(df + 1) / (N + 1)`: average number of documents with the term.
    DF,
    /// `(F + 1) / (N + 1)`: average number of occurrences.
    TTF,
}

impl LambdaModel {
    pub fn lambda(&self, stats: &BasicStats) -> f32 {
        match self {
            LambdaModel::DF => {
                (stats.doc_freq as f32 + 1.0) / (stats.number_of_documents as f32 + 1.0)
            }
            LambdaModel::TTF => {
                (stats.total_term_freq as f32 + 1.0) / (stats.number_of_documents as f32 + 1.0)
            }
        }
    }
}

#[derive(Clone)]
pub struct IbSimilarity {
    pub distribution: DistributionModel,
    pub lambda: LambdaModel,
    pub normalization: Normalization,
}

impl IbSimilarity {
    pub fn new(
        distribution: DistributionModel,
        lambda: LambdaModel,
        normalization: Normalization,
    ) -> IbSimilarity {
        IbSimilarity {
            distribution,
            lambda,
            normalization,
        }
    }
}

impl SimilarityBase for IbSimilarity {
    fn score_from_stats(&self, stats: &BasicStats, freq: f32, doc_len: f32) -> f32 {
        let tfn = self.normalization.tfn(stats, freq, doc_len);
        stats.total_boost * self.distribution.score(tfn, self.lambda.lambda(stats))
    }

    fn explain_from_stats(&self, stats: &BasicStats, freq: f32, doc_len: f32) -> Vec<Explanation> {
        let tfn = self.normalization.tfn(stats, freq, doc_len);
        let lambda = self.lambda.lambda(stats);
        let mut details = Vec::new();
        if stats.total_boost != 1.0 {
            details.push(Explanation::new(stats.total_boost, "boost"));
        }
        details.push(Explanation::new(tfn, "tfn"));
        details.push(Explanation::new(lambda, "lambda"));
        details
    }
}

impl_similarity_base!(IbSimilarity);

#[cfg(test)]
mod tests {
    use super::{DistributionModel, IbSimilarity, LambdaModel};
    use crate::similarity::basic::BasicStats;
    use crate::similarity::tests::assert_normalization_idempotent;
    use crate::similarity::{Normalization, SimilarityBase};

    fn stats() -> BasicStats {
        let mut stats = BasicStats::new("body", 1.0);
        stats.number_of_documents = 500;
        stats.number_of_field_tokens = 20_000;
        stats.avg_field_length = 40.0;
        stats.doc_freq = 12;
        stats.total_term_freq = 30;
        stats
    }

    #[test]
    fn test_all_combinations_finite_and_positive() {
        let stats = stats();
        for &distribution in &[DistributionModel::LL, DistributionModel::SPL] {
            for &lambda in &[LambdaModel::DF, LambdaModel::TTF] {
                for norm in [
                    Normalization::None,
                    Normalization::h1(),
                    Normalization::h2(),
                    Normalization::h3(),
                    Normalization::z(),
                ] {
                    let sim = IbSimilarity::new(distribution, lambda, norm);
                    let score = sim.score_from_stats(&stats, 2.0, 35.0);
                    assert!(score.is_finite() && score > 0.0);
                }
            }
        }
    }

    #[test]
    fn test_ll_matches_closed_form() {
        let sim = IbSimilarity::new(DistributionModel::LL, LambdaModel::DF, Normalization::None);
        let stats = stats();
        let lambda = (12f32 + 1.0) / (500f32 + 1.0);
        let expected = -(lambda / (2.0 + lambda)).ln();
        assert!((sim.score_from_stats(&stats, 2.0, 35.0) - expected).abs() < 1e-5);
    }

    #[test]
    fn test_normalization_idempotent() {
        assert_normalization_idempotent(&IbSimilarity::new(
            DistributionModel::SPL,
            LambdaModel::TTF,
            Normalization::h2(),
        ));
    }
}
