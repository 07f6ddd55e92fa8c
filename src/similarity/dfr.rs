//! The divergence-from-randomness framework (Amati & Van Rijsbergen).
//!
//! A score is `boost · basic(stats, tfn) · afterEffect(stats, tfn)`
//! with `tfn` produced by a length normalization. The three components
//! are orthogonal closed families.

use std::f64::consts::{E, PI};

use crate::similarity::basic::impl_similarity_base;
use crate::similarity::{BasicStats, Explanation, SimilarityBase};

/// Basic models of information content.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BasicModel {
    /// Limiting form of Bose-Einstein.
    Be,
    /// Divergence approximation of the binomial.
    D,
    /// Geometric approximation of Bose-Einstein.
    G,
    /// Inverse term frequency.
    If,
    /// Inverse document frequency.
    In,
    /// Inverse expected document frequency.
    Ine,
    /// Poisson approximation of the binomial.
    P,
}

impl BasicModel {
    pub fn score(&self, stats: &BasicStats, tfn: f32) -> f32 {
        let tfn = f64::from(tfn);
        match self {
            BasicModel::Be => {
                // the approximation only holds when F << N, so fold F
                // into N
                let f = stats.total_term_freq as f64 + 1.0 + tfn;
                let n = f + stats.number_of_documents as f64;
                fn aux(n: f64, m: f64) -> f64 {
                    (m + 0.5) * (n / m).log2() + (n - m) * n.log2()
                }
                (-((n - 1.0) * E).log2() + aux(n + f - 1.0, n + f - tfn - 2.0)
                    - aux(f, f - tfn)) as f32
            }
            BasicModel::D => {
                // keep phi < 1 even for tiny F, else nphi goes negative
                let f = stats.total_term_freq as f64 + 1.0 + tfn;
                let phi = tfn / f;
                let nphi = 1.0 - phi;
                let p = 1.0 / (stats.number_of_documents as f64 + 1.0);
                let d = phi * (phi / p).log2() + nphi * (nphi / (1.0 - p)).log2();
                (d * f + 0.5 * (1.0 + 2.0 * PI * tfn * nphi).log2()) as f32
            }
            BasicModel::G => {
                let f = stats.total_term_freq as f64 + 1.0;
                let n = stats.number_of_documents as f64;
                let lambda = f / (n + f);
                ((lambda + 1.0).log2() + tfn * ((1.0 + lambda) / lambda).log2()) as f32
            }
            BasicModel::If => {
                let n = stats.number_of_documents as f64;
                let f = stats.total_term_freq as f64;
                (tfn * (1.0 + (n + 1.0) / (f + 0.5)).log2()) as f32
            }
            BasicModel::In => {
                let n = stats.number_of_documents as f64;
                let df = stats.doc_freq as f64;
                (tfn * ((n + 1.0) / (df + 0.5)).log2()) as f32
            }
            BasicModel::Ine => {
                let n = stats.number_of_documents as f64;
                let f = stats.total_term_freq as f64;
                let ne = n * (1.0 - ((n - 1.0) / n).powf(f));
                (tfn * ((n + 1.0) / (ne + 0.5)).log2()) as f32
            }
            BasicModel::P => {
                let lambda = (stats.total_term_freq as f64 + 1.0)
                    / (stats.number_of_documents as f64 + 1.0);
                (tfn * (tfn / lambda).log2()
                    + (lambda + 1.0 / (12.0 * tfn) - tfn) * std::f64::consts::LOG2_E
                    + 0.5 * (2.0 * PI * tfn).log2()) as f32
            }
        }
    }
}

/// First normalization of the information gain.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AfterEffect {
    /// No first normalization.
    None,
    /// Ratio of two Bernoulli processes.
    B,
    /// Laplace's law of succession.
    L,
}

impl AfterEffect {
    pub fn score(&self, stats: &BasicStats, tfn: f32) -> f32 {
        match self {
            AfterEffect::None => 1.0,
            AfterEffect::B => {
                let f = stats.total_term_freq as f32 + 1.0;
                let n = stats.doc_freq as f32 + 1.0;
                (f + 1.0) / (n * (tfn + 1.0))
            }
            AfterEffect::L => 1.0 / (tfn + 1.0),
        }
    }
}

/// Second (length) normalization of the term frequency.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Normalization {
    /// `tfn = tf` (no normalization).
    None,
    /// Uniform distribution of term frequency.
    H1(f32),
    /// Term frequency density inversely related to length.
    H2(f32),
    /// Dirichlet-prior normalization.
    H3(f32),
    /// Zipfian relation (Terrier's NormalizationP).
    Z(f32),
}

impl Normalization {
    pub fn h1() -> Normalization {
        Normalization::H1(1.0)
    }

    pub fn h2() -> Normalization {
        Normalization::H2(1.0)
    }

    pub fn h3() -> Normalization {
        Normalization::H3(800.0)
    }

    pub fn z() -> Normalization {
        Normalization::Z(0.30)
    }

    pub fn tfn(&self, stats: &BasicStats, tf: f32, doc_len: f32) -> f32 {
        match self {
            Normalization::None => tf,
            Normalization::H1(c) => tf * c * stats.avg_field_length / doc_len,
            Normalization::H2(c) => {
                tf * (1.0 + c * stats.avg_field_length / doc_len).log2()
            }
            Normalization::H3(mu) => {
                mu * (tf
                    + mu * (stats.total_term_freq as f32 + 1.0)
                        / (stats.number_of_field_tokens as f32 + 1.0))
                    / (doc_len + mu)
            }
            Normalization::Z(z) => tf * (stats.avg_field_length / doc_len).powf(*z),
        }
    }
}

/// DFR similarity: pick one of each component.
#[derive(Clone)]
pub struct DfrSimilarity {
    pub basic_model: BasicModel,
    pub after_effect: AfterEffect,
    pub normalization: Normalization,
}

impl DfrSimilarity {
    pub fn new(
        basic_model: BasicModel,
        after_effect: AfterEffect,
        normalization: Normalization,
    ) -> DfrSimilarity {
        DfrSimilarity {
            basic_model,
            after_effect,
            normalization,
        }
    }
}

impl SimilarityBase for DfrSimilarity {
    fn score_from_stats(&self, stats: &BasicStats, freq: f32, doc_len: f32) -> f32 {
        let tfn = self.normalization.tfn(stats, freq, doc_len);
        stats.total_boost * self.basic_model.score(stats, tfn) * self.after_effect.score(stats, tfn)
    }

    fn explain_from_stats(&self, stats: &BasicStats, freq: f32, doc_len: f32) -> Vec<Explanation> {
        let tfn = self.normalization.tfn(stats, freq, doc_len);
        let mut details = Vec::new();
        if stats.total_boost != 1.0 {
            details.push(Explanation::new(stats.total_boost, "boost"));
        }
        details.push(Explanation::new(tfn, "tfn"));
        details.push(Explanation::new(
            self.basic_model.score(stats, tfn),
            "basic model",
        ));
        details.push(Explanation::new(
            self.after_effect.score(stats, tfn),
            "after effect",
        ));
        details
    }
}

impl_similarity_base!(DfrSimilarity);

#[cfg(test)]
mod tests {
    use super::{AfterEffect, BasicModel, DfrSimilarity, Normalization};
    use crate::similarity::basic::BasicStats;
    use crate::similarity::tests::assert_normalization_idempotent;
    use crate::similarity::SimilarityBase;

    fn stats() -> BasicStats {
        let mut stats = BasicStats::new("body", 1.0);
        stats.number_of_documents = 1_000;
        stats.number_of_field_tokens = 50_000;
        stats.avg_field_length = 50.0;
        stats.doc_freq = 20;
        stats.total_term_freq = 60;
        stats
    }

    #[test]
    fn test_all_component_combinations_are_finite() {
        let models = [
            BasicModel::Be,
            BasicModel::D,
            BasicModel::G,
            BasicModel::If,
            BasicModel::In,
            BasicModel::Ine,
            BasicModel::P,
        ];
        let effects = [AfterEffect::None, AfterEffect::B, AfterEffect::L];
        let norms = [
            Normalization::None,
            Normalization::h1(),
            Normalization::h2(),
            Normalization::h3(),
            Normalization::z(),
        ];
        let stats = stats();
        for &model in &models {
            for &effect in &effects {
                for &norm in &norms {
                    let sim = DfrSimilarity::new(model, effect, norm);
                    let score = sim.score_from_stats(&stats, 3.0, 40.0);
                    assert!(
                        score.is_finite(),
                        "DFR({:?}, {:?}, {:?}) produced {}",
                        model,
                        effect,
                        norm,
                        score
                    );
                }
            }
        }
    }

    #[test]
    fn test_in_model_matches_closed_form() {
        // I(n) with no after effect and no normalization:
        // tfn * log2((N+1)/(df+0.5))
        let sim = DfrSimilarity::new(BasicModel::In, AfterEffect::None, Normalization::None);
        let stats = stats();
        let expected = 3.0 * ((1_000f32 + 1.0) / (20.0 + 0.5)).log2();
        let actual = sim.score_from_stats(&stats, 3.0, 40.0);
        assert!((actual - expected).abs() < 1e-4);
    }

    #[test]
    fn test_h2_dampens_long_documents() {
        let sim = DfrSimilarity::new(BasicModel::In, AfterEffect::L, Normalization::h2());
        let stats = stats();
        assert!(sim.score_from_stats(&stats, 3.0, 10.0) > sim.score_from_stats(&stats, 3.0, 500.0));
    }

    #[test]
    fn test_normalization_idempotent() {
        assert_normalization_idempotent(&DfrSimilarity::new(
            BasicModel::G,
            AfterEffect::B,
            Normalization::h2(),
        ));
    }
}
