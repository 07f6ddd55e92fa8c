//! Language-model similarities.
//!
//! Each model smooths the document language model with a collection
//! model; the per-term collection probability lives on [`LmStats`], an
//! LM-only extension of the shared statistics, so the other families
//! never see it.

use std::any::Any;
use std::sync::Arc;

use crate::similarity::basic::compute_norm_default;
use crate::similarity::{
    byte315_to_float, BasicStats, CollectionStatistics, Explanation, FieldInvertState, Norms,
    SimScorer, SimWeight, Similarity, TermStatistics,
};
use crate::{DocId, ErrorKind, Result, Score};

pub const DEFAULT_MU: f32 = 2000.0;
pub const DEFAULT_LAMBDA_JM: f32 = 0.7;
pub const DEFAULT_DELTA_AD: f32 = 0.7;
pub const DEFAULT_LAMBDA_HIEMSTRA: f32 = 0.15;

/// Strategy producing a per-term collection probability.
pub trait CollectionModel: Send + Sync {
    fn compute_probability(&self, stats: &BasicStats) -> f32;
}

/// Maximum-likelihood estimate with Laplace smoothing:
/// `(F + 1) / (fieldTokens + 1)`.
#[derive(Debug, Default)]
pub struct DefaultCollectionModel;

impl CollectionModel for DefaultCollectionModel {
    fn compute_probability(&self, stats: &BasicStats) -> f32 {
        (stats.total_term_freq as f32 + 1.0) / (stats.number_of_field_tokens as f32 + 1.0)
    }
}

/// [`BasicStats`] plus the collection probability LM models need.
#[derive(Debug, Clone)]
pub struct LmStats {
    pub basic: BasicStats,
    pub collection_probability: f32,
}

pub struct LmStatsWeight {
    pub stats: Vec<LmStats>,
}

impl SimWeight for LmStatsWeight {
    fn value_for_normalization(&self) -> f32 {
        let sum: f32 = self
            .stats
            .iter()
            .map(|stats| stats.basic.query_boost * stats.basic.query_boost)
            .sum();
        sum / self.stats.len().max(1) as f32
    }

    fn normalize(&mut self, _query_norm: f32, top_level_boost: f32) {
        for stats in &mut self.stats {
            stats.basic.top_level_boost = top_level_boost;
            stats.basic.total_boost = stats.basic.query_boost * top_level_boost;
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// One function of `(LmStats, freq, docLen)` defines the model.
trait LmScoring: Clone + Send + Sync + 'static {
    fn score_lm(&self, stats: &LmStats, freq: f32, doc_len: f32) -> f32;
    fn name(&self) -> String;
}

struct LmSimScorer<S: LmScoring> {
    sim: S,
    stats: Vec<LmStats>,
    norms: Option<Norms>,
}

impl<S: LmScoring> LmSimScorer<S> {
    fn doc_len(&self, doc: DocId) -> f32 {
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

impl<S: LmScoring> SimScorer for LmSimScorer<S> {
    fn score(&self, doc: DocId, freq: f32) -> Score {
        let doc_len = self.doc_len(doc);
        self.stats
            .iter()
            .map(|stats| self.sim.score_lm(stats, freq, doc_len))
            .sum()
    }

    fn explain(&self, doc: DocId, freq: &Explanation) -> Explanation {
        let mut result = Explanation::new(
            self.score(doc, freq.value()),
            format!("{}, score(doc={}, freq={}):", self.sim.name(), doc, freq.value()),
        );
        result.add_detail(freq.clone());
        for stats in &self.stats {
            result.add_detail(Explanation::new(
                stats.collection_probability,
                "collection probability",
            ));
        }
        result
    }
}

macro_rules! impl_lm_similarity {
    ($name:ty) => {
        impl Similarity for $name {
            fn compute_norm(&self, state: &FieldInvertState) -> u8 {
                compute_norm_default(state, true)
            }

            fn compute_weight(
                &self,
                query_boost: f32,
                collection_stats: &CollectionStatistics,
                term_stats: &[TermStatistics],
            ) -> Box<dyn SimWeight> {
                let stats = term_stats
                    .iter()
                    .map(|ts| {
                        let mut basic = BasicStats::new(&collection_stats.field, query_boost);
                        basic.fill(collection_stats, ts);
                        let collection_probability =
                            self.collection_model.compute_probability(&basic);
                        LmStats {
                            basic,
                            collection_probability,
                        }
                    })
                    .collect();
                Box::new(LmStatsWeight { stats })
            }

            fn sim_scorer(
                &self,
                weight: &dyn SimWeight,
                norms: Option<Norms>,
            ) -> Result<Box<dyn SimScorer>> {
                let stats = weight
                    .as_any()
                    .downcast_ref::<LmStatsWeight>()
                    .ok_or_else(|| {
                        ErrorKind::InvalidArgument("weight is not an LmStatsWeight".to_string())
                    })?;
                Ok(Box::new(LmSimScorer {
                    sim: self.clone(),
                    stats: stats.stats.clone(),
                    norms,
                }))
            }
        }
    };
}

/// Bayesian smoothing with Dirichlet priors (Zhai & Lafferty). Scores
/// the paper would make negative are clamped at 0.
#[derive(Clone)]
pub struct LmDirichletSimilarity {
    pub mu: f32,
    collection_model: Arc<dyn CollectionModel>,
}

impl LmDirichletSimilarity {
    pub fn new(mu: f32) -> LmDirichletSimilarity {
        LmDirichletSimilarity {
            mu,
            collection_model: Arc::new(DefaultCollectionModel),
        }
    }

    pub fn with_model(collection_model: Arc<dyn CollectionModel>, mu: f32) -> LmDirichletSimilarity {
        LmDirichletSimilarity {
            mu,
            collection_model,
        }
    }
}

impl Default for LmDirichletSimilarity {
    fn default() -> LmDirichletSimilarity {
        LmDirichletSimilarity::new(DEFAULT_MU)
    }
}

impl LmScoring for LmDirichletSimilarity {
    fn score_lm(&self, stats: &LmStats, freq: f32, doc_len: f32) -> f32 {
        let score = stats.basic.total_boost
            * ((1.0 + freq / (self.mu * stats.collection_probability)).ln()
                + (self.mu / (doc_len + self.mu)).ln());
        score.max(0.0)
    }

    fn name(&self) -> String {
        format!("LM Dirichlet({:.2})", self.mu)
    }
}

impl_lm_similarity!(LmDirichletSimilarity);

/// Jelinek-Mercer smoothing: interpolation with a fixed lambda.
#[derive(Clone)]
pub struct LmJelinekMercerSimilarity {
    pub lambda: f32,
    collection_model: Arc<dyn CollectionModel>,
}

impl LmJelinekMercerSimilarity {
    pub fn new(lambda: f32) -> LmJelinekMercerSimilarity {
        LmJelinekMercerSimilarity {
            lambda,
            collection_model: Arc::new(DefaultCollectionModel),
        }
    }
}

impl Default for LmJelinekMercerSimilarity {
    fn default() -> LmJelinekMercerSimilarity {
        LmJelinekMercerSimilarity::new(DEFAULT_LAMBDA_JM)
    }
}

impl LmScoring for LmJelinekMercerSimilarity {
    fn score_lm(&self, stats: &LmStats, freq: f32, doc_len: f32) -> f32 {
        stats.basic.total_boost
            * ((1.0
                + ((1.0 - self.lambda) * freq / doc_len)
                    / (self.lambda * stats.collection_probability))
                .ln()
                + self.lambda.ln())
    }

    fn name(&self) -> String {
        format!("LM Jelinek-Mercer({:.2})", self.lambda)
    }
}

impl_lm_similarity!(LmJelinekMercerSimilarity);

/// Absolute discounting: subtracts a constant from seen counts, so
/// rare events are discounted relatively more.
#[derive(Clone)]
pub struct LmAbsoluteDiscountingSimilarity {
    pub delta: f32,
    collection_model: Arc<dyn CollectionModel>,
}

impl LmAbsoluteDiscountingSimilarity {
    pub fn new(delta: f32) -> LmAbsoluteDiscountingSimilarity {
        LmAbsoluteDiscountingSimilarity {
            delta,
            collection_model: Arc::new(DefaultCollectionModel),
        }
    }
}

impl Default for LmAbsoluteDiscountingSimilarity {
    fn default() -> LmAbsoluteDiscountingSimilarity {
        LmAbsoluteDiscountingSimilarity::new(DEFAULT_DELTA_AD)
    }
}

impl LmScoring for LmAbsoluteDiscountingSimilarity {
    fn score_lm(&self, stats: &LmStats, freq: f32, doc_len: f32) -> f32 {
        let field_tokens = stats.basic.number_of_field_tokens as f32;
        stats.basic.total_boost
            * ((1.0
                + (freq - self.delta)
                    / (self.delta * field_tokens * stats.collection_probability))
                .ln()
                + (self.delta * field_tokens / doc_len).ln())
    }

    fn name(&self) -> String {
        format!("LM AbsoluteDiscounting({:.2})", self.delta)
    }
}

impl_lm_similarity!(LmAbsoluteDiscountingSimilarity);

/// Hiemstra's language model.
#[derive(Clone)]
pub struct LmHiemstraSimilarity {
    pub lambda: f32,
    collection_model: Arc<dyn CollectionModel>,
}

impl LmHiemstraSimilarity {
    pub fn new(lambda: f32) -> LmHiemstraSimilarity {
        LmHiemstraSimilarity {
            lambda,
            collection_model: Arc::new(DefaultCollectionModel),
        }
    }
}

impl Default for LmHiemstraSimilarity {
    fn default() -> LmHiemstraSimilarity {
        LmHiemstraSimilarity::new(DEFAULT_LAMBDA_HIEMSTRA)
    }
}

impl LmScoring for LmHiemstraSimilarity {
    fn score_lm(&self, stats: &LmStats, freq: f32, doc_len: f32) -> f32 {
        let score = stats.basic.total_boost
            * (1.0
                + (self.lambda * freq * stats.basic.number_of_field_tokens as f32)
                    / ((1.0 - self.lambda) * stats.basic.total_term_freq as f32 * doc_len))
                .ln();
        score.max(0.0)
    }

    fn name(&self) -> String {
        format!("LM Hiemstra({:.2})", self.lambda)
    }
}

impl_lm_similarity!(LmHiemstraSimilarity);

/// Pitman-Yor process smoothing: power-law discounting on top of a
/// Dirichlet-smoothed model.
#[derive(Clone)]
pub struct LmPitmanYorProcessSimilarity {
    pub mu: f32,
    pub delta: f32,
    collection_model: Arc<dyn CollectionModel>,
}

impl LmPitmanYorProcessSimilarity {
    pub fn new(mu: f32, delta: f32) -> LmPitmanYorProcessSimilarity {
        LmPitmanYorProcessSimilarity {
            mu,
            delta,
            collection_model: Arc::new(DefaultCollectionModel),
        }
    }
}

impl Default for LmPitmanYorProcessSimilarity {
    fn default() -> LmPitmanYorProcessSimilarity {
        LmPitmanYorProcessSimilarity::new(DEFAULT_MU, DEFAULT_DELTA_AD)
    }
}

impl LmScoring for LmPitmanYorProcessSimilarity {
    fn score_lm(&self, stats: &LmStats, freq: f32, doc_len: f32) -> f32 {
        let tw = if freq > 0.0 {
            f64::from(freq).powf(f64::from(self.delta))
        } else {
            0.0
        };
        let freq_prime = (f64::from(freq) - f64::from(self.delta) * tw).max(0.0);
        let score = stats.basic.total_boost
            * (((1.0 + freq_prime / f64::from(self.mu * stats.collection_probability)).ln()
                + (1.0
                    - f64::from(
                        stats.basic.number_of_field_tokens as f32 / (doc_len + self.mu),
                    ))
                .ln()) as f32);
        score.max(0.0)
    }

    fn name(&self) -> String {
        format!("LM Pitman-Yor-Process(mu={:.2}, delta={:.2})", self.mu, self.delta)
    }
}

impl_lm_similarity!(LmPitmanYorProcessSimilarity);

/// Two-stage smoothing (Zhai & Lafferty): a generalization of both
/// Dirichlet and Jelinek-Mercer. `lambda = 1` recovers Dirichlet;
/// large `mu` with the JM lambda recovers Jelinek-Mercer.
#[derive(Clone)]
pub struct LmTwoStageSimilarity {
    pub lambda: f32,
    pub mu: f32,
    collection_model: Arc<dyn CollectionModel>,
}

impl LmTwoStageSimilarity {
    pub fn new(lambda: f32, mu: f32) -> LmTwoStageSimilarity {
        LmTwoStageSimilarity {
            lambda,
            mu,
            collection_model: Arc::new(DefaultCollectionModel),
        }
    }
}

impl Default for LmTwoStageSimilarity {
    fn default() -> LmTwoStageSimilarity {
        LmTwoStageSimilarity::new(DEFAULT_LAMBDA_JM, DEFAULT_MU)
    }
}

impl LmScoring for LmTwoStageSimilarity {
    fn score_lm(&self, stats: &LmStats, freq: f32, doc_len: f32) -> f32 {
        let norm = ((1.0 - self.lambda) * doc_len + self.mu) / (doc_len + self.mu);
        stats.basic.total_boost
            * ((1.0
                + (self.lambda * freq)
                    / (((1.0 - self.lambda) * doc_len + self.mu)
                        * stats.collection_probability))
                .ln()
                + norm.ln())
    }

    fn name(&self) -> String {
        format!("LM Two-Stage(lambda={:.2}, mu={:.2})", self.lambda, self.mu)
    }
}

impl_lm_similarity!(LmTwoStageSimilarity);

/// XSqrA_M: inner product of Pearson's X² with the information growth
/// computed with the multinomial M. Parameter-free.
#[derive(Clone)]
pub struct XSqrAMSimilarity {
    collection_model: Arc<dyn CollectionModel>,
}

impl XSqrAMSimilarity {
    pub fn new() -> XSqrAMSimilarity {
        XSqrAMSimilarity {
            collection_model: Arc::new(DefaultCollectionModel),
        }
    }
}

impl Default for XSqrAMSimilarity {
    fn default() -> XSqrAMSimilarity {
        XSqrAMSimilarity::new()
    }
}

impl LmScoring for XSqrAMSimilarity {
    fn score_lm(&self, stats: &LmStats, freq: f32, doc_len: f32) -> f32 {
        let mle_d = freq / doc_len;
        let smoothed_probability = (freq + 1.0) / (doc_len + 1.0);
        let mle_c = stats.collection_probability;
        let x_sqr_a = (1.0 - mle_d) * (1.0 - mle_d) / (freq + 1.0);
        let information_delta = (freq + 1.0) * (smoothed_probability / mle_c).ln()
            - freq * (mle_d / mle_c).ln()
            + 0.5 * (smoothed_probability / mle_d).ln();
        stats.basic.total_boost * freq * x_sqr_a * information_delta
    }

    fn name(&self) -> String {
        "XSqrA_M".to_string()
    }
}

impl_lm_similarity!(XSqrAMSimilarity);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::similarity::tests::assert_normalization_idempotent;

    fn lm_stats() -> LmStats {
        let mut basic = BasicStats::new("body", 1.0);
        basic.number_of_documents = 1_000;
        basic.number_of_field_tokens = 100_000;
        basic.avg_field_length = 100.0;
        basic.doc_freq = 30;
        basic.total_term_freq = 90;
        LmStats {
            collection_probability: DefaultCollectionModel.compute_probability(&basic),
            basic,
        }
    }

    #[test]
    fn test_dirichlet_prefers_more_occurrences() {
        let sim = LmDirichletSimilarity::default();
        let stats = lm_stats();
        assert!(sim.score_lm(&stats, 5.0, 100.0) > sim.score_lm(&stats, 1.0, 100.0));
    }

    #[test]
    fn test_dirichlet_clamps_negative_scores() {
        let sim = LmDirichletSimilarity::default();
        let stats = lm_stats();
        // one occurrence in a huge document: the paper's formula goes
        // negative, the implementation returns 0
        assert_eq!(sim.score_lm(&stats, 1.0, 1_000_000.0), 0.0);
    }

    #[test]
    fn test_collection_probability_is_laplace_smoothed_mle() {
        let stats = lm_stats();
        assert!((stats.collection_probability - 91.0 / 100_001.0).abs() < 1e-9);
    }

    #[test]
    fn test_all_lm_models_finite() {
        let stats = lm_stats();
        let scores = [
            LmDirichletSimilarity::default().score_lm(&stats, 3.0, 80.0),
            LmJelinekMercerSimilarity::default().score_lm(&stats, 3.0, 80.0),
            LmAbsoluteDiscountingSimilarity::default().score_lm(&stats, 3.0, 80.0),
            LmHiemstraSimilarity::default().score_lm(&stats, 3.0, 80.0),
            LmPitmanYorProcessSimilarity::default().score_lm(&stats, 3.0, 80.0),
            LmTwoStageSimilarity::default().score_lm(&stats, 3.0, 80.0),
            XSqrAMSimilarity::default().score_lm(&stats, 3.0, 80.0),
        ];
        for score in scores {
            assert!(score.is_finite());
        }
    }

    #[test]
    fn test_normalization_idempotent() {
        assert_normalization_idempotent(&LmDirichletSimilarity::default());
        assert_normalization_idempotent(&LmJelinekMercerSimilarity::default());
        assert_normalization_idempotent(&LmTwoStageSimilarity::default());
    }
}
