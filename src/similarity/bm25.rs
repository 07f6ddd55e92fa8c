//! The BM25 family.
//!
//! One implementation carries the classic formula and its published
//! reshapes, selected by [`Bm25Variant`]:
//!
//! * `Classic` — Robertson et al., with the non-negative idf.
//! * `L` — Lv & Zhai's fix for over-penalized long documents.
//! * `Plus` — lower-bounds the tf normalization with a constant δ.
//! * `Atire` — Robertson-Walker idf `ln(N/df)`.
//! * `Modified` — `ln((N+1)/df)`, never negative.

use std::any::Any;

use crate::similarity::{
    byte315_to_float, float_to_byte315, CollectionStatistics, Explanation, FieldInvertState,
    Norms, SimScorer, SimWeight, Similarity, TermStatistics,
};
use crate::{DocId, ErrorKind, Result, Score};

pub const DEFAULT_K1: f32 = 1.2;
pub const DEFAULT_B: f32 = 0.75;
const DEFAULT_D: f32 = 0.5;
const DEFAULT_DELTA: f32 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Bm25Variant {
    Classic,
    /// BM25L with its shift parameter `d`.
    L(f32),
    /// BM25+ with its lower bound `delta`.
    Plus(f32),
    Atire,
    Modified,
}

pub struct Bm25Similarity {
    k1: f32,
    b: f32,
    variant: Bm25Variant,
    pub discount_overlaps: bool,
}

impl Default for Bm25Similarity {
    fn default() -> Bm25Similarity {
        Bm25Similarity::new(DEFAULT_K1, DEFAULT_B, Bm25Variant::Classic)
    }
}

impl Bm25Similarity {
    pub fn new(k1: f32, b: f32, variant: Bm25Variant) -> Bm25Similarity {
        let variant = match variant {
            Bm25Variant::L(d) if d <= 0.0 => Bm25Variant::L(DEFAULT_D),
            Bm25Variant::Plus(delta) if delta <= 0.0 => Bm25Variant::Plus(DEFAULT_DELTA),
            other => other,
        };
        Bm25Similarity {
            k1,
            b,
            variant,
            discount_overlaps: true,
        }
    }

    pub fn bm25l() -> Bm25Similarity {
        Bm25Similarity::new(DEFAULT_K1, DEFAULT_B, Bm25Variant::L(DEFAULT_D))
    }

    pub fn bm25_plus() -> Bm25Similarity {
        Bm25Similarity::new(DEFAULT_K1, DEFAULT_B, Bm25Variant::Plus(DEFAULT_DELTA))
    }

    pub fn atire() -> Bm25Similarity {
        Bm25Similarity::new(DEFAULT_K1, DEFAULT_B, Bm25Variant::Atire)
    }

    pub fn modified() -> Bm25Similarity {
        Bm25Similarity::new(DEFAULT_K1, DEFAULT_B, Bm25Variant::Modified)
    }

    fn idf(&self, doc_freq: i64, num_docs: i64) -> f32 {
        let (df, n) = (doc_freq as f64, num_docs as f64);
        let idf = match self.variant {
            Bm25Variant::Classic | Bm25Variant::Plus(_) => {
                (1.0 + (n - df + 0.5) / (df + 0.5)).ln()
            }
            Bm25Variant::L(_) => ((n + 1.0) / (df + 0.5)).ln(),
            Bm25Variant::Atire => (n / df).ln(),
            Bm25Variant::Modified => ((n + 1.0) / df).ln(),
        };
        idf as f32
    }

    /// `norm` is `dl / avgdl`, already decoded from the norm byte.
    fn tf_norm(&self, freq: f32, norm: f32) -> f32 {
        match self.variant {
            Bm25Variant::Classic | Bm25Variant::Atire | Bm25Variant::Modified => {
                freq * (self.k1 + 1.0) / (freq + self.k1 * (1.0 - self.b + self.b * norm))
            }
            Bm25Variant::Plus(delta) => {
                freq * (self.k1 + 1.0) / (freq + self.k1 * (1.0 - self.b + self.b * norm)) + delta
            }
            Bm25Variant::L(d) => {
                let tf_normalized = freq / (1.0 - self.b + self.b * norm);
                (self.k1 + 1.0) * (tf_normalized + d) / (self.k1 + tf_normalized + d)
            }
        }
    }

    fn avg_field_length(collection_stats: &CollectionStatistics) -> f32 {
        if collection_stats.sum_total_term_freq <= 0 {
            1.0
        } else {
            collection_stats.sum_total_term_freq as f32 / collection_stats.max_doc as f32
        }
    }
}

impl Similarity for Bm25Similarity {
    fn compute_norm(&self, state: &FieldInvertState) -> u8 {
        let num_terms = if self.discount_overlaps {
            state.length - state.num_overlap
        } else {
            state.length
        };
        float_to_byte315(state.boost / (num_terms.max(1) as f32).sqrt())
    }

    fn compute_weight(
        &self,
        query_boost: f32,
        collection_stats: &CollectionStatistics,
        term_stats: &[TermStatistics],
    ) -> Box<dyn SimWeight> {
        let idf: f32 = term_stats
            .iter()
            .map(|stats| self.idf(stats.doc_freq, collection_stats.max_doc))
            .sum();
        let avgdl = Bm25Similarity::avg_field_length(collection_stats);
        // norm byte → dl / avgdl, precomputed once per weight
        let mut cache = [0f32; 256];
        for (byte, slot) in cache.iter_mut().enumerate() {
            let decoded = byte315_to_float(byte as u8);
            let doc_len = if decoded == 0.0 { 1.0 } else { 1.0 / (decoded * decoded) };
            *slot = doc_len / avgdl;
        }
        Box::new(Bm25Stats {
            idf,
            avgdl,
            query_boost,
            top_level_boost: 1.0,
            weight: idf * query_boost,
            cache,
        })
    }

    fn sim_scorer(
        &self,
        weight: &dyn SimWeight,
        norms: Option<Norms>,
    ) -> Result<Box<dyn SimScorer>> {
        let stats = weight
            .as_any()
            .downcast_ref::<Bm25Stats>()
            .ok_or_else(|| ErrorKind::InvalidArgument("weight is not a Bm25Stats".to_string()))?;
        Ok(Box::new(Bm25SimScorer {
            k1: self.k1,
            b: self.b,
            variant: self.variant,
            weight_value: stats.weight,
            cache: stats.cache,
            norms,
        }))
    }
}

struct Bm25Stats {
    idf: f32,
    avgdl: f32,
    query_boost: f32,
    top_level_boost: f32,
    weight: f32,
    /// norm byte → `dl / avgdl`.
    cache: [f32; 256],
}

impl SimWeight for Bm25Stats {
    fn value_for_normalization(&self) -> f32 {
        let query_weight = self.idf * self.query_boost;
        query_weight * query_weight
    }

    fn normalize(&mut self, _query_norm: f32, top_level_boost: f32) {
        // BM25 ignores the query norm; only boosts propagate
        self.top_level_boost = top_level_boost;
        self.weight = self.idf * self.query_boost * top_level_boost;
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

struct Bm25SimScorer {
    k1: f32,
    b: f32,
    variant: Bm25Variant,
    weight_value: f32,
    cache: [f32; 256],
    norms: Option<Norms>,
}

impl Bm25SimScorer {
    fn tf_norm(&self, freq: f32, norm: f32) -> f32 {
        let helper = Bm25Similarity {
            k1: self.k1,
            b: self.b,
            variant: self.variant,
            discount_overlaps: true,
        };
        helper.tf_norm(freq, norm)
    }
}

impl SimScorer for Bm25SimScorer {
    fn score(&self, doc: DocId, freq: f32) -> Score {
        let norm = match &self.norms {
            // without norms, assume every document has average length
            None => 1.0,
            Some(norms) => self.cache[norms.byte(doc) as usize],
        };
        self.weight_value * self.tf_norm(freq, norm)
    }

    fn explain(&self, doc: DocId, freq: &Explanation) -> Explanation {
        let mut result = Explanation::new(
            self.score(doc, freq.value()),
            format!("score(doc={}, freq={}), product of:", doc, freq.value()),
        );
        result.add_detail(Explanation::new(self.weight_value, "idf * boost"));
        let norm = match &self.norms {
            None => 1.0,
            Some(norms) => self.cache[norms.byte(doc) as usize],
        };
        let mut tf_expl = Explanation::new(self.tf_norm(freq.value(), norm), "tfNorm, computed from:");
        tf_expl.add_detail(freq.clone());
        tf_expl.add_detail(Explanation::new(self.k1, "parameter k1"));
        tf_expl.add_detail(Explanation::new(self.b, "parameter b"));
        tf_expl.add_detail(Explanation::new(norm, "fieldLength / avgFieldLength"));
        result.add_detail(tf_expl);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::{Bm25Similarity, Bm25Variant};
    use crate::similarity::tests::assert_normalization_idempotent;
    use crate::similarity::{CollectionStatistics, Norms, Similarity, TermStatistics};

    fn stats() -> (CollectionStatistics, [TermStatistics; 1]) {
        (
            CollectionStatistics {
                field: "body".to_string(),
                max_doc: 100,
                doc_count: 100,
                sum_total_term_freq: 10_000,
                sum_doc_freq: 9_000,
            },
            [TermStatistics {
                term: b"x".to_vec(),
                doc_freq: 10,
                total_term_freq: 20,
            }],
        )
    }

    #[test]
    fn test_normalization_idempotent_all_variants() {
        assert_normalization_idempotent(&Bm25Similarity::default());
        assert_normalization_idempotent(&Bm25Similarity::bm25l());
        assert_normalization_idempotent(&Bm25Similarity::bm25_plus());
        assert_normalization_idempotent(&Bm25Similarity::atire());
        assert_normalization_idempotent(&Bm25Similarity::modified());
    }

    #[test]
    fn test_shorter_doc_scores_higher() {
        let sim = Bm25Similarity::default();
        let (collection_stats, term_stats) = stats();
        let mut weight = sim.compute_weight(1.0, &collection_stats, &term_stats);
        weight.normalize(1.0, 1.0);
        // doc 0 is short, doc 1 is long
        let norms = Norms::new(vec![
            sim.compute_norm(&{
                let mut s = crate::similarity::FieldInvertState::new("body");
                s.length = 10;
                s
            }),
            sim.compute_norm(&{
                let mut s = crate::similarity::FieldInvertState::new("body");
                s.length = 1000;
                s
            }),
        ]);
        let scorer = sim.sim_scorer(&*weight, Some(norms)).unwrap();
        assert!(scorer.score(0, 1.0) > scorer.score(1, 1.0));
    }

    #[test]
    fn test_idf_variants_ordering() {
        let classic = Bm25Similarity::default();
        let atire = Bm25Similarity::atire();
        // ATIRE idf: ln(N/df) = ln(10) for N=100, df=10
        assert!((atire.idf(10, 100) - (10f32).ln()).abs() < 1e-6);
        assert!(classic.idf(10, 100) > 0.0);
    }

    #[test]
    fn test_bm25_plus_is_lower_bounded() {
        let plus = Bm25Similarity::bm25_plus();
        let classic = Bm25Similarity::new(1.2, 0.75, Bm25Variant::Classic);
        // at equal idf-free tf, BM25+ exceeds classic by delta
        let tf_plus = plus.tf_norm(1.0, 5.0);
        let tf_classic = classic.tf_norm(1.0, 5.0);
        assert!((tf_plus - tf_classic - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_score_positive_without_norms() {
        let sim = Bm25Similarity::default();
        let (collection_stats, term_stats) = stats();
        let mut weight = sim.compute_weight(1.0, &collection_stats, &term_stats);
        weight.normalize(1.0, 1.0);
        let scorer = sim.sim_scorer(&*weight, None).unwrap();
        assert!(scorer.score(0, 2.0) > 0.0);
    }
}
