//! The classic vector-space TF-IDF scoring.

use std::any::Any;

use crate::similarity::{
    byte315_to_float, float_to_byte315, CollectionStatistics, Explanation, FieldInvertState,
    Norms, SimScorer, SimWeight, Similarity, TermStatistics,
};
use crate::{DocId, ErrorKind, Result, Score};

/// `tf(f) = sqrt(f)`, `idf = 1 + ln(N / (df + 1))`, length norm
/// `boost / sqrt(numTerms)`, coord `overlap / maxOverlap`, query norm
/// `1 / sqrt(sum of squared weights)`.
pub struct DefaultSimilarity {
    pub discount_overlaps: bool,
}

impl Default for DefaultSimilarity {
    fn default() -> DefaultSimilarity {
        DefaultSimilarity {
            discount_overlaps: true,
        }
    }
}

impl DefaultSimilarity {
    fn tf(&self, freq: f32) -> f32 {
        freq.sqrt()
    }

    fn idf(&self, doc_freq: i64, num_docs: i64) -> f32 {
        (num_docs as f32 / (doc_freq as f32 + 1.0)).ln() + 1.0
    }

    fn length_norm(&self, state: &FieldInvertState) -> f32 {
        let num_terms = if self.discount_overlaps {
            state.length - state.num_overlap
        } else {
            state.length
        };
        state.boost * (1.0 / (num_terms.max(1) as f32).sqrt())
    }
}

impl Similarity for DefaultSimilarity {
    fn coord(&self, overlap: usize, max_overlap: usize) -> f32 {
        overlap as f32 / max_overlap as f32
    }

    fn query_norm(&self, sum_of_squared_weights: f32) -> f32 {
        1.0 / sum_of_squared_weights.sqrt()
    }

    fn compute_norm(&self, state: &FieldInvertState) -> u8 {
        float_to_byte315(self.length_norm(state))
    }

    fn compute_weight(
        &self,
        query_boost: f32,
        collection_stats: &CollectionStatistics,
        term_stats: &[TermStatistics],
    ) -> Box<dyn SimWeight> {
        // a phrase weight sums the idf of its terms
        let idf: f32 = term_stats
            .iter()
            .map(|stats| self.idf(stats.doc_freq, collection_stats.max_doc))
            .sum();
        Box::new(IdfStats {
            idf,
            query_boost,
            query_norm: 1.0,
            query_weight: idf * query_boost,
            value: 0.0,
        })
    }

    fn sim_scorer(
        &self,
        weight: &dyn SimWeight,
        norms: Option<Norms>,
    ) -> Result<Box<dyn SimScorer>> {
        let stats = weight
            .as_any()
            .downcast_ref::<IdfStats>()
            .ok_or_else(|| ErrorKind::InvalidArgument("weight is not an IdfStats".to_string()))?;
        Ok(Box::new(TfIdfSimScorer {
            weight_value: stats.value,
            idf: stats.idf,
            norms,
        }))
    }
}

/// The only statistic this model keeps between the two phases is idf.
struct IdfStats {
    idf: f32,
    query_boost: f32,
    query_norm: f32,
    query_weight: f32,
    /// `query_weight * idf`, ready for the per-doc product.
    value: f32,
}

impl SimWeight for IdfStats {
    fn value_for_normalization(&self) -> f32 {
        self.query_weight * self.query_weight
    }

    fn normalize(&mut self, query_norm: f32, top_level_boost: f32) {
        // cumulative on purpose: a later normalize(1, 1) is a no-op
        self.query_norm = query_norm * top_level_boost;
        self.query_weight *= self.query_norm;
        self.value = self.query_weight * self.idf;
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

struct TfIdfSimScorer {
    weight_value: f32,
    idf: f32,
    norms: Option<Norms>,
}

impl SimScorer for TfIdfSimScorer {
    fn score(&self, doc: DocId, freq: f32) -> Score {
        let raw = freq.sqrt() * self.weight_value;
        match &self.norms {
            Some(norms) => raw * byte315_to_float(norms.byte(doc)),
            None => raw,
        }
    }

    fn explain(&self, doc: DocId, freq: &Explanation) -> Explanation {
        let tf = freq.value().sqrt();
        let field_norm = self
            .norms
            .as_ref()
            .map_or(1.0, |norms| byte315_to_float(norms.byte(doc)));
        let mut field_expl = Explanation::new(
            tf * self.idf * field_norm,
            format!("fieldWeight in doc {}, product of:", doc),
        );
        let mut tf_expl = Explanation::new(tf, format!("tf(freq={}), with freq of:", freq.value()));
        tf_expl.add_detail(freq.clone());
        field_expl.add_detail(tf_expl);
        field_expl.add_detail(Explanation::new(self.idf, "idf"));
        field_expl.add_detail(Explanation::new(field_norm, format!("fieldNorm(doc={})", doc)));

        let query_weight = self.weight_value / self.idf.max(f32::MIN_POSITIVE);
        if (query_weight - 1.0).abs() < f32::EPSILON {
            return field_expl;
        }
        let mut result = Explanation::new(
            self.score(doc, freq.value()),
            format!("score(doc={}, freq={}), product of:", doc, freq.value()),
        );
        result.add_detail(Explanation::new(query_weight, "queryWeight"));
        result.add_detail(field_expl);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::DefaultSimilarity;
    use crate::similarity::tests::assert_normalization_idempotent;
    use crate::similarity::{CollectionStatistics, FieldInvertState, Similarity, TermStatistics};

    #[test]
    fn test_coord_and_query_norm() {
        let sim = DefaultSimilarity::default();
        assert_eq!(sim.coord(2, 2), 1.0);
        assert_eq!(sim.coord(1, 2), 0.5);
        assert!((sim.query_norm(4.0) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_rarer_terms_weigh_more() {
        let sim = DefaultSimilarity::default();
        assert!(sim.idf(2, 1000) > sim.idf(500, 1000));
    }

    #[test]
    fn test_longer_fields_get_smaller_norms() {
        let sim = DefaultSimilarity::default();
        let mut short = FieldInvertState::new("body");
        short.length = 4;
        let mut long = FieldInvertState::new("body");
        long.length = 400;
        assert!(sim.compute_norm(&short) > sim.compute_norm(&long));
    }

    #[test]
    fn test_discount_overlaps() {
        let sim = DefaultSimilarity::default();
        let mut with_overlap = FieldInvertState::new("body");
        with_overlap.length = 100;
        with_overlap.num_overlap = 96;
        let mut plain = FieldInvertState::new("body");
        plain.length = 4;
        assert_eq!(sim.compute_norm(&with_overlap), sim.compute_norm(&plain));
    }

    #[test]
    fn test_normalization_idempotent() {
        assert_normalization_idempotent(&DefaultSimilarity::default());
    }

    #[test]
    fn test_score_grows_with_freq() {
        let sim = DefaultSimilarity::default();
        let collection_stats = CollectionStatistics {
            field: "body".to_string(),
            max_doc: 10,
            doc_count: 10,
            sum_total_term_freq: 100,
            sum_doc_freq: 80,
        };
        let term_stats = [TermStatistics {
            term: b"fox".to_vec(),
            doc_freq: 3,
            total_term_freq: 5,
        }];
        let mut weight = sim.compute_weight(1.0, &collection_stats, &term_stats);
        weight.normalize(1.0, 1.0);
        let scorer = sim.sim_scorer(&*weight, None).unwrap();
        assert!(scorer.score(0, 4.0) > scorer.score(0, 1.0));
        assert!(scorer.score(0, 1.0) > 0.0);
    }
}
