//! Similarity combinators: summing several models, and routing by
//! field name.

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use crate::similarity::{
    CollectionStatistics, Explanation, FieldInvertState, Norms, SimScorer, SimWeight, Similarity,
    TermStatistics,
};
use crate::{DocId, ErrorKind, Result, Score};

/// Sums the scores of a list of sub-similarities. Norms come from the
/// first one.
pub struct MultiSimilarity {
    sims: Vec<Arc<dyn Similarity>>,
}

impl MultiSimilarity {
    pub fn new(sims: Vec<Arc<dyn Similarity>>) -> MultiSimilarity {
        assert!(!sims.is_empty(), "MultiSimilarity needs at least one sub");
        MultiSimilarity { sims }
    }
}

struct MultiStats {
    sub_stats: Vec<Box<dyn SimWeight>>,
}

impl SimWeight for MultiStats {
    fn value_for_normalization(&self) -> f32 {
        let sum: f32 = self
            .sub_stats
            .iter()
            .map(|stats| stats.value_for_normalization())
            .sum();
        sum / self.sub_stats.len() as f32
    }

    fn normalize(&mut self, query_norm: f32, top_level_boost: f32) {
        for stats in &mut self.sub_stats {
            stats.normalize(query_norm, top_level_boost);
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

struct MultiSimScorer {
    sub_scorers: Vec<Box<dyn SimScorer>>,
}

impl SimScorer for MultiSimScorer {
    fn score(&self, doc: DocId, freq: f32) -> Score {
        self.sub_scorers
            .iter()
            .map(|scorer| scorer.score(doc, freq))
            .sum()
    }

    fn compute_slop_factor(&self, distance: i32) -> f32 {
        self.sub_scorers[0].compute_slop_factor(distance)
    }

    fn compute_payload_factor(&self, doc: DocId, start: i32, end: i32, payload: &[u8]) -> f32 {
        self.sub_scorers[0].compute_payload_factor(doc, start, end, payload)
    }

    fn explain(&self, doc: DocId, freq: &Explanation) -> Explanation {
        let mut result = Explanation::new(self.score(doc, freq.value()), "sum of:");
        for scorer in &self.sub_scorers {
            result.add_detail(scorer.explain(doc, freq));
        }
        result
    }
}

impl Similarity for MultiSimilarity {
    fn compute_norm(&self, state: &FieldInvertState) -> u8 {
        self.sims[0].compute_norm(state)
    }

    fn compute_weight(
        &self,
        query_boost: f32,
        collection_stats: &CollectionStatistics,
        term_stats: &[TermStatistics],
    ) -> Box<dyn SimWeight> {
        let sub_stats = self
            .sims
            .iter()
            .map(|sim| sim.compute_weight(query_boost, collection_stats, term_stats))
            .collect();
        Box::new(MultiStats { sub_stats })
    }

    fn sim_scorer(
        &self,
        weight: &dyn SimWeight,
        norms: Option<Norms>,
    ) -> Result<Box<dyn SimScorer>> {
        let stats = weight
            .as_any()
            .downcast_ref::<MultiStats>()
            .ok_or_else(|| ErrorKind::InvalidArgument("weight is not a MultiStats".to_string()))?;
        let sub_scorers = self
            .sims
            .iter()
            .zip(&stats.sub_stats)
            .map(|(sim, sub)| sim.sim_scorer(&**sub, norms.clone()))
            .collect::<Result<Vec<_>>>()?;
        Ok(Box::new(MultiSimScorer { sub_scorers }))
    }
}

/// Routes every call to a similarity chosen by field name.
pub struct PerFieldSimilarity {
    by_field: HashMap<String, Arc<dyn Similarity>>,
    default: Arc<dyn Similarity>,
}

impl PerFieldSimilarity {
    pub fn new(
        by_field: HashMap<String, Arc<dyn Similarity>>,
        default: Arc<dyn Similarity>,
    ) -> PerFieldSimilarity {
        PerFieldSimilarity { by_field, default }
    }

    fn get(&self, field: &str) -> &Arc<dyn Similarity> {
        self.by_field.get(field).unwrap_or(&self.default)
    }
}

struct PerFieldSimWeight {
    sim: Arc<dyn Similarity>,
    weight: Box<dyn SimWeight>,
}

impl SimWeight for PerFieldSimWeight {
    fn value_for_normalization(&self) -> f32 {
        self.weight.value_for_normalization()
    }

    fn normalize(&mut self, query_norm: f32, top_level_boost: f32) {
        self.weight.normalize(query_norm, top_level_boost);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Similarity for PerFieldSimilarity {
    fn compute_norm(&self, state: &FieldInvertState) -> u8 {
        self.get(&state.field_name).compute_norm(state)
    }

    fn compute_weight(
        &self,
        query_boost: f32,
        collection_stats: &CollectionStatistics,
        term_stats: &[TermStatistics],
    ) -> Box<dyn SimWeight> {
        let sim = Arc::clone(self.get(&collection_stats.field));
        let weight = sim.compute_weight(query_boost, collection_stats, term_stats);
        Box::new(PerFieldSimWeight { sim, weight })
    }

    fn sim_scorer(
        &self,
        weight: &dyn SimWeight,
        norms: Option<Norms>,
    ) -> Result<Box<dyn SimScorer>> {
        let per_field = weight
            .as_any()
            .downcast_ref::<PerFieldSimWeight>()
            .ok_or_else(|| {
                ErrorKind::InvalidArgument("weight is not a PerFieldSimWeight".to_string())
            })?;
        per_field.sim.sim_scorer(&*per_field.weight, norms)
    }
}

#[cfg(test)]
mod tests {
    use super::{MultiSimilarity, PerFieldSimilarity};
    use crate::similarity::{
        Bm25Similarity, CollectionStatistics, DefaultSimilarity, Similarity, TermStatistics,
    };
    use std::collections::HashMap;
    use std::sync::Arc;

    fn stats() -> (CollectionStatistics, [TermStatistics; 1]) {
        (
            CollectionStatistics {
                field: "body".to_string(),
                max_doc: 50,
                doc_count: 50,
                sum_total_term_freq: 5_000,
                sum_doc_freq: 4_000,
            },
            [TermStatistics {
                term: b"x".to_vec(),
                doc_freq: 5,
                total_term_freq: 9,
            }],
        )
    }

    #[test]
    fn test_multi_sums_sub_scores() {
        let bm25: Arc<dyn Similarity> = Arc::new(Bm25Similarity::default());
        let tfidf: Arc<dyn Similarity> = Arc::new(DefaultSimilarity::default());
        let multi = MultiSimilarity::new(vec![Arc::clone(&bm25), Arc::clone(&tfidf)]);
        let (collection_stats, term_stats) = stats();

        let score_of = |sim: &dyn Similarity| {
            let mut weight = sim.compute_weight(1.0, &collection_stats, &term_stats);
            weight.normalize(1.0, 1.0);
            sim.sim_scorer(&*weight, None).unwrap().score(0, 2.0)
        };

        let combined = score_of(&multi);
        let separate = score_of(&*bm25) + score_of(&*tfidf);
        assert!((combined - separate).abs() < 1e-5);
    }

    #[test]
    fn test_per_field_routing() {
        let mut by_field: HashMap<String, Arc<dyn Similarity>> = HashMap::new();
        by_field.insert("title".to_string(), Arc::new(DefaultSimilarity::default()));
        let per_field =
            PerFieldSimilarity::new(by_field, Arc::new(Bm25Similarity::default()));
        let (mut collection_stats, term_stats) = stats();

        // default route (bm25) and title route (tfidf) disagree
        let mut weight = per_field.compute_weight(1.0, &collection_stats, &term_stats);
        weight.normalize(1.0, 1.0);
        let bm25_score = per_field
            .sim_scorer(&*weight, None)
            .unwrap()
            .score(0, 2.0);

        collection_stats.field = "title".to_string();
        let mut weight = per_field.compute_weight(1.0, &collection_stats, &term_stats);
        weight.normalize(1.0, 1.0);
        let tfidf_score = per_field
            .sim_scorer(&*weight, None)
            .unwrap()
            .score(0, 2.0);

        assert!((bm25_score - tfidf_score).abs() > 1e-4);
    }
}
