//! Batch boolean scorer for pure SHOULD/MUST_NOT queries.
//!
//! Scores documents in windows of 2048: every optional scorer dumps
//! its matches of the window into per-slot score/count buckets, the
//! prohibited scorers stamp their docs, and the window is then swept in
//! doc order applying the coord factor per match count.

use crate::collector::Collector;
use crate::postings::DocSet;
use crate::query::{BulkScorer, Scorer};
use crate::{DocId, Result, NO_MORE_DOCS};

const WINDOW_SIZE: usize = 2048;

pub struct BooleanBulkScorer {
    optional: Vec<Box<dyn Scorer>>,
    prohibited: Vec<Box<dyn Scorer>>,
    coord_factors: Vec<f32>,
    minimum_matchers: usize,
    scores: Vec<f64>,
    counts: Vec<u32>,
    excluded: Vec<bool>,
}

impl BooleanBulkScorer {
    pub fn new(
        optional: Vec<Box<dyn Scorer>>,
        prohibited: Vec<Box<dyn Scorer>>,
        coord_factors: Vec<f32>,
        minimum_matchers: usize,
    ) -> BooleanBulkScorer {
        debug_assert!(minimum_matchers >= 1);
        BooleanBulkScorer {
            optional,
            prohibited,
            coord_factors,
            minimum_matchers,
            scores: vec![0.0; WINDOW_SIZE],
            counts: vec![0; WINDOW_SIZE],
            excluded: vec![false; WINDOW_SIZE],
        }
    }

    /// Smallest current doc across the optional scorers, advancing
    /// everything below `min` up to it first.
    fn align(&mut self, min: DocId) -> Result<DocId> {
        let mut smallest = NO_MORE_DOCS;
        for scorer in &mut self.optional {
            let mut doc = scorer.doc();
            if doc < min {
                doc = scorer.advance(min)?;
            }
            smallest = smallest.min(doc);
        }
        Ok(smallest)
    }
}

impl BulkScorer for BooleanBulkScorer {
    fn score_window(
        &mut self,
        collector: &mut dyn Collector,
        min: DocId,
        max: DocId,
    ) -> Result<DocId> {
        let mut window_base = self.align(min)?;
        while window_base < max {
            let window_end = window_base.saturating_add(WINDOW_SIZE as DocId).min(max);
            self.counts[..].fill(0);
            self.scores[..].fill(0.0);
            self.excluded[..].fill(false);

            for scorer in &mut self.optional {
                let mut doc = scorer.doc();
                while doc < window_end {
                    let slot = (doc - window_base) as usize;
                    self.counts[slot] += 1;
                    self.scores[slot] += f64::from(scorer.score()?);
                    doc = scorer.next_doc()?;
                }
            }
            for scorer in &mut self.prohibited {
                let mut doc = scorer.doc();
                if doc < window_base {
                    doc = scorer.advance(window_base)?;
                }
                while doc < window_end {
                    self.excluded[(doc - window_base) as usize] = true;
                    doc = scorer.next_doc()?;
                }
            }

            for slot in 0..(window_end - window_base) as usize {
                let count = self.counts[slot] as usize;
                if count >= self.minimum_matchers && !self.excluded[slot] {
                    let score = self.scores[slot] as f32 * self.coord_factors[count];
                    collector.collect(window_base + slot as DocId, score)?;
                }
            }

            window_base = self.align(window_end)?;
        }
        Ok(window_base)
    }
}

#[cfg(test)]
mod tests {
    use super::BooleanBulkScorer;
    use crate::collector::Collector;
    use crate::core::segment_reader::SegmentReader;
    use crate::query::test_util::ConstScorer;
    use crate::query::{BulkScorer, Scorer};
    use crate::{DocId, Result, Score};

    struct SinkCollector {
        hits: Vec<(DocId, Score)>,
    }

    impl Collector for SinkCollector {
        fn set_next_reader(&mut self, _reader: &SegmentReader, _doc_base: DocId) -> Result<()> {
            Ok(())
        }

        fn collect(&mut self, doc: DocId, score: Score) -> Result<()> {
            self.hits.push((doc, score));
            Ok(())
        }

        fn accepts_docs_out_of_order(&self) -> bool {
            true
        }
    }

    #[test]
    fn test_window_scoring_with_coord() {
        let optional: Vec<Box<dyn Scorer>> = vec![
            Box::new(ConstScorer::new(vec![1, 3000], 1.0)),
            Box::new(ConstScorer::new(vec![1, 4000], 2.0)),
        ];
        let scorer_coords = vec![0.0, 0.5, 1.0];
        let mut bulk = BooleanBulkScorer::new(optional, Vec::new(), scorer_coords, 1);
        let mut collector = SinkCollector { hits: Vec::new() };
        bulk.score_all(&mut collector).unwrap();
        assert_eq!(
            collector.hits,
            vec![(1, 3.0), (3000, 0.5), (4000, 1.0)]
        );
    }

    #[test]
    fn test_prohibited_docs_are_dropped() {
        let optional: Vec<Box<dyn Scorer>> =
            vec![Box::new(ConstScorer::new(vec![1, 2, 3], 1.0))];
        let prohibited: Vec<Box<dyn Scorer>> =
            vec![Box::new(ConstScorer::new(vec![2], 1.0))];
        let mut bulk =
            BooleanBulkScorer::new(optional, prohibited, vec![1.0, 1.0], 1);
        let mut collector = SinkCollector { hits: Vec::new() };
        bulk.score_all(&mut collector).unwrap();
        let docs: Vec<DocId> = collector.hits.iter().map(|&(doc, _)| doc).collect();
        assert_eq!(docs, vec![1, 3]);
    }

    #[test]
    fn test_minimum_matchers() {
        let optional: Vec<Box<dyn Scorer>> = vec![
            Box::new(ConstScorer::new(vec![1, 2], 1.0)),
            Box::new(ConstScorer::new(vec![2, 3], 1.0)),
        ];
        let mut bulk =
            BooleanBulkScorer::new(optional, Vec::new(), vec![1.0, 1.0, 1.0], 2);
        let mut collector = SinkCollector { hits: Vec::new() };
        bulk.score_all(&mut collector).unwrap();
        let docs: Vec<DocId> = collector.hits.iter().map(|&(doc, _)| doc).collect();
        assert_eq!(docs, vec![2]);
    }
}
