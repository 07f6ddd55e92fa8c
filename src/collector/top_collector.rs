//! Top-k collection over a bounded min-heap.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::collector::Collector;
use crate::core::segment_reader::SegmentReader;
use crate::{DocId, Result, Score};

/// One hit: an index-wide doc id and its score.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreDoc {
    pub score: Score,
    pub doc: DocId,
}

/// Orders by "badness": the *greatest* element is the weakest hit, so
/// the binary heap's root is the candidate to beat. Ties on score are
/// broken toward smaller doc ids being better.
#[derive(Debug, Clone, Copy, PartialEq)]
struct HeapItem(ScoreDoc);

impl Eq for HeapItem {}

impl PartialOrd for HeapItem {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HeapItem {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .0
            .score
            .partial_cmp(&self.0.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| self.0.doc.cmp(&other.0.doc))
    }
}

/// Keeps the `k` best `(score, doc)` pairs, score descending, doc id
/// ascending among equal scores.
pub struct TopScoreDocCollector {
    limit: usize,
    heap: BinaryHeap<HeapItem>,
    doc_base: DocId,
    total_hits: usize,
}

impl TopScoreDocCollector {
    pub fn with_limit(limit: usize) -> TopScoreDocCollector {
        assert!(limit > 0, "limit must be strictly positive");
        TopScoreDocCollector {
            limit,
            heap: BinaryHeap::with_capacity(limit + 1),
            doc_base: 0,
            total_hits: 0,
        }
    }

    /// Number of documents collected, bounded or not.
    pub fn total_hits(&self) -> usize {
        self.total_hits
    }

    /// The hits, best first.
    pub fn top_docs(self) -> Vec<ScoreDoc> {
        self.heap
            .into_sorted_vec()
            .into_iter()
            .map(|item| item.0)
            .collect()
    }
}

impl Collector for TopScoreDocCollector {
    fn set_next_reader(&mut self, _reader: &SegmentReader, doc_base: DocId) -> Result<()> {
        self.doc_base = doc_base;
        Ok(())
    }

    fn collect(&mut self, doc: DocId, score: Score) -> Result<()> {
        self.total_hits += 1;
        let item = HeapItem(ScoreDoc {
            score,
            doc: self.doc_base + doc,
        });
        if self.heap.len() < self.limit {
            self.heap.push(item);
        } else if let Some(worst) = self.heap.peek() {
            if item < *worst {
                self.heap.pop();
                self.heap.push(item);
            }
        }
        Ok(())
    }

    fn accepts_docs_out_of_order(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::TopScoreDocCollector;
    use crate::collector::Collector;

    #[test]
    fn test_keeps_best_k() {
        let mut collector = TopScoreDocCollector::with_limit(2);
        for (doc, score) in [(0, 0.5), (1, 2.0), (2, 1.0), (3, 3.0)] {
            collector.collect(doc, score).unwrap();
        }
        assert_eq!(collector.total_hits(), 4);
        let top = collector.top_docs();
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].doc, 3);
        assert_eq!(top[0].score, 3.0);
        assert_eq!(top[1].doc, 1);
        assert_eq!(top[1].score, 2.0);
    }

    #[test]
    fn test_score_ties_break_on_doc_id() {
        let mut collector = TopScoreDocCollector::with_limit(3);
        for (doc, score) in [(5, 1.0), (1, 1.0), (9, 1.0), (3, 1.0)] {
            collector.collect(doc, score).unwrap();
        }
        let top = collector.top_docs();
        let docs: Vec<i32> = top.iter().map(|hit| hit.doc).collect();
        assert_eq!(docs, vec![1, 3, 5]);
    }

    #[test]
    fn test_fewer_hits_than_limit() {
        let mut collector = TopScoreDocCollector::with_limit(10);
        collector.collect(4, 0.25).unwrap();
        let top = collector.top_docs();
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].doc, 4);
    }
}
