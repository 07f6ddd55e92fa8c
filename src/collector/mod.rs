/*!
Collectors receive the matching documents of a search, segment by
segment, and fold them into a result (top-k hits, a count, ...).
*/

mod top_collector;

pub use self::top_collector::{ScoreDoc, TopScoreDocCollector};

use crate::core::segment_reader::SegmentReader;
use crate::{DocId, Result, Score};

pub trait Collector {
    /// Called before the first doc of each segment; `doc_base` maps
    /// segment-local doc ids to index-wide ones.
    fn set_next_reader(&mut self, reader: &SegmentReader, doc_base: DocId) -> Result<()>;

    /// Called once per matching document with its segment-local id.
    fn collect(&mut self, doc: DocId, score: Score) -> Result<()>;

    /// When false, docs arrive in strictly increasing order within a
    /// segment; bulk scorers that batch out of order must not be used.
    fn accepts_docs_out_of_order(&self) -> bool;
}

/// Counts matches, nothing else.
#[derive(Default)]
pub struct CountCollector {
    count: usize,
}

impl CountCollector {
    pub fn count(&self) -> usize {
        self.count
    }
}

impl Collector for CountCollector {
    fn set_next_reader(&mut self, _reader: &SegmentReader, _doc_base: DocId) -> Result<()> {
        Ok(())
    }

    fn collect(&mut self, _doc: DocId, _score: Score) -> Result<()> {
        self.count += 1;
        Ok(())
    }

    fn accepts_docs_out_of_order(&self) -> bool {
        true
    }
}
