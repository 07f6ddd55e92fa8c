/*!
Query module

The query module regroups all of tallyho's query objects: the query
tree types, the collection-level weights they compile into, and the
per-segment scorers that walk postings and hand scored docs to a
collector.
*/

mod boolean_query;
mod boolean_scorer;
mod conjunction_scorer;
mod disjunction_scorer;
mod min_should_match_scorer;
mod occur;
mod phrase_query;
mod req_excl_scorer;
mod req_opt_scorer;
mod term_query;

pub use self::boolean_query::{BooleanClause, BooleanQuery};
pub use self::boolean_scorer::BooleanBulkScorer;
pub use self::conjunction_scorer::ConjunctionScorer;
pub use self::disjunction_scorer::DisjunctionSumScorer;
pub use self::min_should_match_scorer::MinShouldMatchSumScorer;
pub use self::occur::Occur;
pub use self::phrase_query::PhraseQuery;
pub use self::req_excl_scorer::ReqExclScorer;
pub use self::req_opt_scorer::{ReqMultiOptScorer, ReqOptSumScorer, ReqSingleOptScorer};
pub use self::term_query::TermQuery;

use std::any::Any;
use std::fmt;

use crate::collector::Collector;
use crate::core::searcher::Searcher;
use crate::core::segment_reader::SegmentReader;
use crate::postings::{DocSet, LiveDocs};
use crate::similarity::Explanation;
use crate::{DocId, Result, Score, NO_MORE_DOCS};

/// A node of the query tree. Queries are immutable once built and safe
/// to share across concurrent searches.
pub trait Query: fmt::Debug + Send + Sync {
    fn boost(&self) -> f32 {
        1.0
    }

    /// One rewrite step toward a simpler, executable query. `None`
    /// means the query is already in normal form; the searcher applies
    /// this to a fixed point.
    fn rewrite(&self, searcher: &Searcher) -> Result<Option<Box<dyn Query>>> {
        let _ = searcher;
        Ok(None)
    }

    /// Compiles the query against collection-level statistics.
    fn create_weight(&self, searcher: &Searcher) -> Result<Box<dyn Weight>>;

    fn as_any(&self) -> &dyn Any;

    fn clone_box(&self) -> Box<dyn Query>;
}

impl Clone for Box<dyn Query> {
    fn clone(&self) -> Box<dyn Query> {
        self.clone_box()
    }
}

/// Collection-level compiled form of a query.
pub trait Weight {
    /// Contribution to the query norm (sum of squared leaf weights).
    fn value_for_normalization(&self) -> f32;

    /// Second pass of query normalization.
    fn normalize(&mut self, query_norm: f32, top_level_boost: f32);

    /// Per-segment scorer; `None` when nothing in the segment can
    /// match.
    fn scorer(
        &self,
        reader: &SegmentReader,
        live_docs: Option<LiveDocs>,
    ) -> Result<Option<Box<dyn Scorer>>>;

    /// Batch evaluation hook. The default wraps [`scorer`](Self::scorer).
    fn bulk_scorer(
        &self,
        reader: &SegmentReader,
        live_docs: Option<LiveDocs>,
    ) -> Result<Option<Box<dyn BulkScorer>>> {
        match self.scorer(reader, live_docs)? {
            Some(scorer) => Ok(Some(Box::new(DefaultBulkScorer::new(scorer)))),
            None => Ok(None),
        }
    }

    fn explain(&self, reader: &SegmentReader, doc: DocId) -> Result<Explanation>;
}

/// The leaf of the evaluation tree: a doc iterator that can score its
/// current doc.
pub trait Scorer: DocSet {
    fn score(&mut self) -> Result<Score>;

    /// Number of matches behind the current doc: the term frequency
    /// for a term scorer, the phrase occurrence count for a phrase
    /// scorer, the number of matching clauses for a disjunction.
    fn freq(&mut self) -> Result<u32>;
}

/// Scores a range of documents at once; only queries with an optimized
/// batch path implement this beyond the default wrapper.
pub trait BulkScorer {
    /// Scores every doc in `[min, max)`, feeding the collector, and
    /// returns the first doc `>= max` still to score (or
    /// `NO_MORE_DOCS`).
    fn score_window(
        &mut self,
        collector: &mut dyn Collector,
        min: DocId,
        max: DocId,
    ) -> Result<DocId>;

    /// Scores everything left.
    fn score_all(&mut self, collector: &mut dyn Collector) -> Result<()> {
        self.score_window(collector, 0, NO_MORE_DOCS)?;
        Ok(())
    }
}

pub(crate) struct DefaultBulkScorer {
    scorer: Box<dyn Scorer>,
}

impl DefaultBulkScorer {
    pub fn new(scorer: Box<dyn Scorer>) -> DefaultBulkScorer {
        DefaultBulkScorer { scorer }
    }
}

impl BulkScorer for DefaultBulkScorer {
    fn score_window(
        &mut self,
        collector: &mut dyn Collector,
        min: DocId,
        max: DocId,
    ) -> Result<DocId> {
        let mut doc = self.scorer.doc();
        if doc == -1 || doc < min {
            doc = self.scorer.advance(min)?;
        }
        while doc < max {
            let score = self.scorer.score()?;
            collector.collect(doc, score)?;
            doc = self.scorer.next_doc()?;
        }
        Ok(doc)
    }
}

/// Scorer over nothing; stands in for exhausted or impossible clauses.
pub struct EmptyScorer;

impl DocSet for EmptyScorer {
    fn doc(&self) -> DocId {
        NO_MORE_DOCS
    }

    fn next_doc(&mut self) -> Result<DocId> {
        Ok(NO_MORE_DOCS)
    }

    fn advance(&mut self, _target: DocId) -> Result<DocId> {
        Ok(NO_MORE_DOCS)
    }

    fn cost(&self) -> u64 {
        0
    }
}

impl Scorer for EmptyScorer {
    fn score(&mut self) -> Result<Score> {
        Ok(0.0)
    }

    fn freq(&mut self) -> Result<u32> {
        Ok(0)
    }
}

/// Forwards everything and multiplies the score by a fixed factor
/// (the single-clause coord path of boolean queries).
pub struct BoostedScorer {
    inner: Box<dyn Scorer>,
    boost: f32,
}

impl BoostedScorer {
    pub fn new(inner: Box<dyn Scorer>, boost: f32) -> BoostedScorer {
        BoostedScorer { inner, boost }
    }
}

impl DocSet for BoostedScorer {
    fn doc(&self) -> DocId {
        self.inner.doc()
    }

    fn next_doc(&mut self) -> Result<DocId> {
        self.inner.next_doc()
    }

    fn advance(&mut self, target: DocId) -> Result<DocId> {
        self.inner.advance(target)
    }

    fn cost(&self) -> u64 {
        self.inner.cost()
    }
}

impl Scorer for BoostedScorer {
    fn score(&mut self) -> Result<Score> {
        Ok(self.inner.score()? * self.boost)
    }

    fn freq(&mut self) -> Result<u32> {
        self.inner.freq()
    }
}
