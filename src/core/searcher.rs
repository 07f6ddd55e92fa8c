//! Query execution over the segments of one index.

use std::sync::Arc;

use crate::collector::{Collector, ScoreDoc, TopScoreDocCollector};
use crate::core::index::Index;
use crate::core::segment_reader::SegmentReader;
use crate::query::{BulkScorer, Query, Weight};
use crate::schema::{Field, Schema, Term};
use crate::similarity::{
    default_similarity, CollectionStatistics, Explanation, Similarity, TermStatistics,
};
use crate::{DocId, ErrorKind, Result, MAX_CLAUSE_COUNT};

pub struct Searcher {
    schema: Schema,
    readers: Vec<SegmentReader>,
    similarity: Arc<dyn Similarity>,
}

impl Searcher {
    /// Opens a searcher with the process-wide default similarity.
    pub fn new(index: &Index) -> Result<Searcher> {
        Searcher::with_similarity(index, default_similarity())
    }

    pub fn with_similarity(index: &Index, similarity: Arc<dyn Similarity>) -> Result<Searcher> {
        Ok(Searcher {
            schema: index.schema().clone(),
            readers: index.segment_readers()?,
            similarity,
        })
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn similarity(&self) -> &Arc<dyn Similarity> {
        &self.similarity
    }

    pub fn segment_readers(&self) -> &[SegmentReader] {
        &self.readers
    }

    pub fn max_doc(&self) -> DocId {
        self.readers.iter().map(|reader| reader.max_doc()).sum()
    }

    pub fn num_docs(&self) -> DocId {
        self.readers.iter().map(|reader| reader.num_docs()).sum()
    }

    /// Index-wide statistics of a field, aggregated over segments.
    pub fn collection_statistics(&self, field: Field) -> Result<CollectionStatistics> {
        let entry = self.schema.get_field_entry(field);
        let mut stats = CollectionStatistics {
            field: entry.name().to_string(),
            max_doc: 0,
            doc_count: 0,
            sum_total_term_freq: 0,
            sum_doc_freq: 0,
        };
        for reader in &self.readers {
            let segment = reader.collection_statistics(field);
            stats.max_doc += segment.max_doc;
            if segment.doc_count > 0 {
                stats.doc_count += segment.doc_count;
            }
            if segment.sum_total_term_freq > 0 {
                stats.sum_total_term_freq += segment.sum_total_term_freq;
            }
            if segment.sum_doc_freq > 0 {
                stats.sum_doc_freq += segment.sum_doc_freq;
            }
        }
        if stats.sum_total_term_freq == 0 {
            stats.sum_total_term_freq = -1;
        }
        if stats.sum_doc_freq == 0 {
            stats.sum_doc_freq = -1;
        }
        Ok(stats)
    }

    /// Index-wide statistics of a term.
    pub fn term_statistics(&self, term: &Term) -> Result<TermStatistics> {
        let mut doc_freq = 0i64;
        let mut total_term_freq = 0i64;
        for reader in &self.readers {
            let segment = reader.term_statistics(term)?;
            doc_freq += segment.doc_freq;
            total_term_freq += segment.total_term_freq;
        }
        Ok(TermStatistics {
            term: term.value_bytes().to_vec(),
            doc_freq,
            total_term_freq,
        })
    }

    pub fn doc_freq(&self, term: &Term) -> Result<i64> {
        let mut doc_freq = 0;
        for reader in &self.readers {
            doc_freq += reader.doc_freq(term)?;
        }
        Ok(doc_freq)
    }

    /// Applies `rewrite` until the query reaches its normal form. The
    /// iteration count is bounded so a misbehaving query cannot loop.
    pub fn rewrite(&self, query: &dyn Query) -> Result<Box<dyn Query>> {
        let mut current = query.clone_box();
        for _ in 0..MAX_CLAUSE_COUNT {
            match current.rewrite(self)? {
                Some(next) => current = next,
                None => return Ok(current),
            }
        }
        Err(ErrorKind::TooManyClauses(MAX_CLAUSE_COUNT).into())
    }

    /// Rewrites, compiles, and runs the two-pass query normalization.
    pub fn create_normalized_weight(&self, query: &dyn Query) -> Result<Box<dyn Weight>> {
        let rewritten = self.rewrite(query)?;
        let mut weight = rewritten.create_weight(self)?;
        let value = weight.value_for_normalization();
        let mut norm = self.similarity.query_norm(value);
        if !norm.is_finite() {
            norm = 1.0;
        }
        weight.normalize(norm, 1.0);
        Ok(weight)
    }

    /// Runs the query, feeding every match to the collector, segment by
    /// segment in segment order.
    pub fn search(&self, query: &dyn Query, collector: &mut dyn Collector) -> Result<()> {
        let weight = self.create_normalized_weight(query)?;
        self.search_with_weight(&*weight, collector)
    }

    pub fn search_with_weight(
        &self,
        weight: &dyn Weight,
        collector: &mut dyn Collector,
    ) -> Result<()> {
        let mut doc_base = 0;
        for reader in &self.readers {
            collector.set_next_reader(reader, doc_base)?;
            if let Some(mut bulk_scorer) = weight.bulk_scorer(reader, reader.live_docs())? {
                bulk_scorer.score_all(collector)?;
            }
            doc_base += reader.max_doc();
        }
        Ok(())
    }

    /// Top-`limit` hits by score.
    pub fn search_top(&self, query: &dyn Query, limit: usize) -> Result<Vec<ScoreDoc>> {
        let limit = limit.min((self.max_doc().max(1)) as usize);
        let mut collector = TopScoreDocCollector::with_limit(limit);
        self.search(query, &mut collector)?;
        Ok(collector.top_docs())
    }

    /// Describes how `doc` (index-wide id) scores against `query`.
    pub fn explain(&self, query: &dyn Query, doc: DocId) -> Result<Explanation> {
        let weight = self.create_normalized_weight(query)?;
        let mut doc_base = 0;
        for reader in &self.readers {
            if doc < doc_base + reader.max_doc() {
                return weight.explain(reader, doc - doc_base);
            }
            doc_base += reader.max_doc();
        }
        Err(ErrorKind::InvalidArgument(format!("doc {} is out of range", doc)).into())
    }
}
