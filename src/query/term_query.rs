use std::any::Any;
use std::sync::Arc;

use crate::core::searcher::Searcher;
use crate::core::segment_reader::SegmentReader;
use crate::postings::{DocSet, LiveDocs, Postings, SegmentDocsIterator};
use crate::query::{Query, Scorer, Weight};
use crate::schema::{Field, Term};
use crate::similarity::{Explanation, SimScorer, SimWeight, Similarity};
use crate::{DocId, Result, Score};

/// Query matching the documents containing one term.
#[derive(Debug, Clone)]
pub struct TermQuery {
    term: Term,
    boost: f32,
}

impl TermQuery {
    pub fn new(term: Term) -> TermQuery {
        TermQuery { term, boost: 1.0 }
    }

    pub fn text(field: Field, text: &str) -> TermQuery {
        TermQuery::new(Term::from_field_text(field, text))
    }

    pub fn with_boost(mut self, boost: f32) -> TermQuery {
        self.boost = boost;
        self
    }

    pub fn term(&self) -> &Term {
        &self.term
    }
}

impl Query for TermQuery {
    fn boost(&self) -> f32 {
        self.boost
    }

    fn create_weight(&self, searcher: &Searcher) -> Result<Box<dyn Weight>> {
        let collection_stats = searcher.collection_statistics(self.term.field())?;
        let term_stats = searcher.term_statistics(&self.term)?;
        let similarity = Arc::clone(searcher.similarity());
        let sim_weight =
            similarity.compute_weight(self.boost, &collection_stats, &[term_stats]);
        Ok(Box::new(TermWeight {
            term: self.term.clone(),
            similarity,
            sim_weight,
        }))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn clone_box(&self) -> Box<dyn Query> {
        Box::new(self.clone())
    }
}

pub struct TermWeight {
    term: Term,
    similarity: Arc<dyn Similarity>,
    sim_weight: Box<dyn SimWeight>,
}

impl Weight for TermWeight {
    fn value_for_normalization(&self) -> f32 {
        self.sim_weight.value_for_normalization()
    }

    fn normalize(&mut self, query_norm: f32, top_level_boost: f32) {
        self.sim_weight.normalize(query_norm, top_level_boost);
    }

    fn scorer(
        &self,
        reader: &SegmentReader,
        live_docs: Option<LiveDocs>,
    ) -> Result<Option<Box<dyn Scorer>>> {
        let info = match reader.term_info(&self.term)? {
            Some(info) => info,
            // an absent term is an empty scorer, never an error
            None => return Ok(None),
        };
        let postings = reader.postings(&self.term, &info, live_docs)?;
        let norms = reader.norms(self.term.field());
        let sim_scorer = self.similarity.sim_scorer(&*self.sim_weight, norms)?;
        Ok(Some(Box::new(TermScorer::new(postings, sim_scorer))))
    }

    fn explain(&self, reader: &SegmentReader, doc: DocId) -> Result<Explanation> {
        if let Some(mut scorer) = self.scorer(reader, reader.live_docs())? {
            if scorer.advance(doc)? == doc {
                let freq = scorer.freq()?;
                let norms = reader.norms(self.term.field());
                let sim_scorer = self.similarity.sim_scorer(&*self.sim_weight, norms)?;
                let freq_expl =
                    Explanation::new(freq as f32, format!("termFreq={}", freq));
                let score_expl = sim_scorer.explain(doc, &freq_expl);
                let mut result = Explanation::new(
                    score_expl.value(),
                    format!("weight({:?} in {}), result of:", self.term, doc),
                );
                result.add_detail(score_expl);
                return Ok(result);
            }
        }
        Ok(Explanation::new(
            0.0,
            format!("no matching term {:?} in doc {}", self.term, doc),
        ))
    }
}

/// Wraps a single term's postings; the score of a doc is the
/// similarity applied to its term frequency, fetched lazily.
pub struct TermScorer {
    postings: SegmentDocsIterator,
    sim_scorer: Box<dyn SimScorer>,
}

impl TermScorer {
    pub fn new(postings: SegmentDocsIterator, sim_scorer: Box<dyn SimScorer>) -> TermScorer {
        TermScorer {
            postings,
            sim_scorer,
        }
    }
}

impl DocSet for TermScorer {
    fn doc(&self) -> DocId {
        self.postings.doc()
    }

    fn next_doc(&mut self) -> Result<DocId> {
        self.postings.next_doc()
    }

    fn advance(&mut self, target: DocId) -> Result<DocId> {
        self.postings.advance(target)
    }

    fn cost(&self) -> u64 {
        self.postings.cost()
    }
}

impl Scorer for TermScorer {
    fn score(&mut self) -> Result<Score> {
        let doc = self.postings.doc();
        let freq = self.postings.freq();
        Ok(self.sim_scorer.score(doc, freq as f32))
    }

    fn freq(&mut self) -> Result<u32> {
        Ok(self.postings.freq())
    }
}
