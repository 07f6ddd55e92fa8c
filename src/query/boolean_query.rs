//! Boolean combinations of queries.
//!
//! The weight picks the scorer structurally from the sets of required,
//! optional, and prohibited clauses: conjunction, disjunction,
//! min-should-match, and the req/excl, req/opt combinations, with
//! coord factors rewarding docs matching more optional clauses.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::core::searcher::Searcher;
use crate::core::segment_reader::SegmentReader;
use crate::postings::{DocSet, LiveDocs};
use crate::query::{
    BooleanBulkScorer, BoostedScorer, BulkScorer, ConjunctionScorer, DisjunctionSumScorer,
    MinShouldMatchSumScorer, Occur, Query, ReqExclScorer, ReqMultiOptScorer, ReqOptSumScorer,
    ReqSingleOptScorer, Scorer, Weight,
};
use crate::similarity::{Explanation, Similarity};
use crate::{DocId, ErrorKind, Result, Score, MAX_CLAUSE_COUNT, NO_MORE_DOCS};

#[derive(Clone)]
pub struct BooleanClause {
    pub query: Box<dyn Query>,
    pub occur: Occur,
}

impl fmt::Debug for BooleanClause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{:?}", self.occur, self.query)
    }
}

/// A tree of clauses combined with AND/OR/NOT semantics.
#[derive(Debug, Clone)]
pub struct BooleanQuery {
    clauses: Vec<BooleanClause>,
    disable_coord: bool,
    minimum_number_should_match: usize,
    boost: f32,
}

impl Default for BooleanQuery {
    fn default() -> BooleanQuery {
        BooleanQuery::new()
    }
}

impl BooleanQuery {
    pub fn new() -> BooleanQuery {
        BooleanQuery::with_coord_disabled(false)
    }

    pub fn with_coord_disabled(disable_coord: bool) -> BooleanQuery {
        BooleanQuery {
            clauses: Vec::new(),
            disable_coord,
            minimum_number_should_match: 0,
            boost: 1.0,
        }
    }

    pub fn add(&mut self, query: Box<dyn Query>, occur: Occur) -> Result<()> {
        if self.clauses.len() >= MAX_CLAUSE_COUNT {
            return Err(ErrorKind::TooManyClauses(MAX_CLAUSE_COUNT).into());
        }
        self.clauses.push(BooleanClause { query, occur });
        Ok(())
    }

    pub fn set_minimum_number_should_match(&mut self, minimum: usize) {
        self.minimum_number_should_match = minimum;
    }

    pub fn set_boost(&mut self, boost: f32) {
        self.boost = boost;
    }

    pub fn clauses(&self) -> &[BooleanClause] {
        &self.clauses
    }
}

impl Query for BooleanQuery {
    fn boost(&self) -> f32 {
        self.boost
    }

    fn rewrite(&self, searcher: &Searcher) -> Result<Option<Box<dyn Query>>> {
        // a one-clause query without MUST_NOT is that clause
        if self.clauses.len() == 1
            && self.minimum_number_should_match == 0
            && self.boost == 1.0
            && !self.clauses[0].occur.is_prohibited()
        {
            return Ok(Some(self.clauses[0].query.clone()));
        }
        // otherwise push rewriting into the clauses
        let mut changed = false;
        let mut rewritten = Vec::with_capacity(self.clauses.len());
        for clause in &self.clauses {
            match clause.query.rewrite(searcher)? {
                Some(query) => {
                    changed = true;
                    rewritten.push(BooleanClause {
                        query,
                        occur: clause.occur,
                    });
                }
                None => rewritten.push(clause.clone()),
            }
        }
        if changed {
            let mut query = BooleanQuery::with_coord_disabled(self.disable_coord);
            query.minimum_number_should_match = self.minimum_number_should_match;
            query.boost = self.boost;
            query.clauses = rewritten;
            return Ok(Some(Box::new(query)));
        }
        Ok(None)
    }

    fn create_weight(&self, searcher: &Searcher) -> Result<Box<dyn Weight>> {
        let mut weights = Vec::with_capacity(self.clauses.len());
        let mut occurs = Vec::with_capacity(self.clauses.len());
        let mut max_coord = 0;
        for clause in &self.clauses {
            weights.push(clause.query.create_weight(searcher)?);
            occurs.push(clause.occur);
            if !clause.occur.is_prohibited() {
                max_coord += 1;
            }
        }
        Ok(Box::new(BooleanWeight {
            weights,
            occurs,
            similarity: Arc::clone(searcher.similarity()),
            boost: self.boost,
            disable_coord: self.disable_coord,
            minimum_number_should_match: self.minimum_number_should_match,
            max_coord,
        }))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn clone_box(&self) -> Box<dyn Query> {
        Box::new(self.clone())
    }
}

pub struct BooleanWeight {
    weights: Vec<Box<dyn Weight>>,
    occurs: Vec<Occur>,
    similarity: Arc<dyn Similarity>,
    boost: f32,
    disable_coord: bool,
    minimum_number_should_match: usize,
    /// Number of optional plus required clauses.
    max_coord: usize,
}

impl BooleanWeight {
    fn coord(&self, overlap: usize, max_overlap: usize) -> f32 {
        if max_overlap == 1 {
            1.0
        } else {
            self.similarity.coord(overlap, max_overlap)
        }
    }

    fn coords(&self) -> Vec<f32> {
        let mut coords = Vec::with_capacity(self.max_coord + 1);
        coords.push(0.0);
        for overlap in 1..=self.max_coord {
            coords.push(self.coord(overlap, self.max_coord));
        }
        coords
    }

    /// Combines the required scorers.
    fn req(&self, mut required: Vec<Box<dyn Scorer>>, disable_coord: bool) -> Box<dyn Scorer> {
        if required.len() == 1 {
            let req = required.pop().expect("one required scorer");
            if !disable_coord && self.max_coord > 1 {
                Box::new(BoostedScorer::new(req, self.coord(1, self.max_coord)))
            } else {
                req
            }
        } else {
            let coord = if disable_coord {
                1.0
            } else {
                self.coord(required.len(), self.max_coord)
            };
            Box::new(ConjunctionScorer::with_coord(required, coord))
        }
    }

    /// Wraps `main` with the prohibited clauses.
    fn excl(
        &self,
        main: Box<dyn Scorer>,
        mut prohibited: Vec<Box<dyn Scorer>>,
    ) -> Box<dyn Scorer> {
        if prohibited.is_empty() {
            main
        } else if prohibited.len() == 1 {
            Box::new(ReqExclScorer::new(
                main,
                Box::new(ScorerDocSet(prohibited.pop().expect("one prohibited"))),
            ))
        } else {
            let ones = vec![1.0f32; prohibited.len() + 1];
            let union = DisjunctionSumScorer::new(prohibited, ones);
            Box::new(ReqExclScorer::new(main, Box::new(ScorerDocSet(Box::new(union)))))
        }
    }

    /// Combines the optional scorers.
    fn opt(
        &self,
        mut optional: Vec<Box<dyn Scorer>>,
        min_should_match: usize,
        disable_coord: bool,
    ) -> Box<dyn Scorer> {
        if optional.len() == 1 {
            let opt = optional.pop().expect("one optional scorer");
            if !disable_coord && self.max_coord > 1 {
                Box::new(BoostedScorer::new(opt, self.coord(1, self.max_coord)))
            } else {
                opt
            }
        } else {
            let coords = if disable_coord {
                vec![1.0f32; optional.len() + 1]
            } else {
                self.coords()
            };
            if min_should_match > 1 {
                Box::new(MinShouldMatchSumScorer::new(optional, min_should_match, coords))
            } else {
                Box::new(DisjunctionSumScorer::new(optional, coords))
            }
        }
    }
}

impl Weight for BooleanWeight {
    fn value_for_normalization(&self) -> f32 {
        let mut sum = 0.0;
        for (weight, &occur) in self.weights.iter().zip(&self.occurs) {
            let value = weight.value_for_normalization();
            if !occur.is_prohibited() {
                sum += value;
            }
        }
        sum * self.boost * self.boost
    }

    fn normalize(&mut self, query_norm: f32, top_level_boost: f32) {
        let top_level_boost = top_level_boost * self.boost;
        for weight in &mut self.weights {
            weight.normalize(query_norm, top_level_boost);
        }
    }

    fn scorer(
        &self,
        reader: &SegmentReader,
        live_docs: Option<LiveDocs>,
    ) -> Result<Option<Box<dyn Scorer>>> {
        let mut min_should_match = self.minimum_number_should_match;
        let mut required = Vec::new();
        let mut prohibited = Vec::new();
        let mut optional = Vec::new();
        for (weight, &occur) in self.weights.iter().zip(&self.occurs) {
            match weight.scorer(reader, live_docs.clone())? {
                None => {
                    if occur.is_required() {
                        // a required clause with no matching docs
                        return Ok(None);
                    }
                }
                Some(scorer) => {
                    if occur.is_required() {
                        required.push(scorer);
                    } else if occur.is_prohibited() {
                        prohibited.push(scorer);
                    } else {
                        optional.push(scorer);
                    }
                }
            }
        }

        // every optional clause must match: treat them as required
        if optional.len() == min_should_match {
            required.append(&mut optional);
            min_should_match = 0;
        }

        if required.is_empty() && optional.is_empty() {
            // no required and no optional clauses
            return Ok(None);
        } else if optional.len() < min_should_match {
            // too many clauses missing from this segment
            return Ok(None);
        }

        if optional.is_empty() {
            let main = self.req(required, self.disable_coord);
            return Ok(Some(self.excl(main, prohibited)));
        }

        if required.is_empty() {
            let main = self.opt(optional, min_should_match, self.disable_coord);
            return Ok(Some(self.excl(main, prohibited)));
        }

        // both required and optional clauses
        let nr_required = required.len();
        let nr_optional = optional.len();
        let req_scorer = self.excl(self.req(required, true), prohibited);
        let opt_scorer = self.opt(optional, min_should_match, true);

        if self.disable_coord {
            if min_should_match > 0 {
                Ok(Some(Box::new(ConjunctionScorer::with_coord(
                    vec![req_scorer, opt_scorer],
                    1.0,
                ))))
            } else {
                Ok(Some(Box::new(ReqOptSumScorer::new(req_scorer, opt_scorer))))
            }
        } else if nr_optional == 1 {
            if min_should_match > 0 {
                Ok(Some(Box::new(ConjunctionScorer::with_coord(
                    vec![req_scorer, opt_scorer],
                    self.coord(nr_required + 1, self.max_coord),
                ))))
            } else {
                let coord_req = self.coord(nr_required, self.max_coord);
                let coord_both = self.coord(nr_required + 1, self.max_coord);
                Ok(Some(Box::new(ReqSingleOptScorer::new(
                    req_scorer, opt_scorer, coord_req, coord_both,
                ))))
            }
        } else if min_should_match > 0 {
            Ok(Some(Box::new(CoordinatingConjunctionScorer::new(
                req_scorer,
                opt_scorer,
                nr_required,
                self.coords(),
            ))))
        } else {
            Ok(Some(Box::new(ReqMultiOptScorer::new(
                req_scorer,
                opt_scorer,
                nr_required,
                self.coords(),
            ))))
        }
    }

    fn bulk_scorer(
        &self,
        reader: &SegmentReader,
        live_docs: Option<LiveDocs>,
    ) -> Result<Option<Box<dyn BulkScorer>>> {
        if self.minimum_number_should_match > 1
            || self.occurs.iter().any(|occur| occur.is_required())
        {
            // the batch fast path only handles optional/prohibited sets
            return match self.scorer(reader, live_docs)? {
                Some(scorer) => Ok(Some(Box::new(crate::query::DefaultBulkScorer::new(scorer)))),
                None => Ok(None),
            };
        }
        let mut prohibited = Vec::new();
        let mut optional = Vec::new();
        for (weight, &occur) in self.weights.iter().zip(&self.occurs) {
            if let Some(scorer) = weight.scorer(reader, live_docs.clone())? {
                if occur.is_prohibited() {
                    prohibited.push(scorer);
                } else {
                    optional.push(scorer);
                }
            }
        }
        if optional.is_empty() {
            return Ok(None);
        }
        let coords = if self.disable_coord {
            vec![1.0f32; self.max_coord + 1]
        } else {
            self.coords()
        };
        Ok(Some(Box::new(BooleanBulkScorer::new(
            optional,
            prohibited,
            coords,
            self.minimum_number_should_match.max(1),
        ))))
    }

    fn explain(&self, reader: &SegmentReader, doc: DocId) -> Result<Explanation> {
        let mut sum = 0.0;
        let mut overlap = 0usize;
        let mut details = Vec::new();
        for (weight, &occur) in self.weights.iter().zip(&self.occurs) {
            let sub = weight.explain(reader, doc)?;
            match occur {
                Occur::MustNot => {
                    if sub.is_match() {
                        return Ok(Explanation::new(
                            0.0,
                            format!("match prohibited by clause in doc {}", doc),
                        ));
                    }
                }
                Occur::Must | Occur::Should => {
                    if sub.is_match() {
                        sum += sub.value();
                        overlap += 1;
                        details.push(sub);
                    } else if occur == Occur::Must {
                        let mut failure = Explanation::new(
                            0.0,
                            format!("failure to meet required clause in doc {}", doc),
                        );
                        failure.add_detail(sub);
                        return Ok(failure);
                    }
                }
            }
        }
        if overlap == 0 {
            return Ok(Explanation::new(0.0, format!("no matching clauses in doc {}", doc)));
        }
        let coord = if self.disable_coord {
            1.0
        } else {
            self.coord(overlap, self.max_coord)
        };
        let mut result = Explanation::new(sum * coord, "sum of matching clauses, times coord:");
        for detail in details {
            result.add_detail(detail);
        }
        result.add_detail(Explanation::new(coord, format!("coord({}/{})", overlap, self.max_coord)));
        Ok(result)
    }
}

/// Adapter viewing a scorer as a bare doc set (the excluded side of
/// req/excl never scores).
struct ScorerDocSet(Box<dyn Scorer>);

impl DocSet for ScorerDocSet {
    fn doc(&self) -> DocId {
        self.0.doc()
    }

    fn next_doc(&mut self) -> Result<DocId> {
        self.0.next_doc()
    }

    fn advance(&mut self, target: DocId) -> Result<DocId> {
        self.0.advance(target)
    }

    fn cost(&self) -> u64 {
        self.0.cost()
    }
}

/// Conjunction of the required and optional sides when a
/// min-should-match constraint keeps the optional side mandatory; the
/// coord factor tracks how many optional clauses actually matched.
struct CoordinatingConjunctionScorer {
    req: Box<dyn Scorer>,
    opt: Box<dyn Scorer>,
    nr_required: usize,
    coords: Vec<f32>,
    last_doc: DocId,
}

impl CoordinatingConjunctionScorer {
    fn new(
        req: Box<dyn Scorer>,
        opt: Box<dyn Scorer>,
        nr_required: usize,
        coords: Vec<f32>,
    ) -> CoordinatingConjunctionScorer {
        CoordinatingConjunctionScorer {
            req,
            opt,
            nr_required,
            coords,
            last_doc: -1,
        }
    }

    fn align(&mut self, mut doc: DocId) -> Result<DocId> {
        loop {
            if doc == NO_MORE_DOCS {
                return Ok(doc);
            }
            let opt_doc = if self.opt.doc() < doc {
                self.opt.advance(doc)?
            } else {
                self.opt.doc()
            };
            if opt_doc == doc {
                return Ok(doc);
            }
            doc = self.req.advance(opt_doc)?;
            if doc == opt_doc {
                return Ok(doc);
            }
        }
    }
}

impl DocSet for CoordinatingConjunctionScorer {
    fn doc(&self) -> DocId {
        self.last_doc
    }

    fn next_doc(&mut self) -> Result<DocId> {
        let doc = self.req.next_doc()?;
        self.last_doc = self.align(doc)?;
        Ok(self.last_doc)
    }

    fn advance(&mut self, target: DocId) -> Result<DocId> {
        let doc = self.req.advance(target)?;
        self.last_doc = self.align(doc)?;
        Ok(self.last_doc)
    }

    fn cost(&self) -> u64 {
        self.req.cost().min(self.opt.cost())
    }
}

impl Scorer for CoordinatingConjunctionScorer {
    fn score(&mut self) -> Result<Score> {
        let req_score = self.req.score()?;
        let opt_score = self.opt.score()?;
        let opt_freq = self.opt.freq()? as usize;
        Ok((req_score + opt_score) * self.coords[self.nr_required + opt_freq])
    }

    fn freq(&mut self) -> Result<u32> {
        Ok(self.nr_required as u32 + self.opt.freq()?)
    }
}
