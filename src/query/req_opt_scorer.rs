//! Scorers combining a required side with an optional, score-only
//! side. Doc iteration always follows the required side; the optional
//! side is probed with `advance` at score time.

use crate::postings::DocSet;
use crate::query::Scorer;
use crate::{DocId, Result, Score, NO_MORE_DOCS};

/// Plain sum: required score, plus the optional score when it lands on
/// the same doc.
pub struct ReqOptSumScorer {
    req_scorer: Box<dyn Scorer>,
    opt_scorer: Option<Box<dyn Scorer>>,
}

impl ReqOptSumScorer {
    pub fn new(req_scorer: Box<dyn Scorer>, opt_scorer: Box<dyn Scorer>) -> ReqOptSumScorer {
        ReqOptSumScorer {
            req_scorer,
            opt_scorer: Some(opt_scorer),
        }
    }

    /// Lines the optional side up with the current required doc.
    /// Returns its current doc, or `None` once exhausted.
    fn align_optional(&mut self, cur_doc: DocId) -> Result<Option<DocId>> {
        let opt = match self.opt_scorer.as_mut() {
            Some(opt) => opt,
            None => return Ok(None),
        };
        let mut opt_doc = opt.doc();
        if opt_doc < cur_doc {
            opt_doc = opt.advance(cur_doc)?;
            if opt_doc == NO_MORE_DOCS {
                self.opt_scorer = None;
                return Ok(None);
            }
        }
        Ok(Some(opt_doc))
    }
}

impl DocSet for ReqOptSumScorer {
    fn doc(&self) -> DocId {
        self.req_scorer.doc()
    }

    fn next_doc(&mut self) -> Result<DocId> {
        self.req_scorer.next_doc()
    }

    fn advance(&mut self, target: DocId) -> Result<DocId> {
        self.req_scorer.advance(target)
    }

    fn cost(&self) -> u64 {
        self.req_scorer.cost()
    }
}

impl Scorer for ReqOptSumScorer {
    fn score(&mut self) -> Result<Score> {
        let cur_doc = self.req_scorer.doc();
        let req_score = self.req_scorer.score()?;
        match self.align_optional(cur_doc)? {
            Some(opt_doc) if opt_doc == cur_doc => {
                let opt_score = self.opt_scorer.as_mut().expect("aligned").score()?;
                Ok(req_score + opt_score)
            }
            _ => Ok(req_score),
        }
    }

    fn freq(&mut self) -> Result<u32> {
        let cur_doc = self.req_scorer.doc();
        match self.align_optional(cur_doc)? {
            Some(opt_doc) if opt_doc == cur_doc => Ok(2),
            _ => Ok(1),
        }
    }
}

/// One optional clause with coord: `coord_req` applies when only the
/// required side matches, `coord_both` when both do.
pub struct ReqSingleOptScorer {
    inner: ReqOptSumScorer,
    coord_req: f32,
    coord_both: f32,
}

impl ReqSingleOptScorer {
    pub fn new(
        req_scorer: Box<dyn Scorer>,
        opt_scorer: Box<dyn Scorer>,
        coord_req: f32,
        coord_both: f32,
    ) -> ReqSingleOptScorer {
        ReqSingleOptScorer {
            inner: ReqOptSumScorer::new(req_scorer, opt_scorer),
            coord_req,
            coord_both,
        }
    }
}

impl DocSet for ReqSingleOptScorer {
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

impl Scorer for ReqSingleOptScorer {
    fn score(&mut self) -> Result<Score> {
        let cur_doc = self.inner.req_scorer.doc();
        let req_score = self.inner.req_scorer.score()?;
        match self.inner.align_optional(cur_doc)? {
            Some(opt_doc) if opt_doc == cur_doc => {
                let opt_score = self.inner.opt_scorer.as_mut().expect("aligned").score()?;
                Ok((req_score + opt_score) * self.coord_both)
            }
            _ => Ok(req_score * self.coord_req),
        }
    }

    fn freq(&mut self) -> Result<u32> {
        self.inner.freq()
    }
}

/// Several optional clauses (already combined into one disjunction):
/// the coord factor is looked up from the number of matching clauses.
pub struct ReqMultiOptScorer {
    inner: ReqOptSumScorer,
    required_nr_matchers: usize,
    coords: Vec<f32>,
}

impl ReqMultiOptScorer {
    pub fn new(
        req_scorer: Box<dyn Scorer>,
        opt_scorer: Box<dyn Scorer>,
        required_nr_matchers: usize,
        coords: Vec<f32>,
    ) -> ReqMultiOptScorer {
        ReqMultiOptScorer {
            inner: ReqOptSumScorer::new(req_scorer, opt_scorer),
            required_nr_matchers,
            coords,
        }
    }
}

impl DocSet for ReqMultiOptScorer {
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

impl Scorer for ReqMultiOptScorer {
    fn score(&mut self) -> Result<Score> {
        let cur_doc = self.inner.req_scorer.doc();
        let req_score = self.inner.req_scorer.score()?;
        match self.inner.align_optional(cur_doc)? {
            Some(opt_doc) if opt_doc == cur_doc => {
                let opt = self.inner.opt_scorer.as_mut().expect("aligned");
                let opt_score = opt.score()?;
                let opt_freq = opt.freq()? as usize;
                Ok((req_score + opt_score) * self.coords[self.required_nr_matchers + opt_freq])
            }
            _ => Ok(req_score * self.coords[self.required_nr_matchers]),
        }
    }

    fn freq(&mut self) -> Result<u32> {
        self.inner.freq()
    }
}

#[cfg(test)]
mod tests {
    use super::{ReqOptSumScorer, ReqSingleOptScorer};
    use crate::postings::DocSet;
    use crate::query::test_util::ConstScorer;
    use crate::query::Scorer;
    use crate::NO_MORE_DOCS;

    #[test]
    fn test_iterates_required_only() {
        let mut scorer = ReqOptSumScorer::new(
            Box::new(ConstScorer::new(vec![1, 4, 9], 1.0)),
            Box::new(ConstScorer::new(vec![0, 4, 5, 9, 12], 2.0)),
        );
        assert_eq!(scorer.next_doc().unwrap(), 1);
        assert_eq!(scorer.score().unwrap(), 1.0);
        assert_eq!(scorer.next_doc().unwrap(), 4);
        assert_eq!(scorer.score().unwrap(), 3.0);
        assert_eq!(scorer.next_doc().unwrap(), 9);
        assert_eq!(scorer.score().unwrap(), 3.0);
        assert_eq!(scorer.next_doc().unwrap(), NO_MORE_DOCS);
    }

    #[test]
    fn test_exhausted_optional_is_dropped() {
        let mut scorer = ReqOptSumScorer::new(
            Box::new(ConstScorer::new(vec![1, 8], 1.0)),
            Box::new(ConstScorer::new(vec![2], 2.0)),
        );
        assert_eq!(scorer.next_doc().unwrap(), 1);
        assert_eq!(scorer.score().unwrap(), 1.0);
        assert_eq!(scorer.next_doc().unwrap(), 8);
        assert_eq!(scorer.score().unwrap(), 1.0);
    }

    #[test]
    fn test_single_opt_coords() {
        let mut scorer = ReqSingleOptScorer::new(
            Box::new(ConstScorer::new(vec![3, 6], 1.0)),
            Box::new(ConstScorer::new(vec![6], 1.0)),
            0.5,
            1.0,
        );
        assert_eq!(scorer.next_doc().unwrap(), 3);
        assert_eq!(scorer.score().unwrap(), 0.5);
        assert_eq!(scorer.next_doc().unwrap(), 6);
        assert_eq!(scorer.score().unwrap(), 2.0);
    }
}
