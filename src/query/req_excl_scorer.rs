//! Scorer for queries with a required sub-scorer and an excluding
//! (prohibited) doc iterator.

use crate::postings::DocSet;
use crate::query::Scorer;
use crate::{DocId, Result, Score, NO_MORE_DOCS};

pub struct ReqExclScorer {
    req_scorer: Option<Box<dyn Scorer>>,
    excl: Option<Box<dyn DocSet>>,
    doc: DocId,
}

impl ReqExclScorer {
    pub fn new(req_scorer: Box<dyn Scorer>, excl: Box<dyn DocSet>) -> ReqExclScorer {
        ReqExclScorer {
            req_scorer: Some(req_scorer),
            excl: Some(excl),
            doc: -1,
        }
    }

    /// Advances the required scorer past every excluded doc. On entry
    /// it sits on a candidate that may still be excluded.
    fn to_non_excluded(&mut self) -> Result<DocId> {
        let mut excl_doc = self.excl.as_ref().expect("exclusions not exhausted").doc();
        let mut req_doc = self.req_scorer.as_ref().expect("required not exhausted").doc();
        loop {
            if req_doc < excl_doc {
                return Ok(req_doc);
            } else if req_doc > excl_doc {
                excl_doc = self
                    .excl
                    .as_mut()
                    .expect("exclusions not exhausted")
                    .advance(req_doc)?;
                if excl_doc == NO_MORE_DOCS {
                    self.excl = None;
                    return Ok(req_doc);
                }
                if excl_doc > req_doc {
                    return Ok(req_doc);
                }
            }
            req_doc = self
                .req_scorer
                .as_mut()
                .expect("required not exhausted")
                .next_doc()?;
            if req_doc == NO_MORE_DOCS {
                break;
            }
        }
        self.req_scorer = None;
        Ok(NO_MORE_DOCS)
    }
}

impl DocSet for ReqExclScorer {
    fn doc(&self) -> DocId {
        self.doc
    }

    fn next_doc(&mut self) -> Result<DocId> {
        let req = match self.req_scorer.as_mut() {
            Some(req) => req,
            None => return Ok(self.doc),
        };
        self.doc = req.next_doc()?;
        if self.doc == NO_MORE_DOCS {
            self.req_scorer = None;
            return Ok(self.doc);
        }
        if self.excl.is_none() {
            return Ok(self.doc);
        }
        self.doc = self.to_non_excluded()?;
        Ok(self.doc)
    }

    fn advance(&mut self, target: DocId) -> Result<DocId> {
        let req = match self.req_scorer.as_mut() {
            Some(req) => req,
            None => {
                self.doc = NO_MORE_DOCS;
                return Ok(self.doc);
            }
        };
        let req_doc = req.advance(target)?;
        if req_doc == NO_MORE_DOCS {
            self.req_scorer = None;
            self.doc = NO_MORE_DOCS;
            return Ok(self.doc);
        }
        if self.excl.is_none() {
            self.doc = req_doc;
            return Ok(self.doc);
        }
        self.doc = self.to_non_excluded()?;
        Ok(self.doc)
    }

    fn cost(&self) -> u64 {
        self.req_scorer.as_ref().map_or(0, |req| req.cost())
    }
}

impl Scorer for ReqExclScorer {
    fn score(&mut self) -> Result<Score> {
        self.req_scorer
            .as_mut()
            .expect("score after exhaustion")
            .score()
    }

    fn freq(&mut self) -> Result<u32> {
        self.req_scorer
            .as_mut()
            .expect("freq after exhaustion")
            .freq()
    }
}

#[cfg(test)]
mod tests {
    use super::ReqExclScorer;
    use crate::postings::{DocSet, VecPostings};
    use crate::query::test_util::{collect_docs, ConstScorer};
    use crate::NO_MORE_DOCS;

    fn req_excl(req: Vec<i32>, excl: Vec<i32>) -> ReqExclScorer {
        ReqExclScorer::new(
            Box::new(ConstScorer::new(req, 1.0)),
            Box::new(VecPostings::from(excl)),
        )
    }

    #[test]
    fn test_difference() {
        let mut scorer = req_excl(vec![1, 2, 3, 9, 14], vec![3, 4, 9, 12]);
        assert_eq!(collect_docs(&mut scorer), vec![1, 2, 14]);
    }

    #[test]
    fn test_empty_exclusions() {
        let mut scorer = req_excl(vec![4, 8], vec![]);
        assert_eq!(collect_docs(&mut scorer), vec![4, 8]);
    }

    #[test]
    fn test_everything_excluded() {
        let mut scorer = req_excl(vec![1, 2], vec![1, 2]);
        assert_eq!(collect_docs(&mut scorer), Vec::<i32>::new());
    }

    #[test]
    fn test_advance() {
        let mut scorer = req_excl(vec![1, 3, 7, 8, 10, 13], vec![7, 8, 10, 12, 14]);
        assert_eq!(scorer.advance(2).unwrap(), 3);
        assert_eq!(scorer.advance(7).unwrap(), 13);
        assert_eq!(scorer.advance(14).unwrap(), NO_MORE_DOCS);
    }
}
