//! Scorer for OR-like queries, counterpart of the conjunction scorer.
//!
//! Sub-scorers live in a min-heap keyed by their current doc. Matching
//! sub-scorers for the current doc cluster near the heap root, so score
//! and freq are accumulated by a recursive walk that stops at the first
//! non-matching node.

use crate::postings::DocSet;
use crate::query::Scorer;
use crate::{DocId, Result, Score, NO_MORE_DOCS};

pub struct DisjunctionSumScorer {
    sub_scorers: Vec<Box<dyn Scorer>>,
    num_scorers: usize,
    doc: DocId,
    /// Number of sub-scorers on the current doc; -1 when not yet
    /// computed.
    freq: i32,
    score: f64,
    /// `coord[n]` multiplies the score when `n` clauses match.
    coord: Vec<f32>,
    cost: u64,
}

impl DisjunctionSumScorer {
    pub fn new(sub_scorers: Vec<Box<dyn Scorer>>, coord: Vec<f32>) -> DisjunctionSumScorer {
        debug_assert!(sub_scorers.len() > 1);
        let num_scorers = sub_scorers.len();
        let cost = sub_scorers.iter().map(|scorer| scorer.cost()).sum();
        let mut scorer = DisjunctionSumScorer {
            sub_scorers,
            num_scorers,
            doc: -1,
            freq: -1,
            score: 0.0,
            coord,
            cost,
        };
        scorer.heapify();
        scorer
    }

    fn heapify(&mut self) {
        for i in (0..self.num_scorers / 2).rev() {
            self.heap_adjust(i);
        }
    }

    /// Sifts the root of the subtree at `root` down to its place.
    fn heap_adjust(&mut self, root: usize) {
        let mut i = root;
        loop {
            if i >= self.num_scorers / 2 {
                return;
            }
            let doc = self.sub_scorers[i].doc();
            let lchild = 2 * i + 1;
            let ldoc = self.sub_scorers[lchild].doc();
            let rchild = 2 * i + 2;
            let rdoc = if rchild < self.num_scorers {
                self.sub_scorers[rchild].doc()
            } else {
                DocId::MAX
            };
            if ldoc < doc {
                if rdoc < ldoc {
                    self.sub_scorers.swap(i, rchild);
                    i = rchild;
                } else {
                    self.sub_scorers.swap(i, lchild);
                    i = lchild;
                }
            } else if rdoc < doc {
                self.sub_scorers.swap(i, rchild);
                i = rchild;
            } else {
                return;
            }
        }
    }

    fn heap_remove_root(&mut self) {
        self.num_scorers -= 1;
        if self.num_scorers > 0 {
            self.sub_scorers.swap(0, self.num_scorers);
            self.heap_adjust(0);
        }
    }

    /// Accumulates score and freq over every sub-scorer on the current
    /// doc.
    fn visit_scorers(&mut self) -> Result<()> {
        self.score = 0.0;
        self.freq = 1;
        self.score += f64::from(self.sub_scorers[0].score()?);
        self.visit(1)?;
        self.visit(2)?;
        Ok(())
    }

    fn visit(&mut self, root: usize) -> Result<()> {
        if root < self.num_scorers && self.sub_scorers[root].doc() == self.doc {
            self.freq += 1;
            self.score += f64::from(self.sub_scorers[root].score()?);
            self.visit(2 * root + 1)?;
            self.visit(2 * root + 2)?;
        }
        Ok(())
    }
}

impl DocSet for DisjunctionSumScorer {
    fn doc(&self) -> DocId {
        self.doc
    }

    fn next_doc(&mut self) -> Result<DocId> {
        debug_assert!(self.doc != NO_MORE_DOCS);
        loop {
            if self.sub_scorers[0].next_doc()? != NO_MORE_DOCS {
                self.heap_adjust(0);
            } else {
                self.heap_remove_root();
                if self.num_scorers == 0 {
                    self.doc = NO_MORE_DOCS;
                    self.freq = -1;
                    return Ok(self.doc);
                }
            }
            let top_doc = self.sub_scorers[0].doc();
            if top_doc != self.doc {
                self.doc = top_doc;
                self.freq = -1;
                return Ok(self.doc);
            }
        }
    }

    fn advance(&mut self, target: DocId) -> Result<DocId> {
        debug_assert!(self.doc != NO_MORE_DOCS);
        loop {
            if self.sub_scorers[0].advance(target)? != NO_MORE_DOCS {
                self.heap_adjust(0);
            } else {
                self.heap_remove_root();
                if self.num_scorers == 0 {
                    self.doc = NO_MORE_DOCS;
                    self.freq = -1;
                    return Ok(self.doc);
                }
            }
            let top_doc = self.sub_scorers[0].doc();
            if top_doc >= target {
                self.doc = top_doc;
                self.freq = -1;
                return Ok(self.doc);
            }
        }
    }

    fn cost(&self) -> u64 {
        self.cost
    }
}

impl Scorer for DisjunctionSumScorer {
    fn score(&mut self) -> Result<Score> {
        if self.freq < 0 {
            self.visit_scorers()?;
        }
        Ok(self.score as f32 * self.coord[self.freq as usize])
    }

    fn freq(&mut self) -> Result<u32> {
        if self.freq < 0 {
            self.visit_scorers()?;
        }
        Ok(self.freq as u32)
    }
}
