//! Disjunction with a minimum number of matching clauses.
//!
//! A mixture of a pure disjunction and a conjunction: the cheap
//! sub-scorers stay in a doc-ordered min-heap and generate candidates;
//! the `mm - 1` most expensive ones wait on a stack and are only probed
//! via `advance`, so their long posting lists are skipped through
//! rather than walked.

use crate::postings::DocSet;
use crate::query::Scorer;
use crate::{DocId, Result, Score, NO_MORE_DOCS};

pub struct MinShouldMatchSumScorer {
    scorers: Vec<Box<dyn Scorer>>,
    /// Indices of `scorers`, sorted by descending cost.
    sorted: Vec<usize>,
    /// Cursor into `sorted`: the next candidate to refill the stack.
    sorted_cursor: usize,
    /// The `mm - 1` most expensive sub-scorers, probed lazily.
    mm_stack: Vec<usize>,
    /// Doc-ordered min-heap of the remaining sub-scorers.
    heap: Vec<usize>,
    num_scorers: usize,
    mm: usize,
    doc: DocId,
    nr_matchers: i64,
    score: f64,
    coord: Vec<f32>,
}

impl MinShouldMatchSumScorer {
    pub fn new(
        sub_scorers: Vec<Box<dyn Scorer>>,
        minimum_nr_matchers: usize,
        coord: Vec<f32>,
    ) -> MinShouldMatchSumScorer {
        assert!(minimum_nr_matchers > 0, "minimum number of matchers must be positive");
        assert!(sub_scorers.len() > 1, "there must be at least 2 sub-scorers");
        let num_scorers = sub_scorers.len();
        let mut sorted: Vec<usize> = (0..num_scorers).collect();
        let mut costs: Vec<u64> = sub_scorers.iter().map(|scorer| scorer.cost()).collect();
        sorted.sort_by(|&a, &b| costs[b].cmp(&costs[a]));
        costs.clear();

        let mm_stack: Vec<usize> = sorted[..minimum_nr_matchers - 1].to_vec();
        let heap: Vec<usize> = sorted[minimum_nr_matchers - 1..].to_vec();

        let mut scorer = MinShouldMatchSumScorer {
            scorers: sub_scorers,
            sorted,
            sorted_cursor: minimum_nr_matchers - 1,
            mm_stack,
            heap,
            num_scorers,
            mm: minimum_nr_matchers,
            doc: -1,
            nr_matchers: -1,
            score: f64::NAN,
            coord,
        };
        scorer.minheap_heapify();
        scorer
    }

    fn heap_doc(&self, heap_slot: usize) -> DocId {
        self.scorers[self.heap[heap_slot]].doc()
    }

    fn minheap_heapify(&mut self) {
        for i in (0..self.heap.len() / 2).rev() {
            self.minheap_sift_down(i);
        }
    }

    fn minheap_sift_down(&mut self, root: usize) {
        let mut i = root;
        loop {
            if i >= self.heap.len() / 2 {
                return;
            }
            let doc = self.heap_doc(i);
            let lchild = 2 * i + 1;
            let ldoc = self.heap_doc(lchild);
            let rchild = 2 * i + 2;
            let rdoc = if rchild < self.heap.len() {
                self.heap_doc(rchild)
            } else {
                DocId::MAX
            };
            if ldoc < doc {
                if rdoc < ldoc {
                    self.heap.swap(i, rchild);
                    i = rchild;
                } else {
                    self.heap.swap(i, lchild);
                    i = lchild;
                }
            } else if rdoc < doc {
                self.heap.swap(i, rchild);
                i = rchild;
            } else {
                return;
            }
        }
    }

    fn minheap_sift_up(&mut self, mut i: usize) {
        let doc = self.heap_doc(i);
        while i > 0 {
            let parent = (i - 1) / 2;
            if self.heap_doc(parent) > doc {
                self.heap.swap(i, parent);
                i = parent;
            } else {
                break;
            }
        }
    }

    fn minheap_remove_root(&mut self) {
        let last = self.heap.len() - 1;
        self.heap.swap(0, last);
        self.heap.truncate(last);
        if !self.heap.is_empty() {
            self.minheap_sift_down(0);
        }
    }

    /// Removes a specific scorer from the heap; false when it is not
    /// there (already exhausted and dropped).
    fn minheap_remove(&mut self, scorer_index: usize) -> bool {
        for slot in 0..self.heap.len() {
            if self.heap[slot] == scorer_index {
                let last = self.heap.len() - 1;
                self.heap.swap(slot, last);
                self.heap.truncate(last);
                if slot < self.heap.len() {
                    self.minheap_sift_up(slot);
                    self.minheap_sift_down(slot);
                }
                return true;
            }
        }
        false
    }

    /// Scores the doc at the heap root and probes the stack to settle
    /// whether it reaches `mm` matchers.
    fn evaluate_smallest_doc_in_heap(&mut self) -> Result<()> {
        self.doc = self.heap_doc(0);
        if self.doc == NO_MORE_DOCS {
            self.nr_matchers = i64::MAX;
            return Ok(());
        }
        self.score = f64::from(self.scorers[self.heap[0]].score()?);
        self.nr_matchers = 1;
        self.count_matches(1)?;
        self.count_matches(2)?;

        // probe the expensive stack, sparsest first
        for i in (0..self.mm - 1).rev() {
            let stack_scorer = self.mm_stack[i];
            if self.scorers[stack_scorer].doc() < self.doc {
                self.scorers[stack_scorer].advance(self.doc)?;
            }
            let stack_doc = self.scorers[stack_scorer].doc();
            if stack_doc == self.doc {
                self.nr_matchers += 1;
                self.score += f64::from(self.scorers[stack_scorer].score()?);
            } else if stack_doc == NO_MORE_DOCS {
                // stack scorer exhausted: shrink, then promote the next
                // most costly scorer out of the heap onto the stack
                self.num_scorers -= 1;
                if self.num_scorers < self.mm {
                    self.doc = NO_MORE_DOCS;
                    self.nr_matchers = i64::MAX;
                    return Ok(());
                }
                self.mm_stack.remove(i);
                loop {
                    let candidate = self.sorted[self.sorted_cursor];
                    self.sorted_cursor += 1;
                    if self.minheap_remove(candidate) {
                        self.mm_stack.push(candidate);
                        break;
                    }
                }
                if self.nr_matchers + (i as i64) < self.mm as i64 {
                    // too few potential matchers left for this doc
                    return Ok(());
                }
            } else if self.nr_matchers + (i as i64) < self.mm as i64 {
                // the remaining stack cannot save this doc
                return Ok(());
            }
        }
        Ok(())
    }

    fn count_matches(&mut self, root: usize) -> Result<()> {
        if root < self.heap.len() && self.heap_doc(root) == self.doc {
            self.nr_matchers += 1;
            self.score += f64::from(self.scorers[self.heap[root]].score()?);
            self.count_matches(2 * root + 1)?;
            self.count_matches(2 * root + 2)?;
        }
        Ok(())
    }
}

impl DocSet for MinShouldMatchSumScorer {
    fn doc(&self) -> DocId {
        self.doc
    }

    fn next_doc(&mut self) -> Result<DocId> {
        debug_assert!(self.doc != NO_MORE_DOCS);
        loop {
            // push every heap scorer past the current doc
            while self.heap_doc(0) == self.doc {
                let top = self.heap[0];
                if self.scorers[top].next_doc()? != NO_MORE_DOCS {
                    self.minheap_sift_down(0);
                } else {
                    self.minheap_remove_root();
                    self.num_scorers -= 1;
                    if self.num_scorers < self.mm {
                        self.doc = NO_MORE_DOCS;
                        return Ok(self.doc);
                    }
                }
            }
            self.evaluate_smallest_doc_in_heap()?;
            if self.nr_matchers >= self.mm as i64 {
                break;
            }
        }
        Ok(self.doc)
    }

    fn advance(&mut self, target: DocId) -> Result<DocId> {
        if self.num_scorers < self.mm {
            self.doc = NO_MORE_DOCS;
            return Ok(self.doc);
        }
        while self.heap_doc(0) < target {
            let top = self.heap[0];
            if self.scorers[top].advance(target)? != NO_MORE_DOCS {
                self.minheap_sift_down(0);
            } else {
                self.minheap_remove_root();
                self.num_scorers -= 1;
                if self.num_scorers < self.mm {
                    self.doc = NO_MORE_DOCS;
                    return Ok(self.doc);
                }
            }
        }
        self.evaluate_smallest_doc_in_heap()?;
        if self.nr_matchers >= self.mm as i64 {
            Ok(self.doc)
        } else {
            self.next_doc()
        }
    }

    fn cost(&self) -> u64 {
        // rough bound: the heap generates the candidates
        self.heap
            .iter()
            .map(|&index| self.scorers[index].cost())
            .sum()
    }
}

impl Scorer for MinShouldMatchSumScorer {
    fn score(&mut self) -> Result<Score> {
        Ok(self.score as f32 * self.coord[self.nr_matchers.min(self.coord.len() as i64 - 1) as usize])
    }

    fn freq(&mut self) -> Result<u32> {
        Ok(self.nr_matchers as u32)
    }
}

#[cfg(test)]
mod tests {
    use super::MinShouldMatchSumScorer;
    use crate::postings::DocSet;
    use crate::query::test_util::{collect_docs, ConstScorer};
    use crate::query::Scorer;
    use crate::NO_MORE_DOCS;

    fn mm_scorer(lists: Vec<Vec<i32>>, mm: usize) -> MinShouldMatchSumScorer {
        let coord = vec![1.0f32; lists.len() + 1];
        let subs: Vec<Box<dyn Scorer>> = lists
            .into_iter()
            .map(|docs| Box::new(ConstScorer::new(docs, 1.0)) as Box<dyn Scorer>)
            .collect();
        MinShouldMatchSumScorer::new(subs, mm, coord)
    }

    #[test]
    fn test_two_of_three() {
        let mut scorer = mm_scorer(
            vec![vec![1, 2, 5, 9], vec![2, 5, 7], vec![5, 9, 11]],
            2,
        );
        assert_eq!(collect_docs(&mut scorer), vec![2, 5, 9]);
    }

    #[test]
    fn test_three_of_three_is_intersection() {
        let mut scorer = mm_scorer(
            vec![vec![1, 4, 6, 9], vec![4, 9, 12], vec![0, 4, 9]],
            3,
        );
        assert_eq!(collect_docs(&mut scorer), vec![4, 9]);
    }

    #[test]
    fn test_mm_with_skewed_costs() {
        // the long list lands on the stack and is only probed
        let long: Vec<i32> = (0..500).collect();
        let mut scorer = mm_scorer(vec![long, vec![100, 200, 600], vec![100, 300]], 2);
        assert_eq!(collect_docs(&mut scorer), vec![100, 200, 300]);
    }

    #[test]
    fn test_advance() {
        let mut scorer = mm_scorer(
            vec![vec![1, 5, 20, 30], vec![5, 20, 35], vec![20, 30, 35]],
            2,
        );
        assert_eq!(scorer.advance(6).unwrap(), 20);
        assert_eq!(scorer.freq().unwrap(), 3);
        assert_eq!(scorer.advance(31).unwrap(), 35);
        assert_eq!(scorer.advance(36).unwrap(), NO_MORE_DOCS);
    }

    #[test]
    fn test_exhausted_stack_scorer_is_replaced() {
        // the most expensive scorer dries up early; the constraint must
        // still be enforced with the remaining ones
        let mut scorer = mm_scorer(
            vec![(0..300).collect(), vec![310, 320], vec![310, 330], vec![320, 330]],
            2,
        );
        assert_eq!(collect_docs(&mut scorer), vec![310, 320, 330]);
    }
}
