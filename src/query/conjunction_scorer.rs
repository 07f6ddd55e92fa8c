//! Scorer for conjunctions: sets of scorers, all of which are
//! required.

use crate::postings::DocSet;
use crate::query::Scorer;
use crate::{DocId, Result, Score};

struct DocsAndCost {
    scorer: Box<dyn Scorer>,
    doc: DocId,
    cost: u64,
}

pub struct ConjunctionScorer {
    last_doc: DocId,
    /// Sorted by ascending cost; the cheapest leads.
    subs: Vec<DocsAndCost>,
    coord: f32,
}

impl ConjunctionScorer {
    pub fn new(scorers: Vec<Box<dyn Scorer>>) -> ConjunctionScorer {
        ConjunctionScorer::with_coord(scorers, 1.0)
    }

    pub fn with_coord(scorers: Vec<Box<dyn Scorer>>, coord: f32) -> ConjunctionScorer {
        debug_assert!(scorers.len() >= 2);
        let mut subs: Vec<DocsAndCost> = scorers
            .into_iter()
            .map(|scorer| DocsAndCost {
                cost: scorer.cost(),
                doc: scorer.doc(),
                scorer,
            })
            .collect();
        subs.sort_by_key(|sub| sub.cost);
        ConjunctionScorer {
            last_doc: -1,
            subs,
            coord,
        }
    }

    /// The lead sits on a candidate; line every other sub up with it.
    /// Whoever overshoots sets the new candidate and the walk
    /// restarts.
    fn do_next(&mut self, mut doc: DocId) -> Result<DocId> {
        'restart: loop {
            for index in 1..self.subs.len() {
                if self.subs[index].doc < doc {
                    let advanced = self.subs[index].scorer.advance(doc)?;
                    self.subs[index].doc = advanced;
                    if advanced > doc {
                        // overshoot: re-anchor the lead and start over
                        let lead_doc = self.subs[0].scorer.advance(advanced)?;
                        self.subs[0].doc = lead_doc;
                        doc = lead_doc;
                        continue 'restart;
                    }
                }
            }
            return Ok(doc);
        }
    }
}

impl DocSet for ConjunctionScorer {
    fn doc(&self) -> DocId {
        self.last_doc
    }

    fn next_doc(&mut self) -> Result<DocId> {
        let lead_doc = self.subs[0].scorer.next_doc()?;
        self.subs[0].doc = lead_doc;
        self.last_doc = self.do_next(lead_doc)?;
        Ok(self.last_doc)
    }

    fn advance(&mut self, target: DocId) -> Result<DocId> {
        let lead_doc = self.subs[0].scorer.advance(target)?;
        self.subs[0].doc = lead_doc;
        self.last_doc = self.do_next(lead_doc)?;
        Ok(self.last_doc)
    }

    fn cost(&self) -> u64 {
        self.subs[0].cost
    }
}

impl Scorer for ConjunctionScorer {
    fn score(&mut self) -> Result<Score> {
        let mut sum = 0.0;
        for sub in &mut self.subs {
            sum += sub.scorer.score()?;
        }
        Ok(sum * self.coord)
    }

    fn freq(&mut self) -> Result<u32> {
        Ok(self.subs.len() as u32)
    }
}

#[cfg(test)]
mod tests {
    use super::ConjunctionScorer;
    use crate::postings::DocSet;
    use crate::query::test_util::{collect_docs, ConstScorer};
    use crate::query::Scorer;
    use crate::NO_MORE_DOCS;

    fn conjunction(lists: Vec<Vec<i32>>) -> ConjunctionScorer {
        let subs: Vec<Box<dyn Scorer>> = lists
            .into_iter()
            .map(|docs| Box::new(ConstScorer::new(docs, 1.0)) as Box<dyn Scorer>)
            .collect();
        ConjunctionScorer::new(subs)
    }

    #[test]
    fn test_intersection() {
        let mut scorer = conjunction(vec![
            vec![1, 3, 5, 9, 14],
            vec![3, 5, 6, 9, 20],
            vec![0, 3, 9, 14],
        ]);
        assert_eq!(collect_docs(&mut scorer), vec![3, 9]);
    }

    #[test]
    fn test_empty_intersection() {
        let mut scorer = conjunction(vec![vec![1, 2], vec![3, 4]]);
        assert_eq!(collect_docs(&mut scorer), Vec::<i32>::new());
    }

    #[test]
    fn test_advance() {
        let mut scorer = conjunction(vec![vec![1, 3, 7, 9, 40], vec![3, 7, 9, 11, 40]]);
        assert_eq!(scorer.advance(4).unwrap(), 7);
        assert_eq!(scorer.advance(10).unwrap(), 40);
        assert_eq!(scorer.advance(41).unwrap(), NO_MORE_DOCS);
    }

    #[test]
    fn test_score_is_coord_times_sum() {
        let subs: Vec<Box<dyn Scorer>> = vec![
            Box::new(ConstScorer::new(vec![4], 2.0)),
            Box::new(ConstScorer::new(vec![4], 3.0)),
        ];
        let mut scorer = ConjunctionScorer::with_coord(subs, 0.5);
        assert_eq!(scorer.next_doc().unwrap(), 4);
        assert_eq!(scorer.score().unwrap(), 2.5);
        assert_eq!(scorer.freq().unwrap(), 2);
    }
}
