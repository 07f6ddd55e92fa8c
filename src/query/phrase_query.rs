//! Exact phrase matching over positional postings.

use std::any::Any;
use std::sync::Arc;

use crate::core::searcher::Searcher;
use crate::core::segment_reader::SegmentReader;
use crate::postings::{DocSet, LiveDocs, Postings, TermInfo};
use crate::query::{Query, Scorer, TermQuery, Weight};
use crate::schema::Term;
use crate::similarity::{Explanation, SimScorer, SimWeight, Similarity};
use crate::{DocId, ErrorKind, Result, Score, NO_MORE_DOCS};

/// Position window scanned at a time.
const CHUNK: i32 = 4096;

/// Query matching documents containing a run of terms at consecutive
/// positions.
#[derive(Debug, Clone)]
pub struct PhraseQuery {
    terms: Vec<Term>,
    /// Position of each term within the phrase.
    positions: Vec<i32>,
    boost: f32,
}

impl PhraseQuery {
    pub fn new(terms: Vec<Term>) -> PhraseQuery {
        assert!(!terms.is_empty(), "a phrase needs at least one term");
        debug_assert!(
            terms.windows(2).all(|pair| pair[0].field() == pair[1].field()),
            "all phrase terms must target one field"
        );
        let positions = (0..terms.len() as i32).collect();
        PhraseQuery {
            terms,
            positions,
            boost: 1.0,
        }
    }

    pub fn from_texts(field: crate::schema::Field, texts: &[&str]) -> PhraseQuery {
        PhraseQuery::new(
            texts
                .iter()
                .map(|text| Term::from_field_text(field, text))
                .collect(),
        )
    }

    pub fn with_boost(mut self, boost: f32) -> PhraseQuery {
        self.boost = boost;
        self
    }

    pub fn terms(&self) -> &[Term] {
        &self.terms
    }
}

impl Query for PhraseQuery {
    fn boost(&self) -> f32 {
        self.boost
    }

    fn rewrite(&self, _searcher: &Searcher) -> Result<Option<Box<dyn Query>>> {
        // a single-term phrase is just that term
        if self.terms.len() == 1 {
            let rewritten =
                TermQuery::new(self.terms[0].clone()).with_boost(self.boost);
            return Ok(Some(Box::new(rewritten)));
        }
        Ok(None)
    }

    fn create_weight(&self, searcher: &Searcher) -> Result<Box<dyn Weight>> {
        let field = self.terms[0].field();
        let collection_stats = searcher.collection_statistics(field)?;
        let term_stats = self
            .terms
            .iter()
            .map(|term| searcher.term_statistics(term))
            .collect::<Result<Vec<_>>>()?;
        let similarity = Arc::clone(searcher.similarity());
        let sim_weight = similarity.compute_weight(self.boost, &collection_stats, &term_stats);
        Ok(Box::new(PhraseWeight {
            terms: self.terms.clone(),
            positions: self.positions.clone(),
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

pub struct PhraseWeight {
    terms: Vec<Term>,
    positions: Vec<i32>,
    similarity: Arc<dyn Similarity>,
    sim_weight: Box<dyn SimWeight>,
}

impl Weight for PhraseWeight {
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
        let field = self.terms[0].field();
        if !reader.has_positions(field) {
            let field_name = reader.schema().get_field_entry(field).name().to_string();
            return Err(ErrorKind::FieldNotIndexed(
                field_name,
                "phrase queries need positions".to_string(),
            )
            .into());
        }
        let mut postings = Vec::with_capacity(self.terms.len());
        for (term, &position) in self.terms.iter().zip(&self.positions) {
            let info: TermInfo = match reader.term_info(term)? {
                Some(info) => info,
                // one missing term empties the whole phrase
                None => return Ok(None),
            };
            let iterator =
                reader.postings_with_positions(term, &info, live_docs.clone())?;
            postings.push((Box::new(iterator) as Box<dyn Postings>, position));
        }
        let norms = reader.norms(field);
        let sim_scorer = self.similarity.sim_scorer(&*self.sim_weight, norms)?;
        Ok(Some(Box::new(ExactPhraseScorer::new(postings, sim_scorer))))
    }

    fn explain(&self, reader: &SegmentReader, doc: DocId) -> Result<Explanation> {
        if let Some(mut scorer) = self.scorer(reader, reader.live_docs())? {
            if scorer.advance(doc)? == doc {
                let freq = scorer.freq()?;
                let norms = reader.norms(self.terms[0].field());
                let sim_scorer = self.similarity.sim_scorer(&*self.sim_weight, norms)?;
                let freq_expl =
                    Explanation::new(freq as f32, format!("phraseFreq={}", freq));
                let score_expl = sim_scorer.explain(doc, &freq_expl);
                let mut result = Explanation::new(
                    score_expl.value(),
                    format!("weight(phrase {:?} in {}), result of:", self.terms, doc),
                );
                result.add_detail(score_expl);
                return Ok(result);
            }
        }
        Ok(Explanation::new(
            0.0,
            format!("no matching phrase in doc {}", doc),
        ))
    }
}

struct ChunkState {
    postings: Box<dyn Postings>,
    /// Negated position of the term within the phrase, so that every
    /// term of one occurrence lands on the same adjusted position.
    offset: i32,
    pos_upto: u32,
    pos_limit: u32,
    pos: i32,
    last_pos: i32,
}

/// Matches phrases by walking positions in CHUNK-sized windows.
///
/// The first term stamps a generation mark at each adjusted position;
/// each middle term survives only where the previous term count
/// matches; the last term counts phrase occurrences.
pub struct ExactPhraseScorer {
    chunk_states: Vec<ChunkState>,
    end_minus_1: usize,
    doc_id: DocId,
    freq: u32,
    gen: u32,
    counts: Vec<u32>,
    gens: Vec<u32>,
    cost: u64,
    sim_scorer: Box<dyn SimScorer>,
}

impl ExactPhraseScorer {
    pub fn new(
        postings: Vec<(Box<dyn Postings>, i32)>,
        sim_scorer: Box<dyn SimScorer>,
    ) -> ExactPhraseScorer {
        debug_assert!(postings.len() >= 2);
        let end_minus_1 = postings.len() - 1;
        let cost = postings[0].0.cost();
        ExactPhraseScorer {
            chunk_states: postings
                .into_iter()
                .map(|(iterator, position)| ChunkState {
                    postings: iterator,
                    offset: -position,
                    pos_upto: 0,
                    pos_limit: 0,
                    pos: 0,
                    last_pos: 0,
                })
                .collect(),
            end_minus_1,
            doc_id: -1,
            freq: 0,
            gen: 0,
            counts: vec![0; CHUNK as usize],
            gens: vec![0; CHUNK as usize],
            cost,
            sim_scorer,
        }
    }

    /// Conjunction walk over the doc lists; on each common doc, counts
    /// the phrase occurrences and skips docs without any.
    fn do_next(&mut self, mut doc: DocId) -> Result<DocId> {
        'advance_head: loop {
            for index in 1..self.chunk_states.len() {
                if self.chunk_states[index].postings.doc() < doc {
                    let advanced = self.chunk_states[index].postings.advance(doc)?;
                    if advanced > doc {
                        doc = self.chunk_states[0].postings.advance(advanced)?;
                        continue 'advance_head;
                    }
                }
            }
            if doc == NO_MORE_DOCS {
                return Ok(doc);
            }
            if self.phrase_freq()? > 0 {
                return Ok(doc);
            }
            doc = self.chunk_states[0].postings.next_doc()?;
        }
    }

    fn phrase_freq(&mut self) -> Result<u32> {
        self.freq = 0;
        for state in &mut self.chunk_states {
            state.pos_limit = state.postings.freq();
            state.pos = state.offset + state.postings.next_position()?;
            state.pos_upto = 1;
            state.last_pos = -1;
        }

        let mut chunk_start = 0i32;
        let mut chunk_end = CHUNK;
        let mut end = false;

        while !end {
            self.gen += 1;
            if self.gen == 0 {
                // wrapped around: clear the stamps and burn a fresh gen
                self.gens.fill(0);
                self.gen += 1;
            }

            // first term: stamp candidate start positions
            {
                let state = &mut self.chunk_states[0];
                while state.pos < chunk_end {
                    if state.pos > state.last_pos {
                        state.last_pos = state.pos;
                        if state.pos >= chunk_start {
                            let pos_index = (state.pos - chunk_start) as usize;
                            self.counts[pos_index] = 1;
                            debug_assert!(self.gens[pos_index] != self.gen);
                            self.gens[pos_index] = self.gen;
                        }
                    }
                    if state.pos_upto == state.pos_limit {
                        end = true;
                        break;
                    }
                    state.pos_upto += 1;
                    state.pos = state.offset + state.postings.next_position()?;
                }
            }

            // middle terms: extend chains
            let mut any = true;
            for term_index in 1..self.end_minus_1 {
                let state = &mut self.chunk_states[term_index];
                any = false;
                while state.pos < chunk_end {
                    if state.pos > state.last_pos {
                        state.last_pos = state.pos;
                        if state.pos >= chunk_start {
                            let pos_index = (state.pos - chunk_start) as usize;
                            if self.gens[pos_index] == self.gen
                                && self.counts[pos_index] == term_index as u32
                            {
                                self.counts[pos_index] += 1;
                                any = true;
                            }
                        }
                    }
                    if state.pos_upto == state.pos_limit {
                        end = true;
                        break;
                    }
                    state.pos_upto += 1;
                    state.pos = state.offset + state.postings.next_position()?;
                }
                if !any {
                    break;
                }
            }

            if !any {
                // no chain survived this window
                chunk_start += CHUNK;
                chunk_end += CHUNK;
                continue;
            }

            // last term: complete chains count as occurrences
            {
                let state = &mut self.chunk_states[self.end_minus_1];
                while state.pos < chunk_end {
                    if state.pos > state.last_pos {
                        state.last_pos = state.pos;
                        if state.pos >= chunk_start {
                            let pos_index = (state.pos - chunk_start) as usize;
                            if self.gens[pos_index] == self.gen
                                && self.counts[pos_index] == self.end_minus_1 as u32
                            {
                                self.freq += 1;
                            }
                        }
                    }
                    if state.pos_upto == state.pos_limit {
                        end = true;
                        break;
                    }
                    state.pos_upto += 1;
                    state.pos = state.offset + state.postings.next_position()?;
                }
            }

            chunk_start += CHUNK;
            chunk_end += CHUNK;
        }

        Ok(self.freq)
    }
}

impl DocSet for ExactPhraseScorer {
    fn doc(&self) -> DocId {
        self.doc_id
    }

    fn next_doc(&mut self) -> Result<DocId> {
        let doc = self.chunk_states[0].postings.next_doc()?;
        self.doc_id = self.do_next(doc)?;
        Ok(self.doc_id)
    }

    fn advance(&mut self, target: DocId) -> Result<DocId> {
        let doc = self.chunk_states[0].postings.advance(target)?;
        self.doc_id = self.do_next(doc)?;
        Ok(self.doc_id)
    }

    fn cost(&self) -> u64 {
        self.cost
    }
}

impl Scorer for ExactPhraseScorer {
    fn score(&mut self) -> Result<Score> {
        Ok(self.sim_scorer.score(self.doc_id, self.freq as f32))
    }

    fn freq(&mut self) -> Result<u32> {
        Ok(self.freq)
    }
}
