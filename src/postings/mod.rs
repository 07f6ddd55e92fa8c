/*!
Block-compressed postings: the on-disk `(doc, freq, position, offset,
payload)` streams and the iterators that decode them.

Three files per segment hold a field's postings:

* `.doc` — doc-id deltas and frequencies, in packed 128-integer blocks
  with a vInt tail, followed per term by its multi-level skip data.
* `.pos` — position deltas in packed blocks; the tail block interleaves
  payload lengths/bytes and offset deltas as vInts.
* `.pay` — payload lengths/bytes and offset runs of the *full* blocks.

Iterators implement the [`DocSet`] protocol: `-1` before the first
`next_doc`, strictly increasing doc ids, [`NO_MORE_DOCS`] forever after
exhaustion, and sub-linear `advance` through the skip lists.
*/

mod for_util;
mod segment_postings;
mod skip;
mod term_info;
mod writer;

pub use self::for_util::{read_block, skip_block, write_block, BLOCK_SIZE};
pub use self::segment_postings::{
    LiveDocs, SegmentDocsIterator, SegmentPostingsIterator, SegmentPostingsReader,
};
pub use self::skip::{SkipReader, SkipWriter, MAX_SKIP_LEVELS, SKIP_MULTIPLIER};
pub use self::term_info::TermInfo;
pub use self::writer::PostingsWriter;

use crate::{DocId, Result, NO_MORE_DOCS};

/// Iterator over a sorted doc-id set.
pub trait DocSet {
    /// Current doc: `-1` before the first `next_doc`, `NO_MORE_DOCS`
    /// after exhaustion.
    fn doc(&self) -> DocId;

    fn next_doc(&mut self) -> Result<DocId>;

    /// First doc `>= target`, or `NO_MORE_DOCS`.
    fn advance(&mut self, target: DocId) -> Result<DocId>;

    /// Upper bound on the number of documents, for the optimizer.
    fn cost(&self) -> u64;
}

/// A doc set that also exposes per-doc postings data.
pub trait Postings: DocSet {
    /// Term frequency within the current doc; only defined after a
    /// successful `next_doc`/`advance`.
    fn freq(&self) -> u32;

    /// Next position of the term in the current doc; callable `freq()`
    /// times per doc.
    fn next_position(&mut self) -> Result<i32>;

    fn start_offset(&self) -> i32 {
        -1
    }

    fn end_offset(&self) -> i32 {
        -1
    }

    fn payload(&self) -> Option<&[u8]> {
        None
    }
}

/// In-memory doc set over a plain vector, for tests and simple
/// filters. Every doc has a frequency of 1.
pub struct VecPostings {
    docs: Vec<DocId>,
    cursor: i64,
}

impl From<Vec<DocId>> for VecPostings {
    fn from(docs: Vec<DocId>) -> VecPostings {
        debug_assert!(docs.windows(2).all(|pair| pair[0] < pair[1]));
        VecPostings { docs, cursor: -1 }
    }
}

impl DocSet for VecPostings {
    fn doc(&self) -> DocId {
        if self.cursor < 0 {
            -1
        } else if self.cursor as usize >= self.docs.len() {
            NO_MORE_DOCS
        } else {
            self.docs[self.cursor as usize]
        }
    }

    fn next_doc(&mut self) -> Result<DocId> {
        self.cursor += 1;
        Ok(self.doc())
    }

    fn advance(&mut self, target: DocId) -> Result<DocId> {
        loop {
            let doc = self.next_doc()?;
            if doc >= target {
                return Ok(doc);
            }
        }
    }

    fn cost(&self) -> u64 {
        self.docs.len() as u64
    }
}

impl Postings for VecPostings {
    fn freq(&self) -> u32 {
        1
    }

    fn next_position(&mut self) -> Result<i32> {
        Ok(0)
    }
}

#[cfg(test)]
mod tests {
    use super::{DocSet, VecPostings};
    use crate::NO_MORE_DOCS;

    #[test]
    fn test_vec_postings_iteration() {
        let mut postings = VecPostings::from(vec![1, 3, 9]);
        assert_eq!(postings.doc(), -1);
        assert_eq!(postings.next_doc().unwrap(), 1);
        assert_eq!(postings.next_doc().unwrap(), 3);
        assert_eq!(postings.next_doc().unwrap(), 9);
        assert_eq!(postings.next_doc().unwrap(), NO_MORE_DOCS);
        assert_eq!(postings.doc(), NO_MORE_DOCS);
    }

    #[test]
    fn test_vec_postings_advance() {
        let mut postings = VecPostings::from(vec![1, 3, 9, 14]);
        assert_eq!(postings.advance(3).unwrap(), 3);
        assert_eq!(postings.advance(4).unwrap(), 9);
        assert_eq!(postings.advance(15).unwrap(), NO_MORE_DOCS);
    }
}
