//! Multi-level skip lists over the block postings.
//!
//! Level 0 records one entry per completed 128-doc block; level `n`
//! keeps every 8th entry of level `n - 1`. Each entry carries the last
//! doc of its block and the file pointers (doc/pos/pay) plus
//! within-block cursors needed to resume decoding right after it.
//! Entries above level 0 end with a pointer into the child level.

use std::io;
use std::io::Write;

use crate::common::{read_vint, write_vint};
use crate::directory::{IndexInput, ReadOnlySource, SourceRead};
use crate::postings::BLOCK_SIZE;
use crate::{DocId, NO_MORE_DOCS};

pub const MAX_SKIP_LEVELS: usize = 10;
pub const SKIP_MULTIPLIER: usize = 8;

/// Entries buffered per level until the term finishes.
pub struct SkipWriter {
    has_positions: bool,
    has_payloads: bool,
    has_offsets: bool,
    buffers: Vec<Vec<u8>>,
    last_doc: [DocId; MAX_SKIP_LEVELS],
    last_doc_pointer: [u64; MAX_SKIP_LEVELS],
    last_pos_pointer: [u64; MAX_SKIP_LEVELS],
    last_pay_pointer: [u64; MAX_SKIP_LEVELS],
}

impl SkipWriter {
    pub fn new(has_positions: bool, has_payloads: bool, has_offsets: bool) -> SkipWriter {
        SkipWriter {
            has_positions,
            has_payloads,
            has_offsets,
            buffers: (0..MAX_SKIP_LEVELS).map(|_| Vec::new()).collect(),
            last_doc: [0; MAX_SKIP_LEVELS],
            last_doc_pointer: [0; MAX_SKIP_LEVELS],
            last_pos_pointer: [0; MAX_SKIP_LEVELS],
            last_pay_pointer: [0; MAX_SKIP_LEVELS],
        }
    }

    /// Resets per-term state; deltas are taken against the term's
    /// start pointers.
    pub fn reset(&mut self, doc_base_fp: u64, pos_base_fp: u64, pay_base_fp: u64) {
        for buffer in &mut self.buffers {
            buffer.clear();
        }
        self.last_doc = [0; MAX_SKIP_LEVELS];
        self.last_doc_pointer = [doc_base_fp; MAX_SKIP_LEVELS];
        self.last_pos_pointer = [pos_base_fp; MAX_SKIP_LEVELS];
        self.last_pay_pointer = [pay_base_fp; MAX_SKIP_LEVELS];
    }

    /// Buffers a skip point after a completed block.
    ///
    /// `doc` is the last doc of the block, `num_docs` the number of
    /// docs written so far (a multiple of the block size), and the
    /// cursors describe where that block's positions/payloads end.
    #[allow(clippy::too_many_arguments)]
    pub fn buffer_skip(
        &mut self,
        doc: DocId,
        num_docs: usize,
        doc_fp: u64,
        pos_fp: u64,
        pay_fp: u64,
        pos_buffer_upto: usize,
        payload_byte_upto: usize,
    ) -> io::Result<()> {
        debug_assert_eq!(num_docs % BLOCK_SIZE, 0);
        let mut num_levels = 1;
        let mut blocks = num_docs / BLOCK_SIZE;
        while blocks % SKIP_MULTIPLIER == 0 && num_levels < MAX_SKIP_LEVELS {
            num_levels += 1;
            blocks /= SKIP_MULTIPLIER;
        }

        let mut child_pointer = 0u64;
        for level in 0..num_levels {
            let buffer = &mut self.buffers[level];
            write_vint((doc - self.last_doc[level]) as u64, buffer)?;
            self.last_doc[level] = doc;
            write_vint(doc_fp - self.last_doc_pointer[level], buffer)?;
            self.last_doc_pointer[level] = doc_fp;
            if self.has_positions {
                write_vint(pos_fp - self.last_pos_pointer[level], buffer)?;
                self.last_pos_pointer[level] = pos_fp;
                write_vint(pos_buffer_upto as u64, buffer)?;
                if self.has_payloads {
                    write_vint(payload_byte_upto as u64, buffer)?;
                }
                if self.has_payloads || self.has_offsets {
                    write_vint(pay_fp - self.last_pay_pointer[level], buffer)?;
                    self.last_pay_pointer[level] = pay_fp;
                }
            }
            let new_child_pointer = self.buffers[level].len() as u64;
            if level != 0 {
                write_vint(child_pointer, &mut self.buffers[level])?;
            }
            child_pointer = new_child_pointer;
        }
        Ok(())
    }

    /// Flushes the level buffers, highest first, each prefixed with its
    /// length so readers can locate every level.
    pub fn write_skip<W: Write>(&mut self, out: &mut W) -> io::Result<()> {
        for level in (1..MAX_SKIP_LEVELS).rev() {
            if !self.buffers[level].is_empty() {
                write_vint(self.buffers[level].len() as u64, out)?;
                out.write_all(&self.buffers[level])?;
            }
        }
        out.write_all(&self.buffers[0])
    }
}

fn number_of_levels(doc_count: usize) -> usize {
    if doc_count <= BLOCK_SIZE {
        return 1;
    }
    let mut levels = 1;
    let mut blocks = doc_count / BLOCK_SIZE;
    while blocks >= SKIP_MULTIPLIER {
        levels += 1;
        blocks /= SKIP_MULTIPLIER;
    }
    levels.min(MAX_SKIP_LEVELS)
}

struct SkipLevel {
    stream: SourceRead,
    skip_doc: DocId,
    num_skipped: usize,
    doc_pointer: u64,
    pos_pointer: u64,
    pay_pointer: u64,
    pos_buffer_upto: usize,
    payload_byte_upto: usize,
    child_pointer: u64,
    /// Where this level's bytes start within the skip region.
    base: u64,
}

/// Walks the skip structure of one term.
pub struct SkipReader {
    has_positions: bool,
    has_payloads: bool,
    has_offsets: bool,
    levels: Vec<SkipLevel>,
    active_levels: usize,
    doc_count: usize,
    // data of the last skip point taken
    last_doc: DocId,
    last_doc_pointer: u64,
    last_pos_pointer: u64,
    last_pay_pointer: u64,
    last_pos_buffer_upto: usize,
    last_payload_byte_upto: usize,
    last_child_pointer: u64,
}

impl SkipReader {
    /// `skip_source` is the byte range produced by
    /// [`SkipWriter::write_skip`]; `doc_freq` the term's doc count; the
    /// base pointers are the term's start positions in each file.
    pub fn new(
        skip_source: ReadOnlySource,
        doc_freq: usize,
        doc_base_fp: u64,
        pos_base_fp: u64,
        pay_base_fp: u64,
        has_positions: bool,
        has_payloads: bool,
        has_offsets: bool,
    ) -> io::Result<SkipReader> {
        // skip entries only exist for blocks with a doc after them
        let doc_count = if doc_freq % BLOCK_SIZE == 0 {
            doc_freq - 1
        } else {
            doc_freq
        };
        let num_levels = number_of_levels(doc_count);

        // levels are laid out highest first, each prefixed with its
        // length; level 0 runs to the end of the region
        let mut level_ranges: Vec<(u64, u64)> = vec![(0, 0); num_levels];
        let mut cursor = SourceRead::from(skip_source.clone());
        for level in (1..num_levels).rev() {
            let length = read_vint(&mut cursor)?;
            let start = cursor.file_pointer();
            level_ranges[level] = (start, start + length);
            cursor.seek(start + length)?;
        }
        level_ranges[0] = (cursor.file_pointer(), skip_source.len() as u64);

        let mut levels = Vec::with_capacity(num_levels);
        for &(start, _stop) in &level_ranges {
            let mut stream = SourceRead::from(skip_source.clone());
            stream.seek(start)?;
            levels.push(SkipLevel {
                stream,
                skip_doc: 0,
                num_skipped: 0,
                doc_pointer: doc_base_fp,
                pos_pointer: pos_base_fp,
                pay_pointer: pay_base_fp,
                pos_buffer_upto: 0,
                payload_byte_upto: 0,
                child_pointer: 0,
                base: start,
            });
        }

        Ok(SkipReader {
            has_positions,
            has_payloads,
            has_offsets,
            levels,
            active_levels: num_levels,
            doc_count,
            last_doc: 0,
            last_doc_pointer: doc_base_fp,
            last_pos_pointer: pos_base_fp,
            last_pay_pointer: pay_base_fp,
            last_pos_buffer_upto: 0,
            last_payload_byte_upto: 0,
            last_child_pointer: 0,
        })
    }

    fn skip_interval(level: usize) -> usize {
        BLOCK_SIZE * SKIP_MULTIPLIER.pow(level as u32)
    }

    fn read_entry(&mut self, level: usize) -> io::Result<()> {
        let has_positions = self.has_positions;
        let has_payloads = self.has_payloads;
        let has_offsets = self.has_offsets;
        let child_base = if level > 0 { self.levels[level - 1].base } else { 0 };
        let entry = &mut self.levels[level];
        entry.skip_doc += read_vint(&mut entry.stream)? as DocId;
        entry.doc_pointer += read_vint(&mut entry.stream)?;
        if has_positions {
            entry.pos_pointer += read_vint(&mut entry.stream)?;
            entry.pos_buffer_upto = read_vint(&mut entry.stream)? as usize;
            if has_payloads {
                entry.payload_byte_upto = read_vint(&mut entry.stream)? as usize;
            }
            if has_payloads || has_offsets {
                entry.pay_pointer += read_vint(&mut entry.stream)?;
            }
        }
        if level != 0 {
            let child = read_vint(&mut entry.stream)?;
            entry.child_pointer = child + child_base;
        }
        Ok(())
    }

    fn set_last_skip_data(&mut self, level: usize) {
        let entry = &self.levels[level];
        self.last_doc = entry.skip_doc;
        self.last_child_pointer = entry.child_pointer;
        self.last_doc_pointer = entry.doc_pointer;
        if self.has_positions {
            self.last_pos_pointer = entry.pos_pointer;
            self.last_pos_buffer_upto = entry.pos_buffer_upto;
            if self.has_payloads {
                self.last_payload_byte_upto = entry.payload_byte_upto;
            }
            if self.has_payloads || self.has_offsets {
                self.last_pay_pointer = entry.pay_pointer;
            }
        }
    }

    fn load_next_skip(&mut self, level: usize) -> io::Result<bool> {
        self.set_last_skip_data(level);
        self.levels[level].num_skipped += SkipReader::skip_interval(level);
        if self.levels[level].num_skipped > self.doc_count {
            // this level is exhausted
            self.levels[level].skip_doc = NO_MORE_DOCS;
            if self.active_levels > level {
                self.active_levels = level;
            }
            return Ok(false);
        }
        self.read_entry(level)?;
        Ok(true)
    }

    fn seek_child(&mut self, level: usize) -> io::Result<()> {
        let parent_num_skipped = self.levels[level + 1].num_skipped;
        let child_base = if level > 0 { self.levels[level - 1].base } else { 0 };
        let entry = &mut self.levels[level];
        entry.stream.seek(self.last_child_pointer)?;
        entry.num_skipped = parent_num_skipped - SkipReader::skip_interval(level + 1);
        entry.skip_doc = self.last_doc;
        entry.doc_pointer = self.last_doc_pointer;
        if self.has_positions {
            entry.pos_pointer = self.last_pos_pointer;
            entry.pos_buffer_upto = self.last_pos_buffer_upto;
            if self.has_payloads {
                entry.payload_byte_upto = self.last_payload_byte_upto;
            }
            if self.has_payloads || self.has_offsets {
                entry.pay_pointer = self.last_pay_pointer;
            }
        }
        if level != 0 {
            let child = read_vint(&mut entry.stream)?;
            entry.child_pointer = child + child_base;
        }
        Ok(())
    }

    /// Positions the reader on the last skip point whose doc is
    /// `< target`, returning the index of the last doc it skipped
    /// over (so `return + 1` is the first doc of the block to scan).
    pub fn skip_to(&mut self, target: DocId) -> io::Result<i64> {
        // climb while the level above already has a usable entry
        let mut level: i64 = 0;
        while level + 1 < self.active_levels as i64
            && target > self.levels[level as usize + 1].skip_doc
        {
            level += 1;
        }

        while level >= 0 {
            if target > self.levels[level as usize].skip_doc {
                if !self.load_next_skip(level as usize)? {
                    continue;
                }
            } else {
                if level > 0
                    && self.last_child_pointer > self.levels[level as usize - 1].stream.file_pointer()
                {
                    self.seek_child(level as usize - 1)?;
                }
                level -= 1;
            }
        }

        Ok(self.levels[0].num_skipped as i64 - BLOCK_SIZE as i64 - 1)
    }

    /// Doc of the last skip point taken.
    pub fn doc(&self) -> DocId {
        self.last_doc
    }

    pub fn doc_pointer(&self) -> u64 {
        self.last_doc_pointer
    }

    pub fn pos_pointer(&self) -> u64 {
        self.last_pos_pointer
    }

    pub fn pay_pointer(&self) -> u64 {
        self.last_pay_pointer
    }

    pub fn pos_buffer_upto(&self) -> usize {
        self.last_pos_buffer_upto
    }

    pub fn payload_byte_upto(&self) -> usize {
        self.last_payload_byte_upto
    }

    /// Doc of the next level-0 skip point; targets at or below it do
    /// not need the skipper.
    pub fn next_skip_doc(&self) -> DocId {
        self.levels[0].skip_doc
    }
}

#[cfg(test)]
mod tests {
    use super::{SkipReader, SkipWriter};
    use crate::directory::ReadOnlySource;
    use crate::postings::BLOCK_SIZE;
    use crate::DocId;

    /// Writes skip data for a term with `num_blocks` full blocks where
    /// block `i` ends at doc `(i + 1) * BLOCK_SIZE - 1` and starts in
    /// the doc file at `i * 1000`.
    fn build(num_blocks: usize) -> (Vec<u8>, usize) {
        let mut writer = SkipWriter::new(false, false, false);
        writer.reset(0, 0, 0);
        let doc_freq = num_blocks * BLOCK_SIZE + 5;
        for block in 1..=num_blocks {
            let last_doc = (block * BLOCK_SIZE - 1) as DocId;
            writer
                .buffer_skip(last_doc, block * BLOCK_SIZE, block as u64 * 1000, 0, 0, 0, 0)
                .unwrap();
        }
        let mut bytes = Vec::new();
        writer.write_skip(&mut bytes).unwrap();
        (bytes, doc_freq)
    }

    #[test]
    fn test_skip_within_first_block() {
        let (bytes, doc_freq) = build(4);
        let mut reader = SkipReader::new(
            ReadOnlySource::from(bytes),
            doc_freq,
            0,
            0,
            0,
            false,
            false,
            false,
        )
        .unwrap();
        // target inside block 0: no skip taken
        let skipped = reader.skip_to(5).unwrap();
        assert!(skipped < 0);
        assert_eq!(reader.doc_pointer(), 0);
    }

    #[test]
    fn test_skip_to_later_block() {
        let (bytes, doc_freq) = build(4);
        let mut reader = SkipReader::new(
            ReadOnlySource::from(bytes),
            doc_freq,
            0,
            0,
            0,
            false,
            false,
            false,
        )
        .unwrap();
        // target in block 3: the last skip point before it is the end
        // of block 2
        let target = (3 * BLOCK_SIZE + 10) as DocId;
        let skipped = reader.skip_to(target).unwrap();
        assert_eq!(skipped + 1, (3 * BLOCK_SIZE) as i64);
        assert_eq!(reader.doc(), (3 * BLOCK_SIZE - 1) as DocId);
        assert_eq!(reader.doc_pointer(), 3_000);
    }

    #[test]
    fn test_skip_with_multiple_levels() {
        // 70 blocks: level 1 entries exist (every 8th block)
        let (bytes, doc_freq) = build(70);
        let mut reader = SkipReader::new(
            ReadOnlySource::from(bytes),
            doc_freq,
            0,
            0,
            0,
            false,
            false,
            false,
        )
        .unwrap();
        let target = (65 * BLOCK_SIZE + 3) as DocId;
        let skipped = reader.skip_to(target).unwrap();
        assert_eq!(skipped + 1, (65 * BLOCK_SIZE) as i64);
        assert_eq!(reader.doc_pointer(), 65_000);
        // a later target continues from here
        let target2 = (69 * BLOCK_SIZE + 1) as DocId;
        let skipped2 = reader.skip_to(target2).unwrap();
        assert_eq!(skipped2 + 1, (69 * BLOCK_SIZE) as i64);
        assert_eq!(reader.doc_pointer(), 69_000);
    }

    #[test]
    fn test_skip_past_every_entry() {
        let (bytes, doc_freq) = build(4);
        let mut reader = SkipReader::new(
            ReadOnlySource::from(bytes),
            doc_freq,
            0,
            0,
            0,
            false,
            false,
            false,
        )
        .unwrap();
        // beyond all skip points: lands after the final buffered block
        let skipped = reader.skip_to(1_000_000).unwrap();
        assert_eq!(skipped + 1, (4 * BLOCK_SIZE) as i64);
        assert_eq!(reader.doc_pointer(), 4_000);
    }
}
