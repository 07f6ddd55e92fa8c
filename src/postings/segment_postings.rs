//! Iterators decoding one term's postings from the block files.

use std::sync::Arc;

use bit_set::BitSet;

use crate::common::read_vint;
use crate::directory::{check_footer, check_header, Directory, IndexInput, ReadOnlySource, SourceRead};
use crate::postings::for_util::{read_block, skip_block};
use crate::postings::writer::{
    DOC_CODEC, DOC_EXTENSION, PAY_CODEC, PAY_EXTENSION, POSTINGS_VERSION, POS_CODEC, POS_EXTENSION,
};
use crate::postings::{DocSet, Postings, SkipReader, TermInfo, BLOCK_SIZE};
use crate::schema::IndexOptions;
use crate::{DocId, ErrorKind, Result, NO_MORE_DOCS};

/// Docs with their bit set are alive; the rest are deleted and
/// silently skipped by every iterator.
pub type LiveDocs = Arc<BitSet>;

/// Per-segment access to the postings files.
pub struct SegmentPostingsReader {
    doc_source: ReadOnlySource,
    pos_source: Option<ReadOnlySource>,
    pay_source: Option<ReadOnlySource>,
}

impl SegmentPostingsReader {
    pub fn open(
        directory: &dyn Directory,
        segment_name: &str,
        has_positions: bool,
        has_payloads_or_offsets: bool,
    ) -> Result<SegmentPostingsReader> {
        let doc_name = format!("{}.{}", segment_name, DOC_EXTENSION);
        let doc_source = directory.open_source(&doc_name)?;
        check_header(
            &mut SourceRead::from(doc_source.clone()),
            &doc_name,
            DOC_CODEC,
            POSTINGS_VERSION,
            POSTINGS_VERSION,
        )?;
        check_footer(&doc_source, &doc_name)?;

        let pos_source = if has_positions {
            let pos_name = format!("{}.{}", segment_name, POS_EXTENSION);
            let source = directory.open_source(&pos_name)?;
            check_header(
                &mut SourceRead::from(source.clone()),
                &pos_name,
                POS_CODEC,
                POSTINGS_VERSION,
                POSTINGS_VERSION,
            )?;
            check_footer(&source, &pos_name)?;
            Some(source)
        } else {
            None
        };

        let pay_source = if has_positions && has_payloads_or_offsets {
            let pay_name = format!("{}.{}", segment_name, PAY_EXTENSION);
            let source = directory.open_source(&pay_name)?;
            check_header(
                &mut SourceRead::from(source.clone()),
                &pay_name,
                PAY_CODEC,
                POSTINGS_VERSION,
                POSTINGS_VERSION,
            )?;
            check_footer(&source, &pay_name)?;
            Some(source)
        } else {
            None
        };

        Ok(SegmentPostingsReader {
            doc_source,
            pos_source,
            pay_source,
        })
    }

    /// Doc/freq iterator for one term.
    pub fn docs(
        &self,
        index_options: IndexOptions,
        store_payloads: bool,
        term_info: &TermInfo,
        live_docs: Option<LiveDocs>,
    ) -> Result<SegmentDocsIterator> {
        Ok(SegmentDocsIterator::new(
            self.doc_source.clone(),
            index_options,
            store_payloads,
            term_info,
            live_docs,
        ))
    }

    /// Full postings iterator (positions, and offsets/payloads when
    /// indexed) for one term.
    pub fn docs_and_positions(
        &self,
        index_options: IndexOptions,
        store_payloads: bool,
        term_info: &TermInfo,
        live_docs: Option<LiveDocs>,
    ) -> Result<SegmentPostingsIterator> {
        if !index_options.has_positions() {
            return Err(ErrorKind::InvalidArgument(
                "field was not indexed with positions".to_string(),
            )
            .into());
        }
        let pos_source = self
            .pos_source
            .clone()
            .expect("positions indexed but .pos missing");
        Ok(SegmentPostingsIterator::new(
            self.doc_source.clone(),
            pos_source,
            self.pay_source.clone(),
            index_options,
            store_payloads,
            term_info,
            live_docs,
        ))
    }

    /// Reuse predicate: an iterator may be reset for a new term only
    /// when it reads the same backing file with the same per-field
    /// layout.
    pub fn can_reuse_docs(&self, iterator: &SegmentDocsIterator, index_options: IndexOptions, store_payloads: bool) -> bool {
        iterator.doc_source.ptr_eq(&self.doc_source)
            && iterator.index_has_freq == index_options.has_freqs()
            && iterator.index_has_pos == index_options.has_positions()
            && iterator.index_has_payloads == store_payloads
    }
}

fn read_vint_tail<R: std::io::Read>(
    input: &mut R,
    doc_buffer: &mut [u32],
    freq_buffer: &mut [u32],
    num: usize,
    index_has_freq: bool,
) -> Result<()> {
    for i in 0..num {
        let code = read_vint(input)?;
        if index_has_freq {
            doc_buffer[i] = (code >> 1) as u32;
            if code & 1 != 0 {
                freq_buffer[i] = 1;
            } else {
                freq_buffer[i] = read_vint(input)? as u32;
            }
        } else {
            doc_buffer[i] = code as u32;
        }
    }
    Ok(())
}

/// Doc-and-freq iterator over one term's `.doc` stream.
pub struct SegmentDocsIterator {
    doc_source: ReadOnlySource,
    doc_in: Box<dyn IndexInput>,

    index_has_freq: bool,
    index_has_pos: bool,
    index_has_offsets: bool,
    index_has_payloads: bool,

    doc_delta_buffer: Vec<u32>,
    freq_buffer: Vec<u32>,
    doc_buffer_upto: usize,

    doc_freq: usize,
    total_term_freq: i64,
    doc_upto: usize,
    doc: DocId,
    accum: DocId,
    freq: u32,

    doc_term_start_fp: u64,
    pos_term_start_fp: u64,
    pay_term_start_fp: u64,
    skip_offset: i64,
    singleton_doc_id: DocId,

    next_skip_doc: DocId,
    skipper: Option<SkipReader>,

    live_docs: Option<LiveDocs>,
}

impl SegmentDocsIterator {
    fn new(
        doc_source: ReadOnlySource,
        index_options: IndexOptions,
        store_payloads: bool,
        term_info: &TermInfo,
        live_docs: Option<LiveDocs>,
    ) -> SegmentDocsIterator {
        let mut doc_in: Box<dyn IndexInput> = Box::new(SourceRead::from(doc_source.clone()));
        if term_info.doc_freq > 1 {
            doc_in
                .seek(term_info.doc_start_fp)
                .expect("term pointer within file");
        }
        let index_has_freq = index_options.has_freqs();
        let mut freq_buffer = vec![1u32; BLOCK_SIZE];
        if index_has_freq {
            freq_buffer.fill(0);
        }
        SegmentDocsIterator {
            doc_source,
            doc_in,
            index_has_freq,
            index_has_pos: index_options.has_positions(),
            index_has_offsets: index_options.has_offsets(),
            index_has_payloads: store_payloads,
            doc_delta_buffer: vec![0; BLOCK_SIZE],
            freq_buffer,
            doc_buffer_upto: BLOCK_SIZE,
            doc_freq: term_info.doc_freq as usize,
            total_term_freq: term_info.total_term_freq,
            doc_upto: 0,
            doc: -1,
            accum: 0,
            freq: 1,
            doc_term_start_fp: term_info.doc_start_fp,
            pos_term_start_fp: term_info.pos_start_fp,
            pay_term_start_fp: term_info.pay_start_fp,
            skip_offset: term_info.skip_offset,
            singleton_doc_id: term_info.singleton_doc_id,
            next_skip_doc: if term_info.doc_freq > BLOCK_SIZE as i32 {
                BLOCK_SIZE as DocId - 1
            } else {
                NO_MORE_DOCS
            },
            skipper: None,
            live_docs,
        }
    }

    fn refill_docs(&mut self) -> Result<()> {
        let left = self.doc_freq - self.doc_upto;
        debug_assert!(left > 0);
        if left >= BLOCK_SIZE {
            read_block(&mut self.doc_in, &mut self.doc_delta_buffer)?;
            if self.index_has_freq {
                read_block(&mut self.doc_in, &mut self.freq_buffer)?;
            }
        } else if self.doc_freq == 1 {
            self.doc_delta_buffer[0] = self.singleton_doc_id as u32;
            self.freq_buffer[0] = self.total_term_freq as u32;
        } else {
            read_vint_tail(
                &mut self.doc_in,
                &mut self.doc_delta_buffer,
                &mut self.freq_buffer,
                left,
                self.index_has_freq,
            )?;
        }
        self.doc_buffer_upto = 0;
        Ok(())
    }

    fn try_skip(&mut self, target: DocId) -> Result<()> {
        if self.skipper.is_none() {
            debug_assert!(self.skip_offset >= 0);
            let skip_start = (self.doc_term_start_fp + self.skip_offset as u64) as usize;
            self.skipper = Some(SkipReader::new(
                self.doc_source.slice_from(skip_start),
                self.doc_freq,
                self.doc_term_start_fp,
                self.pos_term_start_fp,
                self.pay_term_start_fp,
                self.index_has_pos,
                self.index_has_payloads,
                self.index_has_offsets,
            )?);
        }
        let skipper = self.skipper.as_mut().expect("initialized above");
        let new_doc_upto = skipper.skip_to(target)? + 1;
        if new_doc_upto > self.doc_upto as i64 {
            debug_assert_eq!(new_doc_upto % BLOCK_SIZE as i64, 0);
            self.doc_upto = new_doc_upto as usize;
            self.doc_buffer_upto = BLOCK_SIZE;
            self.accum = skipper.doc();
            self.doc_in.seek(skipper.doc_pointer())?;
        }
        self.next_skip_doc = skipper.next_skip_doc();
        Ok(())
    }
}

impl DocSet for SegmentDocsIterator {
    fn doc(&self) -> DocId {
        self.doc
    }

    fn next_doc(&mut self) -> Result<DocId> {
        loop {
            if self.doc_upto == self.doc_freq {
                self.doc = NO_MORE_DOCS;
                return Ok(self.doc);
            }
            if self.doc_buffer_upto == BLOCK_SIZE {
                self.refill_docs()?;
            }
            self.accum += self.doc_delta_buffer[self.doc_buffer_upto] as DocId;
            self.doc_upto += 1;
            let alive = self
                .live_docs
                .as_ref()
                .map_or(true, |bits| bits.contains(self.accum as usize));
            if alive {
                self.doc = self.accum;
                self.freq = self.freq_buffer[self.doc_buffer_upto];
                self.doc_buffer_upto += 1;
                return Ok(self.doc);
            }
            self.doc_buffer_upto += 1;
        }
    }

    fn advance(&mut self, target: DocId) -> Result<DocId> {
        if self.doc_freq > BLOCK_SIZE && target > self.next_skip_doc {
            self.try_skip(target)?;
        }
        if self.doc_upto == self.doc_freq {
            self.doc = NO_MORE_DOCS;
            return Ok(self.doc);
        }
        if self.doc_buffer_upto == BLOCK_SIZE {
            self.refill_docs()?;
        }
        loop {
            self.accum += self.doc_delta_buffer[self.doc_buffer_upto] as DocId;
            self.doc_upto += 1;
            if self.accum >= target {
                break;
            }
            self.doc_buffer_upto += 1;
            if self.doc_upto == self.doc_freq {
                self.doc = NO_MORE_DOCS;
                return Ok(self.doc);
            }
            if self.doc_buffer_upto == BLOCK_SIZE {
                self.refill_docs()?;
            }
        }
        let alive = self
            .live_docs
            .as_ref()
            .map_or(true, |bits| bits.contains(self.accum as usize));
        if alive {
            self.freq = self.freq_buffer[self.doc_buffer_upto];
            self.doc_buffer_upto += 1;
            self.doc = self.accum;
            Ok(self.doc)
        } else {
            self.doc_buffer_upto += 1;
            self.next_doc()
        }
    }

    fn cost(&self) -> u64 {
        self.doc_freq as u64
    }
}

impl Postings for SegmentDocsIterator {
    fn freq(&self) -> u32 {
        self.freq
    }

    fn next_position(&mut self) -> Result<i32> {
        // positions were not requested from this iterator
        Ok(-1)
    }
}

/// Full postings iterator: docs, freqs, positions, and (when indexed)
/// offsets and payloads.
pub struct SegmentPostingsIterator {
    doc_source: ReadOnlySource,
    doc_in: Box<dyn IndexInput>,
    pos_in: Box<dyn IndexInput>,
    pay_in: Option<Box<dyn IndexInput>>,

    index_has_offsets: bool,
    index_has_payloads: bool,

    doc_delta_buffer: Vec<u32>,
    freq_buffer: Vec<u32>,
    pos_delta_buffer: Vec<u32>,
    payload_length_buffer: Vec<u32>,
    offset_start_delta_buffer: Vec<u32>,
    offset_length_buffer: Vec<u32>,
    payload_bytes: Vec<u8>,

    doc_buffer_upto: usize,
    pos_buffer_upto: usize,
    payload_byte_upto: usize,
    payload_start: usize,
    payload_length: usize,

    doc_freq: usize,
    total_term_freq: i64,
    doc_upto: usize,
    doc: DocId,
    accum: DocId,
    freq: u32,
    position: i32,
    start_offset: i32,
    end_offset: i32,
    last_start_offset: i32,

    /// Positions of already-returned docs not yet consumed; they must
    /// be skipped before this doc's first position.
    pos_pending_count: u32,
    /// Lazy seek targets, applied at the first `next_position`.
    pos_pending_fp: i64,
    pay_pending_fp: i64,

    doc_term_start_fp: u64,
    pos_term_start_fp: u64,
    pay_term_start_fp: u64,
    last_pos_block_fp: i64,
    skip_offset: i64,
    singleton_doc_id: DocId,

    next_skip_doc: DocId,
    skipper: Option<SkipReader>,

    live_docs: Option<LiveDocs>,
}

impl SegmentPostingsIterator {
    #[allow(clippy::too_many_arguments)]
    fn new(
        doc_source: ReadOnlySource,
        pos_source: ReadOnlySource,
        pay_source: Option<ReadOnlySource>,
        index_options: IndexOptions,
        store_payloads: bool,
        term_info: &TermInfo,
        live_docs: Option<LiveDocs>,
    ) -> SegmentPostingsIterator {
        let mut doc_in: Box<dyn IndexInput> = Box::new(SourceRead::from(doc_source.clone()));
        if term_info.doc_freq > 1 {
            doc_in
                .seek(term_info.doc_start_fp)
                .expect("term pointer within file");
        }
        let pos_in: Box<dyn IndexInput> = Box::new(SourceRead::from(pos_source));
        let pay_in = pay_source.map(|source| {
            let input: Box<dyn IndexInput> = Box::new(SourceRead::from(source));
            input
        });

        let last_pos_block_fp = if term_info.total_term_freq < BLOCK_SIZE as i64 {
            term_info.pos_start_fp as i64
        } else if term_info.total_term_freq == BLOCK_SIZE as i64 {
            -1
        } else {
            (term_info.pos_start_fp as i64) + term_info.last_pos_block_offset
        };

        SegmentPostingsIterator {
            doc_source,
            doc_in,
            pos_in,
            pay_in,
            index_has_offsets: index_options.has_offsets(),
            index_has_payloads: store_payloads,
            doc_delta_buffer: vec![0; BLOCK_SIZE],
            freq_buffer: vec![0; BLOCK_SIZE],
            pos_delta_buffer: vec![0; BLOCK_SIZE],
            payload_length_buffer: vec![0; BLOCK_SIZE],
            offset_start_delta_buffer: vec![0; BLOCK_SIZE],
            offset_length_buffer: vec![0; BLOCK_SIZE],
            payload_bytes: Vec::new(),
            doc_buffer_upto: BLOCK_SIZE,
            pos_buffer_upto: BLOCK_SIZE,
            payload_byte_upto: 0,
            payload_start: 0,
            payload_length: 0,
            doc_freq: term_info.doc_freq as usize,
            total_term_freq: term_info.total_term_freq,
            doc_upto: 0,
            doc: -1,
            accum: 0,
            freq: 0,
            position: 0,
            start_offset: -1,
            end_offset: -1,
            last_start_offset: 0,
            pos_pending_count: 0,
            pos_pending_fp: term_info.pos_start_fp as i64,
            pay_pending_fp: term_info.pay_start_fp as i64,
            doc_term_start_fp: term_info.doc_start_fp,
            pos_term_start_fp: term_info.pos_start_fp,
            pay_term_start_fp: term_info.pay_start_fp,
            last_pos_block_fp,
            skip_offset: term_info.skip_offset,
            singleton_doc_id: term_info.singleton_doc_id,
            next_skip_doc: if term_info.doc_freq > BLOCK_SIZE as i32 {
                BLOCK_SIZE as DocId - 1
            } else {
                NO_MORE_DOCS
            },
            skipper: None,
            live_docs,
        }
    }

    fn refill_docs(&mut self) -> Result<()> {
        let left = self.doc_freq - self.doc_upto;
        debug_assert!(left > 0);
        if left >= BLOCK_SIZE {
            read_block(&mut self.doc_in, &mut self.doc_delta_buffer)?;
            read_block(&mut self.doc_in, &mut self.freq_buffer)?;
        } else if self.doc_freq == 1 {
            self.doc_delta_buffer[0] = self.singleton_doc_id as u32;
            self.freq_buffer[0] = self.total_term_freq as u32;
        } else {
            read_vint_tail(
                &mut self.doc_in,
                &mut self.doc_delta_buffer,
                &mut self.freq_buffer,
                left,
                true,
            )?;
        }
        self.doc_buffer_upto = 0;
        Ok(())
    }

    fn refill_positions(&mut self) -> Result<()> {
        if self.pos_in.file_pointer() as i64 == self.last_pos_block_fp {
            // the vInt tail
            let count = (self.total_term_freq % BLOCK_SIZE as i64) as usize;
            let mut payload_length = 0u32;
            let mut offset_length = 0u32;
            self.payload_bytes.clear();
            let mut payload_upto = 0usize;
            for i in 0..count {
                let code = read_vint(&mut self.pos_in)?;
                if self.index_has_payloads {
                    if code & 1 != 0 {
                        payload_length = read_vint(&mut self.pos_in)? as u32;
                    }
                    self.payload_length_buffer[i] = payload_length;
                    self.pos_delta_buffer[i] = (code >> 1) as u32;
                    if payload_length > 0 {
                        let new_len = payload_upto + payload_length as usize;
                        self.payload_bytes.resize(new_len, 0);
                        self.pos_in
                            .read_exact(&mut self.payload_bytes[payload_upto..new_len])?;
                        payload_upto = new_len;
                    }
                } else {
                    self.pos_delta_buffer[i] = code as u32;
                }
                if self.index_has_offsets {
                    let delta_code = read_vint(&mut self.pos_in)?;
                    if delta_code & 1 != 0 {
                        offset_length = read_vint(&mut self.pos_in)? as u32;
                    }
                    self.offset_start_delta_buffer[i] = (delta_code >> 1) as u32;
                    self.offset_length_buffer[i] = offset_length;
                }
            }
            self.payload_byte_upto = 0;
        } else {
            read_block(&mut self.pos_in, &mut self.pos_delta_buffer)?;
            if self.index_has_payloads {
                let pay_in = self.pay_in.as_mut().expect("payloads indexed");
                read_block(pay_in, &mut self.payload_length_buffer)?;
                let num_bytes = read_vint(pay_in)? as usize;
                self.payload_bytes.resize(num_bytes, 0);
                pay_in.read_exact(&mut self.payload_bytes)?;
                self.payload_byte_upto = 0;
            }
            if self.index_has_offsets {
                let pay_in = self.pay_in.as_mut().expect("offsets indexed");
                read_block(pay_in, &mut self.offset_start_delta_buffer)?;
                read_block(pay_in, &mut self.offset_length_buffer)?;
            }
        }
        Ok(())
    }

    /// Skips the positions of docs that were iterated past without
    /// their positions being read.
    fn skip_positions(&mut self) -> Result<()> {
        let mut to_skip = (self.pos_pending_count - self.freq) as usize;
        let left_in_block = BLOCK_SIZE - self.pos_buffer_upto;
        if to_skip < left_in_block {
            let end = self.pos_buffer_upto + to_skip;
            while self.pos_buffer_upto < end {
                if self.index_has_payloads {
                    self.payload_byte_upto +=
                        self.payload_length_buffer[self.pos_buffer_upto] as usize;
                }
                self.pos_buffer_upto += 1;
            }
        } else {
            to_skip -= left_in_block;
            while to_skip >= BLOCK_SIZE {
                debug_assert!(self.pos_in.file_pointer() as i64 != self.last_pos_block_fp);
                skip_block(&mut *self.pos_in)?;
                if self.index_has_payloads {
                    let pay_in = self.pay_in.as_mut().expect("payloads indexed");
                    skip_block(&mut **pay_in)?;
                    let num_bytes = read_vint(pay_in)?;
                    let pos = pay_in.file_pointer();
                    pay_in.seek(pos + num_bytes)?;
                }
                if self.index_has_offsets {
                    let pay_in = self.pay_in.as_mut().expect("offsets indexed");
                    skip_block(&mut **pay_in)?;
                    skip_block(&mut **pay_in)?;
                }
                to_skip -= BLOCK_SIZE;
            }
            self.refill_positions()?;
            self.payload_byte_upto = 0;
            self.pos_buffer_upto = 0;
            while self.pos_buffer_upto < to_skip {
                if self.index_has_payloads {
                    self.payload_byte_upto +=
                        self.payload_length_buffer[self.pos_buffer_upto] as usize;
                }
                self.pos_buffer_upto += 1;
            }
        }
        self.position = 0;
        self.last_start_offset = 0;
        Ok(())
    }

    fn try_skip(&mut self, target: DocId) -> Result<()> {
        if self.skipper.is_none() {
            debug_assert!(self.skip_offset >= 0);
            let skip_start = (self.doc_term_start_fp + self.skip_offset as u64) as usize;
            self.skipper = Some(SkipReader::new(
                self.doc_source.slice_from(skip_start),
                self.doc_freq,
                self.doc_term_start_fp,
                self.pos_term_start_fp,
                self.pay_term_start_fp,
                true,
                self.index_has_payloads,
                self.index_has_offsets,
            )?);
        }
        let skipper = self.skipper.as_mut().expect("initialized above");
        let new_doc_upto = skipper.skip_to(target)? + 1;
        if new_doc_upto > self.doc_upto as i64 {
            debug_assert_eq!(new_doc_upto % BLOCK_SIZE as i64, 0);
            self.doc_upto = new_doc_upto as usize;
            self.doc_buffer_upto = BLOCK_SIZE;
            self.accum = skipper.doc();
            self.doc_in.seek(skipper.doc_pointer())?;
            self.pos_pending_fp = skipper.pos_pointer() as i64;
            self.pay_pending_fp = skipper.pay_pointer() as i64;
            self.pos_pending_count = skipper.pos_buffer_upto() as u32;
            self.last_start_offset = 0;
            self.payload_byte_upto = skipper.payload_byte_upto();
        }
        self.next_skip_doc = skipper.next_skip_doc();
        Ok(())
    }
}

impl DocSet for SegmentPostingsIterator {
    fn doc(&self) -> DocId {
        self.doc
    }

    fn next_doc(&mut self) -> Result<DocId> {
        loop {
            if self.doc_upto == self.doc_freq {
                self.doc = NO_MORE_DOCS;
                return Ok(self.doc);
            }
            if self.doc_buffer_upto == BLOCK_SIZE {
                self.refill_docs()?;
            }
            self.accum += self.doc_delta_buffer[self.doc_buffer_upto] as DocId;
            self.freq = self.freq_buffer[self.doc_buffer_upto];
            self.pos_pending_count += self.freq;
            self.doc_buffer_upto += 1;
            self.doc_upto += 1;
            let alive = self
                .live_docs
                .as_ref()
                .map_or(true, |bits| bits.contains(self.accum as usize));
            if alive {
                self.doc = self.accum;
                self.position = 0;
                self.last_start_offset = 0;
                return Ok(self.doc);
            }
        }
    }

    fn advance(&mut self, target: DocId) -> Result<DocId> {
        if self.doc_freq > BLOCK_SIZE && target > self.next_skip_doc {
            self.try_skip(target)?;
        }
        if self.doc_upto == self.doc_freq {
            self.doc = NO_MORE_DOCS;
            return Ok(self.doc);
        }
        if self.doc_buffer_upto == BLOCK_SIZE {
            self.refill_docs()?;
        }
        loop {
            self.accum += self.doc_delta_buffer[self.doc_buffer_upto] as DocId;
            self.freq = self.freq_buffer[self.doc_buffer_upto];
            self.pos_pending_count += self.freq;
            self.doc_buffer_upto += 1;
            self.doc_upto += 1;
            if self.accum >= target {
                break;
            }
            if self.doc_upto == self.doc_freq {
                self.doc = NO_MORE_DOCS;
                return Ok(self.doc);
            }
            if self.doc_buffer_upto == BLOCK_SIZE {
                self.refill_docs()?;
            }
        }
        let alive = self
            .live_docs
            .as_ref()
            .map_or(true, |bits| bits.contains(self.accum as usize));
        if alive {
            self.position = 0;
            self.last_start_offset = 0;
            self.doc = self.accum;
            Ok(self.doc)
        } else {
            self.next_doc()
        }
    }

    fn cost(&self) -> u64 {
        self.doc_freq as u64
    }
}

impl Postings for SegmentPostingsIterator {
    fn freq(&self) -> u32 {
        self.freq
    }

    fn next_position(&mut self) -> Result<i32> {
        if self.pos_pending_fp != -1 {
            self.pos_in.seek(self.pos_pending_fp as u64)?;
            self.pos_pending_fp = -1;
            if self.pay_pending_fp != -1 {
                if let Some(pay_in) = self.pay_in.as_mut() {
                    pay_in.seek(self.pay_pending_fp as u64)?;
                }
                self.pay_pending_fp = -1;
            }
            // force a refill
            self.pos_buffer_upto = BLOCK_SIZE;
        }

        if self.pos_pending_count > self.freq {
            self.skip_positions()?;
            self.pos_pending_count = self.freq;
        }

        if self.pos_buffer_upto == BLOCK_SIZE {
            self.refill_positions()?;
            self.pos_buffer_upto = 0;
        }
        self.position += self.pos_delta_buffer[self.pos_buffer_upto] as i32;

        if self.index_has_payloads {
            self.payload_length = self.payload_length_buffer[self.pos_buffer_upto] as usize;
            self.payload_start = self.payload_byte_upto;
            self.payload_byte_upto += self.payload_length;
        }

        if self.index_has_offsets {
            self.start_offset = self.last_start_offset
                + self.offset_start_delta_buffer[self.pos_buffer_upto] as i32;
            self.end_offset =
                self.start_offset + self.offset_length_buffer[self.pos_buffer_upto] as i32;
            self.last_start_offset = self.start_offset;
        }

        self.pos_buffer_upto += 1;
        self.pos_pending_count -= 1;
        Ok(self.position)
    }

    fn start_offset(&self) -> i32 {
        if self.index_has_offsets {
            self.start_offset
        } else {
            -1
        }
    }

    fn end_offset(&self) -> i32 {
        if self.index_has_offsets {
            self.end_offset
        } else {
            -1
        }
    }

    fn payload(&self) -> Option<&[u8]> {
        if self.payload_length == 0 {
            None
        } else {
            Some(&self.payload_bytes[self.payload_start..self.payload_start + self.payload_length])
        }
    }
}
