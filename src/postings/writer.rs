//! Writes the `.doc`/`.pos`/`.pay` files, one term at a time.
//!
//! The caller feeds terms in sorted order and, within a term, docs in
//! increasing order with their positions. Full 128-integer blocks are
//! bit-packed; whatever is left at term end goes out as the vInt tail.

use std::io::Write;

use crate::common::write_vint;
use crate::directory::{write_footer, write_header, Directory, IndexOutput};
use crate::postings::for_util::write_block;
use crate::postings::{SkipWriter, TermInfo, BLOCK_SIZE};
use crate::schema::IndexOptions;
use crate::{DocId, ErrorKind, Result};

pub const DOC_EXTENSION: &str = "doc";
pub const POS_EXTENSION: &str = "pos";
pub const PAY_EXTENSION: &str = "pay";

pub const DOC_CODEC: &str = "TallyhoPostingsDoc";
pub const POS_CODEC: &str = "TallyhoPostingsPos";
pub const PAY_CODEC: &str = "TallyhoPostingsPay";
pub const POSTINGS_VERSION: i32 = 1;

pub struct PostingsWriter {
    doc_out: Box<dyn IndexOutput>,
    pos_out: Option<Box<dyn IndexOutput>>,
    pay_out: Option<Box<dyn IndexOutput>>,

    // per-field state, set by `set_field`
    index_options: IndexOptions,
    write_freqs: bool,
    write_positions: bool,
    write_payloads: bool,
    write_offsets: bool,

    skip_writer: SkipWriter,

    // per-term state
    doc_delta_buffer: Vec<u32>,
    freq_buffer: Vec<u32>,
    doc_buffer_upto: usize,
    doc_count: usize,
    total_term_freq: i64,
    last_doc_id: DocId,
    doc_start_fp: u64,
    pos_start_fp: u64,
    pay_start_fp: u64,
    // last completed block, pending a skip entry once another doc starts
    last_block_doc_id: DocId,
    last_block_pos_fp: u64,
    last_block_pay_fp: u64,
    last_block_pos_buffer_upto: usize,
    last_block_payload_byte_upto: usize,

    // per-doc position state
    pos_delta_buffer: Vec<u32>,
    payload_length_buffer: Vec<u32>,
    offset_start_delta_buffer: Vec<u32>,
    offset_length_buffer: Vec<u32>,
    payload_bytes: Vec<u8>,
    pos_buffer_upto: usize,
    payload_byte_upto: usize,
    last_position: i32,
    last_start_offset: i32,
}

impl PostingsWriter {
    /// Creates the segment's postings files. `has_positions` and
    /// `has_payloads_or_offsets` describe the whole segment; the
    /// per-field layout is chosen with [`set_field`](Self::set_field).
    pub fn new(
        directory: &mut dyn Directory,
        segment_name: &str,
        has_positions: bool,
        has_payloads_or_offsets: bool,
    ) -> Result<PostingsWriter> {
        let mut doc_out = directory.create_output(&format!("{}.{}", segment_name, DOC_EXTENSION))?;
        write_header(&mut doc_out, DOC_CODEC, POSTINGS_VERSION)?;

        let pos_out = if has_positions {
            let mut out = directory.create_output(&format!("{}.{}", segment_name, POS_EXTENSION))?;
            write_header(&mut out, POS_CODEC, POSTINGS_VERSION)?;
            Some(out)
        } else {
            None
        };
        let pay_out = if has_positions && has_payloads_or_offsets {
            let mut out = directory.create_output(&format!("{}.{}", segment_name, PAY_EXTENSION))?;
            write_header(&mut out, PAY_CODEC, POSTINGS_VERSION)?;
            Some(out)
        } else {
            None
        };

        Ok(PostingsWriter {
            doc_out,
            pos_out,
            pay_out,
            index_options: IndexOptions::DocsOnly,
            write_freqs: false,
            write_positions: false,
            write_payloads: false,
            write_offsets: false,
            skip_writer: SkipWriter::new(false, false, false),
            doc_delta_buffer: vec![0; BLOCK_SIZE],
            freq_buffer: vec![0; BLOCK_SIZE],
            doc_buffer_upto: 0,
            doc_count: 0,
            total_term_freq: 0,
            last_doc_id: 0,
            doc_start_fp: 0,
            pos_start_fp: 0,
            pay_start_fp: 0,
            last_block_doc_id: -1,
            last_block_pos_fp: 0,
            last_block_pay_fp: 0,
            last_block_pos_buffer_upto: 0,
            last_block_payload_byte_upto: 0,
            pos_delta_buffer: vec![0; BLOCK_SIZE],
            payload_length_buffer: vec![0; BLOCK_SIZE],
            offset_start_delta_buffer: vec![0; BLOCK_SIZE],
            offset_length_buffer: vec![0; BLOCK_SIZE],
            payload_bytes: Vec::new(),
            pos_buffer_upto: 0,
            payload_byte_upto: 0,
            last_position: 0,
            last_start_offset: 0,
        })
    }

    pub fn index_options(&self) -> IndexOptions {
        self.index_options
    }

    /// Switches to the layout of the next field. Must be called before
    /// the field's first term.
    pub fn set_field(&mut self, index_options: IndexOptions, store_payloads: bool) {
        self.index_options = index_options;
        self.write_freqs = index_options.has_freqs();
        self.write_positions = index_options.has_positions();
        self.write_offsets = index_options.has_offsets();
        self.write_payloads = store_payloads && self.write_positions;
        debug_assert!(!self.write_positions || self.pos_out.is_some());
        debug_assert!(
            !(self.write_payloads || self.write_offsets) || self.pay_out.is_some()
        );
        self.skip_writer =
            SkipWriter::new(self.write_positions, self.write_payloads, self.write_offsets);
    }

    pub fn start_term(&mut self) {
        self.doc_start_fp = self.doc_out.file_pointer();
        if let Some(pos_out) = &self.pos_out {
            self.pos_start_fp = pos_out.file_pointer();
        }
        if let Some(pay_out) = &self.pay_out {
            self.pay_start_fp = pay_out.file_pointer();
        }
        self.doc_buffer_upto = 0;
        self.doc_count = 0;
        self.total_term_freq = 0;
        self.last_doc_id = 0;
        self.last_block_doc_id = -1;
        self.pos_buffer_upto = 0;
        self.payload_byte_upto = 0;
        self.payload_bytes.clear();
        self.skip_writer
            .reset(self.doc_start_fp, self.pos_start_fp, self.pay_start_fp);
    }

    pub fn start_doc(&mut self, doc_id: DocId, term_doc_freq: u32) -> Result<()> {
        if self.doc_count > 0 && doc_id <= self.last_doc_id {
            return Err(ErrorKind::OutOfOrder(format!(
                "doc {} is <= the previous doc {}",
                doc_id, self.last_doc_id
            ))
            .into());
        }
        // the previous block is complete; record its skip point now
        // that we know another doc follows it
        if self.last_block_doc_id != -1 && self.doc_buffer_upto == 0 {
            self.skip_writer.buffer_skip(
                self.last_block_doc_id,
                self.doc_count,
                self.doc_out.file_pointer(),
                self.last_block_pos_fp,
                self.last_block_pay_fp,
                self.last_block_pos_buffer_upto,
                self.last_block_payload_byte_upto,
            )?;
        }

        let doc_delta = doc_id - self.last_doc_id;
        self.doc_delta_buffer[self.doc_buffer_upto] = doc_delta as u32;
        if self.write_freqs {
            self.freq_buffer[self.doc_buffer_upto] = term_doc_freq;
        }
        self.doc_buffer_upto += 1;
        self.doc_count += 1;
        self.total_term_freq += i64::from(term_doc_freq);

        if self.doc_buffer_upto == BLOCK_SIZE {
            write_block(&self.doc_delta_buffer, &mut self.doc_out)?;
            if self.write_freqs {
                write_block(&self.freq_buffer, &mut self.doc_out)?;
            }
            // doc_buffer_upto stays full until finish_doc, which needs
            // to see the block boundary to save skip data
        }

        self.last_doc_id = doc_id;
        self.last_position = 0;
        self.last_start_offset = 0;
        Ok(())
    }

    pub fn add_position(
        &mut self,
        position: i32,
        payload: Option<&[u8]>,
        start_offset: i32,
        end_offset: i32,
    ) -> Result<()> {
        if !self.write_positions {
            return Ok(());
        }
        if position < self.last_position {
            return Err(ErrorKind::OutOfOrder(format!(
                "position {} is < the previous position {}",
                position, self.last_position
            ))
            .into());
        }
        self.pos_delta_buffer[self.pos_buffer_upto] = (position - self.last_position) as u32;
        if self.write_payloads {
            match payload {
                Some(bytes) if !bytes.is_empty() => {
                    self.payload_length_buffer[self.pos_buffer_upto] = bytes.len() as u32;
                    self.payload_bytes.extend_from_slice(bytes);
                    self.payload_byte_upto += bytes.len();
                }
                _ => self.payload_length_buffer[self.pos_buffer_upto] = 0,
            }
        }
        if self.write_offsets {
            debug_assert!(start_offset >= self.last_start_offset);
            debug_assert!(end_offset >= start_offset);
            self.offset_start_delta_buffer[self.pos_buffer_upto] =
                (start_offset - self.last_start_offset) as u32;
            self.offset_length_buffer[self.pos_buffer_upto] = (end_offset - start_offset) as u32;
            self.last_start_offset = start_offset;
        }
        self.pos_buffer_upto += 1;
        self.last_position = position;

        if self.pos_buffer_upto == BLOCK_SIZE {
            let pos_out = self.pos_out.as_mut().expect("positions enabled");
            write_block(&self.pos_delta_buffer, pos_out)?;
            if self.write_payloads {
                let pay_out = self.pay_out.as_mut().expect("payloads enabled");
                write_block(&self.payload_length_buffer, pay_out)?;
                write_vint(self.payload_byte_upto as u64, pay_out)?;
                pay_out.write_all(&self.payload_bytes[..self.payload_byte_upto])?;
                self.payload_bytes.clear();
                self.payload_byte_upto = 0;
            }
            if self.write_offsets {
                let pay_out = self.pay_out.as_mut().expect("offsets enabled");
                write_block(&self.offset_start_delta_buffer, pay_out)?;
                write_block(&self.offset_length_buffer, pay_out)?;
            }
            self.pos_buffer_upto = 0;
        }
        Ok(())
    }

    pub fn finish_doc(&mut self) {
        if self.doc_buffer_upto == BLOCK_SIZE {
            self.last_block_doc_id = self.last_doc_id;
            if self.pos_out.is_some() {
                if let Some(pay_out) = &self.pay_out {
                    self.last_block_pay_fp = pay_out.file_pointer();
                }
                self.last_block_pos_fp =
                    self.pos_out.as_ref().expect("positions enabled").file_pointer();
                self.last_block_pos_buffer_upto = self.pos_buffer_upto;
                self.last_block_payload_byte_upto = self.payload_byte_upto;
            }
            self.doc_buffer_upto = 0;
        }
    }

    pub fn finish_term(&mut self) -> Result<TermInfo> {
        debug_assert!(self.doc_count > 0);

        let singleton_doc_id = if self.doc_count == 1 {
            self.doc_delta_buffer[0] as DocId
        } else {
            // vInt-encode the tail doc deltas and freqs
            for i in 0..self.doc_buffer_upto {
                let doc_delta = u64::from(self.doc_delta_buffer[i]);
                if !self.write_freqs {
                    write_vint(doc_delta, &mut self.doc_out)?;
                } else if self.freq_buffer[i] == 1 {
                    write_vint((doc_delta << 1) | 1, &mut self.doc_out)?;
                } else {
                    write_vint(doc_delta << 1, &mut self.doc_out)?;
                    write_vint(u64::from(self.freq_buffer[i]), &mut self.doc_out)?;
                }
            }
            -1
        };

        let mut last_pos_block_offset = -1i64;
        if self.write_positions {
            let pos_out = self.pos_out.as_mut().expect("positions enabled");
            if self.total_term_freq > BLOCK_SIZE as i64 {
                last_pos_block_offset = (pos_out.file_pointer() - self.pos_start_fp) as i64;
            }
            if self.pos_buffer_upto > 0 {
                // the tail interleaves payload lengths/bytes and offset
                // deltas with the position deltas
                let mut last_payload_length = -1i64;
                let mut last_offset_length = -1i64;
                let mut payload_bytes_read_upto = 0usize;
                for i in 0..self.pos_buffer_upto {
                    let pos_delta = u64::from(self.pos_delta_buffer[i]);
                    if self.write_payloads {
                        let payload_length = self.payload_length_buffer[i];
                        if i64::from(payload_length) != last_payload_length {
                            last_payload_length = i64::from(payload_length);
                            write_vint((pos_delta << 1) | 1, pos_out)?;
                            write_vint(u64::from(payload_length), pos_out)?;
                        } else {
                            write_vint(pos_delta << 1, pos_out)?;
                        }
                        if payload_length > 0 {
                            pos_out.write_all(
                                &self.payload_bytes[payload_bytes_read_upto
                                    ..payload_bytes_read_upto + payload_length as usize],
                            )?;
                            payload_bytes_read_upto += payload_length as usize;
                        }
                    } else {
                        write_vint(pos_delta, pos_out)?;
                    }
                    if self.write_offsets {
                        let delta = u64::from(self.offset_start_delta_buffer[i]);
                        let length = self.offset_length_buffer[i];
                        if i64::from(length) == last_offset_length {
                            write_vint(delta << 1, pos_out)?;
                        } else {
                            write_vint((delta << 1) | 1, pos_out)?;
                            write_vint(u64::from(length), pos_out)?;
                            last_offset_length = i64::from(length);
                        }
                    }
                }
                self.payload_bytes.clear();
                self.payload_byte_upto = 0;
            }
        }

        let skip_offset = if self.doc_count > BLOCK_SIZE {
            let skip_start = self.doc_out.file_pointer();
            self.skip_writer.write_skip(&mut self.doc_out)?;
            (skip_start - self.doc_start_fp) as i64
        } else {
            -1
        };

        Ok(TermInfo {
            doc_freq: self.doc_count as i32,
            total_term_freq: if self.write_freqs {
                self.total_term_freq
            } else {
                self.doc_count as i64
            },
            doc_start_fp: self.doc_start_fp,
            pos_start_fp: self.pos_start_fp,
            pay_start_fp: self.pay_start_fp,
            skip_offset,
            singleton_doc_id,
            last_pos_block_offset,
        })
    }

    /// Writes the checksum footers and flushes everything.
    pub fn close(mut self) -> Result<()> {
        write_footer(&mut *self.doc_out)?;
        self.doc_out.flush()?;
        if let Some(mut pos_out) = self.pos_out.take() {
            write_footer(&mut *pos_out)?;
            pos_out.flush()?;
        }
        if let Some(mut pay_out) = self.pay_out.take() {
            write_footer(&mut *pay_out)?;
            pay_out.flush()?;
        }
        Ok(())
    }
}
