//! The pointer bundle a term dictionary entry carries.

use std::io;
use std::io::{Read, Write};

use crate::common::{read_vint, write_vint};
use crate::postings::BLOCK_SIZE;
use crate::schema::IndexOptions;
use crate::DocId;

/// Everything needed to open a term's posting list.
///
/// Invariants: a term with `doc_freq == 1` stores its only doc in
/// `singleton_doc_id` and owns no doc bytes; `skip_offset >= 0` exactly
/// when `doc_freq > BLOCK_SIZE`; `last_pos_block_offset >= 0` exactly
/// when positions are present and `total_term_freq > BLOCK_SIZE`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TermInfo {
    pub doc_freq: i32,
    pub total_term_freq: i64,
    /// Start of this term's postings in the `.doc` file.
    pub doc_start_fp: u64,
    /// Start of this term's positions in the `.pos` file.
    pub pos_start_fp: u64,
    /// Start of this term's payload/offset data in the `.pay` file.
    pub pay_start_fp: u64,
    /// Offset of the skip data relative to `doc_start_fp`, or -1.
    pub skip_offset: i64,
    /// The sole doc of a `doc_freq == 1` term, or -1.
    pub singleton_doc_id: DocId,
    /// Offset (relative to `pos_start_fp`) of the vInt tail of the
    /// position stream, or -1 when every position fit in one block.
    pub last_pos_block_offset: i64,
}

impl TermInfo {
    pub fn serialize<W: Write>(
        &self,
        index_options: IndexOptions,
        store_payloads: bool,
        out: &mut W,
    ) -> io::Result<()> {
        write_vint(self.doc_freq as u64, out)?;
        write_vint((self.total_term_freq - i64::from(self.doc_freq)) as u64, out)?;
        if self.doc_freq == 1 {
            write_vint(self.singleton_doc_id as u64, out)?;
        } else {
            write_vint(self.doc_start_fp, out)?;
        }
        if index_options.has_positions() {
            write_vint(self.pos_start_fp, out)?;
            if self.total_term_freq > BLOCK_SIZE as i64 {
                write_vint(self.last_pos_block_offset as u64, out)?;
            }
            if (store_payloads || index_options.has_offsets())
                && self.total_term_freq >= BLOCK_SIZE as i64
            {
                write_vint(self.pay_start_fp, out)?;
            }
        }
        if self.doc_freq > BLOCK_SIZE as i32 {
            write_vint(self.skip_offset as u64, out)?;
        }
        Ok(())
    }

    pub fn deserialize<R: Read>(
        index_options: IndexOptions,
        store_payloads: bool,
        input: &mut R,
    ) -> io::Result<TermInfo> {
        let doc_freq = read_vint(input)? as i32;
        let total_term_freq = i64::from(doc_freq) + read_vint(input)? as i64;
        let mut info = TermInfo {
            doc_freq,
            total_term_freq,
            doc_start_fp: 0,
            pos_start_fp: 0,
            pay_start_fp: 0,
            skip_offset: -1,
            singleton_doc_id: -1,
            last_pos_block_offset: -1,
        };
        if doc_freq == 1 {
            info.singleton_doc_id = read_vint(input)? as DocId;
        } else {
            info.doc_start_fp = read_vint(input)?;
        }
        if index_options.has_positions() {
            info.pos_start_fp = read_vint(input)?;
            if total_term_freq > BLOCK_SIZE as i64 {
                info.last_pos_block_offset = read_vint(input)? as i64;
            }
            if (store_payloads || index_options.has_offsets())
                && total_term_freq >= BLOCK_SIZE as i64
            {
                info.pay_start_fp = read_vint(input)?;
            }
        }
        if doc_freq > BLOCK_SIZE as i32 {
            info.skip_offset = read_vint(input)? as i64;
        }
        Ok(info)
    }
}

#[cfg(test)]
mod tests {
    use super::TermInfo;
    use crate::schema::IndexOptions;

    fn round_trip(info: &TermInfo, options: IndexOptions, payloads: bool) {
        let mut bytes = Vec::new();
        info.serialize(options, payloads, &mut bytes).unwrap();
        let read = TermInfo::deserialize(options, payloads, &mut &bytes[..]).unwrap();
        assert_eq!(&read, info);
    }

    #[test]
    fn test_singleton_term() {
        round_trip(
            &TermInfo {
                doc_freq: 1,
                total_term_freq: 3,
                doc_start_fp: 0,
                pos_start_fp: 500,
                pay_start_fp: 0,
                skip_offset: -1,
                singleton_doc_id: 42,
                last_pos_block_offset: -1,
            },
            IndexOptions::DocsFreqsAndPositions,
            false,
        );
    }

    #[test]
    fn test_large_term_with_skip_data() {
        round_trip(
            &TermInfo {
                doc_freq: 10_000,
                total_term_freq: 30_000,
                doc_start_fp: 1_234,
                pos_start_fp: 99_000,
                pay_start_fp: 0,
                skip_offset: 4_567,
                singleton_doc_id: -1,
                last_pos_block_offset: 88,
            },
            IndexOptions::DocsFreqsAndPositions,
            false,
        );
    }

    #[test]
    fn test_docs_only_term() {
        round_trip(
            &TermInfo {
                doc_freq: 7,
                total_term_freq: 7,
                doc_start_fp: 77,
                pos_start_fp: 0,
                pay_start_fp: 0,
                skip_offset: -1,
                singleton_doc_id: -1,
                last_pos_block_offset: -1,
            },
            IndexOptions::DocsOnly,
            false,
        );
    }

    #[test]
    fn test_offsets_term_keeps_pay_pointer() {
        round_trip(
            &TermInfo {
                doc_freq: 200,
                total_term_freq: 400,
                doc_start_fp: 10,
                pos_start_fp: 20,
                pay_start_fp: 30,
                skip_offset: 123,
                singleton_doc_id: -1,
                last_pos_block_offset: 45,
            },
            IndexOptions::DocsFreqsPositionsAndOffsets,
            true,
        );
    }
}
