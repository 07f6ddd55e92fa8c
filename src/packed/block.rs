//! Block-packed encoding of signed integer streams.
//!
//! Values are buffered into power-of-two blocks. Each block is stored as
//! `token · [zig-zag(min) - 1] · packed deltas` where the token byte is
//! `(bpv << 1) | (min == 0)`. A constant block costs a single byte.

use std::io;
use std::io::{Read, Write};

use crate::common::{read_vint, write_vint, zigzag_decode, zigzag_encode};
use crate::directory::ReadOnlySource;
use crate::packed::{bits_required, check_block_size, mask, max_value, PackedFormat};

pub const MIN_BLOCK_SIZE: usize = 64;
pub const MAX_BLOCK_SIZE: usize = 1 << 27;

const MIN_VALUE_EQUALS_0: u8 = 1;
const BPV_SHIFT: u8 = 1;

pub struct BlockPackedWriter<W: Write> {
    out: W,
    values: Vec<i64>,
    off: usize,
    ord: u64,
    finished: bool,
}

impl<W: Write> BlockPackedWriter<W> {
    pub fn new(out: W, block_size: usize) -> BlockPackedWriter<W> {
        check_block_size(block_size, MIN_BLOCK_SIZE, MAX_BLOCK_SIZE);
        BlockPackedWriter {
            out,
            values: vec![0i64; block_size],
            off: 0,
            ord: 0,
            finished: false,
        }
    }

    /// Number of values appended so far.
    pub fn ord(&self) -> u64 {
        self.ord
    }

    pub fn add(&mut self, value: i64) -> io::Result<()> {
        assert!(!self.finished, "writer is finished");
        if self.off == self.values.len() {
            self.flush_block()?;
        }
        self.values[self.off] = value;
        self.off += 1;
        self.ord += 1;
        Ok(())
    }

    /// Flushes the pending partial block. Flushing early mid-stream is
    /// not supported; a partial block may only be the last one.
    pub fn finish(mut self) -> io::Result<W> {
        assert!(!self.finished, "writer is finished");
        if self.off > 0 {
            self.flush_block()?;
        }
        self.finished = true;
        Ok(self.out)
    }

    fn flush_block(&mut self) -> io::Result<()> {
        debug_assert!(self.off > 0);
        let buffered = &mut self.values[..self.off];
        let mut min = buffered.iter().copied().min().unwrap();
        let max = buffered.iter().copied().max().unwrap();

        let delta = (i128::from(max) - i128::from(min)) as u128;
        let bits = if delta == 0 {
            0u8
        } else if delta > u128::from(u64::MAX) {
            64
        } else {
            bits_required(delta as u64)
        };
        if bits == 64 {
            min = 0;
        } else if min > 0 {
            // Shrink min so its vlong takes fewer bytes; the deltas
            // still fit in the same bpv.
            min = 0i64.max(max.wrapping_sub(max_value(bits) as i64));
        }

        let token = (bits << BPV_SHIFT) | if min == 0 { MIN_VALUE_EQUALS_0 } else { 0 };
        self.out.write_all(&[token])?;
        if min != 0 {
            write_vint(zigzag_encode(min).wrapping_sub(1), &mut self.out)?;
        }
        if bits > 0 {
            let deltas: Vec<u64> = buffered
                .iter()
                .map(|&value| value.wrapping_sub(min) as u64 & mask(bits))
                .collect();
            let mut encoded = Vec::new();
            PackedFormat::Packed.encode(&deltas, bits, &mut encoded);
            self.out.write_all(&encoded)?;
        }
        self.off = 0;
        Ok(())
    }
}

struct BlockMeta {
    min: i64,
    bits: u8,
    data_offset: usize,
}

/// Random-access reader over a finished block-packed stream.
pub struct BlockPackedReader {
    block_shift: u32,
    block_mask: usize,
    value_count: u64,
    blocks: Vec<BlockMeta>,
    data: ReadOnlySource,
}

impl BlockPackedReader {
    pub fn new(
        source: ReadOnlySource,
        block_size: usize,
        value_count: u64,
    ) -> io::Result<BlockPackedReader> {
        let block_shift = check_block_size(block_size, MIN_BLOCK_SIZE, MAX_BLOCK_SIZE);
        let num_blocks =
            (value_count / block_size as u64 + u64::from(value_count % block_size as u64 != 0)) as usize;
        let mut blocks = Vec::with_capacity(num_blocks);
        let bytes = source.as_slice();
        let mut pos = 0usize;
        for block_index in 0..num_blocks {
            let token = *bytes.get(pos).ok_or_else(|| {
                io::Error::new(io::ErrorKind::UnexpectedEof, "block header past EOF")
            })?;
            pos += 1;
            let bits = token >> BPV_SHIFT;
            if bits > 64 {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("corrupted block token: bpv {}", bits),
                ));
            }
            let min = if token & MIN_VALUE_EQUALS_0 == 0 {
                let mut cursor = &bytes[pos..];
                let before = cursor.len();
                let raw = read_vint(&mut cursor)?;
                pos += before - cursor.len();
                zigzag_decode(raw.wrapping_add(1))
            } else {
                0
            };
            let data_offset = pos;
            if bits > 0 {
                let values_in_block =
                    (block_size as u64).min(value_count - (block_index as u64) * block_size as u64);
                pos += PackedFormat::Packed.byte_count(values_in_block as usize, bits);
            }
            blocks.push(BlockMeta {
                min,
                bits,
                data_offset,
            });
        }
        Ok(BlockPackedReader {
            block_shift,
            block_mask: block_size - 1,
            value_count,
            blocks,
            data: source,
        })
    }

    pub fn len(&self) -> u64 {
        self.value_count
    }

    pub fn is_empty(&self) -> bool {
        self.value_count == 0
    }

    pub fn get(&self, index: u64) -> i64 {
        assert!(index < self.value_count);
        let block = &self.blocks[(index >> self.block_shift) as usize];
        if block.bits == 0 {
            return block.min;
        }
        let offset_in_block = (index as usize) & self.block_mask;
        let delta = PackedFormat::Packed.get(
            &self.data.as_slice()[block.data_offset..],
            block.bits,
            offset_in_block,
        );
        block.min.wrapping_add(delta as i64)
    }
}

/// Forward-only reader, decoding one block at a time from a stream.
pub struct BlockPackedReaderIterator<R: Read> {
    reader: R,
    block_size: usize,
    values: Vec<i64>,
    off: usize,
    remaining: u64,
}

impl<R: Read> BlockPackedReaderIterator<R> {
    pub fn new(reader: R, block_size: usize, value_count: u64) -> BlockPackedReaderIterator<R> {
        check_block_size(block_size, MIN_BLOCK_SIZE, MAX_BLOCK_SIZE);
        BlockPackedReaderIterator {
            reader,
            block_size,
            values: Vec::new(),
            off: 0,
            remaining: value_count,
        }
    }

    pub fn next(&mut self) -> io::Result<i64> {
        if self.remaining == 0 {
            return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "iterator exhausted"));
        }
        if self.off == self.values.len() {
            self.refill()?;
        }
        let value = self.values[self.off];
        self.off += 1;
        self.remaining -= 1;
        Ok(value)
    }

    pub fn skip(&mut self, mut count: u64) -> io::Result<()> {
        while count > 0 {
            if self.off == self.values.len() {
                if self.remaining == 0 {
                    return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "skip past end"));
                }
                self.refill()?;
            }
            let step = count.min((self.values.len() - self.off) as u64);
            self.off += step as usize;
            self.remaining -= step;
            count -= step;
        }
        Ok(())
    }

    fn refill(&mut self) -> io::Result<()> {
        let mut token = [0u8; 1];
        self.reader.read_exact(&mut token)?;
        let bits = token[0] >> BPV_SHIFT;
        if bits > 64 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("corrupted block token: bpv {}", bits),
            ));
        }
        let min = if token[0] & MIN_VALUE_EQUALS_0 == 0 {
            zigzag_decode(read_vint(&mut self.reader)?.wrapping_add(1))
        } else {
            0
        };
        let values_in_block = (self.block_size as u64).min(self.remaining) as usize;
        self.values.clear();
        if bits == 0 {
            self.values.resize(values_in_block, min);
        } else {
            let byte_len = PackedFormat::Packed.byte_count(values_in_block, bits);
            let mut data = vec![0u8; byte_len];
            self.reader.read_exact(&mut data)?;
            let mut deltas = Vec::new();
            PackedFormat::Packed.decode(&data, bits, values_in_block, &mut deltas);
            self.values
                .extend(deltas.into_iter().map(|delta| min.wrapping_add(delta as i64)));
        }
        self.off = 0;
        Ok(())
    }
}
