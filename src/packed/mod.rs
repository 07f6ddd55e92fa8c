/*!
Packed integer primitives.

Everything below stores unsigned values in a fixed number of bits per
value (`0 < bpv <= 64`). Two layouts exist:

* [`PackedFormat::Packed`] — values are laid out back to back in one
  contiguous little-endian bit stream, no padding. Densest, but a value
  may straddle word boundaries.
* [`PackedFormat::PackedSingleBlock`] — each 64-bit word holds
  `floor(64 / bpv)` values and the remaining high bits are padding, so
  any value can be fetched with a single aligned word read.

The block-packed writer/reader on top of these handle signed streams by
per-block min-delta encoding.
*/

mod block;
mod packed_ints;

pub use self::block::{BlockPackedReader, BlockPackedReaderIterator, BlockPackedWriter};
pub use self::packed_ints::{Packed64, Packed64SingleBlock, PackedReader};

/// Number of bits needed to represent `value`.
///
/// Zero still needs one bit to be written at all.
pub fn bits_required(value: u64) -> u8 {
    if value == 0 {
        1
    } else {
        (64 - value.leading_zeros()) as u8
    }
}

/// Largest value expressible in `bits` bits.
pub fn max_value(bits: u8) -> u64 {
    assert!(bits >= 1 && bits <= 64, "bits out of (0, 64]: {}", bits);
    if bits == 64 {
        u64::MAX
    } else {
        (1u64 << bits) - 1
    }
}

lazy_static! {
    /// Per-bpv masks, filled once on first use.
    static ref VALUE_MASKS: [u64; 65] = {
        let mut masks = [0u64; 65];
        for bits in 1..=64u8 {
            masks[bits as usize] = max_value(bits);
        }
        masks
    };
}

#[inline]
pub(crate) fn mask(bits: u8) -> u64 {
    VALUE_MASKS[bits as usize]
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum PackedFormat {
    Packed,
    PackedSingleBlock,
}

impl PackedFormat {
    /// Number of bytes the format uses to store `value_count` values.
    pub fn byte_count(self, value_count: usize, bits_per_value: u8) -> usize {
        match self {
            PackedFormat::Packed => {
                let bits = value_count as u64 * u64::from(bits_per_value);
                ((bits + 7) / 8) as usize
            }
            PackedFormat::PackedSingleBlock => {
                let values_per_block = (64 / bits_per_value) as usize;
                let blocks = (value_count + values_per_block - 1) / values_per_block;
                blocks * 8
            }
        }
    }

    /// Encodes `values` at `bits_per_value` into `out`.
    pub fn encode(self, values: &[u64], bits_per_value: u8, out: &mut Vec<u8>) {
        let value_mask = mask(bits_per_value);
        match self {
            PackedFormat::Packed => {
                let mut accumulator: u128 = 0;
                let mut pending_bits: u32 = 0;
                for &value in values {
                    debug_assert!(value <= value_mask, "value does not fit in bpv");
                    accumulator |= u128::from(value & value_mask) << pending_bits;
                    pending_bits += u32::from(bits_per_value);
                    while pending_bits >= 8 {
                        out.push(accumulator as u8);
                        accumulator >>= 8;
                        pending_bits -= 8;
                    }
                }
                if pending_bits > 0 {
                    out.push(accumulator as u8);
                }
            }
            PackedFormat::PackedSingleBlock => {
                let values_per_block = (64 / bits_per_value) as usize;
                for chunk in values.chunks(values_per_block) {
                    let mut block = 0u64;
                    for (pos, &value) in chunk.iter().enumerate() {
                        debug_assert!(value <= value_mask, "value does not fit in bpv");
                        block |= (value & value_mask) << (pos as u32 * u32::from(bits_per_value));
                    }
                    out.extend_from_slice(&block.to_le_bytes());
                }
            }
        }
    }

    /// Decodes `value_count` values of `bits_per_value` bits from `data`.
    pub fn decode(
        self,
        data: &[u8],
        bits_per_value: u8,
        value_count: usize,
        values: &mut Vec<u64>,
    ) {
        values.reserve(value_count);
        for index in 0..value_count {
            values.push(self.get(data, bits_per_value, index));
        }
    }

    /// Random access into an encoded byte slice.
    pub fn get(self, data: &[u8], bits_per_value: u8, index: usize) -> u64 {
        match self {
            PackedFormat::Packed => {
                let bit_pos = index as u64 * u64::from(bits_per_value);
                let byte_pos = (bit_pos / 8) as usize;
                let bit_offset = (bit_pos % 8) as u32;
                // A value spans at most ceil((7 + 64) / 8) + 1 = 9 bytes.
                let mut window: u128 = 0;
                let end = (byte_pos + 9).min(data.len());
                for (shift, &byte) in data[byte_pos..end].iter().enumerate() {
                    window |= u128::from(byte) << (8 * shift as u32);
                }
                ((window >> bit_offset) as u64) & mask(bits_per_value)
            }
            PackedFormat::PackedSingleBlock => {
                let values_per_block = (64 / bits_per_value) as usize;
                let block_index = index / values_per_block;
                let offset_in_block = (index % values_per_block) as u32;
                let block_start = block_index * 8;
                let mut word_bytes = [0u8; 8];
                word_bytes.copy_from_slice(&data[block_start..block_start + 8]);
                let block = u64::from_le_bytes(word_bytes);
                (block >> (offset_in_block * u32::from(bits_per_value))) & mask(bits_per_value)
            }
        }
    }
}

/// Checks a block size against `[min, max]` and power-of-two-ness,
/// returning its log2.
pub fn check_block_size(block_size: usize, min: usize, max: usize) -> u32 {
    assert!(
        block_size >= min && block_size <= max,
        "block size {} out of [{}, {}]",
        block_size,
        min,
        max
    );
    assert!(
        block_size.is_power_of_two(),
        "block size {} is not a power of two",
        block_size
    );
    block_size.trailing_zeros()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    #[test]
    fn test_bits_required() {
        assert_eq!(bits_required(0), 1);
        assert_eq!(bits_required(1), 1);
        assert_eq!(bits_required(2), 2);
        assert_eq!(bits_required(255), 8);
        assert_eq!(bits_required(256), 9);
        assert_eq!(bits_required(u64::MAX), 64);
    }

    #[test]
    fn test_max_value() {
        assert_eq!(max_value(1), 1);
        assert_eq!(max_value(8), 255);
        assert_eq!(max_value(63), u64::MAX / 2);
        assert_eq!(max_value(64), u64::MAX);
    }

    fn round_trip(format: PackedFormat, bits_per_value: u8, values: &[u64]) {
        let mut data = Vec::new();
        format.encode(values, bits_per_value, &mut data);
        if format == PackedFormat::Packed {
            assert_eq!(data.len(), format.byte_count(values.len(), bits_per_value));
        }
        let mut decoded = Vec::new();
        format.decode(&data, bits_per_value, values.len(), &mut decoded);
        assert_eq!(&decoded[..], values);
        for (index, &value) in values.iter().enumerate() {
            assert_eq!(format.get(&data, bits_per_value, index), value);
        }
    }

    #[test]
    fn test_round_trip_all_bpvs() {
        let mut rng = StdRng::seed_from_u64(42);
        for bits_per_value in 1..=64u8 {
            let top = max_value(bits_per_value);
            let values: Vec<u64> = (0..130)
                .map(|_| {
                    if top == u64::MAX {
                        rng.gen::<u64>()
                    } else {
                        rng.gen_range(0..=top)
                    }
                })
                .collect();
            round_trip(PackedFormat::Packed, bits_per_value, &values);
            round_trip(PackedFormat::PackedSingleBlock, bits_per_value, &values);
        }
    }

    #[test]
    fn test_boundary_values_round_trip() {
        for bits_per_value in 1..=64u8 {
            let top = max_value(bits_per_value);
            let values = vec![0, top, 0, top, top];
            round_trip(PackedFormat::Packed, bits_per_value, &values);
            round_trip(PackedFormat::PackedSingleBlock, bits_per_value, &values);
        }
    }

    #[test]
    #[should_panic(expected = "not a power of two")]
    fn test_check_block_size_rejects_non_power_of_two() {
        check_block_size(100, 64, 1 << 27);
    }
}
