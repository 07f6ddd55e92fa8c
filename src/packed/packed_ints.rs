use crate::packed::{mask, max_value, PackedFormat};

/// Read access shared by the in-heap packed arrays.
pub trait PackedReader {
    fn get(&self, index: usize) -> u64;
    fn len(&self) -> usize;
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Mutable fixed-bpv array in the contiguous [`PackedFormat::Packed`]
/// layout: value `i` occupies bits `[i * bpv, (i + 1) * bpv)` of the
/// little-endian word stream, straddling words when it must.
pub struct Packed64 {
    blocks: Vec<u64>,
    bits_per_value: u8,
    value_count: usize,
}

impl Packed64 {
    pub fn new(value_count: usize, bits_per_value: u8) -> Packed64 {
        assert!(bits_per_value >= 1 && bits_per_value <= 64);
        let total_bits = value_count as u64 * u64::from(bits_per_value);
        let num_blocks = ((total_bits + 63) / 64) as usize;
        Packed64 {
            blocks: vec![0u64; num_blocks],
            bits_per_value,
            value_count,
        }
    }

    pub fn bits_per_value(&self) -> u8 {
        self.bits_per_value
    }

    pub fn set(&mut self, index: usize, value: u64) {
        assert!(index < self.value_count);
        assert!(
            value <= max_value(self.bits_per_value),
            "value {} does not fit in {} bits",
            value,
            self.bits_per_value
        );
        let bit_pos = index as u64 * u64::from(self.bits_per_value);
        let block = (bit_pos / 64) as usize;
        let offset = (bit_pos % 64) as u32;
        let value_mask = mask(self.bits_per_value);
        self.blocks[block] &= !(value_mask << offset);
        self.blocks[block] |= value << offset;
        let spilled_bits = offset as i64 + i64::from(self.bits_per_value) - 64;
        if spilled_bits > 0 {
            let kept = u32::from(self.bits_per_value) - spilled_bits as u32;
            self.blocks[block + 1] &= !(value_mask >> kept);
            self.blocks[block + 1] |= value >> kept;
        }
    }
}

impl PackedReader for Packed64 {
    fn get(&self, index: usize) -> u64 {
        assert!(index < self.value_count);
        let bit_pos = index as u64 * u64::from(self.bits_per_value);
        let block = (bit_pos / 64) as usize;
        let offset = (bit_pos % 64) as u32;
        let value_mask = mask(self.bits_per_value);
        let mut value = self.blocks[block] >> offset;
        let spilled_bits = offset as i64 + i64::from(self.bits_per_value) - 64;
        if spilled_bits > 0 {
            let kept = u32::from(self.bits_per_value) - spilled_bits as u32;
            value |= self.blocks[block + 1] << kept;
        }
        value & value_mask
    }

    fn len(&self) -> usize {
        self.value_count
    }
}

/// Mutable fixed-bpv array in the [`PackedFormat::PackedSingleBlock`]
/// layout. Slightly larger, but `get` never crosses a word boundary.
pub struct Packed64SingleBlock {
    blocks: Vec<u64>,
    bits_per_value: u8,
    values_per_block: usize,
    value_count: usize,
}

impl Packed64SingleBlock {
    pub fn new(value_count: usize, bits_per_value: u8) -> Packed64SingleBlock {
        assert!(bits_per_value >= 1 && bits_per_value <= 64);
        let values_per_block = (64 / bits_per_value) as usize;
        let num_blocks = (value_count + values_per_block - 1) / values_per_block;
        Packed64SingleBlock {
            blocks: vec![0u64; num_blocks],
            bits_per_value,
            values_per_block,
            value_count,
        }
    }

    pub fn set(&mut self, index: usize, value: u64) {
        assert!(index < self.value_count);
        assert!(value <= max_value(self.bits_per_value));
        let block = index / self.values_per_block;
        let shift = (index % self.values_per_block) as u32 * u32::from(self.bits_per_value);
        let value_mask = mask(self.bits_per_value);
        self.blocks[block] &= !(value_mask << shift);
        self.blocks[block] |= value << shift;
    }

    /// Serialized image, byte-compatible with
    /// `PackedFormat::PackedSingleBlock`.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.blocks.len() * 8);
        for block in &self.blocks {
            out.extend_from_slice(&block.to_le_bytes());
        }
        out
    }
}

impl PackedReader for Packed64SingleBlock {
    fn get(&self, index: usize) -> u64 {
        assert!(index < self.value_count);
        let block = index / self.values_per_block;
        let shift = (index % self.values_per_block) as u32 * u32::from(self.bits_per_value);
        (self.blocks[block] >> shift) & mask(self.bits_per_value)
    }

    fn len(&self) -> usize {
        self.value_count
    }
}
