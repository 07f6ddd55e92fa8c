//! Fixed-size block codec for the postings integer streams.
//!
//! A block is always [`BLOCK_SIZE`] integers. Its first byte is the
//! bits-per-value; 0 flags a constant block, whose single value follows
//! as a vInt.

use std::io;
use std::io::{Read, Write};

use crate::common::{read_vint, write_vint};
use crate::directory::IndexInput;
use crate::packed::{bits_required, PackedFormat};

/// Number of integers per packed block.
pub const BLOCK_SIZE: usize = 128;

const ALL_VALUES_EQUAL: u8 = 0;

pub fn write_block<W: Write>(values: &[u32], out: &mut W) -> io::Result<()> {
    debug_assert_eq!(values.len(), BLOCK_SIZE);
    if values.iter().all(|&value| value == values[0]) {
        out.write_all(&[ALL_VALUES_EQUAL])?;
        return write_vint(u64::from(values[0]), out);
    }
    let max = values.iter().copied().max().unwrap();
    let bits = bits_required(u64::from(max));
    out.write_all(&[bits])?;
    let wide: Vec<u64> = values.iter().map(|&value| u64::from(value)).collect();
    let mut encoded = Vec::with_capacity(PackedFormat::Packed.byte_count(BLOCK_SIZE, bits));
    PackedFormat::Packed.encode(&wide, bits, &mut encoded);
    out.write_all(&encoded)
}

pub fn read_block<R: Read>(input: &mut R, values: &mut [u32]) -> io::Result<()> {
    debug_assert_eq!(values.len(), BLOCK_SIZE);
    let mut bits_byte = [0u8; 1];
    input.read_exact(&mut bits_byte)?;
    let bits = bits_byte[0];
    if bits == ALL_VALUES_EQUAL {
        let value = read_vint(input)? as u32;
        values.fill(value);
        return Ok(());
    }
    if bits > 32 {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("block header claims {} bits per value", bits),
        ));
    }
    let byte_len = PackedFormat::Packed.byte_count(BLOCK_SIZE, bits);
    let mut data = vec![0u8; byte_len];
    input.read_exact(&mut data)?;
    let mut decoded = Vec::with_capacity(BLOCK_SIZE);
    PackedFormat::Packed.decode(&data, bits, BLOCK_SIZE, &mut decoded);
    for (slot, value) in values.iter_mut().zip(decoded) {
        *slot = value as u32;
    }
    Ok(())
}

/// Skips one block without decoding it.
pub fn skip_block(input: &mut dyn IndexInput) -> io::Result<()> {
    let mut bits_byte = [0u8; 1];
    input.read_exact(&mut bits_byte)?;
    let bits = bits_byte[0];
    if bits == ALL_VALUES_EQUAL {
        read_vint(input)?;
        return Ok(());
    }
    let byte_len = PackedFormat::Packed.byte_count(BLOCK_SIZE, bits) as u64;
    let pos = input.file_pointer();
    input.seek(pos + byte_len)
}

#[cfg(test)]
mod tests {
    use super::{read_block, skip_block, write_block, BLOCK_SIZE};
    use crate::directory::{IndexInput, ReadOnlySource, SourceRead};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    #[test]
    fn test_block_round_trip() {
        let mut rng = StdRng::seed_from_u64(5);
        let values: Vec<u32> = (0..BLOCK_SIZE).map(|_| rng.gen_range(0..100_000)).collect();
        let mut bytes = Vec::new();
        write_block(&values, &mut bytes).unwrap();
        let mut decoded = vec![0u32; BLOCK_SIZE];
        read_block(&mut &bytes[..], &mut decoded).unwrap();
        assert_eq!(decoded, values);
    }

    #[test]
    fn test_constant_block_is_tiny() {
        let values = vec![7u32; BLOCK_SIZE];
        let mut bytes = Vec::new();
        write_block(&values, &mut bytes).unwrap();
        assert_eq!(bytes.len(), 2);
        let mut decoded = vec![0u32; BLOCK_SIZE];
        read_block(&mut &bytes[..], &mut decoded).unwrap();
        assert_eq!(decoded, values);
    }

    #[test]
    fn test_skip_block_lands_on_next() {
        let first: Vec<u32> = (0..BLOCK_SIZE as u32).collect();
        let second = vec![42u32; BLOCK_SIZE];
        let mut bytes = Vec::new();
        write_block(&first, &mut bytes).unwrap();
        write_block(&second, &mut bytes).unwrap();
        let mut input: Box<dyn IndexInput> =
            Box::new(SourceRead::from(ReadOnlySource::from(bytes)));
        skip_block(&mut *input).unwrap();
        let mut decoded = vec![0u32; BLOCK_SIZE];
        read_block(&mut input, &mut decoded).unwrap();
        assert_eq!(decoded, second);
    }
}
