//! Field-norm codec: a float squeezed into one byte.
//!
//! The encoding uses a three-bit mantissa and a five-bit exponent with
//! the zero point at 15, covering roughly `7e9` down to `2e-9` with one
//! significant decimal digit. Negative values round up to zero, values
//! out of range saturate.

use std::sync::Arc;

use crate::DocId;

pub fn float_to_byte315(f: f32) -> u8 {
    let bits = f.to_bits() as i32;
    let small_float = bits >> (24 - 3);
    if small_float <= ((63 - 15) << 3) {
        return if bits <= 0 { 0 } else { 1 };
    }
    if small_float >= ((63 - 15) << 3) + 0x100 {
        return 0xFF;
    }
    (small_float - ((63 - 15) << 3)) as u8
}

pub fn byte315_to_float(b: u8) -> f32 {
    if b == 0 {
        return 0.0;
    }
    let mut bits = (b as u32) << (24 - 3);
    bits += (63 - 15) << 24;
    f32::from_bits(bits)
}

lazy_static! {
    /// Decode table, built once on first use.
    static ref NORM_TABLE: [f32; 256] = {
        let mut table = [0f32; 256];
        for (i, slot) in table.iter_mut().enumerate() {
            *slot = byte315_to_float(i as u8);
        }
        table
    };
}

/// Encodes `boost / sqrt(field_length)` the way every built-in
/// similarity stores it.
pub fn encode_norm(boost: f32, field_length: u32) -> u8 {
    float_to_byte315(boost / (field_length.max(1) as f32).sqrt())
}

/// Decodes a norm byte back into the (lossy) float it stored.
pub fn decode_norm(b: u8) -> f32 {
    NORM_TABLE[b as usize]
}

/// Per-document norm bytes of one field in one segment.
#[derive(Clone)]
pub struct Norms {
    bytes: Arc<Vec<u8>>,
}

impl Norms {
    pub fn new(bytes: Vec<u8>) -> Norms {
        Norms {
            bytes: Arc::new(bytes),
        }
    }

    pub fn byte(&self, doc: DocId) -> u8 {
        self.bytes[doc as usize]
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::{byte315_to_float, decode_norm, encode_norm, float_to_byte315};

    #[test]
    fn test_zero_and_negative_round_to_zero() {
        assert_eq!(float_to_byte315(0.0), 0);
        assert_eq!(float_to_byte315(-1.0), 0);
        assert_eq!(byte315_to_float(0), 0.0);
    }

    #[test]
    fn test_encode_decode_is_idempotent_to_lossy_precision() {
        for &value in &[1.0f32, 0.5, 0.25, 0.1, 3.0, 100.0, 1e-4] {
            let byte = float_to_byte315(value);
            let decoded = byte315_to_float(byte);
            // re-encoding the decoded value must be stable
            assert_eq!(float_to_byte315(decoded), byte, "value {}", value);
            // one significant decimal digit of accuracy
            assert!((decoded - value).abs() / value < 0.15, "value {}", value);
        }
    }

    #[test]
    fn test_norm_shrinks_with_field_length() {
        let short = decode_norm(encode_norm(1.0, 4));
        let long = decode_norm(encode_norm(1.0, 400));
        assert!(short > long);
    }
}
