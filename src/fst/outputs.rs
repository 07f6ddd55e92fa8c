//! Output algebras combined along FST paths.
//!
//! Laws every algebra obeys: `add` is associative with `no_output` as
//! identity, and `subtract(add(a, b), b) == a` whenever `b` is a prefix
//! (in the `common` sense) of `add(a, b)`.

use std::fmt;
use std::io;
use std::io::Write;

use crate::common::write_vint;
use crate::fst::bytes_store::ReverseBytesReader;

pub trait Outputs: Clone {
    type Value: Clone + PartialEq + fmt::Debug;

    fn no_output(&self) -> Self::Value;

    fn is_no_output(&self, value: &Self::Value) -> bool {
        *value == self.no_output()
    }

    /// Greatest common prefix/value of `a` and `b`.
    fn common(&self, a: &Self::Value, b: &Self::Value) -> Self::Value;

    /// Removes `prefix` (which must be `common`-compatible) from `a`.
    fn subtract(&self, a: &Self::Value, prefix: &Self::Value) -> Self::Value;

    fn add(&self, prefix: &Self::Value, suffix: &Self::Value) -> Self::Value;

    fn write<W: Write>(&self, value: &Self::Value, out: &mut W) -> io::Result<()>;

    fn read(&self, reader: &mut ReverseBytesReader<'_>) -> Self::Value;

    /// Final-node outputs get their own slot; most algebras encode them
    /// the same way as arc outputs.
    fn write_final<W: Write>(&self, value: &Self::Value, out: &mut W) -> io::Result<()> {
        self.write(value, out)
    }

    fn read_final(&self, reader: &mut ReverseBytesReader<'_>) -> Self::Value {
        self.read(reader)
    }

    fn skip(&self, reader: &mut ReverseBytesReader<'_>) {
        let _ = self.read(reader);
    }

    fn skip_final(&self, reader: &mut ReverseBytesReader<'_>) {
        let _ = self.read_final(reader);
    }
}

/// Algebra for FSTs used as plain automata: every path carries nothing.
#[derive(Debug, Clone, Default)]
pub struct NoOutputs;

impl Outputs for NoOutputs {
    type Value = ();

    fn no_output(&self) -> () {}

    fn common(&self, _: &(), _: &()) -> () {}

    fn subtract(&self, _: &(), _: &()) -> () {}

    fn add(&self, _: &(), _: &()) -> () {}

    fn write<W: Write>(&self, _: &(), _: &mut W) -> io::Result<()> {
        Ok(())
    }

    fn read(&self, _: &mut ReverseBytesReader<'_>) -> () {}
}

/// Non-negative integers under addition; `common` is `min`.
#[derive(Debug, Clone, Default)]
pub struct PositiveIntOutputs;

impl Outputs for PositiveIntOutputs {
    type Value = u64;

    fn no_output(&self) -> u64 {
        0
    }

    fn common(&self, a: &u64, b: &u64) -> u64 {
        *a.min(b)
    }

    fn subtract(&self, a: &u64, prefix: &u64) -> u64 {
        debug_assert!(prefix <= a);
        a - prefix
    }

    fn add(&self, prefix: &u64, suffix: &u64) -> u64 {
        prefix + suffix
    }

    fn write<W: Write>(&self, value: &u64, out: &mut W) -> io::Result<()> {
        write_vint(*value, out)
    }

    fn read(&self, reader: &mut ReverseBytesReader<'_>) -> u64 {
        reader.read_vint()
    }
}

/// Pairs two algebras component-wise.
#[derive(Debug, Clone, Default)]
pub struct PairOutputs<A: Outputs, B: Outputs> {
    pub first: A,
    pub second: B,
}

impl<A: Outputs, B: Outputs> PairOutputs<A, B> {
    pub fn new(first: A, second: B) -> PairOutputs<A, B> {
        PairOutputs { first, second }
    }
}

impl<A: Outputs, B: Outputs> Outputs for PairOutputs<A, B> {
    type Value = (A::Value, B::Value);

    fn no_output(&self) -> Self::Value {
        (self.first.no_output(), self.second.no_output())
    }

    fn common(&self, a: &Self::Value, b: &Self::Value) -> Self::Value {
        (self.first.common(&a.0, &b.0), self.second.common(&a.1, &b.1))
    }

    fn subtract(&self, a: &Self::Value, prefix: &Self::Value) -> Self::Value {
        (
            self.first.subtract(&a.0, &prefix.0),
            self.second.subtract(&a.1, &prefix.1),
        )
    }

    fn add(&self, prefix: &Self::Value, suffix: &Self::Value) -> Self::Value {
        (
            self.first.add(&prefix.0, &suffix.0),
            self.second.add(&prefix.1, &suffix.1),
        )
    }

    fn write<W: Write>(&self, value: &Self::Value, out: &mut W) -> io::Result<()> {
        self.first.write(&value.0, out)?;
        self.second.write(&value.1, out)
    }

    fn read(&self, reader: &mut ReverseBytesReader<'_>) -> Self::Value {
        let first = self.first.read(reader);
        let second = self.second.read(reader);
        (first, second)
    }
}

/// Byte sequences under concatenation; `common` is the longest common
/// prefix. This is the algebra the term dictionary rides on: term
/// metadata is opaque bytes to the FST.
#[derive(Debug, Clone, Default)]
pub struct ByteSequenceOutputs;

impl Outputs for ByteSequenceOutputs {
    type Value = Vec<u8>;

    fn no_output(&self) -> Vec<u8> {
        Vec::new()
    }

    fn common(&self, a: &Vec<u8>, b: &Vec<u8>) -> Vec<u8> {
        let len = a
            .iter()
            .zip(b.iter())
            .take_while(|(byte_a, byte_b)| byte_a == byte_b)
            .count();
        a[..len].to_vec()
    }

    fn subtract(&self, a: &Vec<u8>, prefix: &Vec<u8>) -> Vec<u8> {
        debug_assert!(a.starts_with(prefix));
        a[prefix.len()..].to_vec()
    }

    fn add(&self, prefix: &Vec<u8>, suffix: &Vec<u8>) -> Vec<u8> {
        let mut out = Vec::with_capacity(prefix.len() + suffix.len());
        out.extend_from_slice(prefix);
        out.extend_from_slice(suffix);
        out
    }

    fn write<W: Write>(&self, value: &Vec<u8>, out: &mut W) -> io::Result<()> {
        write_vint(value.len() as u64, out)?;
        out.write_all(value)
    }

    fn read(&self, reader: &mut ReverseBytesReader<'_>) -> Vec<u8> {
        let len = reader.read_vint() as usize;
        let mut value = vec![0u8; len];
        reader.read_bytes(&mut value);
        value
    }
}

#[cfg(test)]
mod tests {
    use super::{ByteSequenceOutputs, Outputs, PositiveIntOutputs};

    #[test]
    fn test_positive_int_laws() {
        let outputs = PositiveIntOutputs;
        let (a, b) = (17u64, 5u64);
        assert_eq!(outputs.add(&a, &outputs.no_output()), a);
        assert_eq!(outputs.subtract(&outputs.add(&a, &b), &b), a);
        assert_eq!(outputs.common(&a, &b), 5);
    }

    #[test]
    fn test_byte_sequence_common_prefix() {
        let outputs = ByteSequenceOutputs;
        let a = b"search".to_vec();
        let b = b"seaside".to_vec();
        assert_eq!(outputs.common(&a, &b), b"sea".to_vec());
        assert_eq!(outputs.subtract(&a, &b"sea".to_vec()), b"rch".to_vec());
        assert_eq!(
            outputs.add(&b"sea".to_vec(), &b"rch".to_vec()),
            b"search".to_vec()
        );
    }
}
