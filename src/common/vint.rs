use std::io;
use std::io::{Read, Write};

use crate::common::serialize::BinarySerializable;
use crate::common::{zigzag_decode, zigzag_encode};

/// Variable-length unsigned integer: 7 bits per byte, high bit set while
/// more bytes follow, least-significant group first.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct VInt(pub u64);

impl BinarySerializable for VInt {
    fn serialize<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        write_vint(self.0, writer)
    }

    fn deserialize<R: Read>(reader: &mut R) -> io::Result<Self> {
        read_vint(reader).map(VInt)
    }
}

pub fn write_vint<W: Write>(mut val: u64, writer: &mut W) -> io::Result<()> {
    let mut buffer = [0u8; 10];
    let mut written = 0;
    loop {
        let next_byte = (val & 0x7F) as u8;
        val >>= 7;
        if val == 0 {
            buffer[written] = next_byte;
            written += 1;
            break;
        }
        buffer[written] = next_byte | 0x80;
        written += 1;
    }
    writer.write_all(&buffer[..written])
}

pub fn read_vint<R: Read + ?Sized>(reader: &mut R) -> io::Result<u64> {
    let mut result = 0u64;
    let mut shift = 0u32;
    loop {
        let mut byte = [0u8; 1];
        reader.read_exact(&mut byte)?;
        result |= u64::from(byte[0] & 0x7F) << shift;
        if byte[0] & 0x80 == 0 {
            return Ok(result);
        }
        shift += 7;
        if shift > 63 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "vint continues past 10 bytes",
            ));
        }
    }
}

pub fn write_zigzag_vint<W: Write>(val: i64, writer: &mut W) -> io::Result<()> {
    write_vint(zigzag_encode(val), writer)
}

pub fn read_zigzag_vint<R: Read>(reader: &mut R) -> io::Result<i64> {
    read_vint(reader).map(zigzag_decode)
}

#[cfg(test)]
mod tests {
    use super::{read_vint, read_zigzag_vint, write_vint, write_zigzag_vint};

    #[test]
    fn test_vint_round_trip() {
        let vals = [
            0u64,
            1,
            127,
            128,
            16_383,
            16_384,
            u64::from(u32::MAX),
            (1u64 << 63) - 1,
            u64::MAX,
        ];
        for &val in &vals {
            let mut buffer = Vec::new();
            write_vint(val, &mut buffer).unwrap();
            assert!(buffer.len() <= 10);
            assert_eq!(read_vint(&mut &buffer[..]).unwrap(), val);
        }
    }

    #[test]
    fn test_vint_byte_boundaries() {
        let mut buffer = Vec::new();
        write_vint(127, &mut buffer).unwrap();
        assert_eq!(buffer, vec![127]);
        buffer.clear();
        write_vint(128, &mut buffer).unwrap();
        assert_eq!(buffer, vec![0x80, 0x01]);
    }

    #[test]
    fn test_zigzag_vint_round_trip() {
        for &val in &[0i64, -1, 1, -63, 64, i64::MIN, i64::MAX] {
            let mut buffer = Vec::new();
            write_zigzag_vint(val, &mut buffer).unwrap();
            assert_eq!(read_zigzag_vint(&mut &buffer[..]).unwrap(), val);
        }
    }

    #[test]
    fn test_vint_truncated() {
        let buffer = vec![0x80u8];
        assert!(read_vint(&mut &buffer[..]).is_err());
    }
}
