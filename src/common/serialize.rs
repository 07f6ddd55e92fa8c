use byteorder::{BigEndian, LittleEndian, ReadBytesExt, WriteBytesExt};
use std::fmt;
use std::io;
use std::io::{Read, Write};

use crate::common::VInt;

/// Trait for types that tallyho persists in its little-endian binary
/// layout (fixed-width integers are little-endian; codec headers note
/// their big-endian fields explicitly).
pub trait BinarySerializable: fmt::Debug + Sized {
    fn serialize<W: Write>(&self, writer: &mut W) -> io::Result<()>;
    fn deserialize<R: Read>(reader: &mut R) -> io::Result<Self>;
}

impl BinarySerializable for () {
    fn serialize<W: Write>(&self, _: &mut W) -> io::Result<()> {
        Ok(())
    }
    fn deserialize<R: Read>(_: &mut R) -> io::Result<Self> {
        Ok(())
    }
}

impl BinarySerializable for u8 {
    fn serialize<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_u8(*self)
    }
    fn deserialize<R: Read>(reader: &mut R) -> io::Result<u8> {
        reader.read_u8()
    }
}

impl BinarySerializable for u16 {
    fn serialize<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_u16::<LittleEndian>(*self)
    }
    fn deserialize<R: Read>(reader: &mut R) -> io::Result<u16> {
        reader.read_u16::<LittleEndian>()
    }
}

impl BinarySerializable for u32 {
    fn serialize<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_u32::<LittleEndian>(*self)
    }
    fn deserialize<R: Read>(reader: &mut R) -> io::Result<u32> {
        reader.read_u32::<LittleEndian>()
    }
}

impl BinarySerializable for u64 {
    fn serialize<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_u64::<LittleEndian>(*self)
    }
    fn deserialize<R: Read>(reader: &mut R) -> io::Result<u64> {
        reader.read_u64::<LittleEndian>()
    }
}

impl BinarySerializable for i32 {
    fn serialize<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_i32::<LittleEndian>(*self)
    }
    fn deserialize<R: Read>(reader: &mut R) -> io::Result<i32> {
        reader.read_i32::<LittleEndian>()
    }
}

impl BinarySerializable for i64 {
    fn serialize<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_i64::<LittleEndian>(*self)
    }
    fn deserialize<R: Read>(reader: &mut R) -> io::Result<i64> {
        reader.read_i64::<LittleEndian>()
    }
}

impl BinarySerializable for String {
    fn serialize<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        let data = self.as_bytes();
        VInt(data.len() as u64).serialize(writer)?;
        writer.write_all(data)
    }

    fn deserialize<R: Read>(reader: &mut R) -> io::Result<String> {
        let len = VInt::deserialize(reader)?.0 as usize;
        let mut data = vec![0u8; len];
        reader.read_exact(&mut data)?;
        String::from_utf8(data).map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))
    }
}

/// Big-endian `i32`, used by the codec header magic and version only.
pub(crate) fn write_i32_be<W: Write + ?Sized>(val: i32, writer: &mut W) -> io::Result<()> {
    writer.write_i32::<BigEndian>(val)
}

pub(crate) fn read_i32_be<R: Read + ?Sized>(reader: &mut R) -> io::Result<i32> {
    reader.read_i32::<BigEndian>()
}

#[cfg(test)]
mod tests {
    use super::BinarySerializable;

    fn round_trip<T: BinarySerializable + Eq>(val: T) {
        let mut buffer = Vec::new();
        val.serialize(&mut buffer).unwrap();
        let read = T::deserialize(&mut &buffer[..]).unwrap();
        assert!(val == read);
    }

    #[test]
    fn test_serialize_ints() {
        round_trip(3u8);
        round_trip(1_000u16);
        round_trip(4_000_000_000u32);
        round_trip(u64::MAX);
        round_trip(-17i64);
    }

    #[test]
    fn test_serialize_string() {
        round_trip(String::from(""));
        round_trip(String::from("threshing floor"));
        round_trip(String::from("釣り"));
    }
}
