//! Codec file framing: every postings/dictionary file starts with a
//! header naming its codec and ends with a checksummed footer.

use std::io;
use std::io::{Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::common::{read_i32_be, write_i32_be};
use crate::directory::{IndexOutput, ReadOnlySource};
use crate::{Error, Result};

pub const CODEC_MAGIC: i32 = 0x3FD7_6C17;
pub const FOOTER_MAGIC: i32 = 0xC028_93E8u32 as i32;

/// Identifier of the only checksum algorithm in use (CRC32).
const CRC32_ALGORITHM_ID: i32 = 0;

pub fn header_length(codec_name: &str) -> usize {
    4 + 4 + 2 + codec_name.len()
}

pub fn footer_length() -> usize {
    4 + 4 + 8
}

/// Writes `magic · version · (len-as-short, codec name)`. Magic and
/// version are big-endian; everything after follows the little-endian
/// convention of the rest of the file.
pub fn write_header<W: Write>(writer: &mut W, codec_name: &str, version: i32) -> io::Result<()> {
    debug_assert!(codec_name.len() < u16::MAX as usize);
    write_i32_be(CODEC_MAGIC, writer)?;
    write_i32_be(version, writer)?;
    writer.write_u16::<LittleEndian>(codec_name.len() as u16)?;
    writer.write_all(codec_name.as_bytes())
}

/// Validates the header of `reader` and returns the version found.
pub fn check_header<R: Read>(
    reader: &mut R,
    filename: &str,
    codec_name: &str,
    min_version: i32,
    max_version: i32,
) -> Result<i32> {
    let magic = read_i32_be(reader)?;
    if magic != CODEC_MAGIC {
        return Err(Error::corruption(
            filename,
            format!("bad magic {:#x}, expected {:#x}", magic, CODEC_MAGIC),
        ));
    }
    let version = read_i32_be(reader)?;
    if version < min_version || version > max_version {
        return Err(Error::corruption(
            filename,
            format!(
                "version {} out of supported range [{}, {}]",
                version, min_version, max_version
            ),
        ));
    }
    let name_len = reader.read_u16::<LittleEndian>()? as usize;
    let mut name_bytes = vec![0u8; name_len];
    reader.read_exact(&mut name_bytes)?;
    if name_bytes != codec_name.as_bytes() {
        return Err(Error::corruption(
            filename,
            format!(
                "codec name mismatch: found {:?}, expected {:?}",
                String::from_utf8_lossy(&name_bytes),
                codec_name
            ),
        ));
    }
    Ok(version)
}

/// Writes the footer. The recorded checksum covers every byte written
/// to `output` before the footer itself.
pub fn write_footer(output: &mut dyn IndexOutput) -> io::Result<()> {
    let checksum = output.checksum();
    write_i32_be(FOOTER_MAGIC, output)?;
    output.write_i32::<LittleEndian>(CRC32_ALGORITHM_ID)?;
    output.write_i64::<LittleEndian>(i64::from(checksum))
}

/// Validates the footer of a whole file: magic, algorithm id, and the
/// CRC32 of everything preceding the footer.
pub fn check_footer(source: &ReadOnlySource, filename: &str) -> Result<()> {
    let len = source.len();
    if len < footer_length() {
        return Err(Error::corruption(
            filename,
            format!("file too short ({} bytes) to hold a footer", len),
        ));
    }
    let body = &source.as_slice()[..len - footer_length()];
    let mut footer = &source.as_slice()[len - footer_length()..];
    let magic = read_i32_be(&mut footer)?;
    if magic != FOOTER_MAGIC {
        return Err(Error::corruption(
            filename,
            format!("bad footer magic {:#x}, expected {:#x}", magic, FOOTER_MAGIC),
        ));
    }
    let algorithm_id = footer.read_i32::<LittleEndian>()?;
    if algorithm_id != CRC32_ALGORITHM_ID {
        return Err(Error::corruption(
            filename,
            format!("unknown checksum algorithm {}", algorithm_id),
        ));
    }
    let expected = footer.read_i64::<LittleEndian>()?;
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(body);
    let actual = i64::from(hasher.finalize());
    if actual != expected {
        return Err(Error::corruption(
            filename,
            format!("checksum mismatch: stored {:#x}, computed {:#x}", expected, actual),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::{Directory, RAMDirectory};
    use std::io::Write;

    #[test]
    fn test_header_round_trip() {
        let mut buffer = Vec::new();
        write_header(&mut buffer, "TallyhoPostings", 2).unwrap();
        assert_eq!(buffer.len(), header_length("TallyhoPostings"));
        let version = check_header(&mut &buffer[..], "seg.doc", "TallyhoPostings", 0, 2).unwrap();
        assert_eq!(version, 2);
    }

    #[test]
    fn test_header_rejects_wrong_codec() {
        let mut buffer = Vec::new();
        write_header(&mut buffer, "TallyhoPostings", 0).unwrap();
        assert!(check_header(&mut &buffer[..], "seg.doc", "TallyhoSkip", 0, 0).is_err());
        assert!(check_header(&mut &buffer[..], "seg.doc", "TallyhoPostings", 1, 2).is_err());
    }

    #[test]
    fn test_footer_round_trip() {
        let mut directory = RAMDirectory::create();
        {
            let mut output = directory.create_output("file").unwrap();
            output.write_all(b"payload bytes").unwrap();
            write_footer(&mut *output).unwrap();
            output.flush().unwrap();
        }
        let source = directory.open_source("file").unwrap();
        check_footer(&source, "file").unwrap();
    }

    #[test]
    fn test_footer_detects_corruption() {
        let mut directory = RAMDirectory::create();
        {
            let mut output = directory.create_output("file").unwrap();
            output.write_all(b"payload bytes").unwrap();
            write_footer(&mut *output).unwrap();
            output.flush().unwrap();
        }
        let source = directory.open_source("file").unwrap();
        let mut bytes = source.as_slice().to_vec();
        bytes[0] ^= 0xFF;
        let tampered = ReadOnlySource::from(bytes);
        assert!(check_footer(&tampered, "file").is_err());
    }
}
