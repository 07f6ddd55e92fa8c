use std::io;
use std::io::Read;
use std::sync::Arc;

use crate::directory::IndexInput;

/// Read-only view over a shared byte buffer.
///
/// Cloning is cheap (an `Arc` bump plus two offsets), which is what lets
/// postings iterators slice into the same file without copying it.
#[derive(Clone)]
pub struct ReadOnlySource {
    data: Arc<Vec<u8>>,
    start: usize,
    stop: usize,
}

impl ReadOnlySource {
    pub fn empty() -> ReadOnlySource {
        ReadOnlySource::from(Vec::new())
    }

    pub fn len(&self) -> usize {
        self.stop - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.stop
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data[self.start..self.stop]
    }

    /// Restriction of the source to `[from, to)`, relative to this view.
    pub fn slice(&self, from: usize, to: usize) -> ReadOnlySource {
        assert!(from <= to);
        assert!(self.start + to <= self.stop, "slice ends past the source");
        ReadOnlySource {
            data: Arc::clone(&self.data),
            start: self.start + from,
            stop: self.start + to,
        }
    }

    pub fn slice_from(&self, from: usize) -> ReadOnlySource {
        self.slice(from, self.len())
    }

    pub fn slice_to(&self, to: usize) -> ReadOnlySource {
        self.slice(0, to)
    }

    /// True when both views share the same backing buffer.
    pub fn ptr_eq(&self, other: &ReadOnlySource) -> bool {
        Arc::ptr_eq(&self.data, &other.data)
    }
}

impl From<Vec<u8>> for ReadOnlySource {
    fn from(data: Vec<u8>) -> ReadOnlySource {
        let stop = data.len();
        ReadOnlySource {
            data: Arc::new(data),
            start: 0,
            stop,
        }
    }
}

/// `IndexInput` walking a `ReadOnlySource`.
pub struct SourceRead {
    source: ReadOnlySource,
    pos: usize,
}

impl From<ReadOnlySource> for SourceRead {
    fn from(source: ReadOnlySource) -> SourceRead {
        SourceRead { source, pos: 0 }
    }
}

impl Read for SourceRead {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let remaining = &self.source.as_slice()[self.pos..];
        let read_len = remaining.len().min(buf.len());
        buf[..read_len].copy_from_slice(&remaining[..read_len]);
        self.pos += read_len;
        Ok(read_len)
    }
}

impl IndexInput for SourceRead {
    fn file_pointer(&self) -> u64 {
        self.pos as u64
    }

    fn seek(&mut self, pos: u64) -> io::Result<()> {
        if pos > self.source.len() as u64 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("seek to {} past end of source ({})", pos, self.source.len()),
            ));
        }
        self.pos = pos as usize;
        Ok(())
    }

    fn len(&self) -> u64 {
        self.source.len() as u64
    }

    fn clone_input(&self) -> Box<dyn IndexInput> {
        Box::new(SourceRead {
            source: self.source.clone(),
            pos: 0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{ReadOnlySource, SourceRead};
    use crate::directory::IndexInput;
    use std::io::Read;

    #[test]
    fn test_slice() {
        let source = ReadOnlySource::from(vec![0u8, 1, 2, 3, 4, 5]);
        let sub = source.slice(2, 5);
        assert_eq!(sub.as_slice(), &[2u8, 3, 4]);
        assert_eq!(sub.slice_from(1).as_slice(), &[3u8, 4]);
        assert_eq!(sub.slice_to(1).as_slice(), &[2u8]);
    }

    #[test]
    fn test_source_read_seek() {
        let source = ReadOnlySource::from((0u8..10).collect::<Vec<u8>>());
        let mut reader = SourceRead::from(source);
        let mut buf = [0u8; 4];
        reader.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, &[0, 1, 2, 3]);
        assert_eq!(reader.file_pointer(), 4);
        reader.seek(8).unwrap();
        let mut tail = Vec::new();
        reader.read_to_end(&mut tail).unwrap();
        assert_eq!(tail, vec![8, 9]);
        assert!(reader.seek(11).is_err());
    }
}
