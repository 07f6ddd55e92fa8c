/*!
Directory abstraction and its in-memory realization.

The search core never touches the filesystem directly. It reads and
writes named files through the [`Directory`] contract; durability and
file lifecycle belong to the embedding system.
*/

mod codec;
mod ram_directory;
mod read_only_source;

pub use self::codec::{
    check_footer, check_header, footer_length, header_length, write_footer, write_header,
    CODEC_MAGIC, FOOTER_MAGIC,
};
pub use self::ram_directory::RAMDirectory;
pub use self::read_only_source::{ReadOnlySource, SourceRead};

use std::fmt;
use std::io;

use crate::Result;

/// Random-access reader over one named file.
///
/// Every read may block on I/O. Readers are cheap to clone so that
/// several iterators can walk one file independently.
pub trait IndexInput: io::Read + Send {
    /// Absolute position of the next byte to be read.
    fn file_pointer(&self) -> u64;

    /// Repositions the reader. Seeking past the end is an error
    /// surfaced by the next read.
    fn seek(&mut self, pos: u64) -> io::Result<()>;

    /// Total length of the file in bytes.
    fn len(&self) -> u64;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// An independent reader over the same bytes, positioned at 0.
    fn clone_input(&self) -> Box<dyn IndexInput>;
}

/// Append-only writer over one named file.
pub trait IndexOutput: io::Write + Send {
    /// Number of bytes written so far.
    fn file_pointer(&self) -> u64;

    /// CRC32 of every byte written so far.
    fn checksum(&self) -> u32;
}

/// Opaque store of named files.
pub trait Directory: fmt::Debug + Send + Sync {
    /// Opens a file for sequential/random reads.
    fn open_input(&self, name: &str) -> Result<Box<dyn IndexInput>>;

    /// Exposes a whole file as a random-access byte slice.
    fn open_source(&self, name: &str) -> Result<ReadOnlySource>;

    /// Creates a new file. Overwriting an existing name is an error.
    fn create_output(&mut self, name: &str) -> Result<Box<dyn IndexOutput>>;

    fn file_exists(&self, name: &str) -> bool;

    /// Releases every resource held by the directory.
    fn close(&mut self);
}
