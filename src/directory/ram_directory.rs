use std::collections::HashMap;
use std::fmt;
use std::io;
use std::io::Write;
use std::sync::{Arc, RwLock};

use crate::directory::{Directory, IndexInput, IndexOutput, ReadOnlySource, SourceRead};
use crate::{ErrorKind, Result};

type FileMap = Arc<RwLock<HashMap<String, ReadOnlySource>>>;

/// Directory keeping every file in anonymous memory.
///
/// This is the store the unit and scenario tests index into; nothing in
/// the search core assumes anything beyond the `Directory` contract.
#[derive(Clone, Default)]
pub struct RAMDirectory {
    fs: FileMap,
}

impl fmt::Debug for RAMDirectory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RAMDirectory")
    }
}

impl RAMDirectory {
    pub fn create() -> RAMDirectory {
        RAMDirectory::default()
    }
}

impl Directory for RAMDirectory {
    fn open_input(&self, name: &str) -> Result<Box<dyn IndexInput>> {
        let source = self.open_source(name)?;
        Ok(Box::new(SourceRead::from(source)))
    }

    fn open_source(&self, name: &str) -> Result<ReadOnlySource> {
        let fs = self.fs.read().expect("directory lock poisoned");
        fs.get(name)
            .cloned()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, name.to_string()).into())
    }

    fn create_output(&mut self, name: &str) -> Result<Box<dyn IndexOutput>> {
        if self.file_exists(name) {
            return Err(
                ErrorKind::InvalidArgument(format!("file {:?} already exists", name)).into(),
            );
        }
        Ok(Box::new(RAMOutput {
            name: name.to_string(),
            data: Vec::new(),
            hasher: crc32fast::Hasher::new(),
            fs: Arc::clone(&self.fs),
        }))
    }

    fn file_exists(&self, name: &str) -> bool {
        let fs = self.fs.read().expect("directory lock poisoned");
        fs.contains_key(name)
    }

    fn close(&mut self) {
        let mut fs = self.fs.write().expect("directory lock poisoned");
        fs.clear();
    }
}

struct RAMOutput {
    name: String,
    data: Vec<u8>,
    hasher: crc32fast::Hasher,
    fs: FileMap,
}

impl Write for RAMOutput {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.data.extend_from_slice(buf);
        self.hasher.update(buf);
        Ok(buf.len())
    }

    /// Publishes the bytes written so far under the file's name.
    fn flush(&mut self) -> io::Result<()> {
        let mut fs = self.fs.write().expect("directory lock poisoned");
        fs.insert(self.name.clone(), ReadOnlySource::from(self.data.clone()));
        Ok(())
    }
}

impl IndexOutput for RAMOutput {
    fn file_pointer(&self) -> u64 {
        self.data.len() as u64
    }

    fn checksum(&self) -> u32 {
        self.hasher.clone().finalize()
    }
}

impl Drop for RAMOutput {
    fn drop(&mut self) {
        let _ = self.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::RAMDirectory;
    use crate::directory::Directory;
    use std::io::{Read, Write};

    #[test]
    fn test_ram_directory_round_trip() {
        let mut directory = RAMDirectory::create();
        {
            let mut output = directory.create_output("seg.doc").unwrap();
            output.write_all(b"hello postings").unwrap();
            output.flush().unwrap();
        }
        assert!(directory.file_exists("seg.doc"));
        assert!(!directory.file_exists("seg.pos"));
        let mut input = directory.open_input("seg.doc").unwrap();
        let mut content = String::new();
        input.read_to_string(&mut content).unwrap();
        assert_eq!(content, "hello postings");
    }

    #[test]
    fn test_create_existing_file_fails() {
        let mut directory = RAMDirectory::create();
        directory.create_output("dup").unwrap().flush().unwrap();
        assert!(directory.create_output("dup").is_err());
    }

    #[test]
    fn test_close_drops_files() {
        let mut directory = RAMDirectory::create();
        directory.create_output("f").unwrap().flush().unwrap();
        directory.close();
        assert!(!directory.file_exists("f"));
    }
}
