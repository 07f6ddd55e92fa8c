use std::io::Write;

use crate::core::segment_reader::SegmentReader;
use crate::directory::Directory;
use crate::schema::Schema;
use crate::{DocId, Error, Result};

pub const META_FILE: &str = "meta.json";

/// Identity and size of one sealed segment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentMeta {
    pub name: String,
    pub max_doc: DocId,
}

#[derive(Serialize, Deserialize)]
struct IndexMeta {
    schema: Schema,
    segments: Vec<SegmentMeta>,
}

/// Handle on a committed index: a directory, its schema, and the list
/// of sealed segments.
pub struct Index {
    directory: Box<dyn Directory>,
    schema: Schema,
    segments: Vec<SegmentMeta>,
}

impl Index {
    pub(crate) fn from_parts(
        directory: Box<dyn Directory>,
        schema: Schema,
        segments: Vec<SegmentMeta>,
    ) -> Index {
        Index {
            directory,
            schema,
            segments,
        }
    }

    /// Opens an index from its meta file.
    pub fn open(directory: Box<dyn Directory>) -> Result<Index> {
        let source = directory.open_source(META_FILE)?;
        let meta: IndexMeta = serde_json::from_slice(source.as_slice())
            .map_err(|err| Error::corruption(META_FILE, err.to_string()))?;
        Ok(Index {
            directory,
            schema: meta.schema,
            segments: meta.segments,
        })
    }

    pub(crate) fn write_meta(
        directory: &mut dyn Directory,
        schema: &Schema,
        segments: &[SegmentMeta],
    ) -> Result<()> {
        let meta = IndexMeta {
            schema: schema.clone(),
            segments: segments.to_vec(),
        };
        let json = serde_json::to_vec_pretty(&meta).expect("meta serialization cannot fail");
        let mut out = directory.create_output(META_FILE)?;
        out.write_all(&json)?;
        out.flush()?;
        Ok(())
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn segments(&self) -> &[SegmentMeta] {
        &self.segments
    }

    pub fn directory(&self) -> &dyn Directory {
        &*self.directory
    }

    pub fn directory_mut(&mut self) -> &mut dyn Directory {
        &mut *self.directory
    }

    /// Total number of documents, deleted ones included.
    pub fn max_doc(&self) -> DocId {
        self.segments.iter().map(|segment| segment.max_doc).sum()
    }

    /// Opens one reader per segment, in segment order.
    pub fn segment_readers(&self) -> Result<Vec<SegmentReader>> {
        self.segments
            .iter()
            .map(|segment| SegmentReader::open(&*self.directory, segment, &self.schema))
            .collect()
    }
}
