//! Per-segment reader: term dictionary, postings, norms, live docs.

use std::collections::HashMap;
use std::io::Write;
use std::sync::Arc;

use bit_set::BitSet;

use crate::common::{read_vint, write_vint};
use crate::core::index::SegmentMeta;
use crate::directory::{
    check_footer, check_header, write_footer, write_header, Directory, ReadOnlySource, SourceRead,
};
use crate::postings::{
    LiveDocs, SegmentDocsIterator, SegmentPostingsIterator, SegmentPostingsReader, TermInfo,
};
use crate::schema::{Field, Schema, Term};
use crate::similarity::{CollectionStatistics, Norms, TermStatistics};
use crate::termdict::TermDictionary;
use crate::{DocId, ErrorKind, Result};

pub const NORMS_EXTENSION: &str = "nrm";
pub const LIVE_DOCS_EXTENSION: &str = "liv";
const NORMS_CODEC: &str = "TallyhoNorms";
const LIVE_DOCS_CODEC: &str = "TallyhoLiveDocs";
const SEGMENT_AUX_VERSION: i32 = 1;

/// The inverted index reader of one segment.
///
/// It is safe to search while the segment's files are dropped from the
/// directory: every structure keeps its backing source alive. Scorers
/// must not outlive the reader that produced them.
pub struct SegmentReader {
    segment_name: String,
    max_doc: DocId,
    schema: Schema,
    term_dict: TermDictionary,
    postings_reader: SegmentPostingsReader,
    norms: HashMap<u32, Norms>,
    live_docs: Option<LiveDocs>,
    num_deleted: DocId,
}

impl SegmentReader {
    pub fn open(
        directory: &dyn Directory,
        meta: &SegmentMeta,
        schema: &Schema,
    ) -> Result<SegmentReader> {
        let has_positions = schema
            .fields()
            .iter()
            .any(|entry| entry.index_options().has_positions());
        let has_payloads_or_offsets = schema
            .fields()
            .iter()
            .any(|entry| entry.store_payloads() || entry.index_options().has_offsets());

        let term_dict = TermDictionary::open(directory, &meta.name, schema)?;
        let postings_reader = SegmentPostingsReader::open(
            directory,
            &meta.name,
            has_positions,
            has_payloads_or_offsets,
        )?;
        let norms = read_norms(directory, &meta.name)?;
        let live_docs = read_live_docs(directory, &meta.name, meta.max_doc)?;
        let num_deleted = live_docs
            .as_ref()
            .map_or(0, |bits| meta.max_doc - bits.len() as DocId);

        Ok(SegmentReader {
            segment_name: meta.name.clone(),
            max_doc: meta.max_doc,
            schema: schema.clone(),
            term_dict,
            postings_reader,
            norms,
            live_docs,
            num_deleted,
        })
    }

    pub fn segment_name(&self) -> &str {
        &self.segment_name
    }

    pub fn max_doc(&self) -> DocId {
        self.max_doc
    }

    /// Number of live (non-deleted) documents.
    pub fn num_docs(&self) -> DocId {
        self.max_doc - self.num_deleted
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn live_docs(&self) -> Option<LiveDocs> {
        self.live_docs.clone()
    }

    pub fn has_positions(&self, field: Field) -> bool {
        self.schema.get_field_entry(field).index_options().has_positions()
    }

    /// Term lookup; `None` for unknown terms or fields.
    pub fn term_info(&self, term: &Term) -> Result<Option<TermInfo>> {
        self.term_dict.get(term)
    }

    pub fn doc_freq(&self, term: &Term) -> Result<i64> {
        self.term_dict.doc_freq(term)
    }

    /// Doc/freq iterator for a term already resolved to its
    /// [`TermInfo`].
    pub fn postings(
        &self,
        term: &Term,
        info: &TermInfo,
        live_docs: Option<LiveDocs>,
    ) -> Result<SegmentDocsIterator> {
        let entry = self.schema.get_field_entry(term.field());
        self.postings_reader
            .docs(entry.index_options(), entry.store_payloads(), info, live_docs)
    }

    /// Positional iterator; fails naming the field when it was not
    /// indexed with positions.
    pub fn postings_with_positions(
        &self,
        term: &Term,
        info: &TermInfo,
        live_docs: Option<LiveDocs>,
    ) -> Result<SegmentPostingsIterator> {
        let entry = self.schema.get_field_entry(term.field());
        if !entry.index_options().has_positions() {
            return Err(ErrorKind::FieldNotIndexed(
                entry.name().to_string(),
                "positions were not indexed".to_string(),
            )
            .into());
        }
        self.postings_reader.docs_and_positions(
            entry.index_options(),
            entry.store_payloads(),
            info,
            live_docs,
        )
    }

    pub fn norms(&self, field: Field) -> Option<Norms> {
        self.norms.get(&field.0).cloned()
    }

    /// Field statistics recorded at indexing time.
    pub fn collection_statistics(&self, field: Field) -> CollectionStatistics {
        let entry = self.schema.get_field_entry(field);
        match self.term_dict.field_stats(field) {
            Some(stats) => CollectionStatistics {
                field: entry.name().to_string(),
                max_doc: i64::from(self.max_doc),
                doc_count: stats.doc_count,
                sum_total_term_freq: stats.sum_total_term_freq,
                sum_doc_freq: stats.sum_doc_freq,
            },
            None => CollectionStatistics {
                field: entry.name().to_string(),
                max_doc: i64::from(self.max_doc),
                doc_count: 0,
                sum_total_term_freq: -1,
                sum_doc_freq: -1,
            },
        }
    }

    pub fn term_statistics(&self, term: &Term) -> Result<TermStatistics> {
        let (doc_freq, total_term_freq) = match self.term_info(term)? {
            Some(info) => (i64::from(info.doc_freq), info.total_term_freq),
            None => (0, 0),
        };
        Ok(TermStatistics {
            term: term.value_bytes().to_vec(),
            doc_freq,
            total_term_freq,
        })
    }
}

/// Writes the `.nrm` file: one norm byte per document per field.
pub(crate) fn write_norms(
    directory: &mut dyn Directory,
    segment_name: &str,
    norms_by_field: &[(u32, Vec<u8>)],
) -> Result<()> {
    let name = format!("{}.{}", segment_name, NORMS_EXTENSION);
    let mut out = directory.create_output(&name)?;
    write_header(&mut out, NORMS_CODEC, SEGMENT_AUX_VERSION)?;
    write_vint(norms_by_field.len() as u64, &mut out)?;
    for (field, bytes) in norms_by_field {
        write_vint(u64::from(*field), &mut out)?;
        write_vint(bytes.len() as u64, &mut out)?;
        out.write_all(bytes)?;
    }
    write_footer(&mut *out)?;
    out.flush()?;
    Ok(())
}

fn read_norms(directory: &dyn Directory, segment_name: &str) -> Result<HashMap<u32, Norms>> {
    let name = format!("{}.{}", segment_name, NORMS_EXTENSION);
    if !directory.file_exists(&name) {
        return Ok(HashMap::new());
    }
    let source: ReadOnlySource = directory.open_source(&name)?;
    check_footer(&source, &name)?;
    let mut input = SourceRead::from(source);
    check_header(&mut input, &name, NORMS_CODEC, SEGMENT_AUX_VERSION, SEGMENT_AUX_VERSION)?;
    let num_fields = read_vint(&mut input)? as usize;
    let mut norms = HashMap::with_capacity(num_fields);
    for _ in 0..num_fields {
        let field = read_vint(&mut input)? as u32;
        let len = read_vint(&mut input)? as usize;
        let mut bytes = vec![0u8; len];
        std::io::Read::read_exact(&mut input, &mut bytes)?;
        norms.insert(field, Norms::new(bytes));
    }
    Ok(norms)
}

/// Writes the `.liv` file: one byte per doc, 1 for alive.
pub fn write_live_docs(
    directory: &mut dyn Directory,
    segment_name: &str,
    alive: &BitSet,
    max_doc: DocId,
) -> Result<()> {
    let name = format!("{}.{}", segment_name, LIVE_DOCS_EXTENSION);
    let mut out = directory.create_output(&name)?;
    write_header(&mut out, LIVE_DOCS_CODEC, SEGMENT_AUX_VERSION)?;
    write_vint(max_doc as u64, &mut out)?;
    for doc in 0..max_doc {
        out.write_all(&[u8::from(alive.contains(doc as usize))])?;
    }
    write_footer(&mut *out)?;
    out.flush()?;
    Ok(())
}

fn read_live_docs(
    directory: &dyn Directory,
    segment_name: &str,
    max_doc: DocId,
) -> Result<Option<LiveDocs>> {
    let name = format!("{}.{}", segment_name, LIVE_DOCS_EXTENSION);
    if !directory.file_exists(&name) {
        return Ok(None);
    }
    let source = directory.open_source(&name)?;
    check_footer(&source, &name)?;
    let mut input = SourceRead::from(source);
    check_header(&mut input, &name, LIVE_DOCS_CODEC, SEGMENT_AUX_VERSION, SEGMENT_AUX_VERSION)?;
    let recorded_max_doc = read_vint(&mut input)? as DocId;
    if recorded_max_doc != max_doc {
        return Err(crate::Error::corruption(
            &name,
            format!("live docs cover {} docs, segment has {}", recorded_max_doc, max_doc),
        ));
    }
    let mut alive = BitSet::with_capacity(max_doc as usize);
    for doc in 0..max_doc {
        let mut byte = [0u8; 1];
        std::io::Read::read_exact(&mut input, &mut byte)?;
        if byte[0] != 0 {
            alive.insert(doc as usize);
        }
    }
    Ok(Some(Arc::new(alive)))
}
