/*!
In-memory single-segment indexing.

The writer buffers an inverted index in a sorted map, then commits it
through the postings writer and the FST term dictionary. It exists so
the search core has something real to run against; segment merging,
buffer spilling and deletes belong to the embedding system.
*/

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use crate::analyzer::{Analyzer, TokenStream, TokenStreamChain};
use crate::core::index::{Index, SegmentMeta};
use crate::core::segment_reader::write_norms;
use crate::directory::{Directory, RAMDirectory};
use crate::postings::PostingsWriter;
use crate::schema::{Field, Schema, Term};
use crate::similarity::{default_similarity, FieldInvertState, Similarity};
use crate::termdict::{FieldStats, TermDictionaryWriter};
use crate::{DocId, Result};

const SEGMENT_NAME: &str = "seg0";

struct PositionEntry {
    position: i32,
    start_offset: i32,
    end_offset: i32,
}

struct DocPosting {
    doc: DocId,
    freq: u32,
    positions: Vec<PositionEntry>,
}

#[derive(Default)]
struct TermPostings {
    docs: Vec<DocPosting>,
}

pub struct IndexWriter {
    directory: Box<dyn Directory>,
    schema: Schema,
    analyzer: Box<dyn Analyzer>,
    similarity: Arc<dyn Similarity>,
    postings: BTreeMap<Term, TermPostings>,
    field_stats: HashMap<u32, FieldStats>,
    norms: HashMap<u32, Vec<u8>>,
    max_doc: DocId,
}

impl IndexWriter {
    /// Writer over a fresh in-memory directory.
    pub fn new(schema: Schema, analyzer: Box<dyn Analyzer>) -> IndexWriter {
        IndexWriter::create_in(Box::new(RAMDirectory::create()), schema, analyzer)
    }

    pub fn create_in(
        directory: Box<dyn Directory>,
        schema: Schema,
        analyzer: Box<dyn Analyzer>,
    ) -> IndexWriter {
        IndexWriter {
            directory,
            schema,
            analyzer,
            similarity: default_similarity(),
            postings: BTreeMap::new(),
            field_stats: HashMap::new(),
            norms: HashMap::new(),
            max_doc: 0,
        }
    }

    /// The similarity whose `compute_norm` fills the norms file.
    pub fn set_similarity(&mut self, similarity: Arc<dyn Similarity>) {
        self.similarity = similarity;
    }

    /// Analyzes and buffers one document; the same field may appear
    /// several times (its values are position-gapped).
    pub fn add_document(&mut self, fields: &[(Field, &str)]) -> Result<DocId> {
        let doc = self.max_doc;
        self.max_doc += 1;

        let mut by_field: BTreeMap<u32, Vec<&str>> = BTreeMap::new();
        for &(field, value) in fields {
            by_field.entry(field.0).or_default().push(value);
        }

        for (field_ord, values) in by_field {
            let field = Field(field_ord);
            self.invert_field(doc, field, &values)?;
        }
        Ok(doc)
    }

    fn invert_field(&mut self, doc: DocId, field: Field, values: &[&str]) -> Result<()> {
        let entry = self.schema.get_field_entry(field);
        let index_options = entry.index_options();
        let mut state = FieldInvertState::new(entry.name());

        let mut stream = if values.len() == 1 {
            self.analyzer.token_stream(values[0])
        } else {
            let mut offsets = Vec::with_capacity(values.len());
            let mut streams = Vec::with_capacity(values.len());
            let mut offset = 0usize;
            for value in values {
                offsets.push(offset);
                streams.push(self.analyzer.token_stream(value));
                offset += value.chars().count() + 1;
            }
            Box::new(TokenStreamChain::new(offsets, streams))
        };

        stream.reset()?;
        let mut position = -1i32;
        while stream.increment_token()? {
            let token = stream.token();
            state.length += 1;
            if token.position_increment == 0 {
                state.num_overlap += 1;
            }
            position += token.position_increment as i32;
            let term = Term::new(field, token.term.as_bytes().to_vec());
            let offset_from = token.offset_from as i32;
            let offset_to = token.offset_to as i32;

            let postings = self.postings.entry(term).or_default();
            match postings.docs.last_mut() {
                Some(last) if last.doc == doc => {
                    last.freq += 1;
                    if index_options.has_positions() {
                        last.positions.push(PositionEntry {
                            position,
                            start_offset: offset_from,
                            end_offset: offset_to,
                        });
                    }
                }
                _ => {
                    let mut positions = Vec::new();
                    if index_options.has_positions() {
                        positions.push(PositionEntry {
                            position,
                            start_offset: offset_from,
                            end_offset: offset_to,
                        });
                    }
                    postings.docs.push(DocPosting {
                        doc,
                        freq: 1,
                        positions,
                    });
                }
            }
        }
        stream.end()?;

        if state.length > 0 {
            let stats = self.field_stats.entry(field.0).or_default();
            stats.doc_count += 1;
            stats.sum_total_term_freq += i64::from(state.length);
        }
        if entry.has_norms() {
            let norm = self.similarity.compute_norm(&state);
            let norms = self.norms.entry(field.0).or_default();
            norms.resize(doc as usize, 0);
            norms.push(norm);
        }
        Ok(())
    }

    /// Seals the buffered documents into one segment and returns the
    /// resulting index.
    pub fn commit(mut self) -> Result<Index> {
        let has_positions = self
            .schema
            .fields()
            .iter()
            .any(|entry| entry.index_options().has_positions());
        let has_payloads_or_offsets = self
            .schema
            .fields()
            .iter()
            .any(|entry| entry.store_payloads() || entry.index_options().has_offsets());

        let mut postings_writer = PostingsWriter::new(
            &mut *self.directory,
            SEGMENT_NAME,
            has_positions,
            has_payloads_or_offsets,
        )?;
        let mut dict_writer = TermDictionaryWriter::new(&mut *self.directory, SEGMENT_NAME)?;

        let mut open_field: Option<Field> = None;
        for (term, term_postings) in &self.postings {
            let field = term.field();
            if open_field != Some(field) {
                if let Some(previous) = open_field {
                    let stats = self.field_stats.remove(&previous.0).unwrap_or_default();
                    dict_writer.finish_field(stats)?;
                }
                let entry = self.schema.get_field_entry(field);
                dict_writer.start_field(field, entry.index_options(), entry.store_payloads())?;
                postings_writer.set_field(entry.index_options(), entry.store_payloads());
                open_field = Some(field);
            }
            let index_options = self.schema.get_field_entry(field).index_options();

            postings_writer.start_term();
            for doc_posting in &term_postings.docs {
                let freq = if index_options.has_freqs() {
                    doc_posting.freq
                } else {
                    1
                };
                postings_writer.start_doc(doc_posting.doc, freq)?;
                if index_options.has_positions() {
                    for entry in &doc_posting.positions {
                        postings_writer.add_position(
                            entry.position,
                            None,
                            entry.start_offset,
                            entry.end_offset,
                        )?;
                    }
                }
                postings_writer.finish_doc();
            }
            let info = postings_writer.finish_term()?;
            dict_writer.add_term(term.value_bytes(), &info)?;

            let stats = self.field_stats.entry(field.0).or_default();
            stats.sum_doc_freq += i64::from(info.doc_freq);
            stats.num_terms += 1;
        }
        if let Some(previous) = open_field {
            let stats = self.field_stats.remove(&previous.0).unwrap_or_default();
            dict_writer.finish_field(stats)?;
        }

        postings_writer.close()?;
        dict_writer.finish()?;

        let mut norms_by_field: Vec<(u32, Vec<u8>)> = self
            .norms
            .into_iter()
            .map(|(field, mut bytes)| {
                bytes.resize(self.max_doc as usize, 0);
                (field, bytes)
            })
            .collect();
        norms_by_field.sort_by_key(|(field, _)| *field);
        write_norms(&mut *self.directory, SEGMENT_NAME, &norms_by_field)?;

        let segments = vec![SegmentMeta {
            name: SEGMENT_NAME.to_string(),
            max_doc: self.max_doc,
        }];
        Index::write_meta(&mut *self.directory, &self.schema, &segments)?;
        info!(
            "committed segment {:?}: {} docs, {} terms",
            SEGMENT_NAME,
            self.max_doc,
            self.postings.len()
        );
        Ok(Index::from_parts(self.directory, self.schema, segments))
    }
}

#[cfg(test)]
mod tests {
    use super::IndexWriter;
    use crate::analyzer::StandardAnalyzer;
    use crate::postings::{DocSet, Postings};
    use crate::schema::{IndexOptions, SchemaBuilder, Term};
    use crate::NO_MORE_DOCS;

    #[test]
    fn test_index_and_read_back() {
        let mut schema_builder = SchemaBuilder::new();
        let body = schema_builder.add_text_field("body", IndexOptions::DocsFreqsAndPositions);
        let schema = schema_builder.build();
        let mut writer = IndexWriter::new(schema, Box::new(StandardAnalyzer::default()));
        writer.add_document(&[(body, "grey whale")]).unwrap();
        writer.add_document(&[(body, "blue whale whale")]).unwrap();
        let index = writer.commit().unwrap();

        let readers = index.segment_readers().unwrap();
        assert_eq!(readers.len(), 1);
        let reader = &readers[0];
        assert_eq!(reader.max_doc(), 2);

        let term = Term::from_field_text(body, "whale");
        let info = reader.term_info(&term).unwrap().unwrap();
        assert_eq!(info.doc_freq, 2);
        assert_eq!(info.total_term_freq, 3);

        let mut postings = reader.postings(&term, &info, None).unwrap();
        assert_eq!(postings.next_doc().unwrap(), 0);
        assert_eq!(postings.freq(), 1);
        assert_eq!(postings.next_doc().unwrap(), 1);
        assert_eq!(postings.freq(), 2);
        assert_eq!(postings.next_doc().unwrap(), NO_MORE_DOCS);

        let missing = Term::from_field_text(body, "dolphin");
        assert!(reader.term_info(&missing).unwrap().is_none());
    }

    #[test]
    fn test_positions_round_trip() {
        let mut schema_builder = SchemaBuilder::new();
        let body = schema_builder.add_text_field("body", IndexOptions::DocsFreqsAndPositions);
        let schema = schema_builder.build();
        let mut writer = IndexWriter::new(schema, Box::new(StandardAnalyzer::default()));
        writer
            .add_document(&[(body, "one two one two")])
            .unwrap();
        let index = writer.commit().unwrap();

        let readers = index.segment_readers().unwrap();
        let term = Term::from_field_text(body, "two");
        let info = readers[0].term_info(&term).unwrap().unwrap();
        let mut postings = readers[0]
            .postings_with_positions(&term, &info, None)
            .unwrap();
        assert_eq!(postings.next_doc().unwrap(), 0);
        assert_eq!(postings.freq(), 2);
        assert_eq!(postings.next_position().unwrap(), 1);
        assert_eq!(postings.next_position().unwrap(), 3);
    }

    #[test]
    fn test_multi_valued_field_has_position_gap() {
        let mut schema_builder = SchemaBuilder::new();
        let body = schema_builder.add_text_field("body", IndexOptions::DocsFreqsAndPositions);
        let schema = schema_builder.build();
        let mut writer = IndexWriter::new(schema, Box::new(StandardAnalyzer::default()));
        writer
            .add_document(&[(body, "end"), (body, "start")])
            .unwrap();
        let index = writer.commit().unwrap();

        let readers = index.segment_readers().unwrap();
        let term = Term::from_field_text(body, "start");
        let info = readers[0].term_info(&term).unwrap().unwrap();
        let mut postings = readers[0]
            .postings_with_positions(&term, &info, None)
            .unwrap();
        postings.next_doc().unwrap();
        // "end" is at 0; the gap pushes "start" to 3
        assert_eq!(postings.next_position().unwrap(), 3);
    }

    #[test]
    fn test_field_statistics() {
        let mut schema_builder = SchemaBuilder::new();
        let body = schema_builder.add_text_field("body", IndexOptions::DocsFreqsAndPositions);
        let schema = schema_builder.build();
        let mut writer = IndexWriter::new(schema, Box::new(StandardAnalyzer::default()));
        writer.add_document(&[(body, "red fish")]).unwrap();
        writer.add_document(&[(body, "blue fish swim")]).unwrap();
        writer.add_document(&[]).unwrap();
        let index = writer.commit().unwrap();

        let readers = index.segment_readers().unwrap();
        let stats = readers[0].collection_statistics(body);
        assert_eq!(stats.max_doc, 3);
        assert_eq!(stats.doc_count, 2);
        assert_eq!(stats.sum_total_term_freq, 5);
        // red, fish, blue, swim
        assert_eq!(stats.sum_doc_freq, 5);
    }

    #[test]
    fn test_empty_commit() {
        let mut schema_builder = SchemaBuilder::new();
        schema_builder.add_text_field("body", IndexOptions::DocsFreqsAndPositions);
        let schema = schema_builder.build();
        let writer = IndexWriter::new(schema, Box::new(StandardAnalyzer::default()));
        let index = writer.commit().unwrap();
        let readers = index.segment_readers().unwrap();
        assert_eq!(readers[0].max_doc(), 0);
    }
}
