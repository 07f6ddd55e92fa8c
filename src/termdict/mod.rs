/*!
FST-backed term dictionary.

Two files per segment: the index file holds one FST per field mapping
term bytes to a pointer into the data file, and the data file holds the
serialized [`TermInfo`] bundles. Field-level statistics ride along in
the index file so the searcher can build collection statistics without
touching postings.
*/

use std::collections::HashMap;
use std::io::Write;

use crate::common::{read_vint, write_vint};
use crate::directory::{
    check_footer, check_header, write_footer, write_header, Directory, IndexOutput,
    ReadOnlySource, SourceRead,
};
use crate::fst::{Builder as FstBuilder, Fst, InputType, PositiveIntOutputs};
use crate::postings::TermInfo;
use crate::schema::{Field, IndexOptions, Schema, Term};
use crate::Result;

pub const TERMS_EXTENSION: &str = "tim";
pub const TERMS_INDEX_EXTENSION: &str = "tix";
const TERMS_CODEC: &str = "TallyhoTermsDict";
const TERMS_INDEX_CODEC: &str = "TallyhoTermsIndex";
const TERMS_VERSION: i32 = 1;

/// Field-wide statistics accumulated at indexing time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldStats {
    /// Number of documents with at least one term in the field.
    pub doc_count: i64,
    /// Total number of tokens in the field.
    pub sum_total_term_freq: i64,
    /// Sum of doc freqs over all terms of the field.
    pub sum_doc_freq: i64,
    pub num_terms: u64,
}

/// Writes the term dictionary of one segment.
pub struct TermDictionaryWriter {
    data_out: Box<dyn IndexOutput>,
    index_out: Box<dyn IndexOutput>,
    fields: Vec<FinishedField>,
    current: Option<OpenField>,
}

struct OpenField {
    field: Field,
    index_options: IndexOptions,
    store_payloads: bool,
    fst_builder: FstBuilder<PositiveIntOutputs>,
}

struct FinishedField {
    field: Field,
    stats: FieldStats,
    fst: Fst<PositiveIntOutputs>,
}

impl TermDictionaryWriter {
    pub fn new(directory: &mut dyn Directory, segment_name: &str) -> Result<TermDictionaryWriter> {
        let mut data_out =
            directory.create_output(&format!("{}.{}", segment_name, TERMS_EXTENSION))?;
        write_header(&mut data_out, TERMS_CODEC, TERMS_VERSION)?;
        let mut index_out =
            directory.create_output(&format!("{}.{}", segment_name, TERMS_INDEX_EXTENSION))?;
        write_header(&mut index_out, TERMS_INDEX_CODEC, TERMS_VERSION)?;
        Ok(TermDictionaryWriter {
            data_out,
            index_out,
            fields: Vec::new(),
            current: None,
        })
    }

    /// Starts a field. Fields must arrive in ascending ord, terms in
    /// ascending byte order within each field.
    pub fn start_field(
        &mut self,
        field: Field,
        index_options: IndexOptions,
        store_payloads: bool,
    ) -> Result<()> {
        assert!(self.current.is_none(), "previous field not finished");
        self.current = Some(OpenField {
            field,
            index_options,
            store_payloads,
            fst_builder: FstBuilder::new(InputType::Byte1, PositiveIntOutputs),
        });
        Ok(())
    }

    pub fn add_term(&mut self, term_bytes: &[u8], info: &TermInfo) -> Result<()> {
        let current = self.current.as_mut().expect("no field started");
        // the FST maps the term to the absolute offset of its record
        let offset = self.data_out.file_pointer();
        current.fst_builder.add(term_bytes, offset)?;
        info.serialize(current.index_options, current.store_payloads, &mut self.data_out)?;
        Ok(())
    }

    pub fn finish_field(&mut self, stats: FieldStats) -> Result<()> {
        let current = self.current.take().expect("no field started");
        let fst = current.fst_builder.finish()?;
        self.fields.push(FinishedField {
            field: current.field,
            stats,
            fst,
        });
        Ok(())
    }

    /// Seals both files.
    pub fn finish(mut self) -> Result<()> {
        write_footer(&mut *self.data_out)?;
        self.data_out.flush()?;

        write_vint(self.fields.len() as u64, &mut self.index_out)?;
        for field in &self.fields {
            write_vint(u64::from(field.field.0), &mut self.index_out)?;
            write_vint(field.stats.doc_count as u64, &mut self.index_out)?;
            write_vint(field.stats.sum_total_term_freq as u64, &mut self.index_out)?;
            write_vint(field.stats.sum_doc_freq as u64, &mut self.index_out)?;
            write_vint(field.stats.num_terms, &mut self.index_out)?;
            field.fst.save(&mut self.index_out)?;
        }
        write_footer(&mut *self.index_out)?;
        self.index_out.flush()?;
        Ok(())
    }
}

struct FieldTerms {
    fst: Fst<PositiveIntOutputs>,
    stats: FieldStats,
    index_options: IndexOptions,
    store_payloads: bool,
}

/// Read side: term bytes → [`TermInfo`], plus field statistics.
pub struct TermDictionary {
    fields: HashMap<u32, FieldTerms>,
    data: ReadOnlySource,
}

impl TermDictionary {
    pub fn open(
        directory: &dyn Directory,
        segment_name: &str,
        schema: &Schema,
    ) -> Result<TermDictionary> {
        let data_name = format!("{}.{}", segment_name, TERMS_EXTENSION);
        let data = directory.open_source(&data_name)?;
        check_header(
            &mut SourceRead::from(data.clone()),
            &data_name,
            TERMS_CODEC,
            TERMS_VERSION,
            TERMS_VERSION,
        )?;
        check_footer(&data, &data_name)?;

        let index_name = format!("{}.{}", segment_name, TERMS_INDEX_EXTENSION);
        let index_source = directory.open_source(&index_name)?;
        check_footer(&index_source, &index_name)?;
        let mut index_in = SourceRead::from(index_source);
        check_header(
            &mut index_in,
            &index_name,
            TERMS_INDEX_CODEC,
            TERMS_VERSION,
            TERMS_VERSION,
        )?;

        let num_fields = read_vint(&mut index_in)? as usize;
        let mut fields = HashMap::with_capacity(num_fields);
        for _ in 0..num_fields {
            let field_ord = read_vint(&mut index_in)? as u32;
            let stats = FieldStats {
                doc_count: read_vint(&mut index_in)? as i64,
                sum_total_term_freq: read_vint(&mut index_in)? as i64,
                sum_doc_freq: read_vint(&mut index_in)? as i64,
                num_terms: read_vint(&mut index_in)?,
            };
            let fst = Fst::load(&mut index_in, PositiveIntOutputs, &index_name)?;
            let entry = schema.get_field_entry(Field(field_ord));
            fields.insert(
                field_ord,
                FieldTerms {
                    fst,
                    stats,
                    index_options: entry.index_options(),
                    store_payloads: entry.store_payloads(),
                },
            );
        }

        Ok(TermDictionary { fields, data })
    }

    /// Returns the term's pointer bundle, or `None` for an unknown
    /// term or field. Absence is not an error.
    pub fn get(&self, term: &Term) -> Result<Option<TermInfo>> {
        let field = match self.fields.get(&term.field().0) {
            Some(field) => field,
            None => return Ok(None),
        };
        let offset = match field.fst.get(term.value_bytes()) {
            Some(offset) => offset,
            None => return Ok(None),
        };
        let mut cursor = &self.data.as_slice()[offset as usize..];
        let info = TermInfo::deserialize(field.index_options, field.store_payloads, &mut cursor)?;
        Ok(Some(info))
    }

    pub fn field_stats(&self, field: Field) -> Option<&FieldStats> {
        self.fields.get(&field.0).map(|terms| &terms.stats)
    }

    pub fn doc_freq(&self, term: &Term) -> Result<i64> {
        Ok(self.get(term)?.map_or(0, |info| i64::from(info.doc_freq)))
    }
}

#[cfg(test)]
mod tests {
    use super::{FieldStats, TermDictionary, TermDictionaryWriter};
    use crate::directory::RAMDirectory;
    use crate::postings::TermInfo;
    use crate::schema::{Field, IndexOptions, SchemaBuilder, Term};

    fn term_info(doc_freq: i32, fp: u64) -> TermInfo {
        TermInfo {
            doc_freq,
            total_term_freq: i64::from(doc_freq) * 2,
            doc_start_fp: fp,
            pos_start_fp: fp + 1,
            pay_start_fp: 0,
            skip_offset: -1,
            singleton_doc_id: if doc_freq == 1 { 7 } else { -1 },
            last_pos_block_offset: -1,
        }
    }

    #[test]
    fn test_term_dictionary_round_trip() {
        let mut schema_builder = SchemaBuilder::new();
        let body = schema_builder.add_text_field("body", IndexOptions::DocsFreqsAndPositions);
        let title = schema_builder.add_text_field("title", IndexOptions::DocsFreqsAndPositions);
        let schema = schema_builder.build();

        let mut directory = RAMDirectory::create();
        let mut writer = TermDictionaryWriter::new(&mut directory, "seg").unwrap();

        writer
            .start_field(body, IndexOptions::DocsFreqsAndPositions, false)
            .unwrap();
        let body_terms = [("brown", 3), ("fox", 1), ("quick", 12)];
        for (index, (text, doc_freq)) in body_terms.iter().enumerate() {
            writer
                .add_term(text.as_bytes(), &term_info(*doc_freq, index as u64 * 100))
                .unwrap();
        }
        writer
            .finish_field(FieldStats {
                doc_count: 12,
                sum_total_term_freq: 32,
                sum_doc_freq: 16,
                num_terms: 3,
            })
            .unwrap();

        writer
            .start_field(title, IndexOptions::DocsFreqsAndPositions, false)
            .unwrap();
        writer.add_term(b"fox", &term_info(1, 900)).unwrap();
        writer
            .finish_field(FieldStats {
                doc_count: 1,
                sum_total_term_freq: 1,
                sum_doc_freq: 1,
                num_terms: 1,
            })
            .unwrap();
        writer.finish().unwrap();

        let dict = TermDictionary::open(&directory, "seg", &schema).unwrap();
        for (index, (text, doc_freq)) in body_terms.iter().enumerate() {
            let info = dict
                .get(&Term::from_field_text(body, text))
                .unwrap()
                .unwrap_or_else(|| panic!("missing term {}", text));
            assert_eq!(info.doc_freq, *doc_freq);
            assert_eq!(info.doc_start_fp, index as u64 * 100);
        }
        // the same text under another field is a different term
        let title_fox = dict.get(&Term::from_field_text(title, "fox")).unwrap().unwrap();
        assert_eq!(title_fox.doc_start_fp, 900);
        assert!(dict.get(&Term::from_field_text(body, "wolf")).unwrap().is_none());
        assert!(dict
            .get(&Term::from_field_text(Field(9), "fox"))
            .unwrap()
            .is_none());

        let stats = dict.field_stats(body).unwrap();
        assert_eq!(stats.doc_count, 12);
        assert_eq!(stats.num_terms, 3);
    }

    #[test]
    fn test_out_of_order_terms_rejected() {
        let mut directory = RAMDirectory::create();
        let mut writer = TermDictionaryWriter::new(&mut directory, "seg").unwrap();
        writer
            .start_field(Field(0), IndexOptions::DocsAndFreqs, false)
            .unwrap();
        writer.add_term(b"m", &term_info(2, 0)).unwrap();
        assert!(writer.add_term(b"a", &term_info(2, 10)).is_err());
    }
}
