/*!
Schema: the declaration of fields and how they are indexed.

The search core only needs to know, per field, which postings data was
recorded (the index options), whether payloads were kept, and the field
norms flag. Everything else about documents belongs to the embedder.
*/

mod index_options;
mod term;

pub use self::index_options::IndexOptions;
pub use self::term::Term;

/// Handle on a field defined in a schema.
#[derive(Debug, Clone, Copy, Ord, PartialOrd, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct Field(pub u32);

/// Declaration of one field.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct FieldEntry {
    name: String,
    index_options: IndexOptions,
    store_payloads: bool,
    has_norms: bool,
}

impl FieldEntry {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn index_options(&self) -> IndexOptions {
        self.index_options
    }

    pub fn store_payloads(&self) -> bool {
        self.store_payloads
    }

    pub fn has_norms(&self) -> bool {
        self.has_norms
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Schema {
    fields: Vec<FieldEntry>,
}

impl Schema {
    pub fn fields(&self) -> &[FieldEntry] {
        &self.fields
    }

    pub fn get_field_entry(&self, field: Field) -> &FieldEntry {
        &self.fields[field.0 as usize]
    }

    pub fn get_field(&self, field_name: &str) -> Option<Field> {
        self.fields
            .iter()
            .position(|entry| entry.name == field_name)
            .map(|ord| Field(ord as u32))
    }

    pub fn num_fields(&self) -> usize {
        self.fields.len()
    }

    /// Serializes the schema as JSON, the way it is persisted in the
    /// segment meta file.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).expect("schema serialization cannot fail")
    }

    pub fn from_json(json: &str) -> serde_json::Result<Schema> {
        serde_json::from_str(json)
    }
}

#[derive(Default)]
pub struct SchemaBuilder {
    fields: Vec<FieldEntry>,
}

impl SchemaBuilder {
    pub fn new() -> SchemaBuilder {
        SchemaBuilder::default()
    }

    /// Adds a text field indexed with the given options, with norms.
    pub fn add_text_field(&mut self, name: &str, index_options: IndexOptions) -> Field {
        self.add_field(FieldEntry {
            name: name.to_string(),
            index_options,
            store_payloads: false,
            has_norms: true,
        })
    }

    /// Adds a text field that also records per-position payloads.
    pub fn add_text_field_with_payloads(
        &mut self,
        name: &str,
        index_options: IndexOptions,
    ) -> Field {
        self.add_field(FieldEntry {
            name: name.to_string(),
            index_options,
            store_payloads: true,
            has_norms: true,
        })
    }

    pub fn add_field(&mut self, entry: FieldEntry) -> Field {
        let field = Field(self.fields.len() as u32);
        assert!(
            !self.fields.iter().any(|existing| existing.name == entry.name),
            "duplicate field name {:?}",
            entry.name
        );
        self.fields.push(entry);
        field
    }

    pub fn build(self) -> Schema {
        Schema { fields: self.fields }
    }
}

#[cfg(test)]
mod tests {
    use super::{IndexOptions, SchemaBuilder};

    #[test]
    fn test_schema_lookup() {
        let mut builder = SchemaBuilder::new();
        let title = builder.add_text_field("title", IndexOptions::DocsAndFreqs);
        let body = builder.add_text_field("body", IndexOptions::DocsFreqsAndPositions);
        let schema = builder.build();
        assert_eq!(schema.get_field("title"), Some(title));
        assert_eq!(schema.get_field("body"), Some(body));
        assert_eq!(schema.get_field("missing"), None);
        assert_eq!(schema.get_field_entry(body).name(), "body");
    }

    #[test]
    fn test_schema_json_round_trip() {
        let mut builder = SchemaBuilder::new();
        builder.add_text_field("body", IndexOptions::DocsFreqsPositionsAndOffsets);
        let schema = builder.build();
        let json = schema.to_json();
        let loaded = super::Schema::from_json(&json).unwrap();
        assert_eq!(loaded.fields(), schema.fields());
    }

    #[test]
    #[should_panic(expected = "duplicate field name")]
    fn test_duplicate_field_name_panics() {
        let mut builder = SchemaBuilder::new();
        builder.add_text_field("body", IndexOptions::DocsOnly);
        builder.add_text_field("body", IndexOptions::DocsOnly);
    }
}
