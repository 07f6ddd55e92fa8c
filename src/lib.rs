/*!

Tallyho is a full-text search engine library.

It ingests analyzed token streams, persists them as block-compressed
postings behind an FST term dictionary, and answers relevance-ranked
queries over that index.

A minimal round trip looks like this:

```rust
use tallyho::analyzer::EnglishAnalyzer;
use tallyho::indexer::IndexWriter;
use tallyho::query::TermQuery;
use tallyho::schema::{IndexOptions, SchemaBuilder};
use tallyho::Searcher;

# fn main() -> tallyho::Result<()> {
let mut schema_builder = SchemaBuilder::new();
let body = schema_builder.add_text_field("body", IndexOptions::DocsFreqsAndPositions);
let schema = schema_builder.build();

let mut writer = IndexWriter::new(schema, Box::new(EnglishAnalyzer::default()));
writer.add_document(&[(body, "the quick brown fox")])?;
writer.add_document(&[(body, "a lazy dog")])?;
let index = writer.commit()?;

let searcher = Searcher::new(&index)?;
let query = TermQuery::text(body, "fox");
let top_docs = searcher.search_top(&query, 10)?;
assert_eq!(top_docs.len(), 1);
# Ok(())
# }
```
*/

#![cfg_attr(test, allow(clippy::float_cmp))]

#[macro_use]
extern crate error_chain;
#[macro_use]
extern crate lazy_static;
#[macro_use]
extern crate log;
#[macro_use]
extern crate serde_derive;

#[macro_use]
mod macros;

mod error;

pub mod analyzer;
pub mod collector;
pub mod common;
pub mod core;
pub mod directory;
pub mod fst;
pub mod indexer;
pub mod packed;
pub mod postings;
pub mod query;
pub mod schema;
pub mod similarity;
pub mod termdict;

pub use crate::core::searcher::Searcher;
pub use crate::error::{Error, ErrorKind, Result};
pub use crate::postings::DocSet;

/// A document identifier, local to one segment.
///
/// Doc ids are assigned contiguously from 0. Before the first call to
/// `next_doc` an iterator reports `-1`; after exhaustion it reports
/// [`NO_MORE_DOCS`].
pub type DocId = i32;

/// Sentinel returned by doc iterators once they are exhausted.
pub const NO_MORE_DOCS: DocId = i32::MAX;

/// A score computed by a similarity for a `(query, document)` pair.
pub type Score = f32;

/// Hard ceiling on the number of clauses a rewritten boolean query
/// may carry.
pub const MAX_CLAUSE_COUNT: usize = 1024;
