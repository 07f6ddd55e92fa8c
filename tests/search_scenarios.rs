//! End-to-end search scenarios over an in-memory index.

use std::sync::Arc;

use tallyho::analyzer::{Analyzer, EnglishAnalyzer, StandardAnalyzer};
use tallyho::collector::CountCollector;
use tallyho::core::Index;
use tallyho::indexer::IndexWriter;
use tallyho::query::{BooleanQuery, Occur, PhraseQuery, Query, Scorer, TermQuery, Weight};
use tallyho::schema::{Field, IndexOptions, SchemaBuilder, Term};
use tallyho::similarity::Bm25Similarity;
use tallyho::{DocSet, Searcher, NO_MORE_DOCS};

fn build_index(docs: &[&str], analyzer: Box<dyn Analyzer>) -> (Index, Field) {
    let mut schema_builder = SchemaBuilder::new();
    let body = schema_builder.add_text_field("body", IndexOptions::DocsFreqsAndPositions);
    let schema = schema_builder.build();
    let mut writer = IndexWriter::new(schema, analyzer);
    for doc in docs {
        writer.add_document(&[(body, doc)]).unwrap();
    }
    (writer.commit().unwrap(), body)
}

#[test]
fn test_empty_boolean_query_on_empty_index() {
    // an empty query over an empty index is not an error
    let (index, _body) = build_index(&[], Box::new(StandardAnalyzer::default()));
    let searcher = Searcher::new(&index).unwrap();
    let query = BooleanQuery::new();
    let hits = searcher.search_top(&query, 10).unwrap();
    assert!(hits.is_empty());
}

#[test]
fn test_term_query_matches_both_docs() {
    let (index, body) = build_index(
        &["this is a test", "another test entirely"],
        Box::new(StandardAnalyzer::default()),
    );
    let searcher = Searcher::new(&index).unwrap();
    let query = TermQuery::text(body, "test");
    let hits = searcher.search_top(&query, 10).unwrap();
    assert_eq!(hits.len(), 2);
    let mut docs: Vec<i32> = hits.iter().map(|hit| hit.doc).collect();
    docs.sort_unstable();
    assert_eq!(docs, vec![0, 1]);
    assert!(hits.iter().all(|hit| hit.score > 0.0));
}

#[test]
fn test_boolean_must_is_conjunction() {
    let (index, body) = build_index(
        &["alpha beta", "alpha", "beta"],
        Box::new(StandardAnalyzer::default()),
    );
    let searcher = Searcher::new(&index).unwrap();
    let mut query = BooleanQuery::new();
    query
        .add(Box::new(TermQuery::text(body, "alpha")), Occur::Must)
        .unwrap();
    query
        .add(Box::new(TermQuery::text(body, "beta")), Occur::Must)
        .unwrap();
    let hits = searcher.search_top(&query, 10).unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].doc, 0);
}

#[test]
fn test_boolean_should_is_disjunction_with_coord() {
    let (index, body) = build_index(
        &["alpha beta", "alpha", "beta"],
        Box::new(StandardAnalyzer::default()),
    );
    let searcher = Searcher::new(&index).unwrap();
    let mut query = BooleanQuery::new();
    query
        .add(Box::new(TermQuery::text(body, "alpha")), Occur::Should)
        .unwrap();
    query
        .add(Box::new(TermQuery::text(body, "beta")), Occur::Should)
        .unwrap();
    let hits = searcher.search_top(&query, 10).unwrap();
    assert_eq!(hits.len(), 3);
    // the doc matching both clauses wins on coord
    assert_eq!(hits[0].doc, 0);
    assert!(hits[0].score > hits[1].score);
    // the single-clause docs tie
    assert!((hits[1].score - hits[2].score).abs() < 1e-6);
}

#[test]
fn test_boolean_must_not_excludes() {
    let (index, body) = build_index(
        &["alpha beta", "alpha", "beta"],
        Box::new(StandardAnalyzer::default()),
    );
    let searcher = Searcher::new(&index).unwrap();
    let mut query = BooleanQuery::new();
    query
        .add(Box::new(TermQuery::text(body, "alpha")), Occur::Must)
        .unwrap();
    query
        .add(Box::new(TermQuery::text(body, "beta")), Occur::MustNot)
        .unwrap();
    let hits = searcher.search_top(&query, 10).unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].doc, 1);
}

#[test]
fn test_minimum_should_match() {
    let (index, body) = build_index(
        &["x y z", "x y", "x", "y z"],
        Box::new(StandardAnalyzer::default()),
    );
    let searcher = Searcher::new(&index).unwrap();
    let mut query = BooleanQuery::new();
    for text in ["x", "y", "z"] {
        query
            .add(Box::new(TermQuery::text(body, text)), Occur::Should)
            .unwrap();
    }
    query.set_minimum_number_should_match(2);
    let hits = searcher.search_top(&query, 10).unwrap();
    let mut docs: Vec<i32> = hits.iter().map(|hit| hit.doc).collect();
    docs.sort_unstable();
    assert_eq!(docs, vec![0, 1, 3]);
}

#[test]
fn test_exact_phrase() {
    let (index, body) = build_index(
        &["the quick brown fox"],
        Box::new(StandardAnalyzer::default()),
    );
    let searcher = Searcher::new(&index).unwrap();

    let query = PhraseQuery::from_texts(body, &["quick", "brown"]);
    let hits = searcher.search_top(&query, 10).unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].doc, 0);

    // phrase frequency is the number of occurrences
    let weight = searcher.create_normalized_weight(&query).unwrap();
    let reader = &searcher.segment_readers()[0];
    let mut scorer = weight.scorer(reader, None).unwrap().unwrap();
    assert_eq!(scorer.next_doc().unwrap(), 0);
    assert_eq!(scorer.freq().unwrap(), 1);

    let reversed = PhraseQuery::from_texts(body, &["brown", "quick"]);
    let hits = searcher.search_top(&reversed, 10).unwrap();
    assert!(hits.is_empty());
}

#[test]
fn test_phrase_counts_repeated_occurrences() {
    let (index, body) = build_index(
        &["row row row your boat row row"],
        Box::new(StandardAnalyzer::default()),
    );
    let searcher = Searcher::new(&index).unwrap();
    let query = PhraseQuery::from_texts(body, &["row", "row"]);
    let weight = searcher.create_normalized_weight(&query).unwrap();
    let reader = &searcher.segment_readers()[0];
    let mut scorer = weight.scorer(reader, None).unwrap().unwrap();
    assert_eq!(scorer.next_doc().unwrap(), 0);
    // "row row" occurs at 0-1, 1-2, and 5-6
    assert_eq!(scorer.freq().unwrap(), 3);
}

#[test]
fn test_english_analyzer_stemmed_match() {
    let (index, body) = build_index(&["running dogs"], Box::new(EnglishAnalyzer::default()));
    let searcher = Searcher::new(&index).unwrap();
    let hits = searcher
        .search_top(&TermQuery::text(body, "run"), 10)
        .unwrap();
    assert_eq!(hits.len(), 1);
}

#[test]
fn test_postings_skip_advance() {
    let docs: Vec<String> = (0..10_000).map(|_| "x".to_string()).collect();
    let doc_refs: Vec<&str> = docs.iter().map(String::as_str).collect();
    let (index, body) = build_index(&doc_refs, Box::new(StandardAnalyzer::default()));
    let searcher = Searcher::new(&index).unwrap();
    let query = TermQuery::text(body, "x");
    let weight = searcher.create_normalized_weight(&query).unwrap();
    let reader = &searcher.segment_readers()[0];
    let mut scorer = weight.scorer(reader, None).unwrap().unwrap();
    assert_eq!(scorer.advance(9_999).unwrap(), 9_999);
    assert_eq!(scorer.next_doc().unwrap(), NO_MORE_DOCS);
}

#[test]
fn test_bm25_prefers_shorter_doc() {
    let mut schema_builder = SchemaBuilder::new();
    let body = schema_builder.add_text_field("body", IndexOptions::DocsFreqsAndPositions);
    let schema = schema_builder.build();
    let mut writer = IndexWriter::new(schema, Box::new(StandardAnalyzer::default()));
    writer.set_similarity(Arc::new(Bm25Similarity::default()));

    let mut short_doc = String::from("x");
    for i in 0..9 {
        short_doc.push_str(&format!(" f{}", i));
    }
    let mut long_doc = String::from("x");
    for i in 0..999 {
        long_doc.push_str(&format!(" g{}", i));
    }
    writer.add_document(&[(body, short_doc.as_str())]).unwrap();
    writer.add_document(&[(body, long_doc.as_str())]).unwrap();
    let index = writer.commit().unwrap();

    let searcher =
        Searcher::with_similarity(&index, Arc::new(Bm25Similarity::default())).unwrap();
    let hits = searcher
        .search_top(&TermQuery::text(body, "x"), 10)
        .unwrap();
    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0].doc, 0, "the short doc must rank first");
    assert!(hits[0].score > hits[1].score);
}

#[test]
fn test_phrase_on_field_without_positions_is_an_error() {
    let mut schema_builder = SchemaBuilder::new();
    let body = schema_builder.add_text_field("body", IndexOptions::DocsAndFreqs);
    let schema = schema_builder.build();
    let mut writer = IndexWriter::new(schema, Box::new(StandardAnalyzer::default()));
    writer.add_document(&[(body, "quick brown fox")]).unwrap();
    let index = writer.commit().unwrap();
    let searcher = Searcher::new(&index).unwrap();

    let query = PhraseQuery::from_texts(body, &["quick", "brown"]);
    let err = searcher.search_top(&query, 10).unwrap_err();
    assert!(
        err.to_string().contains("body"),
        "the error must name the field: {}",
        err
    );
}

#[test]
fn test_missing_term_yields_empty_results_not_error() {
    let (index, body) = build_index(&["some words"], Box::new(StandardAnalyzer::default()));
    let searcher = Searcher::new(&index).unwrap();
    let hits = searcher
        .search_top(&TermQuery::text(body, "absent"), 10)
        .unwrap();
    assert!(hits.is_empty());

    // a phrase with one absent term matches nothing either
    let query = PhraseQuery::from_texts(body, &["some", "absent"]);
    let hits = searcher.search_top(&query, 10).unwrap();
    assert!(hits.is_empty());
}

#[test]
fn test_single_clause_boolean_rewrites_to_clause() {
    let (index, body) = build_index(&["lone term"], Box::new(StandardAnalyzer::default()));
    let searcher = Searcher::new(&index).unwrap();
    let mut query = BooleanQuery::new();
    query
        .add(Box::new(TermQuery::text(body, "term")), Occur::Should)
        .unwrap();
    let rewritten = searcher.rewrite(&query).unwrap();
    assert!(rewritten.as_any().downcast_ref::<TermQuery>().is_some());
}

#[test]
fn test_single_term_phrase_rewrites_to_term_query() {
    let (index, body) = build_index(&["lone term"], Box::new(StandardAnalyzer::default()));
    let searcher = Searcher::new(&index).unwrap();
    let query = PhraseQuery::from_texts(body, &["term"]);
    let rewritten = searcher.rewrite(&query).unwrap();
    assert!(rewritten.as_any().downcast_ref::<TermQuery>().is_some());
}

#[test]
fn test_explain_matches_search_score() {
    let (index, body) = build_index(
        &["grey whale", "whale of a time", "nothing here"],
        Box::new(StandardAnalyzer::default()),
    );
    let searcher = Searcher::new(&index).unwrap();
    let query = TermQuery::text(body, "whale");
    let hits = searcher.search_top(&query, 10).unwrap();
    for hit in hits {
        let explanation = searcher.explain(&query, hit.doc).unwrap();
        assert!(
            (explanation.value() - hit.score).abs() < 1e-5,
            "explain disagrees with search for doc {}: {} vs {}",
            hit.doc,
            explanation.value(),
            hit.score
        );
    }
    let miss = searcher.explain(&query, 2).unwrap();
    assert!(!miss.is_match());
}

#[test]
fn test_count_collector() {
    let (index, body) = build_index(
        &["a b", "b c", "c d"],
        Box::new(StandardAnalyzer::default()),
    );
    let searcher = Searcher::new(&index).unwrap();
    let mut collector = CountCollector::default();
    searcher
        .search(&TermQuery::text(body, "c"), &mut collector)
        .unwrap();
    assert_eq!(collector.count(), 2);
}

#[test]
fn test_term_query_respects_field_boundaries() {
    let mut schema_builder = SchemaBuilder::new();
    let title = schema_builder.add_text_field("title", IndexOptions::DocsFreqsAndPositions);
    let body = schema_builder.add_text_field("body", IndexOptions::DocsFreqsAndPositions);
    let schema = schema_builder.build();
    let mut writer = IndexWriter::new(schema, Box::new(StandardAnalyzer::default()));
    writer
        .add_document(&[(title, "shared word"), (body, "other text")])
        .unwrap();
    writer
        .add_document(&[(title, "different"), (body, "shared word")])
        .unwrap();
    let index = writer.commit().unwrap();
    let searcher = Searcher::new(&index).unwrap();

    let hits = searcher
        .search_top(&TermQuery::new(Term::from_field_text(title, "shared")), 10)
        .unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].doc, 0);
}

#[test]
fn test_deleted_docs_are_skipped() {
    use bit_set::BitSet;
    use tallyho::core::segment_reader::write_live_docs;

    let mut schema_builder = SchemaBuilder::new();
    let body = schema_builder.add_text_field("body", IndexOptions::DocsFreqsAndPositions);
    let schema = schema_builder.build();
    let mut writer = IndexWriter::new(schema, Box::new(StandardAnalyzer::default()));
    for _ in 0..4 {
        writer.add_document(&[(body, "shared")]).unwrap();
    }
    let mut index = writer.commit().unwrap();

    // mark doc 1 and 2 deleted
    let mut alive = BitSet::new();
    alive.insert(0);
    alive.insert(3);
    write_live_docs(index.directory_mut(), "seg0", &alive, 4).unwrap();

    let searcher = Searcher::new(&index).unwrap();
    let hits = searcher
        .search_top(&TermQuery::text(body, "shared"), 10)
        .unwrap();
    let mut docs: Vec<i32> = hits.iter().map(|hit| hit.doc).collect();
    docs.sort_unstable();
    assert_eq!(docs, vec![0, 3]);
}
