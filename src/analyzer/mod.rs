/*!
Analysis pipeline: token streams and the filters that compose them.

A `TokenStream` lazily produces tokens by mutating a shared attribute
bundle ([`Token`]). Filters wrap an upstream stream and rewrite the
bundle between `increment_token` calls; a tokenizer sits at the head of
the chain and fills the bundle from raw text.
*/

mod attributes;
mod common_grams;
mod hunspell;
mod keyword_tokenizer;
mod porter_stemmer;
mod standard_tokenizer;
mod token_filters;
mod token_stream_chain;

pub use self::attributes::{Token, TokenState, TYPE_WORD};
pub use self::common_grams::{CommonGramsFilter, GRAM_TYPE};
pub use self::hunspell::{HunspellDictionary, HunspellStemFilter};
pub use self::keyword_tokenizer::KeywordTokenizer;
pub use self::porter_stemmer::{PorterStemFilter, PorterStemmer};
pub use self::standard_tokenizer::{StandardTokenizer, DEFAULT_MAX_TOKEN_LENGTH};
pub use self::token_filters::{
    EnglishPossessiveFilter, LowerCaseFilter, StandardFilter, StopFilter, UpperCaseFilter,
};
pub use self::token_stream_chain::TokenStreamChain;

use std::collections::HashSet;

use crate::Result;

/// A lazy, finite producer of tokens.
pub trait TokenStream {
    /// Rewinds the stream and clears all per-stream state, including
    /// any saved attribute states.
    fn reset(&mut self) -> Result<()>;

    /// Advances to the next token. Returns `false` once exhausted.
    fn increment_token(&mut self) -> Result<bool>;

    /// Publishes end-of-stream attributes: the final offset, and any
    /// trailing position increment from skipped tokens.
    fn end(&mut self) -> Result<()>;

    fn token(&self) -> &Token;

    fn token_mut(&mut self) -> &mut Token;
}

impl<'a> TokenStream for Box<dyn TokenStream + 'a> {
    fn reset(&mut self) -> Result<()> {
        (**self).reset()
    }

    fn increment_token(&mut self) -> Result<bool> {
        (**self).increment_token()
    }

    fn end(&mut self) -> Result<()> {
        (**self).end()
    }

    fn token(&self) -> &Token {
        (**self).token()
    }

    fn token_mut(&mut self) -> &mut Token {
        (**self).token_mut()
    }
}

/// Builds a token stream chain for one field value.
pub trait Analyzer: Send + Sync {
    fn token_stream<'a>(&self, text: &'a str) -> Box<dyn TokenStream + 'a>;
}

/// The common English stop words of the standard analyzer family.
pub fn english_stop_words() -> HashSet<String> {
    [
        "a", "an", "and", "are", "as", "at", "be", "but", "by", "for", "if", "in", "into", "is",
        "it", "no", "not", "of", "on", "or", "such", "that", "the", "their", "then", "there",
        "these", "they", "this", "to", "was", "will", "with",
    ]
    .iter()
    .map(|word| word.to_string())
    .collect()
}

/// Keyword analyzer: the entire input becomes one token.
#[derive(Default)]
pub struct KeywordAnalyzer;

impl Analyzer for KeywordAnalyzer {
    fn token_stream<'a>(&self, text: &'a str) -> Box<dyn TokenStream + 'a> {
        Box::new(KeywordTokenizer::new(text))
    }
}

/// Standard analyzer: Unicode word-break tokenizer, lowercasing, and
/// English stop-word removal.
pub struct StandardAnalyzer {
    stop_words: HashSet<String>,
}

impl Default for StandardAnalyzer {
    fn default() -> StandardAnalyzer {
        StandardAnalyzer {
            stop_words: english_stop_words(),
        }
    }
}

impl StandardAnalyzer {
    pub fn with_stop_words(stop_words: HashSet<String>) -> StandardAnalyzer {
        StandardAnalyzer { stop_words }
    }
}

impl Analyzer for StandardAnalyzer {
    fn token_stream<'a>(&self, text: &'a str) -> Box<dyn TokenStream + 'a> {
        let source = StandardTokenizer::new(text);
        let result = StandardFilter::new(source);
        let result = LowerCaseFilter::new(result);
        let result = StopFilter::new(result, self.stop_words.clone());
        Box::new(result)
    }
}

/// English analyzer: the standard chain plus possessive stripping and
/// Porter stemming.
pub struct EnglishAnalyzer {
    stop_words: HashSet<String>,
}

impl Default for EnglishAnalyzer {
    fn default() -> EnglishAnalyzer {
        EnglishAnalyzer {
            stop_words: english_stop_words(),
        }
    }
}

impl EnglishAnalyzer {
    pub fn with_stop_words(stop_words: HashSet<String>) -> EnglishAnalyzer {
        EnglishAnalyzer { stop_words }
    }
}

impl Analyzer for EnglishAnalyzer {
    fn token_stream<'a>(&self, text: &'a str) -> Box<dyn TokenStream + 'a> {
        let source = StandardTokenizer::new(text);
        let result = StandardFilter::new(source);
        let result = EnglishPossessiveFilter::new(result);
        let result = LowerCaseFilter::new(result);
        let result = StopFilter::new(result, self.stop_words.clone());
        let result = PorterStemFilter::new(result);
        Box::new(result)
    }
}

#[cfg(test)]
pub(crate) fn collect_tokens(stream: &mut dyn TokenStream) -> Vec<Token> {
    let mut tokens = Vec::new();
    stream.reset().unwrap();
    while stream.increment_token().unwrap() {
        tokens.push(stream.token().clone());
    }
    stream.end().unwrap();
    tokens
}

#[cfg(test)]
mod tests {
    use super::{collect_tokens, Analyzer, EnglishAnalyzer, KeywordAnalyzer, StandardAnalyzer};

    #[test]
    fn test_keyword_analyzer_single_token() {
        let analyzer = KeywordAnalyzer;
        let mut stream = analyzer.token_stream("Hello, World!");
        let tokens = collect_tokens(&mut *stream);
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].term, "Hello, World!");
    }

    #[test]
    fn test_standard_analyzer_drops_stop_words() {
        let analyzer = StandardAnalyzer::default();
        let mut stream = analyzer.token_stream("The Quick Brown Fox");
        let tokens = collect_tokens(&mut *stream);
        let terms: Vec<&str> = tokens.iter().map(|token| token.term.as_str()).collect();
        assert_eq!(terms, vec!["quick", "brown", "fox"]);
        // "The" was removed; "quick" carries its position gap.
        assert_eq!(tokens[0].position_increment, 2);
    }

    #[test]
    fn test_english_analyzer_stems() {
        let analyzer = EnglishAnalyzer::default();
        let mut stream = analyzer.token_stream("running dogs");
        let tokens = collect_tokens(&mut *stream);
        let terms: Vec<&str> = tokens.iter().map(|token| token.term.as_str()).collect();
        assert_eq!(terms, vec!["run", "dog"]);
    }

    #[test]
    fn test_english_analyzer_possessive() {
        let analyzer = EnglishAnalyzer::default();
        let mut stream = analyzer.token_stream("the dog's bone");
        let tokens = collect_tokens(&mut *stream);
        let terms: Vec<&str> = tokens.iter().map(|token| token.term.as_str()).collect();
        assert_eq!(terms, vec!["dog", "bone"]);
    }
}
