//! Common-grams filter: pairs frequent words with their neighbors.
//!
//! For a stream `the quick fox` with `the` common, the filter emits
//! `the`, `the_quick` (position increment 0, spanning two positions),
//! `quick`, `fox`. Queries over very frequent words can then match the
//! bigram instead of the huge unigram posting list.

use std::collections::HashSet;

use crate::analyzer::{Token, TokenState, TokenStream};
use crate::Result;

pub const GRAM_TYPE: &str = "gram";
const SEPARATOR: char = '_';

pub struct CommonGramsFilter<T: TokenStream> {
    tail: T,
    common_words: HashSet<String>,
    /// Previous term plus separator, waiting for its right neighbor.
    buffer: String,
    last_start_offset: usize,
    last_was_common: bool,
    saved_state: Option<TokenState>,
}

impl<T: TokenStream> CommonGramsFilter<T> {
    pub fn new(tail: T, common_words: HashSet<String>) -> CommonGramsFilter<T> {
        CommonGramsFilter {
            tail,
            common_words,
            buffer: String::new(),
            last_start_offset: 0,
            last_was_common: false,
            saved_state: None,
        }
    }

    fn is_common(&self) -> bool {
        self.common_words.contains(&self.tail.token().term)
    }

    fn save_term_buffer(&mut self) {
        self.buffer.clear();
        self.buffer.push_str(&self.tail.token().term);
        self.buffer.push(SEPARATOR);
        self.last_start_offset = self.tail.token().offset_from;
        self.last_was_common = self.is_common();
    }

    /// Rewrites the current token into the bigram `previous_current`.
    fn gram_token(&mut self) {
        self.buffer.push_str(&self.tail.token().term);
        let end_offset = self.tail.token().offset_to;
        let start_offset = self.last_start_offset;
        let term = self.buffer.clone();
        let token = self.tail.token_mut();
        token.clear();
        token.term.push_str(&term);
        token.position_increment = 0;
        token.position_length = 2;
        token.offset_from = start_offset;
        token.offset_to = end_offset;
        token.token_type = GRAM_TYPE;
        self.buffer.clear();
    }
}

impl<T: TokenStream> TokenStream for CommonGramsFilter<T> {
    fn reset(&mut self) -> Result<()> {
        self.last_was_common = false;
        self.saved_state = None;
        self.buffer.clear();
        self.tail.reset()
    }

    fn increment_token(&mut self) -> Result<bool> {
        match self.saved_state.take() {
            Some(state) => {
                self.tail.token_mut().restore_state(&state);
                self.save_term_buffer();
                return Ok(true);
            }
            None => {
                if !self.tail.increment_token()? {
                    return Ok(false);
                }
            }
        }

        // grams form before and after common words; an empty buffer
        // means there was nothing to the left of this one
        if self.last_was_common || (self.is_common() && !self.buffer.is_empty()) {
            self.saved_state = Some(self.tail.token().capture_state());
            self.gram_token();
            return Ok(true);
        }

        self.save_term_buffer();
        Ok(true)
    }

    fn end(&mut self) -> Result<()> {
        self.tail.end()
    }

    fn token(&self) -> &Token {
        self.tail.token()
    }

    fn token_mut(&mut self) -> &mut Token {
        self.tail.token_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::{CommonGramsFilter, GRAM_TYPE};
    use crate::analyzer::{collect_tokens, LowerCaseFilter, StandardTokenizer, Token};
    use std::collections::HashSet;

    fn common() -> HashSet<String> {
        ["the", "of"].iter().map(|word| word.to_string()).collect()
    }

    fn run(text: &str) -> Vec<Token> {
        let tokenizer = LowerCaseFilter::new(StandardTokenizer::new(text));
        let mut stream = CommonGramsFilter::new(tokenizer, common());
        collect_tokens(&mut stream)
    }

    #[test]
    fn test_bigrams_around_common_word() {
        let tokens = run("the quick fox");
        let terms: Vec<&str> = tokens.iter().map(|token| token.term.as_str()).collect();
        assert_eq!(terms, vec!["the", "the_quick", "quick", "fox"]);

        // the bigram shares quick's position start
        assert_eq!(tokens[1].position_increment, 0);
        assert_eq!(tokens[1].position_length, 2);
        assert_eq!(tokens[1].token_type, GRAM_TYPE);
        assert_eq!(tokens[2].position_increment, 1);
    }

    #[test]
    fn test_gram_offsets_span_both_words() {
        let tokens = run("the quick fox");
        let gram = &tokens[1];
        assert_eq!(gram.offset_from, 0);
        assert_eq!(gram.offset_to, 9);
    }

    #[test]
    fn test_common_word_in_the_middle() {
        let tokens = run("hammer of light");
        let terms: Vec<&str> = tokens.iter().map(|token| token.term.as_str()).collect();
        assert_eq!(
            terms,
            vec!["hammer", "hammer_of", "of", "of_light", "light"]
        );
    }

    #[test]
    fn test_no_common_words_passes_through() {
        let tokens = run("quick brown fox");
        let terms: Vec<&str> = tokens.iter().map(|token| token.term.as_str()).collect();
        assert_eq!(terms, vec!["quick", "brown", "fox"]);
    }
}
