//! The small token filters: case folding, stop words, possessives.

use std::collections::HashSet;

use crate::analyzer::{Token, TokenStream};
use crate::Result;

/// Normalization hook of the standard chain. The 4.x grammar already
/// emits normalized tokens, so this is a pass-through kept for chain
/// shape compatibility.
pub struct StandardFilter<T: TokenStream> {
    tail: T,
}

impl<T: TokenStream> StandardFilter<T> {
    pub fn new(tail: T) -> StandardFilter<T> {
        StandardFilter { tail }
    }
}

impl<T: TokenStream> TokenStream for StandardFilter<T> {
    fn reset(&mut self) -> Result<()> {
        self.tail.reset()
    }

    fn increment_token(&mut self) -> Result<bool> {
        self.tail.increment_token()
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

/// Normalizes token text to lower case, codepoint by codepoint.
pub struct LowerCaseFilter<T: TokenStream> {
    tail: T,
}

impl<T: TokenStream> LowerCaseFilter<T> {
    pub fn new(tail: T) -> LowerCaseFilter<T> {
        LowerCaseFilter { tail }
    }
}

impl<T: TokenStream> TokenStream for LowerCaseFilter<T> {
    fn reset(&mut self) -> Result<()> {
        self.tail.reset()
    }

    fn increment_token(&mut self) -> Result<bool> {
        if !self.tail.increment_token()? {
            return Ok(false);
        }
        let token = self.tail.token_mut();
        if token.term.chars().any(char::is_uppercase) {
            token.term = token.term.chars().flat_map(char::to_lowercase).collect();
        }
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

/// Normalizes token text to UPPER CASE.
///
/// This transformation may lose information when one upper-case
/// character maps to several lower-case ones; prefer
/// [`LowerCaseFilter`] for general search matching.
pub struct UpperCaseFilter<T: TokenStream> {
    tail: T,
}

impl<T: TokenStream> UpperCaseFilter<T> {
    pub fn new(tail: T) -> UpperCaseFilter<T> {
        UpperCaseFilter { tail }
    }
}

impl<T: TokenStream> TokenStream for UpperCaseFilter<T> {
    fn reset(&mut self) -> Result<()> {
        self.tail.reset()
    }

    fn increment_token(&mut self) -> Result<bool> {
        if !self.tail.increment_token()? {
            return Ok(false);
        }
        let token = self.tail.token_mut();
        if token.term.chars().any(char::is_lowercase) {
            token.term = token.term.chars().flat_map(char::to_uppercase).collect();
        }
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

/// Removes tokens whose term is in the stop set, folding the removed
/// tokens' position increments into the next surviving token.
pub struct StopFilter<T: TokenStream> {
    tail: T,
    stop_words: HashSet<String>,
}

impl<T: TokenStream> StopFilter<T> {
    pub fn new(tail: T, stop_words: HashSet<String>) -> StopFilter<T> {
        StopFilter { tail, stop_words }
    }
}

impl<T: TokenStream> TokenStream for StopFilter<T> {
    fn reset(&mut self) -> Result<()> {
        self.tail.reset()
    }

    fn increment_token(&mut self) -> Result<bool> {
        let mut skipped_increment = 0u32;
        while self.tail.increment_token()? {
            let accept = !self.stop_words.contains(&self.tail.token().term);
            if accept {
                let token = self.tail.token_mut();
                token.position_increment += skipped_increment;
                return Ok(true);
            }
            skipped_increment += self.tail.token().position_increment;
        }
        Ok(false)
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

/// Strips trailing possessive markers: `'s`, `'S`, and the curly or
/// full-width apostrophe variants.
pub struct EnglishPossessiveFilter<T: TokenStream> {
    tail: T,
}

impl<T: TokenStream> EnglishPossessiveFilter<T> {
    pub fn new(tail: T) -> EnglishPossessiveFilter<T> {
        EnglishPossessiveFilter { tail }
    }
}

impl<T: TokenStream> TokenStream for EnglishPossessiveFilter<T> {
    fn reset(&mut self) -> Result<()> {
        self.tail.reset()
    }

    fn increment_token(&mut self) -> Result<bool> {
        if !self.tail.increment_token()? {
            return Ok(false);
        }
        let token = self.tail.token_mut();
        let mut chars = token.term.chars().rev();
        let last = chars.next();
        let second_last = chars.next();
        if matches!(last, Some('s') | Some('S'))
            && matches!(
                second_last,
                Some('\'') | Some('\u{2019}') | Some('\u{FF07}')
            )
        {
            let keep = token.term.chars().count() - 2;
            token.term = token.term.chars().take(keep).collect();
        }
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
    use super::{EnglishPossessiveFilter, LowerCaseFilter, StopFilter, UpperCaseFilter};
    use crate::analyzer::{collect_tokens, english_stop_words, StandardTokenizer};

    fn terms_of(tokens: Vec<crate::analyzer::Token>) -> Vec<String> {
        tokens.into_iter().map(|token| token.term).collect()
    }

    #[test]
    fn test_lowercase() {
        let mut stream = LowerCaseFilter::new(StandardTokenizer::new("Groß MiXeD"));
        assert_eq!(terms_of(collect_tokens(&mut stream)), vec!["groß", "mixed"]);
    }

    #[test]
    fn test_uppercase() {
        let mut stream = UpperCaseFilter::new(StandardTokenizer::new("straße one"));
        assert_eq!(terms_of(collect_tokens(&mut stream)), vec!["STRASSE", "ONE"]);
    }

    #[test]
    fn test_stop_filter_preserves_position_increments() {
        let tokenizer = StandardTokenizer::new("fox and the hound");
        let mut stream = StopFilter::new(LowerCaseFilter::new(tokenizer), english_stop_words());
        let tokens = collect_tokens(&mut stream);
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[0].term, "fox");
        assert_eq!(tokens[0].position_increment, 1);
        assert_eq!(tokens[1].term, "hound");
        // "and the" were dropped: hound is three positions after fox
        assert_eq!(tokens[1].position_increment, 3);
    }

    #[test]
    fn test_possessive_variants() {
        for text in ["fox's", "fox\u{2019}s", "fox\u{FF07}S"] {
            let mut stream = EnglishPossessiveFilter::new(StandardTokenizer::new(text));
            assert_eq!(terms_of(collect_tokens(&mut stream)), vec!["fox"], "{}", text);
        }
        let mut stream = EnglishPossessiveFilter::new(StandardTokenizer::new("class"));
        assert_eq!(terms_of(collect_tokens(&mut stream)), vec!["class"]);
    }
}
