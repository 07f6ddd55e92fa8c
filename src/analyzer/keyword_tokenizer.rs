use crate::analyzer::{Token, TokenStream};
use crate::Result;

/// Emits the entire input as a single token.
pub struct KeywordTokenizer<'a> {
    input: &'a str,
    done: bool,
    final_offset: usize,
    token: Token,
}

impl<'a> KeywordTokenizer<'a> {
    pub fn new(input: &'a str) -> KeywordTokenizer<'a> {
        KeywordTokenizer {
            input,
            done: false,
            final_offset: 0,
            token: Token::default(),
        }
    }
}

impl<'a> TokenStream for KeywordTokenizer<'a> {
    fn reset(&mut self) -> Result<()> {
        self.done = false;
        self.final_offset = 0;
        self.token.clear();
        Ok(())
    }

    fn increment_token(&mut self) -> Result<bool> {
        if self.done {
            return Ok(false);
        }
        self.done = true;
        self.token.clear();
        self.token.term.push_str(self.input);
        let total_len = self.input.chars().count();
        self.final_offset = total_len;
        self.token.offset_from = 0;
        self.token.offset_to = total_len;
        Ok(true)
    }

    fn end(&mut self) -> Result<()> {
        self.token.offset_from = self.final_offset;
        self.token.offset_to = self.final_offset;
        self.token.position_increment = 0;
        Ok(())
    }

    fn token(&self) -> &Token {
        &self.token
    }

    fn token_mut(&mut self) -> &mut Token {
        &mut self.token
    }
}

#[cfg(test)]
mod tests {
    use super::KeywordTokenizer;
    use crate::analyzer::collect_tokens;

    #[test]
    fn test_whole_input_is_one_token() {
        let mut tokenizer = KeywordTokenizer::new("left as-is, Случай");
        let tokens = collect_tokens(&mut tokenizer);
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].term, "left as-is, Случай");
        assert_eq!(tokens[0].offset_from, 0);
        assert_eq!(tokens[0].offset_to, "left as-is, Случай".chars().count());
    }

    #[test]
    fn test_empty_input_yields_one_empty_token() {
        let mut tokenizer = KeywordTokenizer::new("");
        let tokens = collect_tokens(&mut tokenizer);
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].term, "");
    }
}
