//! Per-token attribute state threaded through an analysis chain.
//!
//! One `Token` instance lives in the tokenizer at the head of the chain
//! and every filter downstream mutates it in place. Filters that defer
//! emission snapshot the whole bundle with `capture_state` and bring it
//! back with `restore_state`.

/// Default token type label.
pub const TYPE_WORD: &str = "word";

/// Attribute bundle: term text, offsets, position increment/length,
/// type label, and the keyword flag protecting a token from stemmers.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    /// Term text. Filters edit it in place.
    pub term: String,
    /// Source offset of the first character of the token.
    pub offset_from: usize,
    /// Source offset one past the last character of the token.
    pub offset_to: usize,
    /// 0 means "same position as the previous token".
    pub position_increment: u32,
    /// How many positions the token spans; 1 for ordinary tokens.
    pub position_length: u32,
    /// Short label such as `<ALPHANUM>` or `gram`.
    pub token_type: &'static str,
    /// When set, stemming filters pass the token through unchanged.
    pub keyword: bool,
}

impl Default for Token {
    fn default() -> Token {
        Token {
            term: String::new(),
            offset_from: 0,
            offset_to: 0,
            position_increment: 1,
            position_length: 1,
            token_type: TYPE_WORD,
            keyword: false,
        }
    }
}

impl Token {
    /// Resets every attribute to its default, keeping the term buffer's
    /// allocation.
    pub fn clear(&mut self) {
        self.term.clear();
        self.offset_from = 0;
        self.offset_to = 0;
        self.position_increment = 1;
        self.position_length = 1;
        self.token_type = TYPE_WORD;
        self.keyword = false;
    }

    /// Deep snapshot that survives later mutation of the live token.
    pub fn capture_state(&self) -> TokenState {
        TokenState(self.clone())
    }

    pub fn restore_state(&mut self, state: &TokenState) {
        self.clone_from(&state.0);
    }

    /// Number of characters in the term.
    pub fn term_len(&self) -> usize {
        self.term.chars().count()
    }
}

/// Opaque snapshot of a [`Token`].
#[derive(Debug, Clone)]
pub struct TokenState(Token);

#[cfg(test)]
mod tests {
    use super::Token;

    #[test]
    fn test_capture_restore() {
        let mut token = Token::default();
        token.term.push_str("quick");
        token.offset_from = 4;
        token.offset_to = 9;
        token.position_increment = 2;
        let saved = token.capture_state();

        token.clear();
        token.term.push_str("brown");
        assert_eq!(token.position_increment, 1);

        token.restore_state(&saved);
        assert_eq!(token.term, "quick");
        assert_eq!(token.offset_from, 4);
        assert_eq!(token.offset_to, 9);
        assert_eq!(token.position_increment, 2);
    }

    #[test]
    fn test_clear_resets_defaults() {
        let mut token = Token {
            term: "x".to_string(),
            offset_from: 1,
            offset_to: 2,
            position_increment: 0,
            position_length: 3,
            token_type: "gram",
            keyword: true,
        };
        token.clear();
        assert_eq!(token, Token::default());
    }
}
