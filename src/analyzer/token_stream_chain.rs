use crate::analyzer::{Token, TokenStream};
use crate::Result;

/// We do not want phrase queries to accidentally match over two field
/// values because the first one was ending by the beginning of the
/// phrase while the second one was starting by the end of the phrase.
///
/// In order to address this behavior, we do add a position gap between
/// the two values.
const POSITION_GAP: u32 = 2;

/// `TokenStreamChain` is the result of the concatenation of a list of
/// token streams, one per value of a multi-valued field.
pub struct TokenStreamChain<T: TokenStream> {
    offsets: Vec<usize>,
    token_streams: Vec<T>,
    stream_idx: usize,
    position_shift: u32,
    last_position: u32,
    token: Token,
}

impl<T: TokenStream> TokenStreamChain<T> {
    /// Creates a new chained token stream.
    ///
    /// `offsets` shifts the character offsets of each sub-stream by the
    /// start of its value in the concatenated source.
    pub fn new(offsets: Vec<usize>, token_streams: Vec<T>) -> TokenStreamChain<T> {
        assert_eq!(offsets.len(), token_streams.len());
        TokenStreamChain {
            offsets,
            token_streams,
            stream_idx: 0,
            position_shift: 0,
            last_position: 0,
            token: Token::default(),
        }
    }
}

impl<T: TokenStream> TokenStream for TokenStreamChain<T> {
    fn reset(&mut self) -> Result<()> {
        self.stream_idx = 0;
        self.position_shift = 0;
        self.last_position = 0;
        self.token.clear();
        for stream in &mut self.token_streams {
            stream.reset()?;
        }
        Ok(())
    }

    fn increment_token(&mut self) -> Result<bool> {
        while self.stream_idx < self.token_streams.len() {
            let stream = &mut self.token_streams[self.stream_idx];
            if stream.increment_token()? {
                let offset_offset = self.offsets[self.stream_idx];
                let upstream = stream.token();
                self.token.clone_from(upstream);
                self.token.offset_from = upstream.offset_from + offset_offset;
                self.token.offset_to = upstream.offset_to + offset_offset;
                self.token.position_increment = upstream.position_increment + self.position_shift;
                self.last_position += self.token.position_increment;
                self.position_shift = 0;
                return Ok(true);
            }
            stream.end()?;
            self.stream_idx += 1;
            self.position_shift += POSITION_GAP;
        }
        Ok(false)
    }

    fn end(&mut self) -> Result<()> {
        if let Some(last_offset) = self
            .offsets
            .last()
            .zip(self.token_streams.last().map(|stream| stream.token().offset_to))
            .map(|(offset, end)| offset + end)
        {
            self.token.offset_from = last_offset;
            self.token.offset_to = last_offset;
        }
        Ok(())
    }

    fn token(&self) -> &Token {
        assert!(
            self.stream_idx <= self.token_streams.len(),
            "token() called after the end of the token stream"
        );
        &self.token
    }

    fn token_mut(&mut self) -> &mut Token {
        &mut self.token
    }
}

#[cfg(test)]
mod tests {
    use super::TokenStreamChain;
    use crate::analyzer::{collect_tokens, StandardTokenizer};

    #[test]
    fn test_chain_shifts_positions_and_offsets() {
        let first = StandardTokenizer::new("alpha beta");
        let second = StandardTokenizer::new("gamma");
        let mut chain = TokenStreamChain::new(vec![0, 11], vec![first, second]);
        let tokens = collect_tokens(&mut chain);
        let terms: Vec<&str> = tokens.iter().map(|token| token.term.as_str()).collect();
        assert_eq!(terms, vec!["alpha", "beta", "gamma"]);
        // gamma is separated from beta by the position gap
        assert_eq!(tokens[2].position_increment, 1 + 2);
        assert_eq!(tokens[2].offset_from, 11);
        assert_eq!(tokens[2].offset_to, 16);
    }

    #[test]
    fn test_chain_with_empty_middle_stream() {
        let first = StandardTokenizer::new("one");
        let second = StandardTokenizer::new("");
        let third = StandardTokenizer::new("two");
        let mut chain = TokenStreamChain::new(vec![0, 4, 5], vec![first, second, third]);
        let tokens = collect_tokens(&mut chain);
        let terms: Vec<&str> = tokens.iter().map(|token| token.term.as_str()).collect();
        assert_eq!(terms, vec!["one", "two"]);
        assert_eq!(tokens[1].position_increment, 1 + 4);
    }
}
