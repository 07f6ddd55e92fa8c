//! Grammar-driven Unicode word-break tokenizer.
//!
//! A deterministic automaton over a packed character-class map
//! implements the Word Break rules of Unicode Text Segmentation
//! (UAX #29), restricted to the token types the standard grammar
//! emits: alphanumeric runs (with medial apostrophes/dots), numbers,
//! Southeast-Asian and Korean runs, Katakana runs, and one-codepoint
//! Ideographic/Hiragana tokens.

use crate::analyzer::{Token, TokenStream};
use crate::Result;

pub const DEFAULT_MAX_TOKEN_LENGTH: usize = 255;

pub const TYPE_ALPHANUM: &str = "<ALPHANUM>";
pub const TYPE_NUM: &str = "<NUM>";
pub const TYPE_SOUTHEAST_ASIAN: &str = "<SOUTHEAST_ASIAN>";
pub const TYPE_IDEOGRAPHIC: &str = "<IDEOGRAPHIC>";
pub const TYPE_HIRAGANA: &str = "<HIRAGANA>";
pub const TYPE_KATAKANA: &str = "<KATAKANA>";
pub const TYPE_HANGUL: &str = "<HANGUL>";

/// Character classes of the word-break alphabet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(usize)]
enum CharClass {
    Letter = 0,
    Digit = 1,
    MidLetter = 2,
    MidNum = 3,
    MidNumLet = 4,
    ExtendNumLet = 5,
    Extend = 6,
    SoutheastAsian = 7,
    Ideographic = 8,
    Hiragana = 9,
    Katakana = 10,
    Hangul = 11,
    Other = 12,
}

const NUM_CLASSES: usize = 13;

/// Packed codepoint → class map. Ranges cover the scripts the grammar
/// distinguishes; everything alphabetic falls back to `Letter` and
/// everything else to `Other`.
fn char_class(c: char) -> CharClass {
    match c {
        '\u{0E00}'..='\u{0E7F}' // Thai
        | '\u{0E80}'..='\u{0EFF}' // Lao
        | '\u{1000}'..='\u{109F}' // Myanmar
        | '\u{1780}'..='\u{17FF}' => CharClass::SoutheastAsian, // Khmer
        '\u{3040}'..='\u{309F}' => CharClass::Hiragana,
        '\u{30A0}'..='\u{30FF}' | '\u{31F0}'..='\u{31FF}' => CharClass::Katakana,
        '\u{1100}'..='\u{11FF}' | '\u{3130}'..='\u{318F}' | '\u{AC00}'..='\u{D7AF}' => {
            CharClass::Hangul
        }
        '\u{2E80}'..='\u{2EFF}'
        | '\u{3400}'..='\u{4DBF}'
        | '\u{4E00}'..='\u{9FFF}'
        | '\u{F900}'..='\u{FAFF}' => CharClass::Ideographic,
        '\'' | '\u{2019}' | '\u{FF07}' | '\u{02BC}' | '\u{00B7}' | '\u{05F4}' | ':' => {
            CharClass::MidLetter
        }
        ',' | ';' | '\u{FF0C}' | '\u{FF1B}' => CharClass::MidNum,
        '.' | '\u{2024}' | '\u{FE52}' | '\u{FF0E}' => CharClass::MidNumLet,
        '_' | '\u{203F}' | '\u{2040}' | '\u{FF3F}' => CharClass::ExtendNumLet,
        '\u{0300}'..='\u{036F}'
        | '\u{1AB0}'..='\u{1AFF}'
        | '\u{1DC0}'..='\u{1DFF}'
        | '\u{20D0}'..='\u{20FF}'
        | '\u{FE20}'..='\u{FE2F}'
        | '\u{200D}' => CharClass::Extend,
        _ if c.is_numeric() => CharClass::Digit,
        _ if c.is_alphabetic() => CharClass::Letter,
        _ => CharClass::Other,
    }
}

/// Scanner states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(usize)]
enum State {
    Start = 0,
    Word = 1,
    WordMid = 2,
    Num = 3,
    NumMid = 4,
    SoutheastAsian = 5,
    Katakana = 6,
    Hangul = 7,
}

const NUM_STATES: usize = 8;

/// Pseudo-state codes used in the transition table.
const EMIT: u8 = 0xFF; // end the current token, re-scan this char
const EMIT_DROP_MID: u8 = 0xFE; // end the token before the pending medial char
const SINGLE: u8 = 0xFD; // emit this char alone (ideographic / hiragana)
const SKIP: u8 = 0xFC; // not part of any token

/// Transition table, `TRANSITIONS[state][class]`. Values < NUM_STATES
/// are targets; the rest are the pseudo-states above.
#[rustfmt::skip]
const TRANSITIONS: [[u8; NUM_CLASSES]; NUM_STATES] = [
    //          Let   Dig   MidL  MidN  MidNL ExtNL Ext   SEA   Ideo  Hira  Kata  Hang  Other
    /* Start */ [1,    3,    SKIP, SKIP, SKIP, SKIP, SKIP, 5,    SINGLE, SINGLE, 6, 7,  SKIP],
    /* Word  */ [1,    1,    2,    EMIT, 2,    1,    1,    EMIT, EMIT, EMIT, EMIT, EMIT, EMIT],
    /* WordM */ [1,    EMIT_DROP_MID, EMIT_DROP_MID, EMIT_DROP_MID, EMIT_DROP_MID, EMIT_DROP_MID, EMIT_DROP_MID, EMIT_DROP_MID, EMIT_DROP_MID, EMIT_DROP_MID, EMIT_DROP_MID, EMIT_DROP_MID, EMIT_DROP_MID],
    /* Num   */ [1,    3,    EMIT, 4,    4,    3,    3,    EMIT, EMIT, EMIT, EMIT, EMIT, EMIT],
    /* NumM  */ [EMIT_DROP_MID, 3, EMIT_DROP_MID, EMIT_DROP_MID, EMIT_DROP_MID, EMIT_DROP_MID, EMIT_DROP_MID, EMIT_DROP_MID, EMIT_DROP_MID, EMIT_DROP_MID, EMIT_DROP_MID, EMIT_DROP_MID, EMIT_DROP_MID],
    /* SEA   */ [EMIT, EMIT, EMIT, EMIT, EMIT, EMIT, 5,    5,    EMIT, EMIT, EMIT, EMIT, EMIT],
    /* Kata  */ [EMIT, EMIT, EMIT, EMIT, EMIT, EMIT, 6,    EMIT, EMIT, EMIT, 6,    EMIT, EMIT],
    /* Hang  */ [EMIT, EMIT, EMIT, EMIT, EMIT, EMIT, 7,    EMIT, EMIT, EMIT, EMIT, 7,   EMIT],
];

/// Accept table: the token type a run ending in each state produces.
/// `None` marks states that cannot end a token on their own.
const ACCEPTS: [Option<&str>; NUM_STATES] = [
    None,
    Some(TYPE_ALPHANUM),
    Some(TYPE_ALPHANUM), // emitted via EMIT_DROP_MID, minus the medial char
    Some(TYPE_NUM),
    Some(TYPE_NUM),
    Some(TYPE_SOUTHEAST_ASIAN),
    Some(TYPE_KATAKANA),
    Some(TYPE_HANGUL),
];

struct ScannedToken {
    /// Char index of the first character.
    start: usize,
    /// Char index one past the last character.
    end: usize,
    token_type: &'static str,
}

pub struct StandardTokenizer {
    chars: Vec<char>,
    pos: usize,
    max_token_length: usize,
    skipped_positions: u32,
    final_offset: usize,
    token: Token,
}

impl StandardTokenizer {
    pub fn new(input: &str) -> StandardTokenizer {
        StandardTokenizer {
            chars: input.chars().collect(),
            pos: 0,
            max_token_length: DEFAULT_MAX_TOKEN_LENGTH,
            skipped_positions: 0,
            final_offset: 0,
            token: Token::default(),
        }
    }

    /// Tokens longer than this are skipped (but still count toward the
    /// position increment of the following token).
    pub fn set_max_token_length(&mut self, max_token_length: usize) {
        assert!(max_token_length > 0);
        self.max_token_length = max_token_length;
    }

    /// Runs the automaton from the current position and returns the
    /// next raw token, advancing the cursor past it.
    fn next_scan(&mut self) -> Option<ScannedToken> {
        let chars = &self.chars;
        let mut state = State::Start;
        let mut start = self.pos;
        // char index of a pending medial character, if any
        let mut mid_at = 0usize;
        let mut cursor = self.pos;

        while cursor < chars.len() {
            let class = char_class(chars[cursor]);
            let code = TRANSITIONS[state as usize][class as usize];
            match code {
                SKIP => {
                    cursor += 1;
                    start = cursor;
                }
                SINGLE => {
                    if state == State::Start {
                        let token_type = if class == CharClass::Ideographic {
                            TYPE_IDEOGRAPHIC
                        } else {
                            TYPE_HIRAGANA
                        };
                        self.pos = cursor + 1;
                        return Some(ScannedToken {
                            start: cursor,
                            end: cursor + 1,
                            token_type,
                        });
                    }
                    unreachable!("SINGLE only reachable from Start");
                }
                EMIT => {
                    self.pos = cursor;
                    return Some(ScannedToken {
                        start,
                        end: cursor,
                        token_type: ACCEPTS[state as usize].expect("accepting state"),
                    });
                }
                EMIT_DROP_MID => {
                    // the medial char was speculative: token ends
                    // before it, scanning resumes at the current char
                    self.pos = cursor;
                    return Some(ScannedToken {
                        start,
                        end: mid_at,
                        token_type: ACCEPTS[state as usize].expect("accepting state"),
                    });
                }
                next_state => {
                    let next_state = match next_state {
                        0 => State::Start,
                        1 => State::Word,
                        2 => State::WordMid,
                        3 => State::Num,
                        4 => State::NumMid,
                        5 => State::SoutheastAsian,
                        6 => State::Katakana,
                        7 => State::Hangul,
                        _ => unreachable!("bad transition code {}", next_state),
                    };
                    if (next_state == State::WordMid && state != State::WordMid)
                        || (next_state == State::NumMid && state != State::NumMid)
                    {
                        mid_at = cursor;
                    }
                    state = next_state;
                    cursor += 1;
                }
            }
        }

        // end of input: emit whatever the automaton was in the middle of
        self.pos = chars.len();
        match state {
            State::Start => None,
            State::WordMid | State::NumMid => Some(ScannedToken {
                start,
                end: mid_at,
                token_type: ACCEPTS[state as usize].expect("accepting state"),
            }),
            _ => Some(ScannedToken {
                start,
                end: chars.len(),
                token_type: ACCEPTS[state as usize].expect("accepting state"),
            }),
        }
    }
}

impl TokenStream for StandardTokenizer {
    fn reset(&mut self) -> Result<()> {
        self.pos = 0;
        self.skipped_positions = 0;
        self.final_offset = 0;
        self.token.clear();
        Ok(())
    }

    fn increment_token(&mut self) -> Result<bool> {
        self.token.clear();
        self.skipped_positions = 0;
        loop {
            let scanned = match self.next_scan() {
                Some(scanned) => scanned,
                None => return Ok(false),
            };
            let len = scanned.end - scanned.start;
            if len <= self.max_token_length {
                self.token.position_increment = self.skipped_positions + 1;
                self.token
                    .term
                    .extend(&self.chars[scanned.start..scanned.end]);
                self.token.offset_from = scanned.start;
                self.token.offset_to = scanned.end;
                self.token.token_type = scanned.token_type;
                return Ok(true);
            }
            // too-long token: skipped, but it still owned a position
            self.skipped_positions += 1;
        }
    }

    fn end(&mut self) -> Result<()> {
        self.final_offset = self.chars.len();
        self.token.offset_from = self.final_offset;
        self.token.offset_to = self.final_offset;
        self.token.position_increment = self.skipped_positions;
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
    use super::{StandardTokenizer, TYPE_ALPHANUM, TYPE_HANGUL, TYPE_IDEOGRAPHIC, TYPE_NUM};
    use crate::analyzer::{collect_tokens, Token};

    fn terms(text: &str) -> Vec<String> {
        let mut tokenizer = StandardTokenizer::new(text);
        collect_tokens(&mut tokenizer)
            .into_iter()
            .map(|token| token.term)
            .collect()
    }

    #[test]
    fn test_basic_words() {
        assert_eq!(terms("the quick brown fox"), vec!["the", "quick", "brown", "fox"]);
    }

    #[test]
    fn test_punctuation_breaks() {
        assert_eq!(terms("one, two; three!"), vec!["one", "two", "three"]);
    }

    #[test]
    fn test_medial_apostrophe_kept() {
        assert_eq!(terms("John's o'clock"), vec!["John's", "o'clock"]);
    }

    #[test]
    fn test_trailing_apostrophe_dropped() {
        assert_eq!(terms("dogs' bones"), vec!["dogs", "bones"]);
    }

    #[test]
    fn test_numbers() {
        let mut tokenizer = StandardTokenizer::new("v2 3.14 1,024 ends.");
        let tokens = collect_tokens(&mut tokenizer);
        let pairs: Vec<(&str, &str)> = tokens
            .iter()
            .map(|token| (token.term.as_str(), token.token_type))
            .collect();
        assert_eq!(
            pairs,
            vec![
                ("v2", TYPE_ALPHANUM),
                ("3.14", TYPE_NUM),
                ("1,024", TYPE_NUM),
                ("ends", TYPE_ALPHANUM),
            ]
        );
    }

    #[test]
    fn test_offsets_are_char_offsets() {
        let mut tokenizer = StandardTokenizer::new("ab cd");
        let tokens = collect_tokens(&mut tokenizer);
        assert_eq!(tokens[0].offset_from, 0);
        assert_eq!(tokens[0].offset_to, 2);
        assert_eq!(tokens[1].offset_from, 3);
        assert_eq!(tokens[1].offset_to, 5);
    }

    #[test]
    fn test_ideographic_single_char_tokens() {
        let mut tokenizer = StandardTokenizer::new("搜索 engine");
        let tokens = collect_tokens(&mut tokenizer);
        assert_eq!(tokens[0].term, "搜");
        assert_eq!(tokens[0].token_type, TYPE_IDEOGRAPHIC);
        assert_eq!(tokens[1].term, "索");
        assert_eq!(tokens[2].term, "engine");
    }

    #[test]
    fn test_hangul_run() {
        let mut tokenizer = StandardTokenizer::new("한국어 text");
        let tokens = collect_tokens(&mut tokenizer);
        assert_eq!(tokens[0].term, "한국어");
        assert_eq!(tokens[0].token_type, TYPE_HANGUL);
    }

    #[test]
    fn test_max_token_length_skips_but_keeps_position() {
        let long_word = "x".repeat(300);
        let text = format!("start {} finish", long_word);
        let mut tokenizer = StandardTokenizer::new(&text);
        let tokens: Vec<Token> = collect_tokens(&mut tokenizer);
        let terms: Vec<&str> = tokens.iter().map(|token| token.term.as_str()).collect();
        assert_eq!(terms, vec!["start", "finish"]);
        // the skipped long token still occupied a position
        assert_eq!(tokens[1].position_increment, 2);
    }

    #[test]
    fn test_end_publishes_final_offset() {
        let mut tokenizer = StandardTokenizer::new("tail  ");
        let _ = collect_tokens(&mut tokenizer);
        use crate::analyzer::TokenStream;
        assert_eq!(tokenizer.token().offset_from, 6);
        assert_eq!(tokenizer.token().offset_to, 6);
    }

    #[test]
    fn test_mixed_alnum() {
        assert_eq!(terms("MiG29 4you"), vec!["MiG29", "4you"]);
    }
}
