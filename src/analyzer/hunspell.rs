//! Hunspell-backed stemming.
//!
//! Loads the prefix/suffix subset of the textual `.aff`/`.dic` format:
//! `PFX`/`SFX` rule groups with strip/affix/condition columns, and a
//! word list whose entries carry the flags of the rules they accept.
//! Compounding and option lines beyond flag groups are ignored.

use std::collections::{HashMap, HashSet};

use crate::analyzer::{Token, TokenState, TokenStream};
use crate::{ErrorKind, Result};

#[derive(Debug)]
struct AffixRule {
    flag: char,
    strip: String,
    affix: String,
    /// Regex-free condition: a sequence of either literal chars or
    /// bracketed char classes (possibly negated), matched at the edge
    /// of the candidate stem.
    condition: Vec<CondPart>,
}

#[derive(Debug)]
enum CondPart {
    Literal(char),
    Class { negated: bool, chars: Vec<char> },
}

fn parse_condition(raw: &str) -> Result<Vec<CondPart>> {
    let mut parts = Vec::new();
    let mut chars = raw.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '[' {
            let negated = chars.peek() == Some(&'^');
            if negated {
                chars.next();
            }
            let mut class_chars = Vec::new();
            loop {
                match chars.next() {
                    Some(']') => break,
                    Some(inner) => class_chars.push(inner),
                    None => {
                        return Err(ErrorKind::InvalidArgument(format!(
                            "unterminated char class in affix condition {:?}",
                            raw
                        ))
                        .into())
                    }
                }
            }
            parts.push(CondPart::Class {
                negated,
                chars: class_chars,
            });
        } else {
            parts.push(CondPart::Literal(c));
        }
    }
    Ok(parts)
}

fn condition_matches(condition: &[CondPart], word: &str, at_end: bool) -> bool {
    let chars: Vec<char> = word.chars().collect();
    if chars.len() < condition.len() {
        return false;
    }
    let window: &[char] = if at_end {
        &chars[chars.len() - condition.len()..]
    } else {
        &chars[..condition.len()]
    };
    condition.iter().zip(window).all(|(part, &c)| match part {
        CondPart::Literal('.') => true,
        CondPart::Literal(lit) => *lit == c,
        CondPart::Class { negated, chars } => chars.contains(&c) != *negated,
    })
}

/// In-memory hunspell dictionary: the word list plus affix rules.
pub struct HunspellDictionary {
    words: HashMap<String, HashSet<char>>,
    prefixes: Vec<AffixRule>,
    suffixes: Vec<AffixRule>,
}

impl HunspellDictionary {
    /// Parses the affix file and the word list.
    pub fn load(aff: &str, dic: &str) -> Result<HunspellDictionary> {
        let mut prefixes = Vec::new();
        let mut suffixes = Vec::new();
        for line in aff.lines() {
            let fields: Vec<&str> = line.split_whitespace().collect();
            if fields.len() < 5 || (fields[0] != "SFX" && fields[0] != "PFX") {
                continue;
            }
            // group header lines have a Y/N cross-product column and a
            // count; rule lines have strip/affix/condition columns
            let flag = fields[1]
                .chars()
                .next()
                .ok_or_else(|| ErrorKind::InvalidArgument("empty affix flag".to_string()))?;
            if fields[2] == "Y" || fields[2] == "N" {
                continue;
            }
            let strip = if fields[2] == "0" { "" } else { fields[2] };
            let affix = fields[3];
            let rule = AffixRule {
                flag,
                strip: strip.to_string(),
                affix: affix.to_string(),
                condition: parse_condition(fields[4])?,
            };
            if fields[0] == "SFX" {
                suffixes.push(rule);
            } else {
                prefixes.push(rule);
            }
        }

        let mut words = HashMap::new();
        for (line_number, line) in dic.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            // first line is the entry count
            if line_number == 0 && line.chars().all(|c| c.is_ascii_digit()) {
                continue;
            }
            let (word, flags) = match line.split_once('/') {
                Some((word, flags)) => (word, flags.chars().collect::<HashSet<char>>()),
                None => (line, HashSet::new()),
            };
            words.insert(word.to_string(), flags);
        }

        Ok(HunspellDictionary {
            words,
            prefixes,
            suffixes,
        })
    }

    fn entry_has_flag(&self, word: &str, flag: char) -> bool {
        self.words.get(word).map_or(false, |flags| flags.contains(&flag))
    }

    /// Every dictionary stem `word` can be derived from.
    pub fn stem(&self, word: &str) -> Vec<String> {
        let mut stems = Vec::new();
        if self.words.contains_key(word) {
            stems.push(word.to_string());
        }
        for rule in &self.suffixes {
            if let Some(stripped) = word.strip_suffix(rule.affix.as_str()) {
                let candidate = format!("{}{}", stripped, rule.strip);
                if candidate.is_empty() || !condition_matches(&rule.condition, &candidate, true) {
                    continue;
                }
                if self.entry_has_flag(&candidate, rule.flag) {
                    stems.push(candidate);
                }
            }
        }
        for rule in &self.prefixes {
            if let Some(stripped) = word.strip_prefix(rule.affix.as_str()) {
                let candidate = format!("{}{}", rule.strip, stripped);
                if candidate.is_empty() || !condition_matches(&rule.condition, &candidate, false) {
                    continue;
                }
                if self.entry_has_flag(&candidate, rule.flag) {
                    stems.push(candidate);
                }
            }
        }
        stems
    }

    /// Like [`stem`](Self::stem), deduplicated, keeping first-found order.
    pub fn unique_stems(&self, word: &str) -> Vec<String> {
        let mut seen = HashSet::new();
        self.stem(word)
            .into_iter()
            .filter(|stem| seen.insert(stem.clone()))
            .collect()
    }
}

/// Replaces a token with its dictionary stems. Extra stems are emitted
/// at the same position (position increment 0). Unknown words pass
/// through unchanged, as do keyword-flagged tokens.
pub struct HunspellStemFilter<T: TokenStream> {
    tail: T,
    dictionary: std::sync::Arc<HunspellDictionary>,
    dedup: bool,
    longest_only: bool,
    buffer: Vec<String>,
    saved_state: Option<TokenState>,
}

impl<T: TokenStream> HunspellStemFilter<T> {
    pub fn new(
        tail: T,
        dictionary: std::sync::Arc<HunspellDictionary>,
        dedup: bool,
        longest_only: bool,
    ) -> HunspellStemFilter<T> {
        HunspellStemFilter {
            tail,
            dictionary,
            dedup: dedup && !longest_only,
            longest_only,
            buffer: Vec::new(),
            saved_state: None,
        }
    }
}

impl<T: TokenStream> TokenStream for HunspellStemFilter<T> {
    fn reset(&mut self) -> Result<()> {
        self.buffer.clear();
        self.saved_state = None;
        self.tail.reset()
    }

    fn increment_token(&mut self) -> Result<bool> {
        if !self.buffer.is_empty() {
            let next_stem = self.buffer.remove(0);
            let state = self.saved_state.as_ref().expect("buffered stems imply saved state");
            let token = self.tail.token_mut();
            token.restore_state(state);
            token.position_increment = 0;
            token.term.clear();
            token.term.push_str(&next_stem);
            return Ok(true);
        }

        if !self.tail.increment_token()? {
            return Ok(false);
        }
        if self.tail.token().keyword {
            return Ok(true);
        }

        self.buffer = if self.dedup {
            self.dictionary.unique_stems(&self.tail.token().term)
        } else {
            self.dictionary.stem(&self.tail.token().term)
        };

        if self.buffer.is_empty() {
            // unknown word, keep it as is
            return Ok(true);
        }

        if self.longest_only && self.buffer.len() > 1 {
            self.buffer
                .sort_by(|a, b| b.chars().count().cmp(&a.chars().count()));
        }

        let stem = self.buffer.remove(0);
        {
            let token = self.tail.token_mut();
            token.term.clear();
            token.term.push_str(&stem);
        }

        if self.longest_only {
            self.buffer.clear();
        } else if !self.buffer.is_empty() {
            self.saved_state = Some(self.tail.token().capture_state());
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
    use super::{HunspellDictionary, HunspellStemFilter};
    use crate::analyzer::{collect_tokens, LowerCaseFilter, StandardTokenizer};
    use std::sync::Arc;

    const AFF: &str = "\
SET UTF-8
SFX S Y 2
SFX S 0 s [^s]
SFX S 0 es s
SFX D Y 1
SFX D 0 ed [^e]
PFX U Y 1
PFX U 0 un .
";

    const DIC: &str = "\
4
walk/SD
glass/S
do/U
talk/SD
";

    fn dictionary() -> Arc<HunspellDictionary> {
        Arc::new(HunspellDictionary::load(AFF, DIC).unwrap())
    }

    #[test]
    fn test_suffix_stemming() {
        let dict = dictionary();
        assert_eq!(dict.stem("walks"), vec!["walk"]);
        assert_eq!(dict.stem("walked"), vec!["walk"]);
        assert_eq!(dict.stem("glasses"), vec!["glass"]);
        assert_eq!(dict.stem("walk"), vec!["walk"]);
        assert!(dict.stem("jump").is_empty());
    }

    #[test]
    fn test_prefix_stemming() {
        let dict = dictionary();
        assert_eq!(dict.stem("undo"), vec!["do"]);
    }

    #[test]
    fn test_condition_blocks_wrong_class() {
        let dict = dictionary();
        // "glasss" would need the `[^s]` rule on a stem ending in s
        assert!(dict.stem("glasss").is_empty());
    }

    #[test]
    fn test_filter_emits_alternates_at_same_position() {
        let dict = dictionary();
        let tokenizer = LowerCaseFilter::new(StandardTokenizer::new("walked glasses jump"));
        let mut stream = HunspellStemFilter::new(tokenizer, dict, true, false);
        let tokens = collect_tokens(&mut stream);
        let terms: Vec<&str> = tokens.iter().map(|token| token.term.as_str()).collect();
        assert_eq!(terms, vec!["walk", "glass", "jump"]);
        assert!(tokens.iter().all(|token| token.position_increment == 1));
    }

    #[test]
    fn test_longest_only_keeps_single_stem() {
        let dict = dictionary();
        let tokenizer = LowerCaseFilter::new(StandardTokenizer::new("walks"));
        let mut stream = HunspellStemFilter::new(tokenizer, dict, false, true);
        let tokens = collect_tokens(&mut stream);
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].term, "walk");
    }
}
