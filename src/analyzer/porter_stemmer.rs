//! Porter's stemming algorithm, and the filter applying it.
//!
//! The stemmer is the classic six-step suffix stripper. It is
//! deterministic, loses information by design, and only does something
//! useful on lower-cased English words; the filter therefore sits at
//! the very end of the English chain.

use crate::analyzer::{Token, TokenStream};
use crate::Result;

pub struct PorterStemmer {
    b: Vec<char>,
    /// Offsets into `b`: `k` is the last letter of the current stem,
    /// `j` marks the suffix split, `k0` the word start.
    k: i32,
    j: i32,
    k0: i32,
    dirty: bool,
}

impl Default for PorterStemmer {
    fn default() -> PorterStemmer {
        PorterStemmer::new()
    }
}

impl PorterStemmer {
    pub fn new() -> PorterStemmer {
        PorterStemmer {
            b: Vec::with_capacity(50),
            k: 0,
            j: 0,
            k0: 0,
            dirty: false,
        }
    }

    /// Stems `word` in place into the internal buffer. Returns `false`
    /// when the word came through unchanged.
    pub fn stem(&mut self, word: &str) -> bool {
        self.b.clear();
        self.b.extend(word.chars());
        self.dirty = false;
        let len = self.b.len() as i32;
        self.k = len - 1;
        self.k0 = 0;
        self.j = 0;
        if self.k > self.k0 + 1 {
            self.step1();
            self.step2();
            self.step3();
            self.step4();
            self.step5();
            self.step6();
        }
        if self.k + 1 != len {
            self.dirty = true;
        }
        self.b.truncate((self.k + 1) as usize);
        self.dirty
    }

    pub fn result(&self) -> String {
        self.b.iter().collect()
    }

    fn at(&self, i: i32) -> char {
        self.b[i as usize]
    }

    fn cons(&self, i: i32) -> bool {
        match self.at(i) {
            'a' | 'e' | 'i' | 'o' | 'u' => false,
            'y' => {
                if i == self.k0 {
                    true
                } else {
                    !self.cons(i - 1)
                }
            }
            _ => true,
        }
    }

    /// Number of consonant-vowel sequences in `[k0, j]`.
    fn m(&self) -> i32 {
        let mut n = 0;
        let mut i = self.k0;
        loop {
            if i > self.j {
                return n;
            }
            if !self.cons(i) {
                break;
            }
            i += 1;
        }
        i += 1;
        loop {
            loop {
                if i > self.j {
                    return n;
                }
                if self.cons(i) {
                    break;
                }
                i += 1;
            }
            i += 1;
            n += 1;
            loop {
                if i > self.j {
                    return n;
                }
                if !self.cons(i) {
                    break;
                }
                i += 1;
            }
            i += 1;
        }
    }

    fn vowel_in_stem(&self) -> bool {
        (self.k0..=self.j).any(|i| !self.cons(i))
    }

    fn doublec(&self, j: i32) -> bool {
        if j < self.k0 + 1 {
            return false;
        }
        if self.at(j) != self.at(j - 1) {
            return false;
        }
        self.cons(j)
    }

    fn cvc(&self, i: i32) -> bool {
        if i < self.k0 + 2 || !self.cons(i) || self.cons(i - 1) || !self.cons(i - 2) {
            return false;
        }
        !matches!(self.at(i), 'w' | 'x' | 'y')
    }

    fn ends(&mut self, s: &str) -> bool {
        let l = s.len() as i32;
        let o = self.k - l + 1;
        if o < self.k0 {
            return false;
        }
        for (idx, ch) in s.chars().enumerate() {
            if self.at(o + idx as i32) != ch {
                return false;
            }
        }
        self.j = self.k - l;
        true
    }

    fn setto(&mut self, s: &str) {
        let o = (self.j + 1) as usize;
        let needed = o + s.len();
        if self.b.len() < needed {
            self.b.resize(needed, '\0');
        }
        for (idx, ch) in s.chars().enumerate() {
            self.b[o + idx] = ch;
        }
        self.k = self.j + s.len() as i32;
        self.dirty = true;
    }

    fn r(&mut self, s: &str) {
        if self.m() > 0 {
            self.setto(s);
        }
    }

    /// Plural and -ed/-ing removal.
    fn step1(&mut self) {
        if self.at(self.k) == 's' {
            if self.ends("sses") {
                self.k -= 2;
            } else if self.ends("ies") {
                self.setto("i");
            } else if self.at(self.k - 1) != 's' {
                self.k -= 1;
            }
        }
        if self.ends("eed") {
            if self.m() > 0 {
                self.k -= 1;
            }
        } else if (self.ends("ed") || self.ends("ing")) && self.vowel_in_stem() {
            self.k = self.j;
            if self.ends("at") {
                self.setto("ate");
            } else if self.ends("bl") {
                self.setto("ble");
            } else if self.ends("iz") {
                self.setto("ize");
            } else if self.doublec(self.k) {
                let ch = self.at(self.k);
                self.k -= 1;
                if matches!(ch, 'l' | 's' | 'z') {
                    self.k += 1;
                }
            } else if self.m() == 1 && self.cvc(self.k) {
                self.setto("e");
            }
        }
    }

    /// Terminal y to i when there is another vowel in the stem.
    fn step2(&mut self) {
        if self.ends("y") && self.vowel_in_stem() {
            self.b[self.k as usize] = 'i';
            self.dirty = true;
        }
    }

    /// Double suffixes map to single ones (-ization → -ize, ...).
    fn step3(&mut self) {
        if self.k == self.k0 {
            return;
        }
        match self.at(self.k - 1) {
            'a' => {
                if self.ends("ational") {
                    self.r("ate");
                } else if self.ends("tional") {
                    self.r("tion");
                }
            }
            'c' => {
                if self.ends("enci") {
                    self.r("ence");
                } else if self.ends("anci") {
                    self.r("ance");
                }
            }
            'e' => {
                if self.ends("izer") {
                    self.r("ize");
                }
            }
            'l' => {
                if self.ends("bli") {
                    self.r("ble");
                } else if self.ends("alli") {
                    self.r("al");
                } else if self.ends("entli") {
                    self.r("ent");
                } else if self.ends("eli") {
                    self.r("e");
                } else if self.ends("ousli") {
                    self.r("ous");
                }
            }
            'o' => {
                if self.ends("ization") {
                    self.r("ize");
                } else if self.ends("ation") {
                    self.r("ate");
                } else if self.ends("ator") {
                    self.r("ate");
                }
            }
            's' => {
                if self.ends("alism") {
                    self.r("al");
                } else if self.ends("iveness") {
                    self.r("ive");
                } else if self.ends("fulness") {
                    self.r("ful");
                } else if self.ends("ousness") {
                    self.r("ous");
                }
            }
            't' => {
                if self.ends("aliti") {
                    self.r("al");
                } else if self.ends("iviti") {
                    self.r("ive");
                } else if self.ends("biliti") {
                    self.r("ble");
                }
            }
            'g' => {
                if self.ends("logi") {
                    self.r("log");
                }
            }
            _ => {}
        }
    }

    /// -ic-, -full, -ness and friends.
    fn step4(&mut self) {
        match self.at(self.k) {
            'e' => {
                if self.ends("icate") {
                    self.r("ic");
                } else if self.ends("ative") {
                    self.r("");
                } else if self.ends("alize") {
                    self.r("al");
                }
            }
            'i' => {
                if self.ends("iciti") {
                    self.r("ic");
                }
            }
            'l' => {
                if self.ends("ical") {
                    self.r("ic");
                } else if self.ends("ful") {
                    self.r("");
                }
            }
            's' => {
                if self.ends("ness") {
                    self.r("");
                }
            }
            _ => {}
        }
    }

    /// -ant, -ence etc. in context <c>vcvc<v>.
    fn step5(&mut self) {
        if self.k == self.k0 {
            return;
        }
        let matched = match self.at(self.k - 1) {
            'a' => self.ends("al"),
            'c' => self.ends("ance") || self.ends("ence"),
            'e' => self.ends("er"),
            'i' => self.ends("ic"),
            'l' => self.ends("able") || self.ends("ible"),
            'n' => {
                self.ends("ant")
                    || self.ends("ement")
                    || self.ends("ment")
                    || self.ends("ent")
            }
            'o' => {
                (self.ends("ion")
                    && self.j >= 0
                    && matches!(self.at(self.j), 's' | 't'))
                    || self.ends("ou")
            }
            's' => self.ends("ism"),
            't' => self.ends("ate") || self.ends("iti"),
            'u' => self.ends("ous"),
            'v' => self.ends("ive"),
            'z' => self.ends("ize"),
            _ => false,
        };
        if matched && self.m() > 1 {
            self.k = self.j;
        }
    }

    /// Removes a final -e and collapses a final double l.
    fn step6(&mut self) {
        self.j = self.k;
        if self.at(self.k) == 'e' {
            let a = self.m();
            if a > 1 || a == 1 && !self.cvc(self.k - 1) {
                self.k -= 1;
            }
        }
        if self.at(self.k) == 'l' && self.doublec(self.k) && self.m() > 1 {
            self.k -= 1;
        }
    }
}

/// Applies the Porter stemmer to every token not flagged as a keyword.
pub struct PorterStemFilter<T: TokenStream> {
    tail: T,
    stemmer: PorterStemmer,
}

impl<T: TokenStream> PorterStemFilter<T> {
    pub fn new(tail: T) -> PorterStemFilter<T> {
        PorterStemFilter {
            tail,
            stemmer: PorterStemmer::new(),
        }
    }
}

impl<T: TokenStream> TokenStream for PorterStemFilter<T> {
    fn reset(&mut self) -> Result<()> {
        self.tail.reset()
    }

    fn increment_token(&mut self) -> Result<bool> {
        if !self.tail.increment_token()? {
            return Ok(false);
        }
        let token = self.tail.token_mut();
        if !token.keyword && self.stemmer.stem(&token.term) {
            token.term = self.stemmer.result();
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
