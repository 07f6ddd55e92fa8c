use std::fmt;

use crate::schema::Field;

/// A term: a field plus the bytes the analysis chain produced.
///
/// Terms order lexicographically by `(field, bytes)`, which is also the
/// order of the term dictionary.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Term {
    field: Field,
    bytes: Vec<u8>,
}

impl Term {
    pub fn new(field: Field, bytes: Vec<u8>) -> Term {
        Term { field, bytes }
    }

    pub fn from_field_text(field: Field, text: &str) -> Term {
        Term {
            field,
            bytes: text.as_bytes().to_vec(),
        }
    }

    pub fn field(&self) -> Field {
        self.field
    }

    pub fn value_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// The term text, when the bytes happen to be UTF-8 (analysis
    /// chains in this crate always produce UTF-8).
    pub fn text(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.bytes)
    }
}

impl fmt::Debug for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Term(field={}, text={:?})", self.field.0, self.text())
    }
}

#[cfg(test)]
mod tests {
    use super::Term;
    use crate::schema::Field;

    #[test]
    fn test_term_ordering() {
        let a0 = Term::from_field_text(Field(0), "apple");
        let b0 = Term::from_field_text(Field(0), "banana");
        let a1 = Term::from_field_text(Field(1), "apple");
        assert!(a0 < b0);
        assert!(b0 < a1);
    }
}
