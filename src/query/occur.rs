use std::fmt;

/// How a clause takes part in a boolean query.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum Occur {
    /// The clause must match (`+`).
    Must,
    /// The clause may match and contributes to the score.
    Should,
    /// The clause must not match (`-`); it never contributes to the
    /// score.
    MustNot,
}

impl Occur {
    pub fn is_required(self) -> bool {
        self == Occur::Must
    }

    pub fn is_prohibited(self) -> bool {
        self == Occur::MustNot
    }
}

impl fmt::Display for Occur {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Occur::Must => write!(f, "+"),
            Occur::Should => Ok(()),
            Occur::MustNot => write!(f, "-"),
        }
    }
}
