/// What gets recorded in the postings for a field, fixed at indexing
/// time. Each variant strictly extends the previous one.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
pub enum IndexOptions {
    /// Doc ids only.
    DocsOnly,
    /// Doc ids and term frequencies.
    DocsAndFreqs,
    /// Doc ids, frequencies, and per-occurrence positions.
    DocsFreqsAndPositions,
    /// Everything above plus character offsets per occurrence.
    DocsFreqsPositionsAndOffsets,
}

impl IndexOptions {
    pub fn has_freqs(self) -> bool {
        self >= IndexOptions::DocsAndFreqs
    }

    pub fn has_positions(self) -> bool {
        self >= IndexOptions::DocsFreqsAndPositions
    }

    pub fn has_offsets(self) -> bool {
        self == IndexOptions::DocsFreqsPositionsAndOffsets
    }
}

#[cfg(test)]
mod tests {
    use super::IndexOptions;

    #[test]
    fn test_index_options_ordering() {
        assert!(!IndexOptions::DocsOnly.has_freqs());
        assert!(IndexOptions::DocsAndFreqs.has_freqs());
        assert!(!IndexOptions::DocsAndFreqs.has_positions());
        assert!(IndexOptions::DocsFreqsAndPositions.has_positions());
        assert!(!IndexOptions::DocsFreqsAndPositions.has_offsets());
        assert!(IndexOptions::DocsFreqsPositionsAndOffsets.has_offsets());
    }
}
