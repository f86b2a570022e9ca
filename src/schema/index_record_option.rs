use serde::{Deserialize, Serialize};

/// `IndexRecordOption` describes an amount of information associated
/// with a given indexed field.
///
/// It is both used to:
///
///  * describe in the schema the amount of information that should be retained during indexing
///  * request a given amount of information while decoding the postings.
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd, Ord, Eq, Hash, Serialize, Deserialize)]
pub enum IndexRecordOption {
    /// records only the `DocId`s
    #[serde(rename = "basic")]
    Basic,
    /// records the document ids as well as the term frequency.
    #[serde(rename = "freq")]
    WithFreqs,
    /// records the document id, the term frequency and the positions of
    /// the occurrences in the document.
    #[serde(rename = "position")]
    WithFreqsAndPositions,
    /// same as `WithFreqsAndPositions`, plus the start and end offsets
    /// of every occurrence.
    #[serde(rename = "offset")]
    WithFreqsAndPositionsAndOffsets,
}

impl IndexRecordOption {
    /// Returns true iff this option includes encoding
    /// term frequencies.
    pub fn has_freq(self) -> bool {
        !matches!(self, IndexRecordOption::Basic)
    }

    /// Returns true iff this option include encoding
    ///  term positions.
    pub fn has_positions(self) -> bool {
        matches!(
            self,
            IndexRecordOption::WithFreqsAndPositions
                | IndexRecordOption::WithFreqsAndPositionsAndOffsets
        )
    }

    /// Returns true iff this option include encoding
    /// occurrence offsets.
    pub fn has_offsets(self) -> bool {
        matches!(self, IndexRecordOption::WithFreqsAndPositionsAndOffsets)
    }

    /// Resolves the option into the capability record used by the encoders.
    pub fn capabilities(self) -> FieldCapabilities {
        FieldCapabilities {
            freqs: self.has_freq(),
            positions: self.has_positions(),
            offsets: self.has_offsets(),
        }
    }
}

/// What the postings of a field carry, resolved once per field.
///
/// `offsets` implies `positions`, which implies `freqs`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct FieldCapabilities {
    /// In-document term frequencies are recorded.
    pub freqs: bool,
    /// Positions (and payloads) are recorded.
    pub positions: bool,
    /// Start and end offsets are recorded.
    pub offsets: bool,
}

impl FieldCapabilities {
    /// Number of byte streams a term of this field writes:
    /// doc/freq, plus one shared by positions, payloads and offsets.
    pub fn stream_count(self) -> usize {
        if self.positions {
            2
        } else {
            1
        }
    }
}
