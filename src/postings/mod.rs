//! In-memory postings: per-term streams written into arena slices
//! while indexing, and read back when a buffer is sealed.

mod decoder;
mod field_encoder;
mod indexing_context;
mod postings_store;
mod sink;

pub use self::decoder::{DecodedPosition, DocFreqDecoder, PositionDecoder};
pub(crate) use self::field_encoder::FieldEncoder;
pub use self::field_encoder::FieldStats;
pub(crate) use self::indexing_context::IndexingContext;
pub use self::sink::{
    PostingsSink, RamField, RamPostingsSink, RamTerm, SegmentWriteState, TermPostings,
    WriteHandle,
};

/// Maximum position a token may reach within a field.
pub const MAX_POSITION: u32 = i32::MAX as u32 - 128;
