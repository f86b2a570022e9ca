#![doc(test(attr(allow(unused_variables), deny(warnings))))]
#![warn(missing_docs)]
#![allow(clippy::len_without_is_empty)]

//! # `scrivener`
//!
//! The in-memory write path of a full-text search engine.
//!
//! Documents arrive as already analyzed token streams. Each indexing thread
//! owns a [`DocumentBuffer`](indexer::DocumentBuffer) that assigns doc ids and
//! encodes per-term doc/frequency/position streams into arena slices. Deletes
//! and field updates go through a single shared, sequenced delete log that
//! every buffer consumes up to its own admitted document count. A flush policy
//! watches document counts and memory and marks buffers flush-pending; a
//! flush-pending buffer is then sealed into an immutable segment by handing
//! its terms, in order, to a [`PostingsSink`](postings::PostingsSink).
//!
//! ```rust
//! use scrivener::indexer::{IndexWriter, IndexWriterConfig};
//! use scrivener::postings::RamPostingsSink;
//! use scrivener::schema::{Document, FieldOptions, IndexRecordOption, Term};
//! use scrivener::tokenizer::Token;
//!
//! # fn main() -> scrivener::Result<()> {
//! let index_writer = IndexWriter::new(IndexWriterConfig::default())?;
//! let mut buffer = index_writer.new_buffer();
//! let options = FieldOptions::indexed(IndexRecordOption::WithFreqsAndPositions);
//! for (id, text) in [("1", "happy tree"), ("2", "sad tree")] {
//!     let mut doc = Document::default();
//!     let id_options = FieldOptions::indexed(IndexRecordOption::Basic);
//!     doc.add_pre_tokenized("id", id_options, vec![Token::new(id, 0, 1)]);
//!     let tokens = text
//!         .split(' ')
//!         .map(|word| Token::new(word, 0, word.len() as u32))
//!         .collect();
//!     doc.add_pre_tokenized("body", options, tokens);
//!     buffer.add_document(doc, None)?;
//! }
//! index_writer.delete_term(Term::from_field_text("id", "1"));
//! buffer.prepare_flush()?;
//! let mut sink = RamPostingsSink::default();
//! let segment = buffer.flush(&mut sink, None)?;
//! assert_eq!(segment.max_doc(), 2);
//! assert_eq!(segment.num_docs(), 1);
//! # Ok(())
//! # }
//! ```

#[macro_use]
extern crate log;

#[cfg(feature = "failpoints")]
#[macro_use]
extern crate fail;

#[cfg(not(feature = "failpoints"))]
macro_rules! fail_point {
    ($($tt:tt)*) => {};
}

mod core;
mod error;

pub mod indexer;
pub mod postings;
pub mod schema;

/// Re-export of the token boundary crate.
pub mod tokenizer {
    pub use tokenizer_api::{BoxTokenStream, PreTokenizedStream, Token, TokenStream};
}

pub use common::{BitSet, ByteCount};

pub use crate::core::SegmentId;
pub use crate::error::ScrivenerError;

/// Scrivener result.
///
/// Within scrivener, please avoid importing `Result` using `use crate::Result`
/// and instead, refer to this as `crate::Result<T>`.
pub type Result<T> = std::result::Result<T, ScrivenerError>;

/// A `u32` identifying a document within a segment.
/// Documents have their `DocId` assigned in admission order,
/// starting at 0 within each buffer.
pub type DocId = u32;

/// A u64 assigned to every operation incrementally
///
/// All operations modifying an index (document admissions, deletes,
/// field updates) receive an `Opstamp`, which gives them a single
/// global order across indexing threads.
pub type Opstamp = u64;

/// Hard ceiling on the number of documents an index may hold.
pub const MAX_DOCS: u64 = i32::MAX as u64 - 128;
