//! Field metadata, terms and the documents handed to the indexer.
//!
//! Fields are identified by name. The first document that carries a field
//! decides its [`IndexRecordOption`] for the lifetime of a buffer; a later
//! document using a conflicting option for the same field fails.

mod document;
mod field_info;
mod index_record_option;
mod term;

pub use self::document::{Document, DocumentField};
pub use self::field_info::{FieldInfo, FieldInfos, FieldOptions};
pub(crate) use self::field_info::FieldInfosBuilder;
pub use self::index_record_option::{FieldCapabilities, IndexRecordOption};
pub use self::term::Term;
