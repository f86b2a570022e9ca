//! Definition of Scrivener's error and result.

use std::io;
use std::sync::{Arc, PoisonError};

use thiserror::Error;

/// The library's failure based error enum
#[derive(Debug, Clone, Error)]
pub enum ScrivenerError {
    /// The global document ceiling was reached while reserving a doc id.
    /// Nothing was indexed for the rejected document.
    #[error("Number of documents in the index cannot exceed {max_docs}")]
    CapacityExceeded {
        /// The configured ceiling.
        max_docs: u64,
    },
    /// One document could not be indexed. It keeps its doc id but is
    /// marked deleted; the buffer remains usable.
    #[error("Document failed to be indexed: '{0}'")]
    DocumentFailed(String),
    /// Sealing failed. The buffer was aborted and its content discarded.
    #[error("Buffer aborted while sealing: {0}")]
    Aborted(#[source] Box<ScrivenerError>),
    /// Invalid argument was passed by the user.
    #[error("An invalid argument was passed: '{0}'")]
    InvalidArgument(String),
    /// The operation is not allowed in the current state of the buffer.
    #[error("Invalid buffer state: '{0}'")]
    InvalidState(String),
    /// The postings sink refused the data it was handed.
    #[error("Postings sink error: '{0}'")]
    SinkError(String),
    /// IO Error.
    #[error("An IO error occurred: '{0}'")]
    IoError(Arc<io::Error>),
    /// A thread holding the locked panicked and poisoned the lock.
    #[error("A thread holding the lock panicked and poisoned the lock")]
    Poisoned,
    /// Failed to parse a configuration.
    #[error("Failed to deserialize: '{0}'")]
    Deserialize(String),
}

impl ScrivenerError {
    /// Returns true if the error only affected one document,
    /// and the buffer can keep indexing.
    pub fn is_document_failure(&self) -> bool {
        matches!(self, ScrivenerError::DocumentFailed(_))
    }
}

impl From<io::Error> for ScrivenerError {
    fn from(io_error: io::Error) -> ScrivenerError {
        ScrivenerError::IoError(Arc::new(io_error))
    }
}

impl<Guard> From<PoisonError<Guard>> for ScrivenerError {
    fn from(_: PoisonError<Guard>) -> ScrivenerError {
        ScrivenerError::Poisoned
    }
}

impl From<serde_json::Error> for ScrivenerError {
    fn from(error: serde_json::Error) -> ScrivenerError {
        ScrivenerError::Deserialize(error.to_string())
    }
}
