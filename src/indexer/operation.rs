use serde::{Deserialize, Serialize};

use crate::schema::Term;
use crate::Opstamp;

/// A delete-by-query marker.
///
/// Queries cannot be evaluated against an in-memory buffer. They travel
/// through the delete log and end up in the residual updates of the
/// segments they apply to, where the caller resolves them.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DeleteQuery(String);

impl DeleteQuery {
    /// Creates a query marker identified by its textual description.
    pub fn new(description: impl Into<String>) -> DeleteQuery {
        DeleteQuery(description.into())
    }

    /// Description of the query.
    pub fn description(&self) -> &str {
        &self.0
    }
}

/// New value of a doc-value-like field.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum UpdateValue {
    /// A numeric value.
    Numeric(i64),
    /// A binary value.
    Binary(Vec<u8>),
}

/// Sets `field` to `value` on every document matching `term`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldUpdate {
    /// Selects the documents to update.
    pub term: Term,
    /// Name of the updated field.
    pub field: String,
    /// New value.
    pub value: UpdateValue,
}

/// What a delete operation applies to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DeleteTarget {
    /// Deletes every document containing the term.
    Term(Term),
    /// Deletes every document matching the query.
    Query(DeleteQuery),
    /// Updates a field of every document containing a term.
    FieldUpdate(FieldUpdate),
}

/// Timestamped Delete operation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeleteOperation {
    /// Position of the operation in the global order.
    pub opstamp: Opstamp,
    /// Documents the operation applies to.
    pub target: DeleteTarget,
}
