use std::fmt;

use serde::{Deserialize, Serialize};

/// Term represents the value that the token can take.
///
/// Its identity is the pair (field name, term bytes). Terms order by
/// field name first, then by the unsigned lexicographic order of their bytes.
#[derive(Clone, PartialEq, PartialOrd, Ord, Eq, Hash, Serialize, Deserialize)]
pub struct Term {
    field: String,
    bytes: Vec<u8>,
}

impl Term {
    /// Builds a term given a field name and some raw bytes.
    pub fn from_field_bytes(field: impl Into<String>, bytes: &[u8]) -> Term {
        Term {
            field: field.into(),
            bytes: bytes.to_vec(),
        }
    }

    /// Builds a term given a field name and a text.
    pub fn from_field_text(field: impl Into<String>, text: &str) -> Term {
        Term::from_field_bytes(field, text.as_bytes())
    }

    /// Returns the field name.
    pub fn field(&self) -> &str {
        &self.field
    }

    /// Returns the term bytes.
    pub fn value_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Rough memory footprint, used to account buffered deletes.
    pub(crate) fn ram_bytes_used(&self) -> usize {
        std::mem::size_of::<Term>() + self.field.len() + self.bytes.len()
    }
}

impl fmt::Debug for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match std::str::from_utf8(&self.bytes) {
            Ok(text) => write!(f, "Term(field={}, text={text:?})", self.field),
            Err(_) => write!(f, "Term(field={}, bytes={:?})", self.field, self.bytes),
        }
    }
}
