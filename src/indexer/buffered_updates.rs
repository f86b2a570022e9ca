use std::collections::hash_map::Entry;
use std::mem;

use rustc_hash::FxHashMap;

use super::operation::{DeleteOperation, DeleteQuery, DeleteTarget, FieldUpdate};
use crate::schema::Term;
use crate::DocId;

// Rough per-entry overheads of the hash maps and vectors below.
const BYTES_PER_DEL_TERM: usize = 48;
const BYTES_PER_DEL_QUERY: usize = 48;
const BYTES_PER_FIELD_UPDATE: usize = 64;
const BYTES_PER_DEL_DOC_ID: usize = mem::size_of::<DocId>();

/// Doc id bound of the updates that apply to every document.
pub const ALL_DOCS: DocId = DocId::MAX;

/// Deletes and updates resolved against one buffer (or, for the global
/// buffer, against every sealed segment).
///
/// Each entry carries a doc id bound: it only applies to documents with a
/// smaller doc id.
#[derive(Debug, Default)]
pub struct BufferedUpdates {
    delete_terms: FxHashMap<Term, DocId>,
    delete_queries: FxHashMap<DeleteQuery, DocId>,
    field_updates: Vec<(FieldUpdate, DocId)>,
    delete_doc_ids: Vec<DocId>,
    bytes_used: usize,
}

impl BufferedUpdates {
    /// Records a delete operation, bounded by `doc_id_upto`.
    pub fn apply_operation(&mut self, operation: &DeleteOperation, doc_id_upto: DocId) {
        match &operation.target {
            DeleteTarget::Term(term) => self.add_term(term, doc_id_upto),
            DeleteTarget::Query(query) => self.add_query(query, doc_id_upto),
            DeleteTarget::FieldUpdate(update) => self.add_field_update(update, doc_id_upto),
        }
    }

    /// Buffers a delete term. If the term is already buffered, the larger
    /// bound wins.
    pub fn add_term(&mut self, term: &Term, doc_id_upto: DocId) {
        match self.delete_terms.entry(term.clone()) {
            Entry::Occupied(mut entry) => {
                if *entry.get() < doc_id_upto {
                    entry.insert(doc_id_upto);
                }
            }
            Entry::Vacant(entry) => {
                self.bytes_used += BYTES_PER_DEL_TERM + term.ram_bytes_used();
                entry.insert(doc_id_upto);
            }
        }
    }

    /// Buffers a delete query. If the query is already buffered, the larger
    /// bound wins.
    pub fn add_query(&mut self, query: &DeleteQuery, doc_id_upto: DocId) {
        match self.delete_queries.entry(query.clone()) {
            Entry::Occupied(mut entry) => {
                if *entry.get() < doc_id_upto {
                    entry.insert(doc_id_upto);
                }
            }
            Entry::Vacant(entry) => {
                self.bytes_used += BYTES_PER_DEL_QUERY + query.description().len();
                entry.insert(doc_id_upto);
            }
        }
    }

    /// Buffers a field update. Updates are kept in arrival order, since a
    /// later update of the same field overrides an earlier one.
    pub fn add_field_update(&mut self, update: &FieldUpdate, doc_id_upto: DocId) {
        self.bytes_used += BYTES_PER_FIELD_UPDATE + update.term.ram_bytes_used();
        self.field_updates.push((update.clone(), doc_id_upto));
    }

    /// Marks a document of the buffer as deleted, regardless of its content.
    pub fn add_doc_id(&mut self, doc_id: DocId) {
        self.bytes_used += BYTES_PER_DEL_DOC_ID;
        self.delete_doc_ids.push(doc_id);
    }

    /// Estimated memory used by the buffered updates.
    pub fn bytes_used(&self) -> usize {
        self.bytes_used
    }

    /// Returns true iff something is buffered.
    pub fn any(&self) -> bool {
        !self.delete_terms.is_empty()
            || !self.delete_queries.is_empty()
            || !self.field_updates.is_empty()
            || !self.delete_doc_ids.is_empty()
    }

    /// Number of distinct buffered delete terms.
    pub fn num_delete_terms(&self) -> usize {
        self.delete_terms.len()
    }

    /// Doc ids marked as deleted.
    pub fn delete_doc_ids(&self) -> &[DocId] {
        &self.delete_doc_ids
    }

    /// Bound of a buffered delete term.
    pub fn delete_term_bound(&self, term: &Term) -> Option<DocId> {
        self.delete_terms.get(term).copied()
    }

    pub fn clear(&mut self) {
        *self = BufferedUpdates::default();
    }

    /// Takes a sorted, immutable snapshot of the buffered updates and
    /// leaves `self` empty.
    pub fn freeze(&mut self) -> FrozenBufferedUpdates {
        let updates = mem::take(self);
        let mut delete_terms: Vec<(Term, DocId)> = updates.delete_terms.into_iter().collect();
        delete_terms.sort_unstable();
        let mut delete_queries: Vec<(DeleteQuery, DocId)> =
            updates.delete_queries.into_iter().collect();
        delete_queries.sort_unstable();
        let mut delete_doc_ids = updates.delete_doc_ids;
        delete_doc_ids.sort_unstable();
        FrozenBufferedUpdates {
            delete_terms,
            delete_queries,
            field_updates: updates.field_updates,
            delete_doc_ids,
            bytes_used: updates.bytes_used,
        }
    }
}

/// An immutable snapshot of [`BufferedUpdates`].
///
/// Delete terms are sorted by field then term bytes, the order in which
/// they get applied at seal time.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FrozenBufferedUpdates {
    delete_terms: Vec<(Term, DocId)>,
    delete_queries: Vec<(DeleteQuery, DocId)>,
    field_updates: Vec<(FieldUpdate, DocId)>,
    delete_doc_ids: Vec<DocId>,
    bytes_used: usize,
}

impl FrozenBufferedUpdates {
    /// Delete terms and their doc id bounds, sorted.
    pub fn delete_terms(&self) -> &[(Term, DocId)] {
        &self.delete_terms
    }

    /// Delete queries and their doc id bounds.
    pub fn delete_queries(&self) -> &[(DeleteQuery, DocId)] {
        &self.delete_queries
    }

    /// Field updates and their doc id bounds, in arrival order.
    pub fn field_updates(&self) -> &[(FieldUpdate, DocId)] {
        &self.field_updates
    }

    /// Deleted doc ids, sorted.
    pub fn delete_doc_ids(&self) -> &[DocId] {
        &self.delete_doc_ids
    }

    /// Estimated memory used by the snapshot.
    pub fn bytes_used(&self) -> usize {
        self.bytes_used
    }

    /// Returns true iff the snapshot holds nothing.
    pub fn is_empty(&self) -> bool {
        self.delete_terms.is_empty()
            && self.delete_queries.is_empty()
            && self.field_updates.is_empty()
            && self.delete_doc_ids.is_empty()
    }

    /// Keeps what could not be resolved against the postings of a buffer:
    /// delete queries and field updates.
    pub(crate) fn into_residual(self) -> FrozenBufferedUpdates {
        let bytes_used = self.delete_queries.len() * BYTES_PER_DEL_QUERY
            + self
                .delete_queries
                .iter()
                .map(|(query, _)| query.description().len())
                .sum::<usize>()
            + self
                .field_updates
                .iter()
                .map(|(update, _)| BYTES_PER_FIELD_UPDATE + update.term.ram_bytes_used())
                .sum::<usize>();
        FrozenBufferedUpdates {
            delete_terms: Vec::new(),
            delete_queries: self.delete_queries,
            field_updates: self.field_updates,
            delete_doc_ids: Vec::new(),
            bytes_used,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indexer::operation::UpdateValue;

    #[test]
    fn test_delete_term_keeps_largest_bound() {
        let mut updates = BufferedUpdates::default();
        let term = Term::from_field_text("id", "1");
        updates.add_term(&term, 5);
        let bytes_used = updates.bytes_used();
        updates.add_term(&term, 3);
        assert_eq!(updates.delete_term_bound(&term), Some(5));
        updates.add_term(&term, 8);
        assert_eq!(updates.delete_term_bound(&term), Some(8));
        assert_eq!(updates.bytes_used(), bytes_used);
        assert_eq!(updates.num_delete_terms(), 1);
    }

    #[test]
    fn test_freeze_sorts_and_clears() {
        let mut updates = BufferedUpdates::default();
        updates.add_term(&Term::from_field_text("title", "a"), 2);
        updates.add_term(&Term::from_field_text("body", "z"), 2);
        updates.add_term(&Term::from_field_text("body", "b"), 1);
        updates.add_doc_id(7);
        updates.add_doc_id(3);
        updates.add_query(&DeleteQuery::new("price:[0 TO 10]"), 4);
        let frozen = updates.freeze();
        assert!(!updates.any());
        assert_eq!(updates.bytes_used(), 0);
        let terms: Vec<&Term> = frozen.delete_terms().iter().map(|(term, _)| term).collect();
        assert_eq!(
            terms,
            vec![
                &Term::from_field_text("body", "b"),
                &Term::from_field_text("body", "z"),
                &Term::from_field_text("title", "a"),
            ]
        );
        assert_eq!(frozen.delete_doc_ids(), &[3, 7]);
        let residual = frozen.into_residual();
        assert!(residual.delete_terms().is_empty());
        assert_eq!(residual.delete_queries().len(), 1);
    }

    #[test]
    fn test_field_updates_keep_arrival_order() {
        let mut updates = BufferedUpdates::default();
        let term = Term::from_field_text("id", "1");
        for value in [3, 1, 2] {
            updates.add_field_update(
                &FieldUpdate {
                    term: term.clone(),
                    field: "price".to_string(),
                    value: UpdateValue::Numeric(value),
                },
                ALL_DOCS,
            );
        }
        let frozen = updates.freeze();
        let values: Vec<&UpdateValue> = frozen
            .field_updates()
            .iter()
            .map(|(update, _)| &update.value)
            .collect();
        assert_eq!(
            values,
            vec![
                &UpdateValue::Numeric(3),
                &UpdateValue::Numeric(1),
                &UpdateValue::Numeric(2)
            ]
        );
    }
}
