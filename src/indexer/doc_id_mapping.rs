//! This module is used when documents get reordered at seal time, e.g.
//! to get mappings from old doc_id to new doc_id and vice versa.

use common::BitSet;

use crate::{DocId, ScrivenerError};

/// Struct to provide mapping from new doc_id to old doc_id and back.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DocIdMapping {
    new_doc_id_to_old: Vec<DocId>,
    old_doc_id_to_new: Vec<DocId>,
}

impl DocIdMapping {
    /// Builds a mapping from the list of old doc ids, ordered by new doc id.
    ///
    /// Fails if the list is not a permutation of `0..len`.
    pub fn from_new_id_to_old_id(new_doc_id_to_old: Vec<DocId>) -> crate::Result<DocIdMapping> {
        let max_doc = new_doc_id_to_old.len();
        let mut old_doc_id_to_new = vec![DocId::MAX; max_doc];
        for (new_doc_id, &old_doc_id) in new_doc_id_to_old.iter().enumerate() {
            let slot = old_doc_id_to_new.get_mut(old_doc_id as usize).ok_or_else(|| {
                ScrivenerError::InvalidArgument(format!(
                    "doc id {old_doc_id} is out of range, the mapping covers {max_doc} docs"
                ))
            })?;
            if *slot != DocId::MAX {
                return Err(ScrivenerError::InvalidArgument(format!(
                    "doc id {old_doc_id} is mapped twice"
                )));
            }
            *slot = new_doc_id as DocId;
        }
        Ok(DocIdMapping {
            new_doc_id_to_old,
            old_doc_id_to_new,
        })
    }

    /// returns the new doc_id for the old doc_id
    pub fn get_new_doc_id(&self, doc_id: DocId) -> DocId {
        self.old_doc_id_to_new[doc_id as usize]
    }

    /// returns the old doc_id for the new doc_id
    pub fn get_old_doc_id(&self, doc_id: DocId) -> DocId {
        self.new_doc_id_to_old[doc_id as usize]
    }

    /// iterate over old doc_ids in order of the new doc_ids
    pub fn iter_old_doc_ids(&self) -> impl Iterator<Item = DocId> + Clone + '_ {
        self.new_doc_id_to_old.iter().cloned()
    }

    /// Number of documents covered by the mapping.
    pub fn num_docs(&self) -> usize {
        self.new_doc_id_to_old.len()
    }

    /// True if the mapping between old and new doc ids is the identity.
    pub fn is_trivial(&self) -> bool {
        self.iter_old_doc_ids()
            .enumerate()
            .all(|(new_doc_id, old_doc_id)| new_doc_id as DocId == old_doc_id)
    }

    /// Renumbers a live docs bitset, indexed by old doc ids, into new doc ids.
    pub(crate) fn remap_live_docs(&self, live_docs: &BitSet) -> BitSet {
        let mut remapped = BitSet::with_max_value(self.num_docs() as u32);
        for old_doc_id in live_docs.iter() {
            remapped.insert(self.get_new_doc_id(old_doc_id));
        }
        remapped
    }
}
