use std::mem;

use stacker::{Addr, IntAddr, TermOrdinal};

use crate::schema::FieldCapabilities;
use crate::DocId;

/// Per-term encoder state, one array per attribute, indexed by term ordinal.
///
/// The arrays that a field does not need (frequencies, positions, offsets)
/// stay empty for the whole life of the store.
pub(crate) struct PostingsStore {
    capabilities: FieldCapabilities,
    /// Number of slots allocated in every array.
    size: usize,
    /// First write position word of the term, in the int pool.
    pub int_starts: Vec<IntAddr>,
    /// Start of the first stream of the term, in the byte pool.
    pub byte_starts: Vec<Addr>,
    pub last_doc_ids: Vec<DocId>,
    /// Doc code of `last_doc_ids[ord]`, written once that doc is complete.
    pub last_doc_codes: Vec<u32>,
    /// Frequency of the term in `last_doc_ids[ord]`.
    pub term_freqs: Vec<u32>,
    pub last_positions: Vec<u32>,
    pub last_offsets: Vec<u32>,
}

/// Smallest size at least `min_size`, with some headroom so that
/// growing one term at a time stays amortized.
fn oversize(min_size: usize) -> usize {
    min_size + (min_size >> 3).max(3)
}

impl PostingsStore {
    pub fn new(capabilities: FieldCapabilities) -> PostingsStore {
        let mut store = PostingsStore {
            capabilities,
            size: 0,
            int_starts: Vec::new(),
            byte_starts: Vec::new(),
            last_doc_ids: Vec::new(),
            last_doc_codes: Vec::new(),
            term_freqs: Vec::new(),
            last_positions: Vec::new(),
            last_offsets: Vec::new(),
        };
        store.grow(2);
        store
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Number of bytes one slot takes across all allocated arrays.
    pub fn bytes_per_posting(&self) -> usize {
        let mut num_arrays = 4;
        if self.capabilities.freqs {
            num_arrays += 1;
        }
        if self.capabilities.positions {
            num_arrays += 1;
        }
        if self.capabilities.offsets {
            num_arrays += 1;
        }
        num_arrays * mem::size_of::<u32>()
    }

    pub fn mem_usage(&self) -> usize {
        self.size * self.bytes_per_posting()
    }

    /// Makes sure a slot exists for `term_ord`.
    #[inline]
    pub fn ensure_slot(&mut self, term_ord: TermOrdinal) {
        let required = term_ord as usize + 1;
        if required > self.size {
            self.grow(oversize(required));
        }
    }

    /// Moves every array to a new allocation of `new_size` slots.
    /// New slots are zeroed.
    fn grow(&mut self, new_size: usize) {
        debug_assert!(new_size > self.size);
        fn grown<T: Copy>(old: &[T], new_size: usize, fill: T) -> Vec<T> {
            let mut new_array = Vec::with_capacity(new_size);
            new_array.extend_from_slice(old);
            new_array.resize(new_size, fill);
            new_array
        }
        self.int_starts = grown(&self.int_starts, new_size, 0);
        self.byte_starts = grown(&self.byte_starts, new_size, Addr::null_pointer());
        self.last_doc_ids = grown(&self.last_doc_ids, new_size, 0);
        self.last_doc_codes = grown(&self.last_doc_codes, new_size, 0);
        if self.capabilities.freqs {
            self.term_freqs = grown(&self.term_freqs, new_size, 0);
        }
        if self.capabilities.positions {
            self.last_positions = grown(&self.last_positions, new_size, 0);
        }
        if self.capabilities.offsets {
            self.last_offsets = grown(&self.last_offsets, new_size, 0);
        }
        self.size = new_size;
    }
}
