//! Arena storage for the indexer's in-memory postings.
//!
//! - [`ByteBlockPool`] holds term bytes and the per-term byte streams, chained
//!   as slices of increasing size.
//! - [`IntBlockPool`] holds, for every term and stream, the address where the
//!   next byte of that stream goes.
//! - [`TermHashMap`] maps term bytes to dense term ordinals.
//!
//! Nothing is ever freed individually. A pool is reset as a whole once the
//! segment it backs is sealed or discarded.

mod byte_block_pool;
mod int_block_pool;
mod slice_reader;
mod term_hashmap;

pub use self::byte_block_pool::{
    Addr, ByteBlockPool, BYTE_BLOCK_SIZE, FIRST_LEVEL_SIZE, LEVEL_SIZE_ARRAY, MAX_TERM_LEN,
    NEXT_LEVEL_ARRAY,
};
pub use self::int_block_pool::{IntAddr, IntBlockPool, INT_BLOCK_SIZE};
pub use self::slice_reader::ByteSliceReader;
pub use self::term_hashmap::{TermHashMap, TermLookup};

/// Dense identifier given to a term the first time it is seen by a field.
pub type TermOrdinal = u32;
