#![allow(clippy::len_without_is_empty)]

//! Small building blocks shared by the scrivener crates: the live-docs
//! bitset, the continuation-bit variable length integer decoder and a
//! human readable byte count.

mod bitset;
mod byte_count;
mod vint;

pub use bitset::*;
pub use byte_count::ByteCount;
pub use vint::read_u32_vint;
