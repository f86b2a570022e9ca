use std::mem;

use crate::{Addr, ByteBlockPool, TermOrdinal};

/// `KeyValue` is the item stored in the hash table.
/// The key is a term stored in an external [`ByteBlockPool`].
#[derive(Copy, Clone)]
struct KeyValue {
    key_addr: Addr,
    hash: u32,
    term_ord: TermOrdinal,
}

impl Default for KeyValue {
    fn default() -> Self {
        KeyValue {
            key_addr: Addr::null_pointer(),
            hash: 0,
            term_ord: 0,
        }
    }
}

impl KeyValue {
    #[inline]
    fn is_empty(&self) -> bool {
        self.key_addr.is_null()
    }
}

/// Outcome of [`TermHashMap::get_or_insert`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TermLookup {
    /// The term was unknown and just received this ordinal.
    Inserted(TermOrdinal),
    /// The term was already present.
    Found(TermOrdinal),
}

impl TermLookup {
    #[inline]
    pub fn term_ord(self) -> TermOrdinal {
        match self {
            TermLookup::Inserted(term_ord) | TermLookup::Found(term_ord) => term_ord,
        }
    }

    #[inline]
    pub fn is_new(self) -> bool {
        matches!(self, TermLookup::Inserted(_))
    }
}

struct LinearProbing {
    pos: usize,
    mask: usize,
}

impl LinearProbing {
    #[inline]
    fn compute(hash: u32, mask: usize) -> LinearProbing {
        LinearProbing {
            pos: hash as usize,
            mask,
        }
    }

    #[inline]
    fn next_probe(&mut self) -> usize {
        self.pos = self.pos.wrapping_add(1);
        self.pos & self.mask
    }
}

/// Open addressing hash table from term bytes to dense term ordinals.
///
/// Term bytes live in a [`ByteBlockPool`] passed to every call, so that all
/// the fields of a buffer can share the same pool. Ordinals are handed out
/// in insertion order, starting at 0.
pub struct TermHashMap {
    table: Vec<KeyValue>,
    mask: usize,
    /// Term address, indexed by ordinal.
    term_addrs: Vec<Addr>,
}

impl Default for TermHashMap {
    fn default() -> Self {
        TermHashMap::with_capacity(1 << 4)
    }
}

impl TermHashMap {
    /// `table_size` is rounded up to a power of two.
    pub fn with_capacity(table_size: usize) -> TermHashMap {
        let table_size = table_size.max(2).next_power_of_two();
        TermHashMap {
            table: vec![KeyValue::default(); table_size],
            mask: table_size - 1,
            term_addrs: Vec::new(),
        }
    }

    #[inline]
    fn get_hash(key: &[u8]) -> u32 {
        murmurhash32::murmurhash2(key)
    }

    /// Memory used by the table itself, term bytes excluded.
    pub fn mem_usage(&self) -> usize {
        self.table.capacity() * mem::size_of::<KeyValue>()
            + self.term_addrs.capacity() * mem::size_of::<Addr>()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.term_addrs.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.term_addrs.is_empty()
    }

    #[inline]
    fn is_saturated(&self) -> bool {
        self.table.len() <= self.len() * 2
    }

    fn resize(&mut self) {
        let new_len = self.table.len() * 2;
        let mask = new_len - 1;
        self.mask = mask;
        let old_table = mem::replace(&mut self.table, vec![KeyValue::default(); new_len]);
        for key_value in old_table.into_iter().filter(|kv| !kv.is_empty()) {
            let mut probe = LinearProbing::compute(key_value.hash, mask);
            loop {
                let bucket = probe.next_probe();
                if self.table[bucket].is_empty() {
                    self.table[bucket] = key_value;
                    break;
                }
            }
        }
    }

    /// Returns the bytes of the term with the given ordinal.
    pub fn term<'a>(&self, term_ord: TermOrdinal, pool: &'a ByteBlockPool) -> &'a [u8] {
        pool.term_at(self.term_addrs[term_ord as usize])
    }

    /// Looks a term up without inserting it.
    pub fn get(&self, key: &[u8], pool: &ByteBlockPool) -> Option<TermOrdinal> {
        let hash = Self::get_hash(key);
        let mut probe = LinearProbing::compute(hash, self.mask);
        loop {
            let kv = self.table[probe.next_probe()];
            if kv.is_empty() {
                return None;
            }
            if kv.hash == hash && pool.term_at(kv.key_addr) == key {
                return Some(kv.term_ord);
            }
        }
    }

    /// Returns the ordinal of `key`, allocating the next one if the key is new.
    ///
    /// # Panics
    ///
    /// Panics if the key is longer than [`crate::MAX_TERM_LEN`].
    pub fn get_or_insert(&mut self, key: &[u8], pool: &mut ByteBlockPool) -> TermLookup {
        if self.is_saturated() {
            self.resize();
        }
        let hash = Self::get_hash(key);
        let mut probe = LinearProbing::compute(hash, self.mask);
        loop {
            let bucket = probe.next_probe();
            let kv = self.table[bucket];
            if kv.is_empty() {
                let key_addr = pool.append_term(key);
                let term_ord = self.term_addrs.len() as TermOrdinal;
                self.term_addrs.push(key_addr);
                self.table[bucket] = KeyValue {
                    key_addr,
                    hash,
                    term_ord,
                };
                return TermLookup::Inserted(term_ord);
            }
            if kv.hash == hash && pool.term_at(kv.key_addr) == key {
                return TermLookup::Found(kv.term_ord);
            }
        }
    }

    /// Returns every ordinal, ordered by the unsigned lexicographic
    /// order of the term bytes.
    ///
    /// Terms are unique, so the order is total and does not depend
    /// on insertion order or on the hash layout.
    pub fn sorted_term_ords(&self, pool: &ByteBlockPool) -> Vec<TermOrdinal> {
        let mut term_ords: Vec<TermOrdinal> = (0..self.len() as TermOrdinal).collect();
        term_ords.sort_by(|&left, &right| self.term(left, pool).cmp(self.term(right, pool)));
        term_ords
    }
}
