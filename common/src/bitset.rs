use std::fmt;

#[derive(Clone, Copy, Eq, PartialEq)]
pub struct TinySet(u64);

impl fmt::Debug for TinySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.into_iter().collect::<Vec<u32>>().fmt(f)
    }
}

pub struct TinySetIterator(TinySet);
impl Iterator for TinySetIterator {
    type Item = u32;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.0.pop_lowest()
    }
}

impl IntoIterator for TinySet {
    type Item = u32;
    type IntoIter = TinySetIterator;
    fn into_iter(self) -> Self::IntoIter {
        TinySetIterator(self)
    }
}

impl TinySet {
    /// Returns an empty `TinySet`.
    #[inline]
    pub fn empty() -> TinySet {
        TinySet(0u64)
    }

    /// Returns a full `TinySet`.
    #[inline]
    pub fn full() -> TinySet {
        TinySet(!0u64)
    }

    /// Returns true iff the `TinySet` contains the element `el`.
    #[inline]
    pub fn contains(self, el: u32) -> bool {
        self.0 & (1u64 << el) != 0
    }

    /// Returns the number of elements in the TinySet.
    #[inline]
    pub fn len(self) -> u32 {
        self.0.count_ones()
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self.0 == 0u64
    }

    /// Inserts an element within `[0..64)`.
    ///
    /// Returns true if the set changed.
    #[inline]
    pub fn insert_mut(&mut self, el: u32) -> bool {
        let old = self.0;
        self.0 |= 1u64 << el;
        old != self.0
    }

    /// Removes an element within `[0..64)`.
    ///
    /// Returns true if the set changed.
    #[inline]
    pub fn remove_mut(&mut self, el: u32) -> bool {
        let old = self.0;
        self.0 &= !(1u64 << el);
        old != self.0
    }

    /// Returns the lowest element in the `TinySet`
    /// and removes it.
    #[inline]
    pub fn pop_lowest(&mut self) -> Option<u32> {
        if self.is_empty() {
            None
        } else {
            let lowest = self.0.trailing_zeros();
            self.0 ^= 1u64 << lowest;
            Some(lowest)
        }
    }

    /// Returns a `TinySet` that contains all values up
    /// to limit excluded.
    ///
    /// The limit is assumed to be strictly lower than 64.
    pub fn range_lower(upper_bound: u32) -> TinySet {
        TinySet((1u64 << u64::from(upper_bound % 64u32)) - 1u64)
    }
}

/// Bit-per-document set over `[0, max_value)`.
///
/// Sealed segments use it as their live-docs bitmap: it starts full and
/// deleted documents are cleared one by one.
#[derive(Clone, PartialEq, Eq)]
pub struct BitSet {
    tinysets: Box<[TinySet]>,
    len: u64,
    max_value: u32,
}

impl fmt::Debug for BitSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BitSet")
            .field("max_value", &self.max_value)
            .field("len", &self.len)
            .finish()
    }
}

fn num_buckets(max_val: u32) -> u32 {
    (max_val + 63u32) / 64u32
}

impl BitSet {
    /// Creates a new empty `BitSet` that may contain elements
    /// within `[0, max_val)`.
    pub fn with_max_value(max_value: u32) -> BitSet {
        let num_buckets = num_buckets(max_value);
        let tinybitsets = vec![TinySet::empty(); num_buckets as usize].into_boxed_slice();
        BitSet {
            tinysets: tinybitsets,
            len: 0,
            max_value,
        }
    }

    /// Creates a new `BitSet` with all values of `[0, max_val)` set.
    pub fn with_max_value_and_full(max_value: u32) -> BitSet {
        let num_buckets = num_buckets(max_value);
        let mut tinybitsets = vec![TinySet::full(); num_buckets as usize].into_boxed_slice();

        // Fix padding
        let lower = max_value % 64u32;
        if lower != 0 {
            tinybitsets[tinybitsets.len() - 1] = TinySet::range_lower(lower);
        }
        BitSet {
            tinysets: tinybitsets,
            len: max_value as u64,
            max_value,
        }
    }

    /// Returns the number of elements in the `BitSet`.
    #[inline]
    pub fn len(&self) -> usize {
        self.len as usize
    }

    /// Inserts an element in the `BitSet`.
    ///
    /// Returns true if the element was absent.
    #[inline]
    pub fn insert(&mut self, el: u32) -> bool {
        assert!(el < self.max_value, "{el} is out of [0, {})", self.max_value);
        let changed = self.tinysets[(el / 64u32) as usize].insert_mut(el % 64u32);
        self.len += u64::from(changed);
        changed
    }

    /// Removes an element from the `BitSet`.
    ///
    /// Returns true if the element was present.
    #[inline]
    pub fn remove(&mut self, el: u32) -> bool {
        assert!(el < self.max_value, "{el} is out of [0, {})", self.max_value);
        let changed = self.tinysets[(el / 64u32) as usize].remove_mut(el % 64u32);
        self.len -= u64::from(changed);
        changed
    }

    /// Returns true iff the elements is in the `BitSet`.
    #[inline]
    pub fn contains(&self, el: u32) -> bool {
        if el >= self.max_value {
            return false;
        }
        self.tinysets[(el / 64u32) as usize].contains(el % 64)
    }

    /// Iterates over the elements in increasing order.
    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        self.tinysets
            .iter()
            .enumerate()
            .flat_map(|(bucket, tinyset)| {
                let base = bucket as u32 * 64;
                tinyset.into_iter().map(move |lower| base + lower)
            })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use rand::Rng;

    use super::*;

    #[test]
    fn test_tiny_set_remove() {
        let mut tinyset = TinySet::range_lower(10);
        assert!(tinyset.remove_mut(3));
        assert!(!tinyset.remove_mut(3));
        assert!(!tinyset.contains(3));
        assert_eq!(tinyset.len(), 9);
        assert_eq!(tinyset.pop_lowest(), Some(0));
    }

    #[test]
    fn test_bitset_full_padding() {
        let bitset = BitSet::with_max_value_and_full(70);
        assert_eq!(bitset.len(), 70);
        assert!(bitset.contains(69));
        assert!(!bitset.contains(70));
        assert_eq!(bitset.iter().count(), 70);
    }

    #[test]
    fn test_bitset_remove_counts_once() {
        let mut bitset = BitSet::with_max_value_and_full(10);
        assert!(bitset.remove(4));
        assert!(!bitset.remove(4));
        assert_eq!(bitset.len(), 9);
        assert!(bitset.insert(4));
        assert_eq!(bitset.len(), 10);
    }

    #[test]
    fn test_bitset_random() {
        let max_value = 1_000u32;
        let mut rng = rand::thread_rng();
        let mut bitset = BitSet::with_max_value(max_value);
        let mut expected = HashSet::new();
        for _ in 0..500 {
            let el = rng.gen_range(0..max_value);
            assert_eq!(bitset.insert(el), expected.insert(el));
        }
        assert_eq!(bitset.len(), expected.len());
        let mut sorted: Vec<u32> = expected.into_iter().collect();
        sorted.sort_unstable();
        assert_eq!(bitset.iter().collect::<Vec<u32>>(), sorted);
    }
}
