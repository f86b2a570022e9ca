//! Byte arena made of fixed size, zero-filled blocks.
//!
//! Besides plain appends (used for term bytes), the pool stores
//! unbounded streams as chains of *slices*. A slice is a run of bytes
//! whose last byte is a non-zero level marker. Writers append until they
//! hit that marker, then [`ByteBlockPool::alloc_slice`] chains a bigger
//! slice and overwrites the tail of the full one with a forwarding address.
//!
//! Since blocks are zero-filled and stream bytes are written at most once,
//! any non-zero byte found at the write position is a level marker.

/// Blocks are `32KB` large.
const BYTE_BLOCK_SHIFT: usize = 15;
pub const BYTE_BLOCK_SIZE: usize = 1 << BYTE_BLOCK_SHIFT;
const BYTE_BLOCK_MASK: usize = BYTE_BLOCK_SIZE - 1;

/// Addresses are 32 bits, which caps a pool at 4GB.
const MAX_NUM_BLOCKS: usize = 1 << (32 - BYTE_BLOCK_SHIFT);

/// Size of the slices, indexed by level.
pub const LEVEL_SIZE_ARRAY: [usize; 10] = [5, 14, 20, 30, 40, 40, 80, 80, 120, 200];
/// Level of the slice that follows a full slice of a given level.
pub const NEXT_LEVEL_ARRAY: [usize; 10] = [1, 2, 3, 4, 5, 6, 7, 8, 9, 9];
pub const FIRST_LEVEL_SIZE: usize = LEVEL_SIZE_ARRAY[0];

/// Bytes needed to store a forwarding address.
const ADDR_NUM_BYTES: usize = 4;

/// A term and its 2 bytes length prefix must fit in one block.
pub const MAX_TERM_LEN: usize = BYTE_BLOCK_SIZE - 2;

/// Global offset into a [`ByteBlockPool`].
///
/// The upper 17 bits identify the block, the lower 15 bits are
/// the position within this block.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Addr(u32);

impl Addr {
    /// Creates a null pointer.
    #[inline]
    pub fn null_pointer() -> Addr {
        Addr(u32::MAX)
    }

    /// Returns true if and only if the `Addr` is null.
    #[inline]
    pub fn is_null(&self) -> bool {
        self.0 == u32::MAX
    }

    /// Returns the `Addr` object for `addr + offset`.
    #[inline]
    pub fn offset(&self, offset: u32) -> Addr {
        Addr(self.0.wrapping_add(offset))
    }

    #[inline]
    pub fn from_u32(val: u32) -> Addr {
        Addr(val)
    }

    #[inline]
    pub fn as_u32(&self) -> u32 {
        self.0
    }

    #[inline]
    fn new(block_id: usize, local_addr: usize) -> Addr {
        Addr((block_id << BYTE_BLOCK_SHIFT | local_addr) as u32)
    }

    #[inline]
    pub(crate) fn block_id(&self) -> usize {
        self.0 as usize >> BYTE_BLOCK_SHIFT
    }

    #[inline]
    pub(crate) fn block_local_addr(&self) -> usize {
        self.0 as usize & BYTE_BLOCK_MASK
    }
}

pub struct ByteBlockPool {
    blocks: Vec<Box<[u8]>>,
    /// Write position within the last block.
    byte_upto: usize,
}

impl Default for ByteBlockPool {
    fn default() -> Self {
        ByteBlockPool::new()
    }
}

impl ByteBlockPool {
    /// Creates an empty pool. No block is allocated before the first write.
    pub fn new() -> ByteBlockPool {
        ByteBlockPool {
            blocks: Vec::new(),
            byte_upto: BYTE_BLOCK_SIZE,
        }
    }

    /// Number of bytes reserved by the pool.
    pub fn mem_usage(&self) -> usize {
        self.blocks.len() * BYTE_BLOCK_SIZE
    }

    pub fn num_blocks(&self) -> usize {
        self.blocks.len()
    }

    /// Releases every block at once.
    pub fn reset(&mut self) {
        self.blocks = Vec::new();
        self.byte_upto = BYTE_BLOCK_SIZE;
    }

    fn next_block(&mut self) {
        assert!(
            self.blocks.len() < MAX_NUM_BLOCKS,
            "byte block pool exceeded its 4GB address space"
        );
        self.blocks.push(vec![0u8; BYTE_BLOCK_SIZE].into_boxed_slice());
        self.byte_upto = 0;
    }

    fn current_addr(&self) -> Addr {
        Addr::new(self.blocks.len() - 1, self.byte_upto)
    }

    /// Makes sure the next `num_bytes` allocated bytes are contiguous.
    fn ensure_room(&mut self, num_bytes: usize) {
        if BYTE_BLOCK_SIZE - self.byte_upto < num_bytes {
            self.next_block();
        }
    }

    #[inline]
    pub fn byte_at(&self, addr: Addr) -> u8 {
        self.blocks[addr.block_id()][addr.block_local_addr()]
    }

    #[inline]
    fn set_byte(&mut self, addr: Addr, b: u8) {
        self.blocks[addr.block_id()][addr.block_local_addr()] = b;
    }

    pub(crate) fn block(&self, block_id: usize) -> &[u8] {
        &self.blocks[block_id]
    }

    /// Appends a term prefixed by its length.
    ///
    /// # Panics
    ///
    /// Panics if the term is longer than [`MAX_TERM_LEN`].
    pub fn append_term(&mut self, term: &[u8]) -> Addr {
        assert!(term.len() <= MAX_TERM_LEN, "term of {} bytes", term.len());
        let num_bytes = 2 + term.len();
        self.ensure_room(num_bytes);
        let addr = self.current_addr();
        let start = self.byte_upto;
        let block = &mut self.blocks[addr.block_id()];
        block[start..start + 2].copy_from_slice(&(term.len() as u16).to_le_bytes());
        block[start + 2..start + num_bytes].copy_from_slice(term);
        self.byte_upto += num_bytes;
        addr
    }

    /// Reads back a term written by [`ByteBlockPool::append_term`].
    pub fn term_at(&self, addr: Addr) -> &[u8] {
        let block = &self.blocks[addr.block_id()];
        let start = addr.block_local_addr();
        let len = u16::from_le_bytes([block[start], block[start + 1]]) as usize;
        &block[start + 2..start + 2 + len]
    }

    /// Allocates a new slice of `size` bytes and returns its start.
    ///
    /// The last byte of the slice holds the level marker of a level 0 slice.
    pub fn new_slice(&mut self, size: usize) -> Addr {
        self.ensure_room(size);
        let addr = self.current_addr();
        self.byte_upto += size;
        let block_id = self.blocks.len() - 1;
        self.blocks[block_id][self.byte_upto - 1] = 16u8;
        addr
    }

    /// Allocates `count` first level slices, contiguous within a single block,
    /// and returns the start of the first one.
    ///
    /// Slice `i` starts at `start + i * FIRST_LEVEL_SIZE`.
    pub fn new_first_level_slices(&mut self, count: usize) -> Addr {
        self.ensure_room(count * FIRST_LEVEL_SIZE);
        let start = self.current_addr();
        for _ in 0..count {
            self.new_slice(FIRST_LEVEL_SIZE);
        }
        start
    }

    /// Chains a new slice to the full slice whose level marker sits at `upto`.
    ///
    /// The last three data bytes of the full slice are moved to the head of the
    /// new slice, and their place, together with the marker, receives the
    /// address of the new slice. Returns the write position in the new slice.
    pub fn alloc_slice(&mut self, upto: Addr) -> Addr {
        let level = (self.byte_at(upto) & 15u8) as usize;
        let new_level = NEXT_LEVEL_ARRAY[level];
        let new_size = LEVEL_SIZE_ARRAY[new_level];
        self.ensure_room(new_size);
        let new_start = self.current_addr();
        self.byte_upto += new_size;

        let tail_start = Addr(upto.0 - 3);
        let block_id = self.blocks.len() - 1;
        let new_local = new_start.block_local_addr();
        for i in 0..3 {
            let b = self.byte_at(tail_start.offset(i as u32));
            self.blocks[block_id][new_local + i] = b;
        }
        let forward = new_start.as_u32().to_le_bytes();
        for (i, &b) in forward.iter().enumerate() {
            self.set_byte(tail_start.offset(i as u32), b);
        }
        self.blocks[block_id][self.byte_upto - 1] = 16u8 | new_level as u8;
        new_start.offset(3)
    }

    /// Writes one byte of a stream at `upto`, chaining a new slice
    /// if `upto` points at a level marker. Returns the next write position.
    #[inline]
    pub fn write_byte(&mut self, upto: Addr, b: u8) -> Addr {
        let upto = if self.byte_at(upto) != 0 {
            self.alloc_slice(upto)
        } else {
            upto
        };
        self.set_byte(upto, b);
        upto.offset(1)
    }

    pub fn write_bytes(&mut self, mut upto: Addr, data: &[u8]) -> Addr {
        for &b in data {
            upto = self.write_byte(upto, b);
        }
        upto
    }

    /// Writes `val` as a vint: seven bits at a time, lowest group first,
    /// high bit set on every byte but the last.
    pub fn write_vint(&mut self, mut upto: Addr, mut val: u32) -> Addr {
        while val >= 0x80 {
            upto = self.write_byte(upto, (val as u8 & 0x7F) | 0x80);
            val >>= 7;
        }
        self.write_byte(upto, val as u8)
    }
}

pub(crate) fn forward_addr(bytes: &[u8]) -> Addr {
    let mut buf = [0u8; ADDR_NUM_BYTES];
    buf.copy_from_slice(&bytes[..ADDR_NUM_BYTES]);
    Addr(u32::from_le_bytes(buf))
}

pub(crate) const SLICE_ADDR_NUM_BYTES: usize = ADDR_NUM_BYTES;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_addr_layout() {
        let addr = Addr::new(3, 17);
        assert_eq!(addr.block_id(), 3);
        assert_eq!(addr.block_local_addr(), 17);
        assert_eq!(addr.as_u32(), 3 * BYTE_BLOCK_SIZE as u32 + 17);
        assert!(Addr::null_pointer().is_null());
    }

    #[test]
    fn test_new_slice_marker() {
        let mut pool = ByteBlockPool::new();
        let start = pool.new_slice(FIRST_LEVEL_SIZE);
        for i in 0..4 {
            assert_eq!(pool.byte_at(start.offset(i)), 0);
        }
        assert_eq!(pool.byte_at(start.offset(4)), 16);
    }

    #[test]
    fn test_alloc_slice_moves_tail_and_forwards() {
        let mut pool = ByteBlockPool::new();
        let start = pool.new_slice(FIRST_LEVEL_SIZE);
        let upto = pool.write_bytes(start, &[1, 2, 3, 4]);
        assert_eq!(upto, start.offset(4));
        let upto = pool.write_byte(upto, 5);
        // second slice starts right after the first one.
        let second = start.offset(FIRST_LEVEL_SIZE as u32);
        assert_eq!(upto, second.offset(4));
        assert_eq!(pool.byte_at(start), 1);
        assert_eq!(
            forward_addr(&pool.block(0)[1..5]),
            second,
            "forwarding address replaces the tail"
        );
        for (i, expected) in [2u8, 3, 4, 5].iter().enumerate() {
            assert_eq!(pool.byte_at(second.offset(i as u32)), *expected);
        }
        assert_eq!(
            pool.byte_at(second.offset(LEVEL_SIZE_ARRAY[1] as u32 - 1)),
            16 | 1
        );
    }

    #[test]
    fn test_slices_never_straddle_blocks() {
        let mut pool = ByteBlockPool::new();
        pool.append_term(&vec![7u8; BYTE_BLOCK_SIZE - 2 - 3]);
        assert_eq!(pool.num_blocks(), 1);
        let start = pool.new_first_level_slices(2);
        assert_eq!(pool.num_blocks(), 2);
        assert_eq!(start.block_id(), 1);
        assert_eq!(start.block_local_addr(), 0);
    }

    #[test]
    fn test_term_round_trip() {
        let mut pool = ByteBlockPool::new();
        let hello = pool.append_term(b"hello");
        let empty = pool.append_term(b"");
        let long_term = vec![b'x'; MAX_TERM_LEN];
        let long = pool.append_term(&long_term);
        assert_eq!(pool.term_at(hello), b"hello");
        assert_eq!(pool.term_at(empty), b"");
        assert_eq!(pool.term_at(long), &long_term[..]);
        assert_eq!(pool.mem_usage(), 2 * BYTE_BLOCK_SIZE);
        pool.reset();
        assert_eq!(pool.mem_usage(), 0);
    }

    #[test]
    #[should_panic]
    fn test_immense_term_panics() {
        let mut pool = ByteBlockPool::new();
        pool.append_term(&vec![0u8; MAX_TERM_LEN + 1]);
    }
}
