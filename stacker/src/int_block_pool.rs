const INT_BLOCK_SHIFT: usize = 13;
pub const INT_BLOCK_SIZE: usize = 1 << INT_BLOCK_SHIFT;
const INT_BLOCK_MASK: usize = INT_BLOCK_SIZE - 1;

/// Global index of a word in an [`IntBlockPool`].
pub type IntAddr = u32;

/// Arena of `u32` words, allocated by blocks of 8192 words.
///
/// The indexer keeps one word per term and per stream in here: the
/// address of the next byte to write in that stream.
pub struct IntBlockPool {
    blocks: Vec<Box<[u32]>>,
    int_upto: usize,
}

impl Default for IntBlockPool {
    fn default() -> Self {
        IntBlockPool::new()
    }
}

impl IntBlockPool {
    pub fn new() -> IntBlockPool {
        IntBlockPool {
            blocks: Vec::new(),
            int_upto: INT_BLOCK_SIZE,
        }
    }

    pub fn mem_usage(&self) -> usize {
        self.blocks.len() * INT_BLOCK_SIZE * std::mem::size_of::<u32>()
    }

    pub fn reset(&mut self) {
        self.blocks = Vec::new();
        self.int_upto = INT_BLOCK_SIZE;
    }

    /// Reserves `count` consecutive words, all within the same block.
    pub fn allocate(&mut self, count: usize) -> IntAddr {
        assert!(count <= INT_BLOCK_SIZE);
        if INT_BLOCK_SIZE - self.int_upto < count {
            self.blocks.push(vec![0u32; INT_BLOCK_SIZE].into_boxed_slice());
            self.int_upto = 0;
        }
        let addr = ((self.blocks.len() - 1) << INT_BLOCK_SHIFT | self.int_upto) as IntAddr;
        self.int_upto += count;
        addr
    }

    #[inline]
    pub fn get(&self, addr: IntAddr) -> u32 {
        let addr = addr as usize;
        self.blocks[addr >> INT_BLOCK_SHIFT][addr & INT_BLOCK_MASK]
    }

    #[inline]
    pub fn set(&mut self, addr: IntAddr, val: u32) {
        let addr = addr as usize;
        self.blocks[addr >> INT_BLOCK_SHIFT][addr & INT_BLOCK_MASK] = val;
    }
}
