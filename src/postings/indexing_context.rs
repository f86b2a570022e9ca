use stacker::{Addr, ByteBlockPool, ByteSliceReader, IntAddr, IntBlockPool, FIRST_LEVEL_SIZE};

/// IndexingContext contains the transient memory arenas
/// backing the postings of every field of a buffer.
#[derive(Default)]
pub(crate) struct IndexingContext {
    /// Term bytes and per-term streams.
    pub byte_pool: ByteBlockPool,
    /// Per-term, per-stream write positions in `byte_pool`.
    pub int_pool: IntBlockPool,
}

impl IndexingContext {
    /// Returns the memory usage of the arenas, in bytes.
    pub fn mem_usage(&self) -> usize {
        self.byte_pool.mem_usage() + self.int_pool.mem_usage()
    }

    /// Releases both arenas.
    pub fn reset(&mut self) {
        self.byte_pool.reset();
        self.int_pool.reset();
    }

    /// Opens `stream_count` empty streams for a new term.
    ///
    /// Returns the address of the first write position word and the start of
    /// the first stream. Stream `i` starts at `byte_start + i * FIRST_LEVEL_SIZE`
    /// and its write position is word `int_start + i`.
    pub fn new_term_streams(&mut self, stream_count: usize) -> (IntAddr, Addr) {
        let int_start = self.int_pool.allocate(stream_count);
        let byte_start = self.byte_pool.new_first_level_slices(stream_count);
        for stream in 0..stream_count {
            let stream_start = stream_start(byte_start, stream);
            self.int_pool
                .set(int_start + stream as IntAddr, stream_start.as_u32());
        }
        (int_start, byte_start)
    }

    #[inline]
    fn write_position(&self, int_start: IntAddr, stream: usize) -> Addr {
        Addr::from_u32(self.int_pool.get(int_start + stream as IntAddr))
    }

    pub fn write_vint(&mut self, int_start: IntAddr, stream: usize, val: u32) {
        let upto = self.write_position(int_start, stream);
        let upto = self.byte_pool.write_vint(upto, val);
        self.int_pool.set(int_start + stream as IntAddr, upto.as_u32());
    }

    pub fn write_bytes(&mut self, int_start: IntAddr, stream: usize, data: &[u8]) {
        let upto = self.write_position(int_start, stream);
        let upto = self.byte_pool.write_bytes(upto, data);
        self.int_pool.set(int_start + stream as IntAddr, upto.as_u32());
    }

    /// Reader over everything written so far in one stream of a term.
    pub fn stream_reader(
        &self,
        int_start: IntAddr,
        byte_start: Addr,
        stream: usize,
    ) -> ByteSliceReader<'_> {
        ByteSliceReader::new(
            &self.byte_pool,
            stream_start(byte_start, stream),
            self.write_position(int_start, stream),
        )
    }
}

#[inline]
fn stream_start(byte_start: Addr, stream: usize) -> Addr {
    byte_start.offset((stream * FIRST_LEVEL_SIZE) as u32)
}
