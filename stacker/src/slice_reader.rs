use std::io;

use crate::byte_block_pool::{forward_addr, SLICE_ADDR_NUM_BYTES};
use crate::{
    Addr, ByteBlockPool, BYTE_BLOCK_SIZE, FIRST_LEVEL_SIZE, LEVEL_SIZE_ARRAY, NEXT_LEVEL_ARRAY,
};

/// Reads back a stream written as a chain of slices, from its start address
/// up to its current write position (excluded).
pub struct ByteSliceReader<'a> {
    pool: &'a ByteBlockPool,
    block: &'a [u8],
    block_offset: usize,
    upto: usize,
    /// Local position where the data of the current slice stops.
    limit: usize,
    level: usize,
    end: usize,
}

impl<'a> ByteSliceReader<'a> {
    pub fn new(pool: &'a ByteBlockPool, start: Addr, end: Addr) -> ByteSliceReader<'a> {
        let start_global = start.as_u32() as usize;
        let end = end.as_u32() as usize;
        assert!(start_global <= end);
        let block_offset = start.block_id() * BYTE_BLOCK_SIZE;
        let upto = start.block_local_addr();
        let limit = if start_global + FIRST_LEVEL_SIZE >= end {
            end - block_offset
        } else {
            upto + FIRST_LEVEL_SIZE - SLICE_ADDR_NUM_BYTES
        };
        ByteSliceReader {
            pool,
            block: pool.block(start.block_id()),
            block_offset,
            upto,
            limit,
            level: 0,
            end,
        }
    }

    /// Returns true once the whole stream has been read.
    #[inline]
    pub fn eof(&self) -> bool {
        self.upto + self.block_offset == self.end
    }

    fn next_slice(&mut self) {
        let next = forward_addr(&self.block[self.limit..]);
        self.level = NEXT_LEVEL_ARRAY[self.level];
        let slice_size = LEVEL_SIZE_ARRAY[self.level];
        self.block = self.pool.block(next.block_id());
        self.block_offset = next.block_id() * BYTE_BLOCK_SIZE;
        self.upto = next.block_local_addr();
        self.limit = if next.as_u32() as usize + slice_size >= self.end {
            // this is the last slice of the stream.
            self.end - self.block_offset
        } else {
            self.upto + slice_size - SLICE_ADDR_NUM_BYTES
        };
    }

    /// # Panics
    ///
    /// Panics if the stream is exhausted.
    pub fn read_byte(&mut self) -> u8 {
        assert!(!self.eof(), "read past the end of the slice chain");
        if self.upto == self.limit {
            self.next_slice();
        }
        let b = self.block[self.upto];
        self.upto += 1;
        b
    }

    /// Appends the remainder of the stream to `output`.
    pub fn read_to_end(&mut self, output: &mut Vec<u8>) {
        while !self.eof() {
            if self.upto == self.limit {
                self.next_slice();
            }
            output.extend_from_slice(&self.block[self.upto..self.limit]);
            self.upto = self.limit;
        }
    }
}

impl<'a> io::Read for ByteSliceReader<'a> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.eof() || buf.is_empty() {
            return Ok(0);
        }
        if self.upto == self.limit {
            self.next_slice();
        }
        let len = (self.limit - self.upto).min(buf.len());
        buf[..len].copy_from_slice(&self.block[self.upto..self.upto + len]);
        self.upto += len;
        Ok(len)
    }
}
