use std::mem;
use std::ops::DerefMut;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, RwLock, Weak};

use super::buffered_updates::{BufferedUpdates, FrozenBufferedUpdates, ALL_DOCS};
use super::operation::{DeleteOperation, DeleteTarget};
use super::stamper::Stamper;
use crate::{DocId, Opstamp};

// The DeleteQueue is similar in conceptually to a multiple
// consumer single producer broadcast channel.
//
// All consumer will receive all messages.
//
// Consumer of the delete queue are holding a `DeleteCursor`,
// which points to a specific place of the `DeleteQueue`.
//
// New consumer can be created in two ways
// - calling `delete_queue.new_slice()` returns a slice starting after
// every operation pushed so far.
// - cloning an existing cursor returns a new cursor, that
// is at the exact same position, and can now advance independently
// from the original cursor.
#[derive(Default)]
struct InnerDeleteQueue {
    writer: Vec<DeleteOperation>,
    last_block: Weak<Block>,
}

/// Global state of the updates that apply to every sealed segment.
struct GlobalUpdates {
    slice: DeleteSlice,
    updates: BufferedUpdates,
}

/// The shared, append-only and globally ordered log of delete operations.
///
/// Cloning a `DeleteQueue` returns a handle on the same log.
#[derive(Clone)]
pub struct DeleteQueue {
    inner: Arc<RwLock<InnerDeleteQueue>>,
    stamper: Stamper,
    global: Arc<Mutex<GlobalUpdates>>,
    global_bytes_used: Arc<AtomicUsize>,
}

impl Default for DeleteQueue {
    fn default() -> DeleteQueue {
        DeleteQueue::new()
    }
}

impl DeleteQueue {
    /// Creates an empty delete queue. Opstamps start at 0.
    pub fn new() -> DeleteQueue {
        let inner = Arc::new(RwLock::new(InnerDeleteQueue::default()));
        let stamper = Stamper::new(0);
        let global_slice = DeleteSlice {
            cursor: DeleteCursor::new(get_last_block(&inner)),
            end: 0,
        };
        DeleteQueue {
            inner,
            stamper,
            global: Arc::new(Mutex::new(GlobalUpdates {
                slice: global_slice,
                updates: BufferedUpdates::default(),
            })),
            global_bytes_used: Arc::default(),
        }
    }

    /// Takes an opstamp that is larger than the opstamp of every operation
    /// in the log, and smaller than the opstamp of every operation pushed
    /// afterwards.
    fn stamp_tail(&self) -> Opstamp {
        // push() stamps under the write lock.
        let _rlock = self
            .inner
            .read()
            .expect("Failed to acquire read lock on delete queue writer");
        self.stamper.stamp()
    }

    /// Returns a slice positioned after every operation pushed so far.
    pub fn new_slice(&self) -> DeleteSlice {
        let start = self.stamp_tail();
        let mut cursor = DeleteCursor::new(get_last_block(&self.inner));
        cursor.skip_to(start);
        DeleteSlice { cursor, end: start }
    }

    /// Appends an operation to the log and returns its opstamp.
    pub fn push(&self, target: DeleteTarget) -> Opstamp {
        let opstamp = {
            let mut wlock = self
                .inner
                .write()
                .expect("Failed to acquire write lock on delete queue writer");
            let opstamp = self.stamper.stamp();
            wlock.writer.push(DeleteOperation { opstamp, target });
            opstamp
        };
        self.try_apply_global_slice(opstamp + 1);
        opstamp
    }

    /// Appends an operation and extends `slice` up to and including it.
    pub fn push_to_slice(&self, target: DeleteTarget, slice: &mut DeleteSlice) -> Opstamp {
        let opstamp = self.push(target);
        slice.end = opstamp + 1;
        opstamp
    }

    /// Extends `slice` to the current tail of the log.
    ///
    /// Returns a fresh opstamp, and whether the slice now holds operations.
    pub fn update_slice(&self, slice: &mut DeleteSlice) -> (Opstamp, bool) {
        let opstamp = self.stamp_tail();
        slice.end = opstamp;
        (opstamp, !slice.is_empty())
    }

    /// Folds the log into the global updates, if no other thread is
    /// currently doing it.
    fn try_apply_global_slice(&self, tail: Opstamp) {
        if let Ok(mut global) = self.global.try_lock() {
            let GlobalUpdates { slice, updates } = global.deref_mut();
            if slice.end < tail {
                slice.end = tail;
                slice.apply(updates, ALL_DOCS);
                self.global_bytes_used
                    .store(updates.bytes_used(), Ordering::SeqCst);
            }
        }
    }

    /// Takes every update pushed since the last call, handing ownership of
    /// them to the caller.
    ///
    /// When a slice is given, it is extended to the same point of the log.
    pub fn freeze_global_buffer(
        &self,
        caller_slice: Option<&mut DeleteSlice>,
    ) -> FrozenBufferedUpdates {
        let mut global = self
            .global
            .lock()
            .expect("Failed to acquire lock on the global delete buffer");
        let tail = self.stamp_tail();
        if let Some(caller_slice) = caller_slice {
            caller_slice.end = tail;
        }
        let GlobalUpdates { slice, updates } = global.deref_mut();
        slice.end = tail;
        slice.apply(updates, ALL_DOCS);
        let frozen = updates.freeze();
        self.global_bytes_used.store(0, Ordering::SeqCst);
        frozen
    }

    /// Estimated memory held by the global updates.
    pub fn ram_bytes_used(&self) -> usize {
        self.global_bytes_used.load(Ordering::SeqCst)
    }
}

fn get_last_block(inner: &Arc<RwLock<InnerDeleteQueue>>) -> Arc<Block> {
    {
        // try get the last block with simply acquiring the read lock.
        let rlock = inner
            .read()
            .expect("Failed to acquire read lock on delete queue writer");
        if let Some(block) = rlock.last_block.upgrade() {
            return block;
        }
    }
    // It failed. Let's double check after acquiring the write, as someone could have called
    // `get_last_block` right after we released the rlock.
    let mut wlock = inner
        .write()
        .expect("Failed to acquire write lock on delete queue writer");
    if let Some(block) = wlock.last_block.upgrade() {
        return block;
    }
    let block = Arc::new(Block {
        operations: Arc::new([]),
        next: NextBlock::from(Arc::clone(inner)),
    });
    wlock.last_block = Arc::downgrade(&block);
    block
}

// Creates a new block from the operations pushed so far, and makes it the
// last block.
//
// Returns `None` if there was no pending operation.
fn flush(inner: &Arc<RwLock<InnerDeleteQueue>>) -> Option<Arc<Block>> {
    let mut self_wlock = inner
        .write()
        .expect("Failed to acquire write lock on delete queue writer");
    if self_wlock.writer.is_empty() {
        return None;
    }
    let delete_operations = mem::take(&mut self_wlock.writer);
    let new_block = Arc::new(Block {
        operations: Arc::from(delete_operations.into_boxed_slice()),
        next: NextBlock::from(Arc::clone(inner)),
    });
    self_wlock.last_block = Arc::downgrade(&new_block);
    Some(new_block)
}

enum InnerNextBlock {
    Writer(Arc<RwLock<InnerDeleteQueue>>),
    Closed(Arc<Block>),
}

struct NextBlock(RwLock<InnerNextBlock>);

impl From<Arc<RwLock<InnerDeleteQueue>>> for NextBlock {
    fn from(inner: Arc<RwLock<InnerDeleteQueue>>) -> NextBlock {
        NextBlock(RwLock::new(InnerNextBlock::Writer(inner)))
    }
}

impl NextBlock {
    fn next_block(&self) -> Option<Arc<Block>> {
        {
            let next_read_lock = self
                .0
                .read()
                .expect("Failed to acquire write lock in delete queue");
            if let InnerNextBlock::Closed(ref block) = *next_read_lock {
                return Some(Arc::clone(block));
            }
        }
        let next_block;
        {
            let mut next_write_lock = self
                .0
                .write()
                .expect("Failed to acquire write lock in delete queue");
            match *next_write_lock {
                InnerNextBlock::Closed(ref block) => {
                    return Some(Arc::clone(block));
                }
                InnerNextBlock::Writer(ref inner) => match flush(inner) {
                    Some(flushed_next_block) => {
                        next_block = flushed_next_block;
                    }
                    None => {
                        return None;
                    }
                },
            }
            *next_write_lock.deref_mut() = InnerNextBlock::Closed(Arc::clone(&next_block));
            Some(next_block)
        }
    }
}

struct Block {
    operations: Arc<[DeleteOperation]>,
    next: NextBlock,
}

/// A position in the [`DeleteQueue`].
#[derive(Clone)]
pub struct DeleteCursor {
    block: Arc<Block>,
    pos: usize,
}

impl DeleteCursor {
    fn new(block: Arc<Block>) -> DeleteCursor {
        let pos = block.operations.len();
        DeleteCursor { block, pos }
    }

    /// Skips operations and position it so that
    /// - either all of the delete operation currently in the queue are consume and the next get
    ///   will return `None`.
    /// - the next get will return the first operation with an
    /// `opstamp >= target_opstamp`.
    pub fn skip_to(&mut self, target_opstamp: Opstamp) {
        // TODO: skip whole blocks by looking at their last opstamp.
        while self.is_behind_opstamp(target_opstamp) {
            self.advance();
        }
    }

    #[allow(clippy::wrong_self_convention)]
    fn is_behind_opstamp(&mut self, target_opstamp: Opstamp) -> bool {
        self.get()
            .map(|operation| operation.opstamp < target_opstamp)
            .unwrap_or(false)
    }

    /// If the current block has been entirely
    /// consumed, try to load the next one.
    ///
    /// Return `true`, if after this attempt,
    /// the cursor is on a block that has not
    /// been entirely consumed.
    /// Return `false`, if we have reached the end of the queue.
    fn load_block_if_required(&mut self) -> bool {
        while self.pos >= self.block.operations.len() {
            // we have consumed our operations entirely.
            // let's ask our writer if he has more for us.
            match self.block.next.next_block() {
                Some(block) => {
                    self.block = block;
                    self.pos = 0;
                }
                None => {
                    return false;
                }
            }
        }
        true
    }

    /// Advance to the next delete operation.
    /// Returns true iff there is such an operation.
    pub fn advance(&mut self) -> bool {
        if self.load_block_if_required() {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    /// Get the current delete operation.
    /// Calling `.get` does not advance the cursor.
    pub fn get(&mut self) -> Option<&DeleteOperation> {
        if self.load_block_if_required() {
            Some(&self.block.operations[self.pos])
        } else {
            None
        }
    }
}

/// The operations of the [`DeleteQueue`] a buffer has not folded into its
/// pending updates yet.
///
/// It covers the operations between its cursor and its end opstamp
/// (excluded).
#[derive(Clone)]
pub struct DeleteSlice {
    cursor: DeleteCursor,
    end: Opstamp,
}

impl DeleteSlice {
    /// Returns true iff the slice holds no operation.
    pub fn is_empty(&mut self) -> bool {
        let end = self.end;
        self.cursor
            .get()
            .map_or(true, |operation| operation.opstamp >= end)
    }

    /// Folds the operations of the slice into `updates`, bounded by
    /// `doc_id_upto`, and empties the slice.
    pub fn apply(&mut self, updates: &mut BufferedUpdates, doc_id_upto: DocId) {
        let end = self.end;
        while let Some(operation) = self.cursor.get() {
            if operation.opstamp >= end {
                break;
            }
            updates.apply_operation(operation, doc_id_upto);
            self.cursor.advance();
        }
    }

    /// Empties the slice without applying its operations.
    pub fn reset(&mut self) {
        self.cursor.skip_to(self.end);
    }
}
