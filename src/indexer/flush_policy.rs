use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::sync::Arc;

/// Live statistics of one registered buffer.
///
/// Updated by the thread owning the buffer, read by the flush policy.
#[derive(Debug)]
pub struct BufferStats {
    id: u64,
    bytes_used: AtomicUsize,
    num_docs: AtomicU32,
    flush_pending: AtomicBool,
}

impl BufferStats {
    pub(crate) fn new(id: u64) -> BufferStats {
        BufferStats {
            id,
            bytes_used: AtomicUsize::new(0),
            num_docs: AtomicU32::new(0),
            flush_pending: AtomicBool::new(false),
        }
    }

    /// Registration id of the buffer.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Memory used by the buffer, in bytes.
    pub fn bytes_used(&self) -> usize {
        self.bytes_used.load(Ordering::SeqCst)
    }

    /// Number of documents admitted by the buffer.
    pub fn num_docs(&self) -> u32 {
        self.num_docs.load(Ordering::SeqCst)
    }

    /// Returns true iff the buffer was marked flush-pending.
    pub fn is_flush_pending(&self) -> bool {
        self.flush_pending.load(Ordering::SeqCst)
    }

    pub(crate) fn update(&self, bytes_used: usize, num_docs: u32) {
        self.bytes_used.store(bytes_used, Ordering::SeqCst);
        self.num_docs.store(num_docs, Ordering::SeqCst);
    }

    pub(crate) fn mark_flush_pending(&self) -> bool {
        !self.flush_pending.swap(true, Ordering::SeqCst)
    }
}

/// The view a [`FlushPolicy`] gets of the buffers of an index writer.
///
/// The flush control lock is held while the policy runs, so that two
/// threads never take a decision on the same state.
pub struct FlushState<'a> {
    buffers: &'a [Arc<BufferStats>],
    delete_bytes: usize,
    apply_all_deletes: &'a AtomicBool,
}

impl<'a> FlushState<'a> {
    pub(crate) fn new(
        buffers: &'a [Arc<BufferStats>],
        delete_bytes: usize,
        apply_all_deletes: &'a AtomicBool,
    ) -> FlushState<'a> {
        FlushState {
            buffers,
            delete_bytes,
            apply_all_deletes,
        }
    }

    /// Registered buffers.
    pub fn buffers(&self) -> impl Iterator<Item = &BufferStats> + '_ {
        self.buffers.iter().map(|buffer| buffer.as_ref())
    }

    /// Memory used by the buffers that are not flush-pending.
    pub fn active_bytes(&self) -> usize {
        self.buffers()
            .filter(|buffer| !buffer.is_flush_pending())
            .map(BufferStats::bytes_used)
            .sum()
    }

    /// Memory used by the buffers waiting to be sealed.
    pub fn flush_bytes(&self) -> usize {
        self.buffers()
            .filter(|buffer| buffer.is_flush_pending())
            .map(BufferStats::bytes_used)
            .sum()
    }

    /// Memory used by the global delete buffer.
    pub fn delete_bytes(&self) -> usize {
        self.delete_bytes
    }

    /// The buffer using the most memory among those that are not
    /// flush-pending. Ties go to the first registered.
    pub fn largest_non_pending(&self) -> Option<&BufferStats> {
        self.buffers()
            .filter(|buffer| !buffer.is_flush_pending())
            .fold(None, |largest: Option<&BufferStats>, buffer| match largest {
                Some(largest) if largest.bytes_used() >= buffer.bytes_used() => Some(largest),
                _ => Some(buffer),
            })
    }

    /// Marks a buffer as flush-pending.
    pub fn set_flush_pending(&self, buffer: &BufferStats) {
        if buffer.mark_flush_pending() {
            debug!(
                "buffer #{} marked flush-pending ({} docs, {} bytes)",
                buffer.id(),
                buffer.num_docs(),
                buffer.bytes_used()
            );
        }
    }

    /// Asks the caller to apply every buffered delete.
    pub fn set_apply_all_deletes(&self) {
        if !self.apply_all_deletes.swap(true, Ordering::SeqCst) {
            debug!("delete buffer uses {} bytes, applying all deletes", self.delete_bytes);
        }
    }
}

/// Decides which buffers must be sealed.
///
/// The policy is consulted after each document admission and after each
/// delete.
pub trait FlushPolicy: Send + Sync + fmt::Debug {
    /// Called after a document was admitted into `buffer`.
    fn on_insert(&self, state: &FlushState, buffer: &BufferStats);

    /// Called after an operation was pushed to the delete log.
    fn on_delete(&self, state: &FlushState);

    /// Called after a document with a delete term was admitted.
    fn on_update(&self, state: &FlushState, buffer: &BufferStats) {
        self.on_delete(state);
        self.on_insert(state, buffer);
    }
}

/// Flushes on document count, and on memory usage.
///
/// - A buffer reaching `max_buffered_docs` is marked flush-pending.
/// - When the memory used by active buffers and the delete log reaches the
/// memory budget, the largest active buffer is marked flush-pending.
/// - When the delete log alone exceeds the memory budget, every buffered
/// delete should be applied.
///
/// Marking only the largest buffer may leave the total above the budget
/// until that buffer is sealed.
#[derive(Clone, Debug)]
pub struct FlushByRamOrCountsPolicy {
    max_buffered_docs: Option<u32>,
    memory_budget_in_bytes: Option<usize>,
}

impl FlushByRamOrCountsPolicy {
    /// Creates a policy. `None` disables a trigger.
    pub fn new(
        max_buffered_docs: Option<u32>,
        memory_budget_in_bytes: Option<usize>,
    ) -> FlushByRamOrCountsPolicy {
        FlushByRamOrCountsPolicy {
            max_buffered_docs,
            memory_budget_in_bytes,
        }
    }
}

impl FlushPolicy for FlushByRamOrCountsPolicy {
    fn on_insert(&self, state: &FlushState, buffer: &BufferStats) {
        if let Some(max_buffered_docs) = self.max_buffered_docs {
            if buffer.num_docs() >= max_buffered_docs {
                state.set_flush_pending(buffer);
            }
        }
        if let Some(memory_budget) = self.memory_budget_in_bytes {
            let total_bytes = state.active_bytes() + state.delete_bytes();
            if total_bytes >= memory_budget {
                if let Some(largest) = state.largest_non_pending() {
                    state.set_flush_pending(largest);
                }
            }
        }
    }

    fn on_delete(&self, state: &FlushState) {
        if let Some(memory_budget) = self.memory_budget_in_bytes {
            if state.delete_bytes() > memory_budget {
                state.set_apply_all_deletes();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buffers(bytes: &[usize]) -> Vec<Arc<BufferStats>> {
        bytes
            .iter()
            .enumerate()
            .map(|(id, &bytes_used)| {
                let stats = BufferStats::new(id as u64);
                stats.update(bytes_used, 1);
                Arc::new(stats)
            })
            .collect()
    }

    #[test]
    fn test_largest_non_pending() {
        let buffers = buffers(&[10, 30, 20, 30]);
        let apply_all_deletes = AtomicBool::new(false);
        let state = FlushState::new(&buffers, 0, &apply_all_deletes);
        assert_eq!(state.largest_non_pending().map(BufferStats::id), Some(1));
        state.set_flush_pending(&buffers[1]);
        assert_eq!(state.largest_non_pending().map(BufferStats::id), Some(3));
        assert_eq!(state.active_bytes(), 60);
        assert_eq!(state.flush_bytes(), 30);
    }

    #[test]
    fn test_doc_count_trigger() {
        let policy = FlushByRamOrCountsPolicy::new(Some(2), None);
        let buffers = buffers(&[100]);
        let apply_all_deletes = AtomicBool::new(false);
        let state = FlushState::new(&buffers, 0, &apply_all_deletes);
        policy.on_insert(&state, &buffers[0]);
        assert!(!buffers[0].is_flush_pending());
        buffers[0].update(100, 2);
        policy.on_insert(&state, &buffers[0]);
        assert!(buffers[0].is_flush_pending());
    }

    #[test]
    fn test_memory_trigger_marks_the_largest() {
        let memory_budget = 1_000;
        let policy = FlushByRamOrCountsPolicy::new(None, Some(memory_budget));
        let buffers = buffers(&[memory_budget * 3 / 4, memory_budget / 2, memory_budget / 10]);
        let apply_all_deletes = AtomicBool::new(false);
        let state = FlushState::new(&buffers, 0, &apply_all_deletes);
        policy.on_insert(&state, &buffers[2]);
        let pending: Vec<bool> = buffers.iter().map(|buffer| buffer.is_flush_pending()).collect();
        assert_eq!(pending, vec![true, false, false]);
        // the remaining buffers are below the budget.
        policy.on_insert(&state, &buffers[2]);
        let pending: Vec<bool> = buffers.iter().map(|buffer| buffer.is_flush_pending()).collect();
        assert_eq!(pending, vec![true, false, false]);
    }

    #[test]
    fn test_delete_bytes_count_against_the_budget() {
        let policy = FlushByRamOrCountsPolicy::new(None, Some(1_000));
        let buffers = buffers(&[400, 300]);
        let apply_all_deletes = AtomicBool::new(false);
        let state = FlushState::new(&buffers, 300, &apply_all_deletes);
        policy.on_insert(&state, &buffers[1]);
        assert!(buffers[0].is_flush_pending());
        assert!(!buffers[1].is_flush_pending());
        policy.on_delete(&state);
        assert!(!apply_all_deletes.load(Ordering::SeqCst));
        let state = FlushState::new(&buffers, 1_001, &apply_all_deletes);
        policy.on_delete(&state);
        assert!(apply_all_deletes.load(Ordering::SeqCst));
    }
}
