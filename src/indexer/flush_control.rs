use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use super::flush_policy::{BufferStats, FlushPolicy, FlushState};

struct Inner {
    buffers: Mutex<Vec<Arc<BufferStats>>>,
    next_buffer_id: AtomicU64,
    apply_all_deletes: AtomicBool,
    policy: Box<dyn FlushPolicy>,
    per_buffer_hard_limit_in_bytes: usize,
}

/// Keeps track of the memory and document count of every live buffer, and
/// runs the [`FlushPolicy`] on them.
///
/// Buffers register through [`FlushControl::register`]. The registration is
/// bound to the lifetime of the returned [`BufferRegistration`].
#[derive(Clone)]
pub struct FlushControl {
    inner: Arc<Inner>,
}

impl FlushControl {
    /// Creates a flush control running the given policy.
    ///
    /// Buffers using more than `per_buffer_hard_limit_in_bytes` get marked
    /// flush-pending whatever the policy says.
    pub fn new(
        policy: Box<dyn FlushPolicy>,
        per_buffer_hard_limit_in_bytes: usize,
    ) -> FlushControl {
        FlushControl {
            inner: Arc::new(Inner {
                buffers: Mutex::default(),
                next_buffer_id: AtomicU64::new(0),
                apply_all_deletes: AtomicBool::new(false),
                policy,
                per_buffer_hard_limit_in_bytes,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<Vec<Arc<BufferStats>>> {
        self.inner
            .buffers
            .lock()
            .expect("Failed to obtain lock for the buffer registry. This should never happen.")
    }

    /// Registers a new buffer.
    pub fn register(&self) -> BufferRegistration {
        let id = self.inner.next_buffer_id.fetch_add(1, Ordering::SeqCst);
        let stats = Arc::new(BufferStats::new(id));
        self.lock().push(Arc::clone(&stats));
        BufferRegistration {
            flush_control: self.clone(),
            stats,
        }
    }

    fn unregister(&self, stats: &Arc<BufferStats>) {
        self.lock().retain(|buffer| !Arc::ptr_eq(buffer, stats));
    }

    /// Records the new state of a buffer after a document admission, and
    /// runs the policy.
    ///
    /// Returns true iff the buffer is flush-pending.
    pub fn do_after_document(
        &self,
        registration: &BufferRegistration,
        bytes_used: usize,
        num_docs: u32,
        delete_bytes: usize,
        is_update: bool,
    ) -> bool {
        let buffer = registration.stats();
        let buffers = self.lock();
        buffer.update(bytes_used, num_docs);
        if !buffer.is_flush_pending() {
            let state = FlushState::new(&buffers, delete_bytes, &self.inner.apply_all_deletes);
            if is_update {
                self.inner.policy.on_update(&state, buffer);
            } else {
                self.inner.policy.on_insert(&state, buffer);
            }
            if !buffer.is_flush_pending()
                && buffer.bytes_used() > self.inner.per_buffer_hard_limit_in_bytes
            {
                warn!(
                    "buffer #{} uses {} bytes, above the hard limit of {} bytes",
                    buffer.id(),
                    buffer.bytes_used(),
                    self.inner.per_buffer_hard_limit_in_bytes
                );
                state.set_flush_pending(buffer);
            }
        }
        buffer.is_flush_pending()
    }

    /// Runs the policy after an operation was pushed to the delete log.
    pub fn do_on_delete(&self, delete_bytes: usize) {
        let buffers = self.lock();
        let state = FlushState::new(&buffers, delete_bytes, &self.inner.apply_all_deletes);
        self.inner.policy.on_delete(&state);
    }

    /// Returns whether every buffered delete should be applied, and resets
    /// the flag.
    pub fn take_apply_all_deletes(&self) -> bool {
        self.inner.apply_all_deletes.swap(false, Ordering::SeqCst)
    }

    /// Memory used by the buffers that are not flush-pending.
    pub fn active_bytes(&self) -> usize {
        let buffers = self.lock();
        FlushState::new(&buffers, 0, &self.inner.apply_all_deletes).active_bytes()
    }

    /// Memory used by the buffers waiting to be sealed.
    pub fn flush_bytes(&self) -> usize {
        let buffers = self.lock();
        FlushState::new(&buffers, 0, &self.inner.apply_all_deletes).flush_bytes()
    }

    /// Number of registered buffers.
    pub fn num_buffers(&self) -> usize {
        self.lock().len()
    }

    /// Number of registered buffers that are flush-pending.
    pub fn num_flush_pending(&self) -> usize {
        self.lock()
            .iter()
            .filter(|buffer| buffer.is_flush_pending())
            .count()
    }
}

/// The registration of a buffer in a [`FlushControl`].
///
/// The buffer is unregistered on drop.
pub struct BufferRegistration {
    flush_control: FlushControl,
    stats: Arc<BufferStats>,
}

impl BufferRegistration {
    /// Statistics of the registered buffer.
    pub fn stats(&self) -> &BufferStats {
        &self.stats
    }
}

impl Drop for BufferRegistration {
    fn drop(&mut self) {
        self.flush_control.unregister(&self.stats);
    }
}
