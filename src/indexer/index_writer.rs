use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use super::buffered_updates::FrozenBufferedUpdates;
use super::delete_queue::DeleteQueue;
use super::document_buffer::{DocumentBuffer, PendingDocs};
use super::flush_control::FlushControl;
use super::flush_policy::{FlushByRamOrCountsPolicy, FlushPolicy};
use super::operation::{DeleteQuery, DeleteTarget, FieldUpdate};
use super::IndexWriterConfig;
use crate::core::segment_name;
use crate::schema::Term;
use crate::{Opstamp, SegmentId};

/// The entry point of the write path.
///
/// An `IndexWriter` owns the state shared by all indexing threads: the delete
/// log, the flush control and the index document count. Each indexing thread
/// gets its own [`DocumentBuffer`] from [`IndexWriter::new_buffer`], while
/// deletes and updates can be issued from any thread.
pub struct IndexWriter {
    config: IndexWriterConfig,
    delete_queue: DeleteQueue,
    flush_control: FlushControl,
    pending_docs: Arc<PendingDocs>,
    segment_counter: AtomicU64,
}

impl IndexWriter {
    /// Creates an index writer using the default flush policy.
    ///
    /// Returns an error if the config is invalid.
    pub fn new(config: IndexWriterConfig) -> crate::Result<IndexWriter> {
        let policy = FlushByRamOrCountsPolicy::new(
            config.max_buffered_docs,
            config.memory_budget_in_bytes,
        );
        IndexWriter::with_flush_policy(config, Box::new(policy))
    }

    /// Creates an index writer using a custom flush policy.
    ///
    /// The triggers of the config are left to the policy; the other
    /// settings still apply.
    pub fn with_flush_policy(
        config: IndexWriterConfig,
        policy: Box<dyn FlushPolicy>,
    ) -> crate::Result<IndexWriter> {
        config.validate()?;
        info!("creating index writer with {config:?} and {policy:?}");
        let flush_control = FlushControl::new(policy, config.per_buffer_hard_limit_in_bytes);
        let pending_docs = Arc::new(PendingDocs::new(config.max_docs));
        Ok(IndexWriter {
            config,
            delete_queue: DeleteQueue::new(),
            flush_control,
            pending_docs,
            segment_counter: AtomicU64::new(0),
        })
    }

    /// Accessor to the index writer's config.
    pub fn config(&self) -> &IndexWriterConfig {
        &self.config
    }

    /// Creates a buffer, to be owned by one indexing thread.
    pub fn new_buffer(&self) -> DocumentBuffer {
        let counter = self.segment_counter.fetch_add(1, Ordering::SeqCst);
        let name = segment_name(counter);
        debug!("new buffer {name}");
        DocumentBuffer::new(
            SegmentId::generate_random(),
            name,
            self.delete_queue.clone(),
            self.flush_control.clone(),
            Arc::clone(&self.pending_docs),
            self.config.reorder_on_seal,
        )
    }

    /// Deletes all of the documents containing a given term.
    ///
    /// The delete applies to documents admitted before the call returns,
    /// in any buffer, and to every sealed segment.
    pub fn delete_term(&self, term: Term) -> Opstamp {
        self.push(DeleteTarget::Term(term))
    }

    /// Deletes all of the documents matching a query.
    ///
    /// Queries cannot be resolved by the write path: they end up in the
    /// residual updates of the sealed segments.
    pub fn delete_query(&self, query: DeleteQuery) -> Opstamp {
        self.push(DeleteTarget::Query(query))
    }

    /// Updates a field value of all of the documents containing a given term.
    pub fn update_field(&self, update: FieldUpdate) -> Opstamp {
        self.push(DeleteTarget::FieldUpdate(update))
    }

    fn push(&self, target: DeleteTarget) -> Opstamp {
        let opstamp = self.delete_queue.push(target);
        self.flush_control
            .do_on_delete(self.delete_queue.ram_bytes_used());
        opstamp
    }

    /// Number of documents reserved in the index, across all buffers.
    pub fn pending_num_docs(&self) -> u64 {
        self.pending_docs.get()
    }

    /// Returns true if the delete log grew too big, and every buffered
    /// delete should be applied. Resets the flag.
    pub fn take_apply_all_deletes(&self) -> bool {
        self.flush_control.take_apply_all_deletes()
    }

    /// Takes the updates of the delete log no buffer took yet.
    ///
    /// They apply to every previously sealed segment.
    pub fn freeze_global_deletes(&self) -> FrozenBufferedUpdates {
        self.delete_queue.freeze_global_buffer(None)
    }

    /// Accessor to the flush control, shared by all buffers.
    pub fn flush_control(&self) -> &FlushControl {
        &self.flush_control
    }
}
