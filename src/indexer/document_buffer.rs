use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use common::ByteCount;

use super::buffered_updates::{BufferedUpdates, FrozenBufferedUpdates};
use super::delete_queue::{DeleteQueue, DeleteSlice};
use super::flush_control::{BufferRegistration, FlushControl};
use super::operation::DeleteTarget;
use super::segment_sealer::{seal_segment, SealRequest, SealedSegment};
use super::segment_writer::SegmentWriter;
use super::DocIdMapping;
use crate::postings::PostingsSink;
use crate::schema::{Document, Term};
use crate::{DocId, Opstamp, ScrivenerError, SegmentId};

/// Number of documents reserved against the index ceiling, shared by every
/// buffer of an index writer.
pub(crate) struct PendingDocs {
    num_docs: AtomicU64,
    max_docs: u64,
}

impl PendingDocs {
    pub fn new(max_docs: u64) -> PendingDocs {
        PendingDocs {
            num_docs: AtomicU64::new(0),
            max_docs,
        }
    }

    /// Reserves one document, or fails without reserving anything.
    pub fn reserve_one(&self) -> crate::Result<()> {
        if self.num_docs.fetch_add(1, Ordering::SeqCst) >= self.max_docs {
            self.num_docs.fetch_sub(1, Ordering::SeqCst);
            return Err(ScrivenerError::CapacityExceeded {
                max_docs: self.max_docs,
            });
        }
        Ok(())
    }

    pub fn release(&self, num_docs: u64) {
        self.num_docs.fetch_sub(num_docs, Ordering::SeqCst);
    }

    pub fn get(&self) -> u64 {
        self.num_docs.load(Ordering::SeqCst)
    }
}

/// Lifecycle of a [`DocumentBuffer`].
///
/// `Active -> FlushPending -> Sealed`, or `Active -> Aborted`.
/// `Sealed` and `Aborted` are terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BufferState {
    /// The buffer accepts documents.
    Active,
    /// The flush policy picked the buffer. It still accepts documents
    /// until `prepare_flush` is called.
    FlushPending,
    /// The buffer was sealed into a segment.
    Sealed,
    /// The buffer was discarded.
    Aborted,
}

impl BufferState {
    /// Returns true iff no operation may be issued on the buffer anymore.
    pub fn is_terminal(self) -> bool {
        matches!(self, BufferState::Sealed | BufferState::Aborted)
    }
}

/// The in-memory candidate segment of one indexing thread.
///
/// A `DocumentBuffer` assigns doc ids, inverts documents into its own arena,
/// and tracks the deletes of the shared delete log that apply to its
/// documents. It is sealed into a [`SealedSegment`] by
/// [`prepare_flush`](DocumentBuffer::prepare_flush) followed by
/// [`flush`](DocumentBuffer::flush).
///
/// Dropping a buffer that was neither sealed nor aborted aborts it.
pub struct DocumentBuffer {
    segment_id: SegmentId,
    segment_name: String,
    state: BufferState,
    segment_writer: SegmentWriter,
    num_docs: DocId,
    pending_updates: BufferedUpdates,
    delete_queue: DeleteQueue,
    delete_slice: DeleteSlice,
    flush_control: FlushControl,
    registration: Option<BufferRegistration>,
    pending_docs: Arc<PendingDocs>,
    reorder_on_seal: bool,
    flush_prepared: bool,
}

impl DocumentBuffer {
    pub(crate) fn new(
        segment_id: SegmentId,
        segment_name: String,
        delete_queue: DeleteQueue,
        flush_control: FlushControl,
        pending_docs: Arc<PendingDocs>,
        reorder_on_seal: bool,
    ) -> DocumentBuffer {
        let delete_slice = delete_queue.new_slice();
        let registration = flush_control.register();
        DocumentBuffer {
            segment_id,
            segment_name,
            state: BufferState::Active,
            segment_writer: SegmentWriter::default(),
            num_docs: 0,
            pending_updates: BufferedUpdates::default(),
            delete_queue,
            delete_slice,
            flush_control,
            registration: Some(registration),
            pending_docs,
            reorder_on_seal,
            flush_prepared: false,
        }
    }

    /// Id of the segment this buffer will be sealed into.
    pub fn segment_id(&self) -> SegmentId {
        self.segment_id
    }

    /// Name of the segment this buffer will be sealed into.
    pub fn segment_name(&self) -> &str {
        &self.segment_name
    }

    /// Current state of the buffer.
    ///
    /// The flush policy may pick this buffer while another buffer is
    /// indexing, so the shared stats are consulted as well.
    pub fn state(&self) -> BufferState {
        if self.state == BufferState::Active && self.is_marked_by_policy() {
            return BufferState::FlushPending;
        }
        self.state
    }

    /// Returns true iff the flush policy picked this buffer.
    pub fn is_flush_pending(&self) -> bool {
        self.state() == BufferState::FlushPending
    }

    fn is_marked_by_policy(&self) -> bool {
        self.registration
            .as_ref()
            .map_or(false, |registration| registration.stats().is_flush_pending())
    }

    /// Number of documents admitted so far, failed ones included.
    pub fn num_docs(&self) -> DocId {
        self.num_docs
    }

    /// Memory used by the postings and the pending deletes of the buffer.
    pub fn mem_usage(&self) -> usize {
        self.segment_writer.mem_usage() + self.pending_updates.bytes_used()
    }

    /// Deletes and updates resolved against this buffer so far.
    pub fn pending_updates(&self) -> &BufferedUpdates {
        &self.pending_updates
    }

    fn check_accepts_documents(&self) -> crate::Result<()> {
        if self.state.is_terminal() || self.flush_prepared {
            return Err(ScrivenerError::InvalidState(format!(
                "buffer {} does not accept documents ({:?})",
                self.segment_name, self.state
            )));
        }
        Ok(())
    }

    /// Indexes a document, and deletes the documents previously admitted to
    /// the index that contain `delete_term`.
    ///
    /// The document's doc id is the number of documents admitted before it.
    /// If indexing fails, the document keeps its doc id but is marked deleted,
    /// and the error is returned. The buffer stays usable.
    ///
    /// Returns the opstamp of the operation.
    pub fn add_document(
        &mut self,
        document: Document,
        delete_term: Option<Term>,
    ) -> crate::Result<Opstamp> {
        self.add_documents(std::iter::once(document), delete_term)
    }

    /// Indexes a block of documents, getting consecutive doc ids.
    ///
    /// `delete_term` only applies to documents admitted before the block.
    /// If any document fails, every document of the block admitted so far is
    /// marked deleted.
    pub fn add_documents<'a, I>(
        &mut self,
        documents: I,
        delete_term: Option<Term>,
    ) -> crate::Result<Opstamp>
    where
        I: IntoIterator<Item = Document<'a>>,
    {
        self.check_accepts_documents()?;
        let docs_before = self.num_docs;
        if let Err(err) = self.index_documents(documents) {
            let num_failed = self.num_docs - docs_before;
            warn!(
                "buffer {}: marking {num_failed} document(s) deleted after failure: {err}",
                self.segment_name
            );
            for doc in docs_before..self.num_docs {
                self.pending_updates.add_doc_id(doc);
            }
            self.update_stats(false);
            return Err(err);
        }
        let is_update = delete_term.is_some();
        let opstamp = self.finish_documents(delete_term, docs_before);
        self.update_stats(is_update);
        Ok(opstamp)
    }

    fn index_documents<'a, I>(&mut self, documents: I) -> crate::Result<()>
    where
        I: IntoIterator<Item = Document<'a>>,
    {
        for document in documents {
            self.pending_docs.reserve_one()?;
            let doc = self.num_docs;
            // the doc id is consumed even if inverting fails.
            self.num_docs += 1;
            self.index_document(doc, document)?;
        }
        Ok(())
    }

    fn index_document(&mut self, doc: DocId, document: Document) -> crate::Result<()> {
        fail_point!("DocumentBuffer::add_document", |msg: Option<String>| {
            Err(ScrivenerError::DocumentFailed(
                msg.unwrap_or_else(|| "injected failure".to_string()),
            ))
        });
        self.segment_writer.add_document(doc, document)
    }

    /// Pushes the delete term, and folds the part of the delete log this
    /// buffer has not seen yet into its pending updates.
    fn finish_documents(&mut self, delete_term: Option<Term>, docs_before: DocId) -> Opstamp {
        let (opstamp, has_deletes) = match delete_term {
            Some(term) => {
                let opstamp = self
                    .delete_queue
                    .push_to_slice(DeleteTarget::Term(term), &mut self.delete_slice);
                (opstamp, true)
            }
            None => self.delete_queue.update_slice(&mut self.delete_slice),
        };
        if has_deletes && docs_before > 0 {
            self.delete_slice
                .apply(&mut self.pending_updates, docs_before);
        } else {
            // nothing admitted before: there is nothing to delete.
            self.delete_slice.reset();
        }
        opstamp
    }

    fn update_stats(&mut self, is_update: bool) {
        let Some(registration) = self.registration.as_ref() else {
            return;
        };
        let flush_pending = self.flush_control.do_after_document(
            registration,
            self.mem_usage(),
            self.num_docs,
            self.delete_queue.ram_bytes_used(),
            is_update,
        );
        if flush_pending && self.state == BufferState::Active {
            debug!(
                "buffer {} is flush-pending ({} docs, {})",
                self.segment_name,
                self.num_docs,
                ByteCount::from(self.mem_usage())
            );
            self.state = BufferState::FlushPending;
        }
    }

    /// Folds every delete issued so far into the buffer, and takes the
    /// updates of the global buffer that nobody took yet.
    ///
    /// The buffer does not accept documents anymore. The returned updates are
    /// owned by the caller, and apply to previously sealed segments.
    pub fn prepare_flush(&mut self) -> crate::Result<FrozenBufferedUpdates> {
        if self.state.is_terminal() {
            return Err(ScrivenerError::InvalidState(format!(
                "cannot flush buffer {} ({:?})",
                self.segment_name, self.state
            )));
        }
        let global_updates = self
            .delete_queue
            .freeze_global_buffer(Some(&mut self.delete_slice));
        self.delete_slice
            .apply(&mut self.pending_updates, self.num_docs);
        assert!(
            self.delete_slice.is_empty(),
            "all deletes must be applied in prepare_flush"
        );
        self.delete_slice.reset();
        self.state = BufferState::FlushPending;
        self.flush_prepared = true;
        debug!(
            "buffer {}: flush prepared with {} delete terms, {} failed docs",
            self.segment_name,
            self.pending_updates.num_delete_terms(),
            self.pending_updates.delete_doc_ids().len()
        );
        Ok(global_updates)
    }

    /// Seals the buffer into an immutable segment.
    ///
    /// Must be preceded by [`prepare_flush`](DocumentBuffer::prepare_flush).
    /// Invalid arguments are reported before anything is sealed, and leave
    /// the buffer untouched. Any failure while sealing aborts the buffer and
    /// is returned wrapped into [`ScrivenerError::Aborted`].
    pub fn flush(
        &mut self,
        sink: &mut dyn PostingsSink,
        doc_id_mapping: Option<DocIdMapping>,
    ) -> crate::Result<SealedSegment> {
        if self.state.is_terminal() {
            return Err(ScrivenerError::InvalidState(format!(
                "cannot flush buffer {} ({:?})",
                self.segment_name, self.state
            )));
        }
        assert!(
            self.flush_prepared,
            "prepare_flush must be called before flush"
        );
        match doc_id_mapping.as_ref() {
            Some(doc_id_mapping) if doc_id_mapping.num_docs() != self.num_docs as usize => {
                return Err(ScrivenerError::InvalidArgument(format!(
                    "doc id mapping covers {} docs, buffer {} holds {}",
                    doc_id_mapping.num_docs(),
                    self.segment_name,
                    self.num_docs
                )));
            }
            None if self.reorder_on_seal => {
                return Err(ScrivenerError::InvalidArgument(
                    "reorder_on_seal requires a doc id mapping".to_string(),
                ));
            }
            _ => {}
        }
        let request = SealRequest {
            segment_id: self.segment_id,
            segment_name: &self.segment_name,
            max_doc: self.num_docs,
            updates: self.pending_updates.freeze(),
            doc_id_mapping,
        };
        match seal_segment(&mut self.segment_writer, request, sink) {
            Ok(segment) => {
                self.state = BufferState::Sealed;
                self.release_resources();
                Ok(segment)
            }
            Err(err) => {
                warn!("sealing buffer {} failed: {err}", self.segment_name);
                self.abort();
                Err(ScrivenerError::Aborted(Box::new(err)))
            }
        }
    }

    /// Discards the buffer.
    ///
    /// Its documents are released from the index document count. Aborting a
    /// sealed or aborted buffer does nothing.
    pub fn abort(&mut self) {
        if self.state.is_terminal() {
            return;
        }
        warn!(
            "aborting buffer {} holding {} docs",
            self.segment_name, self.num_docs
        );
        self.state = BufferState::Aborted;
        self.pending_docs.release(u64::from(self.num_docs));
        self.pending_updates.clear();
        self.delete_slice.reset();
        self.release_resources();
    }

    fn release_resources(&mut self) {
        self.segment_writer = SegmentWriter::default();
        self.registration = None;
    }
}

impl Drop for DocumentBuffer {
    fn drop(&mut self) {
        self.abort();
    }
}
