use common::{BitSet, ByteCount};

use super::buffered_updates::FrozenBufferedUpdates;
use super::segment_writer::SegmentWriter;
use super::DocIdMapping;
use crate::postings::{DocFreqDecoder, PostingsSink, SegmentWriteState, TermPostings, WriteHandle};
use crate::schema::FieldInfos;
use crate::{DocId, SegmentId};

/// The immutable result of sealing a buffer.
#[derive(Clone, Debug)]
pub struct SealedSegment {
    segment_id: SegmentId,
    name: String,
    max_doc: DocId,
    field_infos: FieldInfos,
    write_handle: WriteHandle,
    live_docs: Option<BitSet>,
    deleted_count: u32,
    residual_updates: FrozenBufferedUpdates,
    doc_id_mapping: Option<DocIdMapping>,
}

impl SealedSegment {
    /// Id of the segment.
    pub fn segment_id(&self) -> SegmentId {
        self.segment_id
    }

    /// Name of the segment.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of documents, deleted ones included.
    pub fn max_doc(&self) -> DocId {
        self.max_doc
    }

    /// Number of live documents.
    pub fn num_docs(&self) -> DocId {
        self.max_doc - self.deleted_count
    }

    /// Number of deleted documents.
    pub fn num_deleted_docs(&self) -> u32 {
        self.deleted_count
    }

    /// Returns true iff the segment has deleted documents.
    pub fn has_deletes(&self) -> bool {
        self.deleted_count > 0
    }

    /// Field metadata.
    pub fn field_infos(&self) -> &FieldInfos {
        &self.field_infos
    }

    /// What the postings sink produced.
    pub fn write_handle(&self) -> &WriteHandle {
        &self.write_handle
    }

    /// Live documents, by new doc id. `None` if no document was deleted.
    pub fn live_docs(&self) -> Option<&BitSet> {
        self.live_docs.as_ref()
    }

    /// Returns true iff the document (new doc id) is deleted.
    pub fn is_deleted(&self, doc: DocId) -> bool {
        self.live_docs
            .as_ref()
            .map_or(false, |live_docs| !live_docs.contains(doc))
    }

    /// Delete queries and field updates that apply to this segment. They
    /// could not be resolved while sealing.
    pub fn residual_updates(&self) -> &FrozenBufferedUpdates {
        &self.residual_updates
    }

    /// The mapping used to reorder documents, if any.
    pub fn doc_id_mapping(&self) -> Option<&DocIdMapping> {
        self.doc_id_mapping.as_ref()
    }
}

/// Lazily allocated live docs of a segment being sealed.
struct LiveDocs {
    max_doc: DocId,
    live_docs: Option<BitSet>,
    deleted_count: u32,
}

impl LiveDocs {
    fn new(max_doc: DocId) -> LiveDocs {
        LiveDocs {
            max_doc,
            live_docs: None,
            deleted_count: 0,
        }
    }

    fn delete(&mut self, doc: DocId) {
        let max_doc = self.max_doc;
        let live_docs = self
            .live_docs
            .get_or_insert_with(|| BitSet::with_max_value_and_full(max_doc));
        if live_docs.remove(doc) {
            self.deleted_count += 1;
        }
    }
}

/// Sealing parameters.
pub(crate) struct SealRequest<'a> {
    pub segment_id: SegmentId,
    pub segment_name: &'a str,
    pub max_doc: DocId,
    pub updates: FrozenBufferedUpdates,
    pub doc_id_mapping: Option<DocIdMapping>,
}

/// Drains a segment writer into a postings sink.
///
/// Fields are handed to the sink by ascending name, and terms by ascending
/// bytes. Delete terms are then resolved against the postings, followed by
/// the doc ids of failed documents.
pub(crate) fn seal_segment(
    segment_writer: &mut SegmentWriter,
    request: SealRequest,
    sink: &mut dyn PostingsSink,
) -> crate::Result<SealedSegment> {
    fail_point!("DocumentBuffer::flush::seal", |msg: Option<String>| {
        Err(crate::ScrivenerError::SinkError(
            msg.unwrap_or_else(|| "injected failure".to_string()),
        ))
    });
    let SealRequest {
        segment_id,
        segment_name,
        max_doc,
        updates,
        doc_id_mapping,
    } = request;
    segment_writer.flush_pending_docs();
    let field_infos = segment_writer.field_infos.finish();
    let write_handle = write_postings(
        segment_writer,
        &SegmentWriteState {
            segment_id,
            segment_name,
            max_doc,
            field_infos: &field_infos,
            doc_id_mapping: doc_id_mapping.as_ref(),
        },
        sink,
    )?;

    let mut live_docs = LiveDocs::new(max_doc);
    apply_delete_terms(segment_writer, &updates, &mut live_docs);
    for &doc in updates.delete_doc_ids() {
        live_docs.delete(doc);
    }
    let LiveDocs {
        live_docs,
        deleted_count,
        ..
    } = live_docs;
    if deleted_count > 0 {
        debug!("segment {segment_name}: {deleted_count} of {max_doc} docs deleted at seal");
    }
    let live_docs = match (live_docs, doc_id_mapping.as_ref()) {
        (Some(live_docs), Some(doc_id_mapping)) => Some(doc_id_mapping.remap_live_docs(&live_docs)),
        (live_docs, _) => live_docs,
    };
    info!(
        "sealed segment {segment_name} ({max_doc} docs, {} fields, {} written)",
        field_infos.len(),
        ByteCount::from(write_handle.num_bytes)
    );
    Ok(SealedSegment {
        segment_id,
        name: segment_name.to_string(),
        max_doc,
        field_infos,
        write_handle,
        live_docs,
        deleted_count,
        residual_updates: updates.into_residual(),
        doc_id_mapping,
    })
}

fn write_postings(
    segment_writer: &SegmentWriter,
    state: &SegmentWriteState,
    sink: &mut dyn PostingsSink,
) -> crate::Result<WriteHandle> {
    sink.open_segment(state)?;
    let ctx = &segment_writer.ctx;
    let mut doc_freq_stream = Vec::new();
    let mut prox_stream = Vec::new();
    for field_number in segment_writer.inverted_fields_by_name() {
        let Some(encoder) = segment_writer.encoder(field_number) else {
            continue;
        };
        let field_info = segment_writer.field_infos.field_info(field_number);
        let has_positions = encoder.capabilities().positions;
        sink.new_field(field_info, &encoder.stats())?;
        for term_ord in encoder.sorted_term_ords(ctx) {
            encoder.read_streams(ctx, term_ord, &mut doc_freq_stream, &mut prox_stream);
            let postings = TermPostings {
                doc_freq_stream: &doc_freq_stream,
                prox_stream: has_positions.then_some(&prox_stream[..]),
            };
            sink.write_term(encoder.term(ctx, term_ord), &postings)?;
        }
        sink.close_field()?;
    }
    sink.finish()
}

fn apply_delete_terms(
    segment_writer: &SegmentWriter,
    updates: &FrozenBufferedUpdates,
    live_docs: &mut LiveDocs,
) {
    let ctx = &segment_writer.ctx;
    let mut doc_freq_stream = Vec::new();
    let mut prox_stream = Vec::new();
    // delete terms are sorted by field first.
    let mut current_field: Option<(&str, Option<u32>)> = None;
    for (term, doc_id_upto) in updates.delete_terms() {
        let field_number = match current_field {
            Some((field, field_number)) if field == term.field() => field_number,
            _ => {
                let field_number = segment_writer.field_infos.number(term.field());
                current_field = Some((term.field(), field_number));
                field_number
            }
        };
        let Some(encoder) =
            field_number.and_then(|field_number| segment_writer.encoder(field_number))
        else {
            continue;
        };
        let Some(term_ord) = encoder.term_ord(ctx, term.value_bytes()) else {
            continue;
        };
        encoder.read_streams(ctx, term_ord, &mut doc_freq_stream, &mut prox_stream);
        for (doc, _) in DocFreqDecoder::new(&doc_freq_stream, encoder.capabilities()) {
            if doc >= *doc_id_upto {
                break;
            }
            live_docs.delete(doc);
        }
    }
}
