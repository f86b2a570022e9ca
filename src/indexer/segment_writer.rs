use smallvec::SmallVec;

use crate::postings::{FieldEncoder, IndexingContext};
use crate::schema::{Document, FieldInfosBuilder};
use crate::DocId;

/// A `SegmentWriter` inverts documents into the postings of a buffer.
///
/// Field numbers are assigned as fields show up. Every inverted field gets
/// its own [`FieldEncoder`], and they all share one [`IndexingContext`].
#[derive(Default)]
pub(crate) struct SegmentWriter {
    pub(crate) ctx: IndexingContext,
    pub(crate) field_infos: FieldInfosBuilder,
    /// Indexed by field number. `None` for fields that are not inverted.
    pub(crate) encoders: Vec<Option<FieldEncoder>>,
}

impl SegmentWriter {
    /// Return the memory usage of the postings of the buffer, in bytes.
    pub fn mem_usage(&self) -> usize {
        self.ctx.mem_usage()
            + self
                .encoders
                .iter()
                .flatten()
                .map(FieldEncoder::mem_usage)
                .sum::<usize>()
    }

    /// Indexes a document.
    ///
    /// On error, the postings may hold part of the document: the caller must
    /// mark it as deleted.
    pub fn add_document(&mut self, doc: DocId, document: Document) -> crate::Result<()> {
        // fields whose per-document state was started, and must be finished.
        let mut started: SmallVec<[u32; 8]> = SmallVec::new();
        let result = self.invert_fields(doc, document, &mut started);
        for &field_number in &started {
            if let Some(encoder) = self.encoders[field_number as usize].as_mut() {
                encoder.finish_document();
            }
        }
        result
    }

    fn invert_fields(
        &mut self,
        doc: DocId,
        document: Document,
        started: &mut SmallVec<[u32; 8]>,
    ) -> crate::Result<()> {
        for mut field in document.into_fields() {
            let field_number = self.field_infos.get_or_add(field.name(), field.options())?;
            let Some(record_option) = field.options().indexing else {
                continue;
            };
            let slot = field_number as usize;
            if self.encoders.len() <= slot {
                self.encoders.resize_with(slot + 1, || None);
            }
            let encoder = self.encoders[slot].get_or_insert_with(|| {
                FieldEncoder::new(field_number, record_option.capabilities())
            });
            if !started.contains(&field_number) {
                encoder.start_document();
                started.push(field_number);
            }
            let inverted = encoder.invert(&mut self.ctx, doc, &mut *field.tokens);
            if encoder.saw_payloads() {
                self.field_infos.set_has_payloads(field_number);
            }
            inverted?;
        }
        Ok(())
    }

    /// Field numbers of the inverted fields, ordered by field name.
    pub fn inverted_fields_by_name(&self) -> Vec<u32> {
        let mut field_numbers: Vec<u32> = self
            .encoders
            .iter()
            .flatten()
            .map(FieldEncoder::field_number)
            .collect();
        field_numbers.sort_by(|&left, &right| {
            self.field_infos
                .field_info(left)
                .name
                .cmp(&self.field_infos.field_info(right).name)
        });
        field_numbers
    }

    /// Encoder of a field, if the field is inverted.
    pub fn encoder(&self, field_number: u32) -> Option<&FieldEncoder> {
        self.encoders
            .get(field_number as usize)
            .and_then(Option::as_ref)
    }

    /// Completes the doc/freq stream of every term of every field.
    pub fn flush_pending_docs(&mut self) {
        for encoder in self.encoders.iter_mut().flatten() {
            encoder.flush_pending_docs(&mut self.ctx);
        }
    }
}
