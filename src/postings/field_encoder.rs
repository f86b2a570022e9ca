use serde::{Deserialize, Serialize};
use stacker::{TermHashMap, TermOrdinal, MAX_TERM_LEN};
use tokenizer_api::{Token, TokenStream};

use super::postings_store::PostingsStore;
use super::{IndexingContext, MAX_POSITION};
use crate::schema::FieldCapabilities;
use crate::{DocId, ScrivenerError};

/// Doc codes and frequencies.
const DOC_STREAM: usize = 0;
/// Positions, payloads and offsets.
const PROX_STREAM: usize = 1;

/// Where a term stands with respect to the document being indexed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum TermState {
    /// First occurrence of the term in this buffer.
    Unseen,
    /// The term already occurred in the current document.
    InCurrentDoc,
    /// The term last occurred in an earlier document, whose doc code and
    /// frequency are still pending.
    InPriorDoc,
}

/// Statistics of a field over all the documents of a buffer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldStats {
    /// Number of distinct terms.
    pub num_terms: u32,
    /// Sum, over documents, of the number of tokens of the field.
    pub sum_total_term_freq: u64,
    /// Sum, over documents, of the number of distinct terms of the field.
    pub sum_doc_freq: u64,
    /// Number of documents with at least one token in the field.
    pub doc_count: u32,
}

/// Per-document inversion state of a field.
struct FieldInvertState {
    position: i64,
    /// Added to token offsets, so that values of a multi-valued field follow each other.
    offset: u32,
    last_start_offset: u32,
    length: u32,
    unique_term_count: u32,
}

impl Default for FieldInvertState {
    fn default() -> FieldInvertState {
        FieldInvertState {
            position: -1,
            offset: 0,
            last_start_offset: 0,
            length: 0,
            unique_term_count: 0,
        }
    }
}

/// One validated token, with its absolute position and offsets.
struct Occurrence<'a> {
    position: u32,
    offset_from: u32,
    offset_to: u32,
    term_freq: u32,
    payload: Option<&'a [u8]>,
}

fn token_error(field_number: u32, msg: impl std::fmt::Display) -> ScrivenerError {
    ScrivenerError::DocumentFailed(format!("field #{field_number}: {msg}"))
}

/// Inverts the values of one field into per-term streams.
///
/// Stream 0 receives, for every document, a doc code followed by the
/// frequency. Since the frequency of a term in a document is only known
/// once the document is over, the doc code and frequency of the last document
/// of a term stay in the [`PostingsStore`] until the term shows up in a later
/// document, or until the buffer is sealed.
///
/// Stream 1 only exists when positions are recorded. Every occurrence
/// writes its position (delta to the previous occurrence within the same
/// document), shifted left by one bit; the low bit flags a payload, which
/// then follows as a length and raw bytes. With offsets, two more values
/// follow: the start offset minus the previous end offset, and the length.
pub(crate) struct FieldEncoder {
    field_number: u32,
    capabilities: FieldCapabilities,
    term_map: TermHashMap,
    postings: PostingsStore,
    stats: FieldStats,
    invert_state: FieldInvertState,
    saw_payloads: bool,
    pending_docs_flushed: bool,
}

impl FieldEncoder {
    pub fn new(field_number: u32, capabilities: FieldCapabilities) -> FieldEncoder {
        FieldEncoder {
            field_number,
            capabilities,
            term_map: TermHashMap::default(),
            postings: PostingsStore::new(capabilities),
            stats: FieldStats::default(),
            invert_state: FieldInvertState::default(),
            saw_payloads: false,
            pending_docs_flushed: false,
        }
    }

    pub fn field_number(&self) -> u32 {
        self.field_number
    }

    pub fn capabilities(&self) -> FieldCapabilities {
        self.capabilities
    }

    pub fn stats(&self) -> FieldStats {
        self.stats
    }

    pub fn saw_payloads(&self) -> bool {
        self.saw_payloads
    }

    pub fn num_terms(&self) -> usize {
        self.term_map.len()
    }

    pub fn mem_usage(&self) -> usize {
        self.term_map.mem_usage() + self.postings.mem_usage()
    }

    /// Resets the per-document state. Called before the first value of the
    /// field in a document.
    pub fn start_document(&mut self) {
        self.invert_state = FieldInvertState::default();
    }

    /// Indexes one value of the field.
    ///
    /// On error, the postings may hold some of the tokens of `doc`. The caller
    /// is expected to mark the document as deleted.
    pub fn invert(
        &mut self,
        ctx: &mut IndexingContext,
        doc: DocId,
        tokens: &mut dyn TokenStream,
    ) -> crate::Result<()> {
        assert!(
            !self.pending_docs_flushed,
            "field #{} was already sealed",
            self.field_number
        );
        let mut last_end_offset = 0u32;
        while tokens.advance() {
            let token = tokens.token();
            let occurrence = self.check_token(token)?;
            last_end_offset = token.offset_to;
            self.add_occurrence(ctx, doc, &token.term, &occurrence);
        }
        self.invert_state.offset = self
            .invert_state
            .offset
            .checked_add(last_end_offset)
            .ok_or_else(|| token_error(self.field_number, "offsets overflowed"))?;
        Ok(())
    }

    /// Folds the statistics of the current document into the field statistics.
    pub fn finish_document(&mut self) {
        self.stats.sum_doc_freq += u64::from(self.invert_state.unique_term_count);
        self.stats.sum_total_term_freq += u64::from(self.invert_state.length);
        if self.invert_state.length > 0 {
            self.stats.doc_count += 1;
        }
    }

    fn check_token<'a>(&mut self, token: &'a Token) -> crate::Result<Occurrence<'a>> {
        let field_number = self.field_number;
        let capabilities = self.capabilities;
        if token.term.len() > MAX_TERM_LEN {
            return Err(token_error(
                field_number,
                format!(
                    "immense term of {} bytes (max is {MAX_TERM_LEN})",
                    token.term.len()
                ),
            ));
        }
        if token.term_freq == 0 {
            return Err(token_error(field_number, "term frequency must be at least 1"));
        }
        if token.term_freq != 1 {
            if !capabilities.freqs {
                return Err(token_error(
                    field_number,
                    "must index term freqs to use custom term frequencies",
                ));
            }
            if capabilities.positions {
                return Err(token_error(
                    field_number,
                    "cannot index positions while using custom term frequencies",
                ));
            }
        }
        let state = &mut self.invert_state;
        let position = state.position + i64::from(token.position_increment);
        if position < 0 {
            return Err(token_error(
                field_number,
                "first position increment must be > 0 (got 0)",
            ));
        }
        if position > i64::from(MAX_POSITION) {
            return Err(token_error(
                field_number,
                format!("position {position} is too large (max is {MAX_POSITION})"),
            ));
        }
        state.position = position;
        let (offset_from, offset_to) = if capabilities.offsets {
            let offset_from = state.offset.checked_add(token.offset_from);
            let offset_to = state.offset.checked_add(token.offset_to);
            match (offset_from, offset_to) {
                (Some(offset_from), Some(offset_to))
                    if offset_from >= state.last_start_offset && offset_to >= offset_from =>
                {
                    state.last_start_offset = offset_from;
                    (offset_from, offset_to)
                }
                _ => {
                    return Err(token_error(
                        field_number,
                        format!(
                            "offsets must not go backwards and end offset must be >= start \
                             offset (got {}..{} after start offset {})",
                            token.offset_from, token.offset_to, state.last_start_offset
                        ),
                    ));
                }
            }
        } else {
            (0, 0)
        };
        state.length = state
            .length
            .checked_add(token.term_freq)
            .ok_or_else(|| token_error(field_number, "too many tokens"))?;
        Ok(Occurrence {
            position: position as u32,
            offset_from,
            offset_to,
            term_freq: token.term_freq,
            payload: token.payload.as_deref().filter(|payload| !payload.is_empty()),
        })
    }

    fn add_occurrence(
        &mut self,
        ctx: &mut IndexingContext,
        doc: DocId,
        term: &[u8],
        occurrence: &Occurrence,
    ) {
        let lookup = self.term_map.get_or_insert(term, &mut ctx.byte_pool);
        let term_ord = lookup.term_ord();
        let slot = term_ord as usize;
        let term_state = if lookup.is_new() {
            self.postings.ensure_slot(term_ord);
            let (int_start, byte_start) = ctx.new_term_streams(self.capabilities.stream_count());
            self.postings.int_starts[slot] = int_start;
            self.postings.byte_starts[slot] = byte_start;
            TermState::Unseen
        } else if self.postings.last_doc_ids[slot] == doc {
            TermState::InCurrentDoc
        } else {
            TermState::InPriorDoc
        };
        let capabilities = self.capabilities;
        match term_state {
            TermState::Unseen => {
                self.postings.last_doc_ids[slot] = doc;
                if capabilities.freqs {
                    self.postings.last_doc_codes[slot] = doc << 1;
                    self.postings.term_freqs[slot] = occurrence.term_freq;
                    if capabilities.positions {
                        self.write_prox(ctx, slot, occurrence.position, occurrence);
                        if capabilities.offsets {
                            self.write_offsets(ctx, slot, occurrence);
                        }
                    }
                } else {
                    self.postings.last_doc_codes[slot] = doc;
                }
                self.invert_state.unique_term_count += 1;
            }
            TermState::InPriorDoc => {
                self.write_pending_doc(ctx, slot);
                let doc_gap = doc - self.postings.last_doc_ids[slot];
                if capabilities.freqs {
                    self.postings.last_doc_codes[slot] = doc_gap << 1;
                    self.postings.term_freqs[slot] = occurrence.term_freq;
                    if capabilities.positions {
                        self.write_prox(ctx, slot, occurrence.position, occurrence);
                        if capabilities.offsets {
                            self.postings.last_offsets[slot] = 0;
                            self.write_offsets(ctx, slot, occurrence);
                        }
                    }
                } else {
                    self.postings.last_doc_codes[slot] = doc_gap;
                }
                self.postings.last_doc_ids[slot] = doc;
                self.invert_state.unique_term_count += 1;
            }
            TermState::InCurrentDoc => {
                if capabilities.freqs {
                    self.postings.term_freqs[slot] += occurrence.term_freq;
                    if capabilities.positions {
                        let position_delta =
                            occurrence.position - self.postings.last_positions[slot];
                        self.write_prox(ctx, slot, position_delta, occurrence);
                        if capabilities.offsets {
                            self.write_offsets(ctx, slot, occurrence);
                        }
                    }
                }
            }
        }
    }

    fn write_prox(
        &mut self,
        ctx: &mut IndexingContext,
        slot: usize,
        position_code: u32,
        occurrence: &Occurrence,
    ) {
        let int_start = self.postings.int_starts[slot];
        match occurrence.payload {
            Some(payload) => {
                ctx.write_vint(int_start, PROX_STREAM, (position_code << 1) | 1);
                ctx.write_vint(int_start, PROX_STREAM, payload.len() as u32);
                ctx.write_bytes(int_start, PROX_STREAM, payload);
                self.saw_payloads = true;
            }
            None => ctx.write_vint(int_start, PROX_STREAM, position_code << 1),
        }
        self.postings.last_positions[slot] = occurrence.position;
    }

    fn write_offsets(&mut self, ctx: &mut IndexingContext, slot: usize, occurrence: &Occurrence) {
        let int_start = self.postings.int_starts[slot];
        // tokens stacked on the same text may start before the previous end.
        let start_delta = occurrence
            .offset_from
            .wrapping_sub(self.postings.last_offsets[slot]);
        ctx.write_vint(int_start, PROX_STREAM, start_delta);
        ctx.write_vint(
            int_start,
            PROX_STREAM,
            occurrence.offset_to - occurrence.offset_from,
        );
        self.postings.last_offsets[slot] = occurrence.offset_to;
    }

    /// Writes the doc code and frequency of the last document of a term.
    ///
    /// A frequency of 1 is folded into the low bit of the doc code when the
    /// field does not record positions.
    fn write_pending_doc(&mut self, ctx: &mut IndexingContext, slot: usize) {
        let int_start = self.postings.int_starts[slot];
        let doc_code = self.postings.last_doc_codes[slot];
        if !self.capabilities.freqs {
            ctx.write_vint(int_start, DOC_STREAM, doc_code);
            return;
        }
        let term_freq = self.postings.term_freqs[slot];
        if term_freq == 1 && !self.capabilities.positions {
            ctx.write_vint(int_start, DOC_STREAM, doc_code | 1);
        } else {
            ctx.write_vint(int_start, DOC_STREAM, doc_code);
            ctx.write_vint(int_start, DOC_STREAM, term_freq);
        }
    }

    /// Writes the pending document of every term, completing stream 0.
    ///
    /// After this call, the field accepts no more documents.
    pub fn flush_pending_docs(&mut self, ctx: &mut IndexingContext) {
        if self.pending_docs_flushed {
            return;
        }
        for slot in 0..self.term_map.len() {
            self.write_pending_doc(ctx, slot);
        }
        self.stats.num_terms = self.term_map.len() as u32;
        self.pending_docs_flushed = true;
    }

    /// Term ordinals, in ascending term bytes order.
    pub fn sorted_term_ords(&self, ctx: &IndexingContext) -> Vec<TermOrdinal> {
        self.term_map.sorted_term_ords(&ctx.byte_pool)
    }

    pub fn term<'a>(&self, ctx: &'a IndexingContext, term_ord: TermOrdinal) -> &'a [u8] {
        self.term_map.term(term_ord, &ctx.byte_pool)
    }

    pub fn term_ord(&self, ctx: &IndexingContext, term: &[u8]) -> Option<TermOrdinal> {
        self.term_map.get(term, &ctx.byte_pool)
    }

    /// Copies the streams of a term into the given buffers.
    ///
    /// `prox_stream` is left empty when positions are not recorded.
    pub fn read_streams(
        &self,
        ctx: &IndexingContext,
        term_ord: TermOrdinal,
        doc_stream: &mut Vec<u8>,
        prox_stream: &mut Vec<u8>,
    ) {
        let slot = term_ord as usize;
        let int_start = self.postings.int_starts[slot];
        let byte_start = self.postings.byte_starts[slot];
        doc_stream.clear();
        prox_stream.clear();
        ctx.stream_reader(int_start, byte_start, DOC_STREAM)
            .read_to_end(doc_stream);
        if self.capabilities.positions {
            ctx.stream_reader(int_start, byte_start, PROX_STREAM)
                .read_to_end(prox_stream);
        }
    }
}
