use serde::{Deserialize, Serialize};

use super::{DecodedPosition, DocFreqDecoder, FieldStats, PositionDecoder};
use crate::indexer::DocIdMapping;
use crate::schema::{FieldCapabilities, FieldInfo, FieldInfos};
use crate::{DocId, ScrivenerError, SegmentId};

/// Everything a sink needs to know about the segment it is about to receive.
pub struct SegmentWriteState<'a> {
    /// Id of the segment being sealed.
    pub segment_id: SegmentId,
    /// Name of the segment, used as a prefix for the files it produces.
    pub segment_name: &'a str,
    /// Number of documents of the segment, deleted ones included.
    pub max_doc: DocId,
    /// Field metadata, frozen.
    pub field_infos: &'a FieldInfos,
    /// Present when documents get reordered: the postings handed to the
    /// sink use the old doc ids.
    pub doc_id_mapping: Option<&'a DocIdMapping>,
}

/// The streams of one term, as written by the indexer.
///
/// Both are opaque to the indexer; [`DocFreqDecoder`] and
/// [`PositionDecoder`] read them back.
#[derive(Clone, Copy, Debug)]
pub struct TermPostings<'a> {
    /// Doc codes and frequencies.
    pub doc_freq_stream: &'a [u8],
    /// Positions, payloads and offsets. `None` if the field does not record
    /// positions.
    pub prox_stream: Option<&'a [u8]>,
}

/// What a sink physically produced for a segment.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteHandle {
    /// Names of the files written.
    pub files: Vec<String>,
    /// Total number of bytes written.
    pub num_bytes: u64,
}

/// Receiver of the postings of a segment being sealed.
///
/// Calls come in the following order: `open_segment`, then for each field
/// (ascending field name) `new_field`, `write_term` for each term
/// (ascending term bytes) and `close_field`, and finally `finish`.
pub trait PostingsSink {
    /// Starts a new segment.
    fn open_segment(&mut self, state: &SegmentWriteState) -> crate::Result<()>;

    /// Starts a new field.
    fn new_field(&mut self, field_info: &FieldInfo, stats: &FieldStats) -> crate::Result<()>;

    /// Writes the postings of one term of the current field.
    fn write_term(&mut self, term: &[u8], postings: &TermPostings) -> crate::Result<()>;

    /// Ends the current field.
    fn close_field(&mut self) -> crate::Result<()>;

    /// Ends the segment.
    fn finish(&mut self) -> crate::Result<WriteHandle>;
}

/// One term kept by a [`RamPostingsSink`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RamTerm {
    term: Vec<u8>,
    doc_freq_stream: Vec<u8>,
    prox_stream: Option<Vec<u8>>,
}

impl RamTerm {
    /// Term bytes.
    pub fn term(&self) -> &[u8] {
        &self.term
    }

    /// Raw doc/freq stream.
    pub fn doc_freq_stream(&self) -> &[u8] {
        &self.doc_freq_stream
    }

    /// Raw position stream, if any.
    pub fn prox_stream(&self) -> Option<&[u8]> {
        self.prox_stream.as_deref()
    }
}

/// One field kept by a [`RamPostingsSink`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RamField {
    field_info: FieldInfo,
    stats: FieldStats,
    terms: Vec<RamTerm>,
}

impl RamField {
    /// Field metadata, as handed to the sink.
    pub fn field_info(&self) -> &FieldInfo {
        &self.field_info
    }

    /// Field statistics, as handed to the sink.
    pub fn stats(&self) -> FieldStats {
        self.stats
    }

    /// Terms, in the order they were received.
    pub fn terms(&self) -> &[RamTerm] {
        &self.terms
    }

    /// Looks a term up.
    pub fn term(&self, term: &[u8]) -> Option<&RamTerm> {
        self.terms
            .binary_search_by(|ram_term| ram_term.term.as_slice().cmp(term))
            .ok()
            .map(|idx| &self.terms[idx])
    }

    fn capabilities(&self) -> FieldCapabilities {
        self.field_info
            .indexing
            .map(|indexing| indexing.capabilities())
            .unwrap_or_default()
    }

    /// Decodes the `(doc, term_freq)` pairs of a term. Empty if the term is
    /// missing.
    pub fn doc_freqs(&self, term: &[u8]) -> Vec<(DocId, u32)> {
        match self.term(term) {
            Some(ram_term) => {
                DocFreqDecoder::new(&ram_term.doc_freq_stream, self.capabilities()).collect()
            }
            None => Vec::new(),
        }
    }

    /// Decodes the occurrences of a term, grouped by document.
    pub fn positions(&self, term: &[u8]) -> Vec<(DocId, Vec<DecodedPosition>)> {
        let Some(ram_term) = self.term(term) else {
            return Vec::new();
        };
        let capabilities = self.capabilities();
        let Some(prox_stream) = ram_term.prox_stream.as_deref() else {
            return Vec::new();
        };
        let mut position_decoder = PositionDecoder::new(prox_stream, capabilities);
        DocFreqDecoder::new(&ram_term.doc_freq_stream, capabilities)
            .map(|(doc, term_freq)| (doc, position_decoder.read_doc(term_freq)))
            .collect()
    }
}

/// A [`PostingsSink`] keeping everything it receives in memory.
///
/// It checks the ordering contract and refuses out of order fields or terms.
#[derive(Debug, Default)]
pub struct RamPostingsSink {
    segment_name: Option<String>,
    max_doc: DocId,
    fields: Vec<RamField>,
    current_field: Option<RamField>,
    num_bytes: u64,
    finished: bool,
}

impl RamPostingsSink {
    /// Name of the last segment opened.
    pub fn segment_name(&self) -> Option<&str> {
        self.segment_name.as_deref()
    }

    /// `max_doc` of the last segment opened.
    pub fn max_doc(&self) -> DocId {
        self.max_doc
    }

    /// Fields received, in order.
    pub fn fields(&self) -> &[RamField] {
        &self.fields
    }

    /// Looks a field up by name.
    pub fn field(&self, name: &str) -> Option<&RamField> {
        self.fields
            .iter()
            .find(|field| field.field_info.name == name)
    }

    /// Returns true once `finish` was called.
    pub fn is_finished(&self) -> bool {
        self.finished
    }
}

fn sink_error(msg: String) -> ScrivenerError {
    ScrivenerError::SinkError(msg)
}

impl PostingsSink for RamPostingsSink {
    fn open_segment(&mut self, state: &SegmentWriteState) -> crate::Result<()> {
        *self = RamPostingsSink {
            segment_name: Some(state.segment_name.to_string()),
            max_doc: state.max_doc,
            ..RamPostingsSink::default()
        };
        Ok(())
    }

    fn new_field(&mut self, field_info: &FieldInfo, stats: &FieldStats) -> crate::Result<()> {
        if self.segment_name.is_none() || self.finished {
            return Err(sink_error("no open segment".to_string()));
        }
        if let Some(current_field) = &self.current_field {
            return Err(sink_error(format!(
                "field '{}' was not closed",
                current_field.field_info.name
            )));
        }
        if let Some(last_field) = self.fields.last() {
            if last_field.field_info.name >= field_info.name {
                return Err(sink_error(format!(
                    "field '{}' received after field '{}'",
                    field_info.name, last_field.field_info.name
                )));
            }
        }
        self.current_field = Some(RamField {
            field_info: field_info.clone(),
            stats: *stats,
            terms: Vec::new(),
        });
        Ok(())
    }

    fn write_term(&mut self, term: &[u8], postings: &TermPostings) -> crate::Result<()> {
        let current_field = self
            .current_field
            .as_mut()
            .ok_or_else(|| sink_error("term received outside of a field".to_string()))?;
        if let Some(last_term) = current_field.terms.last() {
            if last_term.term.as_slice() >= term {
                return Err(sink_error(format!(
                    "term {term:?} received after {:?} in field '{}'",
                    last_term.term, current_field.field_info.name
                )));
            }
        }
        self.num_bytes += (postings.doc_freq_stream.len()
            + postings.prox_stream.map_or(0, <[u8]>::len)) as u64;
        current_field.terms.push(RamTerm {
            term: term.to_vec(),
            doc_freq_stream: postings.doc_freq_stream.to_vec(),
            prox_stream: postings.prox_stream.map(<[u8]>::to_vec),
        });
        Ok(())
    }

    fn close_field(&mut self) -> crate::Result<()> {
        let field = self
            .current_field
            .take()
            .ok_or_else(|| sink_error("no field to close".to_string()))?;
        self.fields.push(field);
        Ok(())
    }

    fn finish(&mut self) -> crate::Result<WriteHandle> {
        if self.current_field.is_some() {
            return Err(sink_error("segment finished with an open field".to_string()));
        }
        let segment_name = self
            .segment_name
            .as_deref()
            .ok_or_else(|| sink_error("no open segment".to_string()))?;
        self.finished = true;
        let mut files = vec![format!("{segment_name}.doc")];
        let has_positions = self.fields.iter().any(|field| field.capabilities().positions);
        if has_positions {
            files.push(format!("{segment_name}.pos"));
        }
        Ok(WriteHandle {
            files,
            num_bytes: self.num_bytes,
        })
    }
}
