//! Readers for the streams written by the field encoder, once a buffer
//! has flushed its pending documents.

use common::read_u32_vint;

use crate::schema::FieldCapabilities;
use crate::DocId;

/// Iterates over the `(doc, term_freq)` pairs of a doc/freq stream.
///
/// Fields that do not record frequencies report a frequency of 1.
pub struct DocFreqDecoder<'a> {
    data: &'a [u8],
    capabilities: FieldCapabilities,
    doc: DocId,
}

impl<'a> DocFreqDecoder<'a> {
    /// Creates a decoder over a doc/freq stream written with `capabilities`.
    pub fn new(data: &'a [u8], capabilities: FieldCapabilities) -> DocFreqDecoder<'a> {
        DocFreqDecoder {
            data,
            capabilities,
            doc: 0,
        }
    }
}

impl Iterator for DocFreqDecoder<'_> {
    type Item = (DocId, u32);

    fn next(&mut self) -> Option<(DocId, u32)> {
        if self.data.is_empty() {
            return None;
        }
        let code = read_u32_vint(&mut self.data);
        if !self.capabilities.freqs {
            self.doc += code;
            return Some((self.doc, 1));
        }
        self.doc += code >> 1;
        let term_freq = if code & 1 == 1 {
            1
        } else {
            read_u32_vint(&mut self.data)
        };
        Some((self.doc, term_freq))
    }
}

/// One occurrence read back from a position stream.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecodedPosition {
    /// Distance to the previous occurrence in the same document.
    pub delta: u32,
    /// Absolute position within the document.
    pub position: u32,
    /// Payload attached to the occurrence, if any.
    pub payload: Option<Vec<u8>>,
    /// Start and end offsets, when the field records them.
    pub offsets: Option<(u32, u32)>,
}

/// Reads a position stream, one document at a time.
///
/// The caller provides the frequency of each document, as read from the
/// doc/freq stream.
pub struct PositionDecoder<'a> {
    data: &'a [u8],
    capabilities: FieldCapabilities,
}

impl<'a> PositionDecoder<'a> {
    /// Creates a decoder over a position stream written with `capabilities`.
    pub fn new(data: &'a [u8], capabilities: FieldCapabilities) -> PositionDecoder<'a> {
        PositionDecoder { data, capabilities }
    }

    /// Returns true once every occurrence of the stream was read.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Reads the `term_freq` occurrences of the next document.
    pub fn read_doc(&mut self, term_freq: u32) -> Vec<DecodedPosition> {
        let mut positions = Vec::with_capacity(term_freq as usize);
        let mut position = 0u32;
        let mut last_end_offset = 0u32;
        for _ in 0..term_freq {
            let code = read_u32_vint(&mut self.data);
            let delta = code >> 1;
            position += delta;
            let payload = if code & 1 == 1 {
                let len = read_u32_vint(&mut self.data) as usize;
                let (payload, rest) = self.data.split_at(len);
                self.data = rest;
                Some(payload.to_vec())
            } else {
                None
            };
            let offsets = if self.capabilities.offsets {
                let start = last_end_offset.wrapping_add(read_u32_vint(&mut self.data));
                let end = start + read_u32_vint(&mut self.data);
                last_end_offset = end;
                Some((start, end))
            } else {
                None
            };
            positions.push(DecodedPosition {
                delta,
                position,
                payload,
                offsets,
            });
        }
        positions
    }
}
