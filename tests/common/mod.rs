#![allow(dead_code)]

use scrivener::indexer::{DocIdMapping, DocumentBuffer, SealedSegment};
use scrivener::postings::RamPostingsSink;
use scrivener::schema::{Document, FieldOptions, IndexRecordOption};
use scrivener::tokenizer::Token;

pub const ID: &str = "id";
pub const BODY: &str = "body";

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Splits `text` on whitespace, with offsets pointing into `text`.
pub fn tokens(text: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut offset = 0;
    for word in text.split(' ') {
        if !word.is_empty() {
            tokens.push(Token::new(
                word,
                offset as u32,
                (offset + word.len()) as u32,
            ));
        }
        offset += word.len() + 1;
    }
    tokens
}

/// A document with an untokenized `id` field and a `body` text field.
pub fn doc(id: &str, body: &str) -> Document<'static> {
    let mut document = Document::default();
    document.add_pre_tokenized(
        ID,
        FieldOptions::indexed(IndexRecordOption::Basic),
        vec![Token::new(id, 0, id.len() as u32)],
    );
    document.add_pre_tokenized(
        BODY,
        FieldOptions::indexed(IndexRecordOption::WithFreqsAndPositionsAndOffsets),
        tokens(body),
    );
    document
}

/// A document that fails to be inverted: its first token has a position
/// increment of 0.
pub fn malformed_doc(id: &str) -> Document<'static> {
    let mut document = doc(id, "");
    document.add_pre_tokenized(
        BODY,
        FieldOptions::indexed(IndexRecordOption::WithFreqsAndPositionsAndOffsets),
        vec![Token::new("broken", 0, 6).with_position_increment(0)],
    );
    document
}

pub fn seal(
    buffer: &mut DocumentBuffer,
    doc_id_mapping: Option<DocIdMapping>,
) -> scrivener::Result<(SealedSegment, RamPostingsSink)> {
    buffer.prepare_flush()?;
    let mut sink = RamPostingsSink::default();
    let segment = buffer.flush(&mut sink, doc_id_mapping)?;
    Ok((segment, sink))
}

pub fn live_docs(segment: &SealedSegment) -> Vec<u32> {
    match segment.live_docs() {
        Some(live_docs) => live_docs.iter().collect(),
        None => (0..segment.max_doc()).collect(),
    }
}
