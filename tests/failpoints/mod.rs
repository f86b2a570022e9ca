use scrivener::indexer::{BufferState, IndexWriter, IndexWriterConfig};
use scrivener::postings::RamPostingsSink;
use scrivener::schema::{Document, FieldOptions, IndexRecordOption};
use scrivener::tokenizer::Token;
use scrivener::ScrivenerError;

fn doc(text: &str) -> Document<'static> {
    let mut document = Document::default();
    let tokens = text
        .split_whitespace()
        .map(|word| Token::new(word, 0, 0))
        .collect();
    document.add_pre_tokenized(
        "body",
        FieldOptions::indexed(IndexRecordOption::WithFreqs),
        tokens,
    );
    document
}

#[test]
fn test_fail_on_seal_aborts_the_buffer() -> scrivener::Result<()> {
    let _fail_scenario_guard = fail::FailScenario::setup();
    let index_writer = IndexWriter::new(IndexWriterConfig::default())?;
    let mut buffer = index_writer.new_buffer();
    for _ in 0..100 {
        buffer.add_document(doc("a b c"), None)?;
    }
    assert_eq!(index_writer.pending_num_docs(), 100);
    buffer.prepare_flush()?;
    fail::cfg("DocumentBuffer::flush::seal", "return(simulatederror)").unwrap();
    let mut sink = RamPostingsSink::default();
    let err = buffer.flush(&mut sink, None).unwrap_err();
    match err {
        ScrivenerError::Aborted(cause) => {
            assert!(matches!(
                *cause,
                ScrivenerError::SinkError(ref msg) if msg == "simulatederror"
            ));
        }
        err => panic!("unexpected error {err:?}"),
    }
    assert_eq!(buffer.state(), BufferState::Aborted);
    assert_eq!(index_writer.pending_num_docs(), 0);
    assert_eq!(index_writer.flush_control().num_buffers(), 0);
    assert!(matches!(
        buffer.flush(&mut sink, None),
        Err(ScrivenerError::InvalidState(_))
    ));
    Ok(())
}

#[test]
fn test_fail_on_add_document_deletes_the_document() -> scrivener::Result<()> {
    let _fail_scenario_guard = fail::FailScenario::setup();
    let index_writer = IndexWriter::new(IndexWriterConfig::default())?;
    let mut buffer = index_writer.new_buffer();
    buffer.add_document(doc("a"), None)?;
    fail::cfg("DocumentBuffer::add_document", "1*return->off").unwrap();
    assert!(matches!(
        buffer.add_document(doc("a"), None),
        Err(ScrivenerError::DocumentFailed(_))
    ));
    buffer.add_document(doc("a"), None)?;
    buffer.prepare_flush()?;
    let mut sink = RamPostingsSink::default();
    let segment = buffer.flush(&mut sink, None)?;
    assert_eq!(segment.max_doc(), 3);
    assert!(segment.is_deleted(1));
    assert_eq!(segment.num_docs(), 2);
    // the failing document never reached the postings.
    assert_eq!(
        sink.field("body").unwrap().doc_freqs(b"a"),
        vec![(0, 1), (2, 1)]
    );
    Ok(())
}
