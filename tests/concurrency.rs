mod common;

use std::collections::HashSet;
use std::thread;

use common::{doc, init_logger, live_docs, seal, BODY, ID};
use scrivener::indexer::{IndexWriter, IndexWriterConfig, SealedSegment};
use scrivener::postings::RamPostingsSink;
use scrivener::schema::Term;

const NUM_THREADS: usize = 4;
const NUM_DOCS: u32 = 200;

fn id(thread_id: usize, doc: u32) -> String {
    format!("t{thread_id}-{doc}")
}

fn index_and_seal(
    index_writer: &IndexWriter,
    thread_id: usize,
) -> scrivener::Result<(SealedSegment, RamPostingsSink, Vec<u64>)> {
    let mut buffer = index_writer.new_buffer();
    let mut opstamps = Vec::new();
    for doc_id in 0..NUM_DOCS {
        opstamps.push(buffer.add_document(doc(&id(thread_id, doc_id), "common text"), None)?);
        if doc_id % 10 == 9 {
            // an admitted document, and one that is not admitted yet.
            let admitted = Term::from_field_text(ID, &id(thread_id, doc_id - 5));
            let upcoming = Term::from_field_text(ID, &id(thread_id, doc_id + 1));
            opstamps.push(index_writer.delete_term(admitted));
            opstamps.push(index_writer.delete_term(upcoming));
        }
    }
    let (segment, sink) = seal(&mut buffer, None)?;
    Ok((segment, sink, opstamps))
}

#[test]
fn test_concurrent_buffers_share_the_delete_log() {
    init_logger();
    let index_writer = IndexWriter::new(IndexWriterConfig::default()).unwrap();
    let results: Vec<_> = thread::scope(|scope| {
        let handles: Vec<_> = (0..NUM_THREADS)
            .map(|thread_id| {
                let index_writer = &index_writer;
                scope.spawn(move || index_and_seal(index_writer, thread_id))
            })
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join().unwrap().unwrap())
            .collect()
    });

    let mut all_opstamps = HashSet::new();
    for (thread_id, (segment, sink, opstamps)) in results.into_iter().enumerate() {
        for opstamp in opstamps {
            assert!(all_opstamps.insert(opstamp), "opstamp {opstamp} was reused");
        }
        assert_eq!(segment.max_doc(), NUM_DOCS);
        let expected_deleted: Vec<u32> = (0..NUM_DOCS)
            .filter(|doc_id| doc_id % 10 == 9)
            .map(|doc_id| doc_id - 5)
            .collect();
        let expected_live: Vec<u32> = (0..NUM_DOCS)
            .filter(|doc_id| !expected_deleted.contains(doc_id))
            .collect();
        assert_eq!(live_docs(&segment), expected_live, "thread {thread_id}");
        let id_field = sink.field(ID).unwrap();
        assert_eq!(id_field.terms().len(), NUM_DOCS as usize);
        assert_eq!(
            sink.field(BODY).unwrap().doc_freqs(b"common").len(),
            NUM_DOCS as usize
        );
    }
    assert_eq!(
        index_writer.pending_num_docs(),
        (NUM_THREADS as u64) * u64::from(NUM_DOCS)
    );
}

#[test]
fn test_deletes_from_other_threads() {
    init_logger();
    let index_writer = IndexWriter::new(IndexWriterConfig::default()).unwrap();
    let mut buffer = index_writer.new_buffer();
    for doc_id in 0..10 {
        buffer
            .add_document(doc(&doc_id.to_string(), "text"), None)
            .unwrap();
    }
    thread::scope(|scope| {
        for doc_id in [2, 4, 6] {
            let index_writer = &index_writer;
            scope.spawn(move || {
                index_writer.delete_term(Term::from_field_text(ID, &doc_id.to_string()))
            });
        }
    });
    let (segment, _) = seal(&mut buffer, None).unwrap();
    assert_eq!(live_docs(&segment), vec![0, 1, 3, 5, 7, 8, 9]);
}
