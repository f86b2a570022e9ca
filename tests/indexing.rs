mod common;

use common::{doc, init_logger, live_docs, malformed_doc, seal, BODY, ID};
use scrivener::indexer::{BufferState, DocIdMapping, IndexWriter, IndexWriterConfig};
use scrivener::schema::Term;
use scrivener::ScrivenerError;

fn index_writer(config: IndexWriterConfig) -> IndexWriter {
    init_logger();
    IndexWriter::new(config).unwrap()
}

fn id_term(id: &str) -> Term {
    Term::from_field_text(ID, id)
}

#[test]
fn test_doc_ids_follow_admission_order() -> scrivener::Result<()> {
    let index_writer = index_writer(IndexWriterConfig::default());
    let mut buffer = index_writer.new_buffer();
    for i in 0..50 {
        buffer.add_document(doc(&i.to_string(), "some text"), None)?;
    }
    assert_eq!(buffer.num_docs(), 50);
    let (segment, sink) = seal(&mut buffer, None)?;
    assert_eq!(segment.max_doc(), 50);
    assert!(segment.live_docs().is_none());
    let id_field = sink.field(ID).unwrap();
    for i in 0..50u32 {
        assert_eq!(id_field.doc_freqs(i.to_string().as_bytes()), vec![(i, 1)]);
    }
    assert_eq!(
        sink.field(BODY).unwrap().doc_freqs(b"some").len(),
        50
    );
    Ok(())
}

#[test]
fn test_delete_only_applies_to_documents_admitted_before() -> scrivener::Result<()> {
    let index_writer = index_writer(IndexWriterConfig::default());
    let mut buffer = index_writer.new_buffer();
    for i in 0..5 {
        buffer.add_document(doc(&i.to_string(), "shared"), None)?;
    }
    index_writer.delete_term(Term::from_field_text(BODY, "shared"));
    for i in 5..10 {
        buffer.add_document(doc(&i.to_string(), "shared"), None)?;
    }
    let (segment, _) = seal(&mut buffer, None)?;
    assert_eq!(live_docs(&segment), vec![5, 6, 7, 8, 9]);
    assert_eq!(segment.num_deleted_docs(), 5);
    Ok(())
}

#[test]
fn test_delete_is_bounded_when_applied_late() -> scrivener::Result<()> {
    let index_writer = index_writer(IndexWriterConfig::default());
    let mut buffer = index_writer.new_buffer();
    for i in 0..5 {
        buffer.add_document(doc(&i.to_string(), "shared"), None)?;
    }
    index_writer.delete_term(Term::from_field_text(BODY, "shared"));
    // the delete is folded into the buffer after the whole block is indexed.
    let block: Vec<_> = (5..10).map(|i| doc(&i.to_string(), "shared")).collect();
    buffer.add_documents(block, None)?;
    let (segment, _) = seal(&mut buffer, None)?;
    assert_eq!(live_docs(&segment), vec![5, 6, 7, 8, 9]);
    Ok(())
}

#[test]
fn test_delete_issued_before_buffer_creation_is_ignored() -> scrivener::Result<()> {
    let index_writer = index_writer(IndexWriterConfig::default());
    index_writer.delete_term(id_term("a"));
    let mut buffer = index_writer.new_buffer();
    buffer.add_document(doc("a", "text"), None)?;
    let global_updates = buffer.prepare_flush()?;
    // the delete belongs to previously sealed segments.
    assert_eq!(global_updates.delete_terms().len(), 1);
    let mut sink = scrivener::postings::RamPostingsSink::default();
    let segment = buffer.flush(&mut sink, None)?;
    assert!(segment.live_docs().is_none());
    Ok(())
}

#[test]
fn test_update_replaces_previous_documents() -> scrivener::Result<()> {
    let index_writer = index_writer(IndexWriterConfig::default());
    let mut buffer = index_writer.new_buffer();
    buffer.add_document(doc("a", "first version"), None)?;
    buffer.add_document(doc("b", "other"), None)?;
    buffer.add_document(doc("a", "second version"), Some(id_term("a")))?;
    let (segment, sink) = seal(&mut buffer, None)?;
    assert_eq!(live_docs(&segment), vec![1, 2]);
    assert_eq!(sink.field(ID).unwrap().doc_freqs(b"a"), vec![(0, 1), (2, 1)]);
    Ok(())
}

#[test]
fn test_block_delete_skips_its_own_documents() -> scrivener::Result<()> {
    let index_writer = index_writer(IndexWriterConfig::default());
    let mut buffer = index_writer.new_buffer();
    buffer.add_document(doc("parent", "old"), None)?;
    let block = vec![doc("parent", "new child"), doc("parent", "new parent")];
    buffer.add_documents(block, Some(id_term("parent")))?;
    let (segment, _) = seal(&mut buffer, None)?;
    assert_eq!(live_docs(&segment), vec![1, 2]);
    Ok(())
}

#[test]
fn test_failed_block_deletes_the_whole_block() -> scrivener::Result<()> {
    let index_writer = index_writer(IndexWriterConfig::default());
    let mut buffer = index_writer.new_buffer();
    buffer.add_document(doc("before", "text"), None)?;
    let block = vec![doc("x", "child"), malformed_doc("y"), doc("z", "parent")];
    let err = buffer
        .add_documents(block, Some(id_term("before")))
        .unwrap_err();
    assert!(err.is_document_failure());
    // the block stopped at the failing document.
    assert_eq!(buffer.num_docs(), 3);
    assert_eq!(buffer.state(), BufferState::Active);
    buffer.add_document(doc("after", "text"), None)?;
    let (segment, sink) = seal(&mut buffer, None)?;
    // the delete term of the failed block was not applied.
    assert_eq!(live_docs(&segment), vec![0, 3]);
    assert!(sink.field(ID).unwrap().term(b"z").is_none());
    Ok(())
}

#[test]
fn test_failed_document_is_deleted() -> scrivener::Result<()> {
    let index_writer = index_writer(IndexWriterConfig::default());
    let mut buffer = index_writer.new_buffer();
    buffer.add_document(doc("0", "ok"), None)?;
    assert!(matches!(
        buffer.add_document(malformed_doc("1"), None),
        Err(ScrivenerError::DocumentFailed(_))
    ));
    buffer.add_document(doc("2", "ok"), None)?;
    assert_eq!(index_writer.pending_num_docs(), 3);
    let (segment, sink) = seal(&mut buffer, None)?;
    assert_eq!(segment.max_doc(), 3);
    assert_eq!(live_docs(&segment), vec![0, 2]);
    // the postings written before the failure are kept, but point to a
    // deleted document.
    assert_eq!(sink.field(ID).unwrap().doc_freqs(b"1"), vec![(1, 1)]);
    Ok(())
}

#[test]
fn test_abort_releases_capacity() -> scrivener::Result<()> {
    let index_writer = index_writer(IndexWriterConfig {
        max_docs: 10,
        ..Default::default()
    });
    let mut first = index_writer.new_buffer();
    for i in 0..10 {
        first.add_document(doc(&i.to_string(), "text"), None)?;
    }
    let mut second = index_writer.new_buffer();
    assert!(matches!(
        second.add_document(doc("10", "text"), None),
        Err(ScrivenerError::CapacityExceeded { max_docs: 10 })
    ));
    assert_eq!(second.num_docs(), 0);
    first.abort();
    assert_eq!(first.state(), BufferState::Aborted);
    assert_eq!(index_writer.pending_num_docs(), 0);
    for i in 0..10 {
        second.add_document(doc(&i.to_string(), "text"), None)?;
    }
    assert!(second.add_document(doc("10", "text"), None).is_err());
    Ok(())
}

#[test]
fn test_sealed_documents_stay_reserved() -> scrivener::Result<()> {
    let index_writer = index_writer(IndexWriterConfig {
        max_docs: 2,
        ..Default::default()
    });
    let mut buffer = index_writer.new_buffer();
    buffer.add_document(doc("0", "text"), None)?;
    seal(&mut buffer, None)?;
    drop(buffer);
    assert_eq!(index_writer.pending_num_docs(), 1);
    Ok(())
}

#[test]
fn test_term_order_is_identical_across_seals() -> scrivener::Result<()> {
    let index_writer = index_writer(IndexWriterConfig::default());
    let texts = [
        "the quick brown fox",
        "jumps over the lazy dog",
        "zebra apple mango apple",
        "Ünïcode bytes sort raw",
    ];
    let mut sinks = Vec::new();
    for _ in 0..2 {
        let mut buffer = index_writer.new_buffer();
        for (i, text) in texts.iter().enumerate() {
            buffer.add_document(doc(&i.to_string(), text), None)?;
        }
        let (_, sink) = seal(&mut buffer, None)?;
        sinks.push(sink);
    }
    let terms: Vec<Vec<&[u8]>> = sinks
        .iter()
        .map(|sink| {
            sink.field(BODY)
                .unwrap()
                .terms()
                .iter()
                .map(|term| term.term())
                .collect()
        })
        .collect();
    assert_eq!(terms[0], terms[1]);
    let mut sorted = terms[0].clone();
    sorted.sort();
    assert_eq!(terms[0], sorted);
    assert_eq!(sinks[0].fields(), sinks[1].fields());
    Ok(())
}

#[test]
fn test_positions_and_offsets_are_recorded() -> scrivener::Result<()> {
    let index_writer = index_writer(IndexWriterConfig::default());
    let mut buffer = index_writer.new_buffer();
    buffer.add_document(doc("0", "to be or not to be"), None)?;
    buffer.add_document(doc("1", "be quick"), None)?;
    let (segment, sink) = seal(&mut buffer, None)?;
    assert!(segment.field_infos().has_positions());
    let body = sink.field(BODY).unwrap();
    assert_eq!(body.doc_freqs(b"be"), vec![(0, 2), (1, 1)]);
    let positions = body.positions(b"be");
    let first: Vec<(u32, Option<(u32, u32)>)> = positions[0]
        .1
        .iter()
        .map(|position| (position.position, position.offsets))
        .collect();
    assert_eq!(first, vec![(1, Some((3, 5))), (5, Some((16, 18)))]);
    assert_eq!(positions[1].1[0].position, 0);
    assert_eq!(body.stats().doc_count, 2);
    assert_eq!(body.stats().sum_total_term_freq, 8);
    Ok(())
}

#[test]
fn test_reorder_on_seal_requires_a_mapping() -> scrivener::Result<()> {
    let index_writer = index_writer(IndexWriterConfig {
        reorder_on_seal: true,
        ..Default::default()
    });
    let mut buffer = index_writer.new_buffer();
    for i in 0..4 {
        buffer.add_document(doc(&i.to_string(), "text"), None)?;
    }
    index_writer.delete_term(id_term("0"));
    buffer.prepare_flush()?;
    let mut sink = scrivener::postings::RamPostingsSink::default();
    assert!(matches!(
        buffer.flush(&mut sink, None),
        Err(ScrivenerError::InvalidArgument(_))
    ));
    let mapping = DocIdMapping::from_new_id_to_old_id(vec![3, 2, 1, 0])?;
    let segment = buffer.flush(&mut sink, Some(mapping))?;
    // old doc 0 is now doc 3.
    assert!(segment.is_deleted(3));
    assert_eq!(live_docs(&segment), vec![0, 1, 2]);
    assert!(segment.doc_id_mapping().is_some());
    Ok(())
}

#[test]
fn test_unresolved_updates_are_handed_back() -> scrivener::Result<()> {
    use scrivener::indexer::{DeleteQuery, FieldUpdate, UpdateValue};

    let index_writer = index_writer(IndexWriterConfig::default());
    let mut buffer = index_writer.new_buffer();
    buffer.add_document(doc("0", "text"), None)?;
    buffer.add_document(doc("1", "text"), None)?;
    index_writer.delete_query(DeleteQuery::new("body:text"));
    index_writer.update_field(FieldUpdate {
        term: id_term("1"),
        field: "price".to_string(),
        value: UpdateValue::Numeric(3),
    });
    buffer.add_document(doc("2", "text"), None)?;
    let (segment, _) = seal(&mut buffer, None)?;
    let residual = segment.residual_updates();
    assert_eq!(
        residual.delete_queries(),
        &[(DeleteQuery::new("body:text"), 2)]
    );
    assert_eq!(residual.field_updates().len(), 1);
    assert_eq!(residual.field_updates()[0].1, 2);
    assert!(residual.delete_terms().is_empty());
    assert!(segment.live_docs().is_none());
    Ok(())
}

#[test]
fn test_doc_count_trigger() -> scrivener::Result<()> {
    let index_writer = index_writer(IndexWriterConfig {
        max_buffered_docs: Some(3),
        memory_budget_in_bytes: None,
        ..Default::default()
    });
    let mut buffer = index_writer.new_buffer();
    for i in 0..2 {
        buffer.add_document(doc(&i.to_string(), "text"), None)?;
        assert!(!buffer.is_flush_pending());
    }
    buffer.add_document(doc("2", "text"), None)?;
    assert!(buffer.is_flush_pending());
    assert_eq!(index_writer.flush_control().num_flush_pending(), 1);
    let (segment, _) = seal(&mut buffer, None)?;
    assert_eq!(segment.max_doc(), 3);
    assert_eq!(buffer.state(), BufferState::Sealed);
    assert_eq!(index_writer.flush_control().num_buffers(), 0);
    Ok(())
}

#[test]
fn test_memory_trigger_picks_the_largest_buffer() -> scrivener::Result<()> {
    let index_writer = index_writer(IndexWriterConfig {
        memory_budget_in_bytes: Some(1_000_000),
        ..Default::default()
    });
    let mut small = index_writer.new_buffer();
    small.add_document(doc("small", "tiny"), None)?;
    let mut large = index_writer.new_buffer();
    let mut i = 0u64;
    while !large.is_flush_pending() {
        let body: String = (0..50).map(|j| format!("w{i}x{j} ")).collect();
        large.add_document(doc(&i.to_string(), &body), None)?;
        i += 1;
        assert!(i < 100_000, "the memory trigger never fired");
    }
    assert!(large.mem_usage() > small.mem_usage());
    assert!(!small.is_flush_pending());
    let flush_control = index_writer.flush_control();
    assert_eq!(flush_control.num_flush_pending(), 1);
    assert_eq!(flush_control.flush_bytes(), large.mem_usage());
    assert_eq!(flush_control.active_bytes(), small.mem_usage());
    Ok(())
}

#[test]
fn test_memory_trigger_marks_an_idle_buffer() -> scrivener::Result<()> {
    let index_writer = index_writer(IndexWriterConfig {
        memory_budget_in_bytes: Some(1_000_000),
        ..Default::default()
    });
    let body = |i: u64| -> String { (0..50).map(|j| format!("w{i}x{j} ")).collect() };
    let mut large = index_writer.new_buffer();
    let mut i = 0u64;
    while large.mem_usage() < 550_000 {
        large.add_document(doc(&i.to_string(), &body(i)), None)?;
        i += 1;
    }
    assert!(!large.is_flush_pending());
    // only the small buffer indexes from now on.
    let mut small = index_writer.new_buffer();
    while index_writer.flush_control().num_flush_pending() == 0 {
        small.add_document(doc(&i.to_string(), &body(i)), None)?;
        i += 1;
        assert!(i < 100_000, "the memory trigger never fired");
    }
    assert!(small.mem_usage() < large.mem_usage());
    assert_eq!(large.state(), BufferState::FlushPending);
    assert!(large.is_flush_pending());
    assert_eq!(small.state(), BufferState::Active);
    assert!(!small.is_flush_pending());
    assert_eq!(index_writer.flush_control().flush_bytes(), large.mem_usage());

    let num_docs = large.num_docs();
    let (segment, _) = seal(&mut large, None)?;
    assert_eq!(segment.max_doc(), num_docs);
    assert_eq!(large.state(), BufferState::Sealed);
    assert_eq!(index_writer.flush_control().num_flush_pending(), 0);
    Ok(())
}

#[test]
fn test_random_reorder_keeps_deletes_on_the_right_documents() -> scrivener::Result<()> {
    use rand::rngs::StdRng;
    use rand::seq::SliceRandom;
    use rand::SeedableRng;

    let index_writer = index_writer(IndexWriterConfig {
        reorder_on_seal: true,
        ..Default::default()
    });
    let mut buffer = index_writer.new_buffer();
    for i in 0..100u32 {
        buffer.add_document(doc(&i.to_string(), "text"), None)?;
        if i % 7 == 0 {
            index_writer.delete_term(id_term(&i.to_string()));
        }
    }
    let mut new_doc_id_to_old: Vec<u32> = (0..100).collect();
    new_doc_id_to_old.shuffle(&mut StdRng::seed_from_u64(42));
    let mapping = DocIdMapping::from_new_id_to_old_id(new_doc_id_to_old.clone())?;
    let (segment, _) = seal(&mut buffer, Some(mapping))?;
    for (new_doc_id, old_doc_id) in new_doc_id_to_old.into_iter().enumerate() {
        assert_eq!(segment.is_deleted(new_doc_id as u32), old_doc_id % 7 == 0);
    }
    assert_eq!(segment.num_deleted_docs(), 15);
    Ok(())
}
