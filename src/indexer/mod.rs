//! Document buffers, the shared delete log, flush decisions and sealing.

mod buffered_updates;
mod delete_queue;
mod doc_id_mapping;
mod document_buffer;
mod flush_control;
mod flush_policy;
mod index_writer;
mod index_writer_config;
mod operation;
mod segment_sealer;
mod segment_writer;
mod stamper;

pub use self::buffered_updates::{BufferedUpdates, FrozenBufferedUpdates, ALL_DOCS};
pub use self::delete_queue::{DeleteCursor, DeleteQueue, DeleteSlice};
pub use self::doc_id_mapping::DocIdMapping;
pub use self::document_buffer::{BufferState, DocumentBuffer};
pub use self::flush_control::{BufferRegistration, FlushControl};
pub use self::flush_policy::{BufferStats, FlushByRamOrCountsPolicy, FlushPolicy, FlushState};
pub use self::index_writer::IndexWriter;
pub use self::index_writer_config::{
    IndexWriterConfig, ARENA_ADDRESS_SPACE, MEMORY_BUDGET_DEFAULT, MEMORY_BUDGET_MIN,
    PER_BUFFER_HARD_LIMIT_DEFAULT,
};
pub use self::operation::{DeleteOperation, DeleteQuery, DeleteTarget, FieldUpdate, UpdateValue};
pub use self::segment_sealer::SealedSegment;
