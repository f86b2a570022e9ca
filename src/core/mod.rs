mod segment_id;

pub use self::segment_id::{segment_name, SegmentId};
