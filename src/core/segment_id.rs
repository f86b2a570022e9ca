use std::cmp::{Ord, Ordering};
use std::fmt;
#[cfg(test)]
use std::sync::atomic;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Uuid identifying a segment.
///
/// Every buffer receives a fresh id when it is created; the id is carried
/// over to the segment the buffer is sealed into.
///
/// In unit test, for reproducability, the `SegmentId` are
/// simply generated in an autoincrement fashion.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SegmentId(Uuid);

#[cfg(test)]
static AUTO_INC_COUNTER: atomic::AtomicU32 = atomic::AtomicU32::new(0);

// During tests, we generate the segment id in a autoincrement manner
// for consistency of segment id between run.
#[cfg(test)]
fn create_uuid() -> Uuid {
    let new_auto_inc_id = AUTO_INC_COUNTER.fetch_add(1, atomic::Ordering::SeqCst);
    Uuid::from_fields(new_auto_inc_id, 0, 0, &[0u8; 8])
}

#[cfg(not(test))]
fn create_uuid() -> Uuid {
    Uuid::new_v4()
}

impl SegmentId {
    #[doc(hidden)]
    pub fn generate_random() -> SegmentId {
        SegmentId(create_uuid())
    }

    /// Returns a shorter identifier of the segment.
    ///
    /// Picking the first 8 chars is ok to identify
    /// segments in a display message (e.g. a5c4dfcb).
    pub fn short_uuid_string(&self) -> String {
        self.0.as_simple().to_string()[..8].to_string()
    }

    /// Returns a segment uuid string.
    ///
    /// It consists in 32 lowercase hexadecimal chars
    /// (e.g. a5c4dfcbdfe645089129e308e26d5523)
    pub fn uuid_string(&self) -> String {
        self.0.as_simple().to_string()
    }
}

impl fmt::Debug for SegmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Seg({:?})", self.short_uuid_string())
    }
}

impl fmt::Display for SegmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.short_uuid_string())
    }
}

impl PartialOrd for SegmentId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SegmentId {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.as_bytes().cmp(other.0.as_bytes())
    }
}

/// Name of the `counter`-th segment produced by an index writer:
/// `_` followed by the counter in base 36.
pub fn segment_name(counter: u64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    let mut digits = Vec::new();
    let mut val = counter;
    loop {
        digits.push(DIGITS[(val % 36) as usize]);
        val /= 36;
        if val == 0 {
            break;
        }
    }
    digits.reverse();
    let mut name = String::with_capacity(digits.len() + 1);
    name.push('_');
    name.extend(digits.into_iter().map(char::from));
    name
}

#[cfg(test)]
mod tests {
    use super::{segment_name, SegmentId};

    #[test]
    fn test_uuid_string() {
        let segment_id = SegmentId::generate_random();
        let uuid_string = segment_id.uuid_string();
        assert_eq!(uuid_string.len(), 32);
        assert_eq!(segment_id.short_uuid_string(), &uuid_string[..8]);
        assert_ne!(segment_id, SegmentId::generate_random());
    }

    #[test]
    fn test_segment_name() {
        assert_eq!(segment_name(0), "_0");
        assert_eq!(segment_name(35), "_z");
        assert_eq!(segment_name(36), "_10");
        assert_eq!(segment_name(1_296), "_100");
    }
}
