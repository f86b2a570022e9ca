use std::fmt;

use serde::{Deserialize, Serialize};

/// Amount of memory or storage, in bytes.
///
/// Formats itself in a human readable way (`1.50 MB`) for log lines.
#[derive(Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ByteCount(u64);

const UNITS: [(&str, u64); 4] = [
    ("GB", 1_000_000_000),
    ("MB", 1_000_000),
    ("KB", 1_000),
    ("B", 1),
];

impl ByteCount {
    #[inline]
    pub fn get_bytes(&self) -> u64 {
        self.0
    }

    pub fn human_readable(&self) -> String {
        let bytes = self.get_bytes();
        for (suffix, threshold) in UNITS.iter() {
            if bytes >= *threshold && *threshold > 1 {
                return format!("{:.2} {suffix}", bytes as f64 / *threshold as f64);
            }
        }
        format!("{bytes} B")
    }
}

impl fmt::Debug for ByteCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.human_readable())
    }
}

impl fmt::Display for ByteCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.human_readable())
    }
}

impl From<u64> for ByteCount {
    fn from(value: u64) -> Self {
        ByteCount(value)
    }
}

impl From<usize> for ByteCount {
    fn from(value: usize) -> Self {
        ByteCount(value as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::ByteCount;

    #[test]
    fn test_human_readable() {
        assert_eq!(ByteCount::from(0u64).human_readable(), "0 B");
        assert_eq!(ByteCount::from(300u64).human_readable(), "300 B");
        assert_eq!(ByteCount::from(32_768u64).human_readable(), "32.77 KB");
        assert_eq!(ByteCount::from(1_500_000u64).human_readable(), "1.50 MB");
        assert_eq!(ByteCount::from(2_000_000_000u64).human_readable(), "2.00 GB");
    }
}
