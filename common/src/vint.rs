/// Reads a vint from the head of `data` and advances `data` past it.
///
/// Values are stored seven bits at a time, least significant group first.
/// Every byte but the last one has its high bit set.
///
/// # Panics
///
/// Panics if `data` ends in the middle of a vint.
#[inline]
pub fn read_u32_vint(data: &mut &[u8]) -> u32 {
    let mut result = 0u32;
    let mut shift = 0u32;
    for (i, &b) in data.iter().enumerate() {
        result |= u32::from(b & 0x7F) << shift;
        if b & 0x80 == 0 {
            *data = &data[i + 1..];
            return result;
        }
        shift += 7;
    }
    panic!("truncated vint");
}
