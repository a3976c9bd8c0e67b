//! Byte-level memory primitives.
//!
//! Plain forward loops. `copy_from_slice` and friends may lower to calls of
//! `memcpy`, which [`crate::ffi`] itself provides.

/// Writes `value` into every byte of `dst`.
pub fn fill(
  dst: &mut [u8],
  value: u8,
) {
  for byte in dst {
    *byte = value;
  }
}

/// Copies `min(dst.len(), src.len())` bytes from the front of `src`.
///
/// Returns the number of bytes copied.
pub fn copy(
  dst: &mut [u8],
  src: &[u8],
) -> usize {
  let mut copied = 0;
  for (d, s) in dst.iter_mut().zip(src) {
    *d = *s;
    copied += 1;
  }
  copied
}

/// Compares the common prefix of `a` and `b`.
///
/// Returns the difference of the first pair of bytes that differ, or 0.
pub fn compare(
  a: &[u8],
  b: &[u8],
) -> i32 {
  a.iter()
    .zip(b)
    .find(|(x, y)| x != y)
    .map_or(0, |(&x, &y)| i32::from(x) - i32::from(y))
}
