/// Rounds the given size up to the next multiple of [`ALIGNMENT`](crate::config::ALIGNMENT),
/// or of an explicit power-of-two alignment.
///
/// # Examples
///
/// ```rust
/// use freearena::align;
///
/// assert_eq!(align!(10), 16);
/// assert_eq!(align!(16), 16);
/// assert_eq!(align!(13, 4), 16);
/// ```
#[macro_export]
macro_rules! align {
  ($value:expr) => {
    $crate::align!($value, $crate::config::ALIGNMENT)
  };
  ($value:expr, $align:expr) => {
    ($value + $align - 1) & !($align - 1)
  };
}

/// Like [`align!`], but returns `None` instead of overflowing near `usize::MAX`.
pub const fn checked_align(
  value: usize,
  align: usize,
) -> Option<usize> {
  match value.checked_add(align - 1) {
    Some(bumped) => Some(bumped & !(align - 1)),
    None => None,
  }
}
