use core::fmt;

/// Opaque reference to an allocation: the arena offset of its first payload byte.
///
/// Handles are only meaningful for the arena that issued them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Handle {
  offset: usize,
}

impl Handle {
  pub(crate) const fn new(offset: usize) -> Self {
    Self { offset }
  }

  /// Offset of the payload from the start of the arena.
  pub const fn offset(self) -> usize {
    self.offset
  }
}

impl fmt::Display for Handle {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    write!(f, "@{:#x}", self.offset)
  }
}
