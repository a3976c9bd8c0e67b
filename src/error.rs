use thiserror::Error;

/// Reasons an arena operation can fail.
///
/// None of these leave the arena in a modified state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AllocError {
  #[error("invalid size (must be > 0)")]
  InvalidSize,

  #[error("out of memory (requested: {requested} bytes, remaining: {remaining} bytes)")]
  OutOfMemory { requested: usize, remaining: usize },

  #[error("size overflow computing {count} * {elem_size}")]
  SizeOverflow { count: usize, elem_size: usize },

  #[error("offset {offset:#x} does not name an allocated block")]
  InvalidHandle { offset: usize },

  #[error("double free detected at offset {offset:#x}")]
  DoubleFree { offset: usize },

  #[error("use of released block at offset {offset:#x}")]
  UseAfterFree { offset: usize },

  #[error("block header at offset {offset:#x} is corrupt")]
  CorruptHeader { offset: usize },
}

pub type Result<T> = core::result::Result<T, AllocError>;
