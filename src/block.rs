/// Size of an encoded [`BlockHeader`] in bytes.
pub const HEADER_SIZE: usize = 24;

const WORD: usize = 8;
const NO_NEXT: u64 = u64::MAX;
const FREE_BIT: u64 = 1;
/// Stamped into the upper half of the flags word of every header.
const GUARD_TAG: u64 = 0xB10C_A11C << 32;
const GUARD_MASK: u64 = 0xFFFF_FFFF << 32;

/// Metadata preceding every payload in the arena.
///
/// Layout, little-endian words: `size`, `next` (`u64::MAX` for none), flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockHeader {
  pub size: usize,
  pub is_free: bool,
  pub next: Option<usize>,
}

impl BlockHeader {
  pub fn new(
    size: usize,
    is_free: bool,
    next: Option<usize>,
  ) -> Self {
    Self { size, is_free, next }
  }

  pub fn encode(&self) -> [u8; HEADER_SIZE] {
    let next = self.next.map_or(NO_NEXT, |offset| offset as u64);
    let flags = GUARD_TAG | if self.is_free { FREE_BIT } else { 0 };

    let mut bytes = [0u8; HEADER_SIZE];
    bytes[..WORD].copy_from_slice(&(self.size as u64).to_le_bytes());
    bytes[WORD..2 * WORD].copy_from_slice(&next.to_le_bytes());
    bytes[2 * WORD..].copy_from_slice(&flags.to_le_bytes());
    bytes
  }

  /// Returns `None` if the bytes were not written by [`BlockHeader::encode`].
  pub fn decode(bytes: &[u8]) -> Option<Self> {
    let word = |i: usize| -> Option<u64> {
      let chunk = bytes.get(i * WORD..(i + 1) * WORD)?;
      Some(u64::from_le_bytes(chunk.try_into().ok()?))
    };

    let flags = word(2)?;
    if flags & GUARD_MASK != GUARD_TAG {
      return None;
    }

    let size = usize::try_from(word(0)?).ok()?;
    let next = match word(1)? {
      NO_NEXT => None,
      offset => Some(usize::try_from(offset).ok()?),
    };

    Some(Self::new(size, flags & FREE_BIT != 0, next))
  }
}
