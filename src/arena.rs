use core::{cell::UnsafeCell, slice};

use crate::{
  config::ALIGNMENT,
  error::Result,
  handle::Handle,
  list::{Blocks, FreeList, Region},
};

/// A first-fit free-list allocator over a fixed `N`-byte buffer.
///
/// Blocks are carved from the front of the buffer in order and are never
/// split, merged or handed back; releasing a block only marks it reusable.
#[repr(C, align(8))]
pub struct Arena<const N: usize> {
  buf: UnsafeCell<[u8; N]>,
  list: FreeList,
}

const _: () = assert!(core::mem::align_of::<Arena<0>>() >= ALIGNMENT);

impl<const N: usize> Default for Arena<N> {
  fn default() -> Self {
    Self::new()
  }
}

impl<const N: usize> Arena<N> {
  pub const fn new() -> Self {
    Self {
      buf: UnsafeCell::new([0; N]),
      list: FreeList::new(),
    }
  }

  pub const fn capacity(&self) -> usize {
    N
  }

  /// Offset of the first byte never handed out.
  pub const fn frontier(&self) -> usize {
    self.list.frontier()
  }

  /// Bytes left behind the frontier, headers included.
  pub const fn remaining(&self) -> usize {
    N - self.list.frontier()
  }

  pub fn block_count(&self) -> usize {
    self.blocks().count()
  }

  /// Iterates over every block ever carved, in carve order.
  pub fn blocks(&self) -> Blocks<'_> {
    self.list.blocks(self.region())
  }

  /// Allocates at least `size` bytes.
  ///
  /// The first free block large enough is reused as is; otherwise a new
  /// block is carved at the frontier. Reused payloads keep their old bytes.
  ///
  /// # Errors
  /// [`AllocError::InvalidSize`](crate::AllocError::InvalidSize) for `size == 0`,
  /// [`AllocError::OutOfMemory`](crate::AllocError::OutOfMemory) when no block
  /// fits and the frontier cannot hold another one.
  pub fn allocate(
    &mut self,
    size: usize,
  ) -> Result<Handle> {
    let region = self.region();
    self.list.allocate(region, size)
  }

  /// Allocates `count * elem_size` bytes and zeroes them.
  ///
  /// # Errors
  /// [`AllocError::SizeOverflow`](crate::AllocError::SizeOverflow) if the
  /// product overflows, otherwise whatever [`Arena::allocate`] returns.
  pub fn allocate_zeroed(
    &mut self,
    count: usize,
    elem_size: usize,
  ) -> Result<Handle> {
    let region = self.region();
    self.list.allocate_zeroed(region, count, elem_size)
  }

  /// Marks the block behind `handle` as free.
  ///
  /// The payload is left untouched and the block keeps its size and its
  /// place in the list.
  ///
  /// # Errors
  /// [`AllocError::InvalidHandle`](crate::AllocError::InvalidHandle) if
  /// `handle` was not issued by this arena,
  /// [`AllocError::DoubleFree`](crate::AllocError::DoubleFree) if the block
  /// is already free.
  pub fn release(
    &mut self,
    handle: Handle,
  ) -> Result<()> {
    let region = self.region();
    self.list.release(region, handle)
  }

  /// [`Arena::release`] that treats `None` as a no-op.
  pub fn release_opt(
    &mut self,
    handle: Option<Handle>,
  ) -> Result<()> {
    match handle {
      Some(handle) => self.release(handle),
      None => Ok(()),
    }
  }

  /// The payload of a live allocation, including its alignment padding.
  pub fn payload(
    &self,
    handle: Handle,
  ) -> Result<&[u8]> {
    let region = self.region();
    let size = self.list.live_size(region, handle)?;
    Ok(unsafe { slice::from_raw_parts(region.base().add(handle.offset()), size) })
  }

  pub fn payload_mut(
    &mut self,
    handle: Handle,
  ) -> Result<&mut [u8]> {
    let region = self.region();
    let size = self.list.live_size(region, handle)?;
    Ok(unsafe { slice::from_raw_parts_mut(region.base().add(handle.offset()), size) })
  }

  fn region(&self) -> Region {
    // SAFETY: the buffer lives as long as `self` and is only reached through
    // this pointer.
    unsafe { Region::new(self.buf.get().cast(), N) }
  }
}

#[cfg(test)]
mod tests {
  use proptest::prelude::*;
  use tracing_test::traced_test;

  use super::*;
  use crate::{block::HEADER_SIZE, error::AllocError, list::BlockInfo, mem};

  #[test]
  fn test_alloc() {
    let mut arena = Arena::<1024>::new();

    let first = arena.allocate(8).unwrap();
    arena.payload_mut(first).unwrap().copy_from_slice(&3u64.to_le_bytes());

    let second = arena.allocate(12).unwrap();
    for (i, byte) in arena.payload_mut(second).unwrap().iter_mut().enumerate() {
      *byte = i as u8 + 1;
    }

    assert_eq!(arena.payload(first).unwrap(), &3u64.to_le_bytes());
    assert_eq!(arena.payload(second).unwrap().len(), 16);
    assert_eq!(
      &arena.payload(second).unwrap()[..12],
      &[1u8, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12]
    );

    arena.release(first).unwrap();

    let third = arena.allocate(4).unwrap();
    assert_eq!(third, first);

    arena.release(third).unwrap();

    let fourth = arena.allocate(16).unwrap();
    assert!(fourth > second);
  }

  #[test]
  fn test_frontier_walkthrough() {
    let mut arena = Arena::<1024>::new();
    assert_eq!(arena.frontier(), 0);

    let first = arena.allocate(10).unwrap();
    assert_eq!(first.offset(), 24);
    assert_eq!(arena.frontier(), 40);

    let second = arena.allocate(16).unwrap();
    assert_eq!(second.offset(), 64);
    assert_eq!(arena.frontier(), 80);

    arena.release(first).unwrap();

    let third = arena.allocate(10).unwrap();
    assert_eq!(third.offset(), 24);
    assert_eq!(arena.frontier(), 80);
    assert_eq!(arena.block_count(), 2);
  }

  #[test]
  fn test_zero_size_is_rejected() {
    let mut arena = Arena::<1024>::new();

    assert_eq!(arena.allocate(0), Err(AllocError::InvalidSize));
    assert_eq!(arena.frontier(), 0);
    assert_eq!(arena.block_count(), 0);
  }

  #[test]
  fn test_first_fit_not_best_fit() {
    let mut arena = Arena::<1024>::new();

    let big = arena.allocate(64).unwrap();
    let small = arena.allocate(8).unwrap();
    arena.release(big).unwrap();
    arena.release(small).unwrap();

    // The 64-byte block comes first in the list, so it wins over the exact fit.
    assert_eq!(arena.allocate(8).unwrap(), big);
    assert_eq!(arena.allocate(8).unwrap(), small);
  }

  #[test]
  fn test_reuse_does_not_split() {
    let mut arena = Arena::<1024>::new();

    let big = arena.allocate(64).unwrap();
    arena.release(big).unwrap();

    let reused = arena.allocate(8).unwrap();
    assert_eq!(reused, big);
    assert_eq!(arena.payload(reused).unwrap().len(), 64);
    assert_eq!(arena.block_count(), 1);
  }

  #[test]
  fn test_adjacent_free_blocks_are_not_coalesced() {
    let mut arena = Arena::<1024>::new();

    let one = arena.allocate(16).unwrap();
    let two = arena.allocate(16).unwrap();
    arena.release(one).unwrap();
    arena.release(two).unwrap();

    let frontier = arena.frontier();
    let three = arena.allocate(32).unwrap();

    assert!(three > two);
    assert_eq!(arena.frontier(), frontier + HEADER_SIZE + 32);
    assert_eq!(arena.block_count(), 3);
  }

  #[test]
  fn test_reuse_keeps_old_bytes() {
    let mut arena = Arena::<1024>::new();

    let handle = arena.allocate(32).unwrap();
    mem::fill(arena.payload_mut(handle).unwrap(), 0xAB);
    arena.release(handle).unwrap();

    let again = arena.allocate(8).unwrap();
    assert_eq!(again, handle);
    assert!(arena.payload(again).unwrap().iter().all(|&b| b == 0xAB));
  }

  #[test]
  fn test_allocate_zeroed_clears_reused_block() {
    let mut arena = Arena::<1024>::new();

    let handle = arena.allocate(32).unwrap();
    mem::fill(arena.payload_mut(handle).unwrap(), 0xAB);
    arena.release(handle).unwrap();

    let zeroed = arena.allocate_zeroed(4, 4).unwrap();
    assert_eq!(zeroed, handle);

    let payload = arena.payload(zeroed).unwrap();
    assert!(payload[..16].iter().all(|&b| b == 0));
    assert!(payload[16..].iter().all(|&b| b == 0xAB));
  }

  #[test]
  fn test_allocate_zeroed_failures() {
    let mut arena = Arena::<1024>::new();

    assert_eq!(arena.allocate_zeroed(0, 8), Err(AllocError::InvalidSize));
    assert_eq!(
      arena.allocate_zeroed(usize::MAX, 2),
      Err(AllocError::SizeOverflow {
        count: usize::MAX,
        elem_size: 2
      })
    );
    assert!(matches!(
      arena.allocate_zeroed(1024, 1),
      Err(AllocError::OutOfMemory { .. })
    ));
    assert_eq!(arena.frontier(), 0);
  }

  #[test]
  fn test_double_free_is_detected() {
    let mut arena = Arena::<1024>::new();

    let handle = arena.allocate(16).unwrap();
    arena.release(handle).unwrap();

    assert_eq!(
      arena.release(handle),
      Err(AllocError::DoubleFree { offset: 24 })
    );
    assert_eq!(arena.block_count(), 1);
  }

  #[test]
  fn test_foreign_handles_are_rejected() {
    let mut arena = Arena::<1024>::new();
    let handle = arena.allocate(16).unwrap();

    for offset in [0, 8, handle.offset() + 8, 512, usize::MAX] {
      assert_eq!(
        arena.release(Handle::new(offset)),
        Err(AllocError::InvalidHandle { offset })
      );
    }
    assert!(!arena.blocks().next().unwrap().free);
  }

  #[test]
  fn test_released_payload_is_inaccessible() {
    let mut arena = Arena::<1024>::new();

    let handle = arena.allocate(16).unwrap();
    arena.release(handle).unwrap();

    assert_eq!(
      arena.payload(handle),
      Err(AllocError::UseAfterFree { offset: 24 })
    );
  }

  #[test]
  fn test_release_none_is_noop() {
    let mut arena = Arena::<1024>::new();
    let handle = arena.allocate(16).unwrap();

    assert_eq!(arena.release_opt(None), Ok(()));
    assert_eq!(arena.release_opt(Some(handle)), Ok(()));
    assert!(arena.blocks().all(|block| block.free));
  }

  #[traced_test]
  #[test]
  fn test_exhaustion() {
    let mut arena = Arena::<1024>::new();

    let mut count = 0;
    while arena.allocate(10).is_ok() {
      count += 1;
    }

    assert_eq!(count, 25);
    assert_eq!(arena.frontier(), 1000);
    assert_eq!(
      arena.allocate(1),
      Err(AllocError::OutOfMemory {
        requested: 8,
        remaining: 24
      })
    );
    assert!(arena.allocate(usize::MAX).is_err());
    assert_eq!(arena.frontier(), 1000);
    assert_eq!(arena.block_count(), 25);
    assert!(logs_contain("arena exhausted"));
  }

  #[traced_test]
  #[test]
  fn test_corrupt_header_is_reported() {
    let mut arena = Arena::<1024>::new();

    arena.allocate(16).unwrap();
    let second = arena.allocate(16).unwrap();
    unsafe {
      core::ptr::write_bytes(arena.buf.get().cast::<u8>().add(40), 0xEE, HEADER_SIZE);
    }

    assert_eq!(arena.block_count(), 1);
    assert!(logs_contain("block list truncated at corrupt block header"));
    assert_eq!(
      arena.allocate(64),
      Err(AllocError::CorruptHeader { offset: 40 })
    );
    assert_eq!(
      arena.release(second),
      Err(AllocError::CorruptHeader { offset: 40 })
    );
    assert_eq!(arena.frontier(), 80);
  }

  #[test]
  fn test_blocks_in_carve_order() {
    let mut arena = Arena::<1024>::new();

    let a = arena.allocate(8).unwrap();
    let b = arena.allocate(24).unwrap();
    arena.release(a).unwrap();

    let blocks: Vec<_> = arena.blocks().collect();
    assert_eq!(
      blocks,
      vec![
        BlockInfo {
          header: 0,
          payload: a,
          size: 8,
          free: true
        },
        BlockInfo {
          header: 32,
          payload: b,
          size: 24,
          free: false
        },
      ]
    );
  }

  proptest! {
    #[test]
    fn release_then_allocate_reuses_block(size in 1usize..=512) {
      let mut arena = Arena::<4096>::new();
      arena.allocate(8).unwrap();

      let handle = arena.allocate(size).unwrap();
      let blocks = arena.block_count();
      arena.release(handle).unwrap();

      prop_assert_eq!(arena.allocate(size).unwrap(), handle);
      prop_assert_eq!(arena.block_count(), blocks);
    }

    #[test]
    fn reuse_preserves_bytes_beyond_request(
      size in 1usize..=256,
      smaller in 1usize..=256,
      fill in any::<u8>()
    ) {
      let smaller = smaller.min(size);
      let mut arena = Arena::<4096>::new();

      let handle = arena.allocate(size).unwrap();
      mem::fill(arena.payload_mut(handle).unwrap(), fill);
      arena.release(handle).unwrap();

      let again = arena.allocate(smaller).unwrap();
      prop_assert_eq!(again, handle);
      prop_assert!(arena.payload(again).unwrap().iter().all(|&b| b == fill));
    }

    #[test]
    fn frontier_never_exceeds_capacity(sizes in prop::collection::vec(0usize..300, 1..64)) {
      let mut arena = Arena::<2048>::new();

      for size in sizes {
        let before = arena.frontier();
        match arena.allocate(size) {
          Ok(handle) => {
            let len = arena.payload(handle).unwrap().len();
            prop_assert!(handle.offset() + len <= arena.frontier());
            prop_assert_eq!(len % ALIGNMENT, 0);
          }
          Err(_) => {
            prop_assert_eq!(arena.frontier(), before);
          }
        }
        prop_assert!(arena.frontier() <= arena.capacity());
      }
    }
  }
}
