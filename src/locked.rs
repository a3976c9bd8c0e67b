use core::{cell::UnsafeCell, ptr::NonNull, slice};

use parking_lot::{Mutex, const_mutex};

use crate::{
  config::ALIGNMENT,
  error::{AllocError, Result},
  handle::Handle,
  list::{FreeList, Region},
};

/// Counters describing an arena at one point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArenaStats {
  pub capacity: usize,
  pub frontier: usize,
  pub blocks: usize,
  pub free_blocks: usize,
}

/// An arena behind a single lock, shareable between threads.
///
/// Each operation holds the lock for the whole search and carve, so a block
/// never has two owners. The bytes sit outside the lock and are only reached
/// through a raw base pointer, so pointers handed out by
/// [`LockedArena::allocate_ptr`] stay usable across later calls.
#[repr(C, align(8))]
pub struct LockedArena<const N: usize> {
  buf: UnsafeCell<[u8; N]>,
  list: Mutex<FreeList>,
}

const _: () = assert!(core::mem::align_of::<LockedArena<0>>() >= ALIGNMENT);

// SAFETY: headers are only touched while `list` is locked, and a payload is
// only touched by the owner of its block.
unsafe impl<const N: usize> Sync for LockedArena<N> {}

impl<const N: usize> Default for LockedArena<N> {
  fn default() -> Self {
    Self::new()
  }
}

impl<const N: usize> LockedArena<N> {
  pub const fn new() -> Self {
    Self {
      buf: UnsafeCell::new([0; N]),
      list: const_mutex(FreeList::new()),
    }
  }

  pub fn allocate(
    &self,
    size: usize,
  ) -> Result<Handle> {
    self.list.lock().allocate(self.region(), size)
  }

  pub fn allocate_zeroed(
    &self,
    count: usize,
    elem_size: usize,
  ) -> Result<Handle> {
    self.list.lock().allocate_zeroed(self.region(), count, elem_size)
  }

  pub fn release(
    &self,
    handle: Handle,
  ) -> Result<()> {
    self.list.lock().release(self.region(), handle)
  }

  /// [`LockedArena::allocate`], returning the payload address.
  pub fn allocate_ptr(
    &self,
    size: usize,
  ) -> Result<NonNull<u8>> {
    self.allocate(size).map(|handle| self.payload_ptr(handle))
  }

  pub fn allocate_zeroed_ptr(
    &self,
    count: usize,
    elem_size: usize,
  ) -> Result<NonNull<u8>> {
    self
      .allocate_zeroed(count, elem_size)
      .map(|handle| self.payload_ptr(handle))
  }

  /// Releases the block whose payload starts at `ptr`.
  ///
  /// # Errors
  /// [`AllocError::InvalidHandle`] (carrying the address) if `ptr` lies
  /// outside the arena, otherwise whatever [`LockedArena::release`] returns.
  pub fn release_ptr(
    &self,
    ptr: *mut u8,
  ) -> Result<()> {
    let offset = ptr
      .addr()
      .checked_sub(self.region().base().addr())
      .filter(|&offset| offset <= N)
      .ok_or(AllocError::InvalidHandle { offset: ptr.addr() })?;

    self.release(Handle::new(offset))
  }

  /// Runs `f` on the payload of `handle` while holding the lock.
  pub fn with_payload<R>(
    &self,
    handle: Handle,
    f: impl FnOnce(&[u8]) -> R,
  ) -> Result<R> {
    let list = self.list.lock();
    let size = list.live_size(self.region(), handle)?;
    let payload = unsafe { slice::from_raw_parts(self.payload_ptr(handle).as_ptr(), size) };
    Ok(f(payload))
  }

  pub fn with_payload_mut<R>(
    &self,
    handle: Handle,
    f: impl FnOnce(&mut [u8]) -> R,
  ) -> Result<R> {
    let list = self.list.lock();
    let size = list.live_size(self.region(), handle)?;
    let payload = unsafe { slice::from_raw_parts_mut(self.payload_ptr(handle).as_ptr(), size) };
    Ok(f(payload))
  }

  pub fn stats(&self) -> ArenaStats {
    let list = self.list.lock();
    let (blocks, free_blocks) = list
      .blocks(self.region())
      .fold((0, 0), |(all, free), block| (all + 1, free + usize::from(block.free)));

    ArenaStats {
      capacity: N,
      frontier: list.frontier(),
      blocks,
      free_blocks,
    }
  }

  fn payload_ptr(
    &self,
    handle: Handle,
  ) -> NonNull<u8> {
    // SAFETY: handles issued by the list point inside the buffer, whose base
    // is never null.
    unsafe { NonNull::new_unchecked(self.region().base().add(handle.offset())) }
  }

  fn region(&self) -> Region {
    // SAFETY: the buffer lives as long as `self`; nothing borrows it as a
    // whole.
    unsafe { Region::new(self.buf.get().cast(), N) }
  }
}

#[cfg(test)]
mod tests {
  use std::{collections::HashSet, sync::Arc, thread};

  use super::*;

  #[test]
  fn test_stats() {
    let arena = LockedArena::<1024>::new();

    let one = arena.allocate(10).unwrap();
    arena.allocate(16).unwrap();
    arena.release(one).unwrap();

    assert_eq!(
      arena.stats(),
      ArenaStats {
        capacity: 1024,
        frontier: 80,
        blocks: 2,
        free_blocks: 1
      }
    );
  }

  #[test]
  fn test_payload_access() {
    let arena = LockedArena::<1024>::new();
    let handle = arena.allocate_zeroed(2, 8).unwrap();

    arena
      .with_payload_mut(handle, |bytes| bytes[0] = 42)
      .unwrap();
    assert_eq!(arena.with_payload(handle, |bytes| bytes[0]).unwrap(), 42);

    arena.release(handle).unwrap();
    assert_eq!(
      arena.with_payload(handle, |bytes| bytes.len()),
      Err(AllocError::UseAfterFree {
        offset: handle.offset()
      })
    );
  }

  #[test]
  fn test_concurrent_owners_are_distinct() {
    let arena = Arc::new(LockedArena::<65536>::new());

    let workers: Vec<_> = (0..4)
      .map(|_| {
        let arena = Arc::clone(&arena);
        thread::spawn(move || {
          (0..64)
            .map(|_| arena.allocate(16).unwrap())
            .collect::<Vec<_>>()
        })
      })
      .collect();

    let mut seen = HashSet::new();
    for worker in workers {
      for handle in worker.join().unwrap() {
        assert!(seen.insert(handle), "{handle} handed out twice");
      }
    }

    assert_eq!(seen.len(), 256);
    assert_eq!(arena.stats().blocks, 256);
  }

  #[test]
  fn test_older_pointers_survive_later_calls() {
    let arena = LockedArena::<1024>::new();

    let first = arena.allocate_ptr(16).unwrap().as_ptr();
    let second = arena.allocate_ptr(16).unwrap().as_ptr();
    unsafe {
      *first = 7;
      *second = 9;
    }

    let third = arena.allocate_zeroed_ptr(2, 8).unwrap().as_ptr();
    arena.release_ptr(second).unwrap();
    unsafe {
      *first.add(15) = 8;
      *third = 1;
      assert_eq!((*first, *first.add(15), *third), (7, 8, 1));
    }

    arena.release_ptr(first).unwrap();
    arena.release_ptr(third).unwrap();
    assert_eq!(arena.stats().free_blocks, 3);
  }

  #[test]
  fn test_release_ptr_outside_arena() {
    let arena = LockedArena::<1024>::new();
    let mut local = 0u8;
    let ptr = &raw mut local;

    assert_eq!(
      arena.release_ptr(ptr),
      Err(AllocError::InvalidHandle { offset: ptr.addr() })
    );
    assert!(matches!(
      arena.release_ptr(core::ptr::null_mut()),
      Err(AllocError::InvalidHandle { .. })
    ));
  }
}
