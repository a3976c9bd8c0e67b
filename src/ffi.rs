//! C ABI over a process-wide heap of [`HEAP_CAPACITY`] bytes.
//!
//! With the `export-symbols` feature these are emitted under their plain C
//! names, so C code compiled into the same image links against them instead
//! of a system libc. Without it they are ordinary Rust functions.
//!
//! The feature is limited to freestanding and wasm targets. On a hosted
//! target the system libc and Rust's own `System` allocator would route into
//! this `malloc`, which has no `realloc` and only guarantees
//! [`ALIGNMENT`](crate::config::ALIGNMENT)-byte alignment.
//!
//! The heap lock is not reentrant: when the symbols are exported, no
//! `tracing` subscriber that allocates may be installed.

#[cfg(all(
  feature = "export-symbols",
  not(any(target_os = "none", target_family = "wasm"))
))]
compile_error!(
  "`export-symbols` replaces the C allocator and is only supported on freestanding (`target_os = \"none\"`) and wasm targets"
);

use core::{ptr, slice};

use libc::{c_int, c_void, size_t};
use tracing::warn;

use crate::{
  config::HEAP_CAPACITY,
  locked::{ArenaStats, LockedArena},
  mem,
};

static HEAP: LockedArena<HEAP_CAPACITY> = LockedArena::new();

/// Snapshot of the process-wide heap.
pub fn heap_stats() -> ArenaStats {
  HEAP.stats()
}

/// Returns a pointer to at least `size` bytes, or null.
#[cfg_attr(feature = "export-symbols", unsafe(no_mangle))]
pub extern "C" fn malloc(size: size_t) -> *mut c_void {
  HEAP
    .allocate_ptr(size)
    .map_or(ptr::null_mut(), |payload| payload.as_ptr().cast())
}

/// Returns a pointer to `nmemb * size` zeroed bytes, or null.
#[cfg_attr(feature = "export-symbols", unsafe(no_mangle))]
pub extern "C" fn calloc(
  nmemb: size_t,
  size: size_t,
) -> *mut c_void {
  HEAP
    .allocate_zeroed_ptr(nmemb, size)
    .map_or(ptr::null_mut(), |payload| payload.as_ptr().cast())
}

/// Releases a pointer returned by [`malloc`] or [`calloc`].
///
/// Null is ignored. Pointers the heap did not hand out, and pointers that
/// were already freed, are logged and ignored.
#[cfg_attr(feature = "export-symbols", unsafe(no_mangle))]
pub extern "C" fn free(ptr: *mut c_void) {
  if ptr.is_null() {
    return;
  }

  if let Err(err) = HEAP.release_ptr(ptr.cast()) {
    warn!(?ptr, %err, "free ignored");
  }
}

/// # Safety
/// `s` must be valid for writes of `n` bytes.
#[cfg_attr(feature = "export-symbols", unsafe(no_mangle))]
pub unsafe extern "C" fn memset(
  s: *mut c_void,
  c: c_int,
  n: size_t,
) -> *mut c_void {
  if n > 0 {
    let dst = unsafe { slice::from_raw_parts_mut(s.cast::<u8>(), n) };
    mem::fill(dst, c as u8);
  }
  s
}

/// # Safety
/// `dest` must be valid for writes and `src` for reads of `n` bytes, and the
/// two regions must not overlap.
#[cfg_attr(feature = "export-symbols", unsafe(no_mangle))]
pub unsafe extern "C" fn memcpy(
  dest: *mut c_void,
  src: *const c_void,
  n: size_t,
) -> *mut c_void {
  if n > 0 {
    let (dst, src) = unsafe {
      (
        slice::from_raw_parts_mut(dest.cast::<u8>(), n),
        slice::from_raw_parts(src.cast::<u8>(), n),
      )
    };
    mem::copy(dst, src);
  }
  dest
}

/// # Safety
/// `s1` and `s2` must be valid for reads of `n` bytes.
#[cfg_attr(feature = "export-symbols", unsafe(no_mangle))]
pub unsafe extern "C" fn memcmp(
  s1: *const c_void,
  s2: *const c_void,
  n: size_t,
) -> c_int {
  if n == 0 {
    return 0;
  }

  let (a, b) = unsafe {
    (
      slice::from_raw_parts(s1.cast::<u8>(), n),
      slice::from_raw_parts(s2.cast::<u8>(), n),
    )
  };
  mem::compare(a, b)
}
