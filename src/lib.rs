//! # freearena - A Freestanding First-Fit Arena Allocator
//!
//! This crate provides `malloc`/`calloc`/`free` semantics over a single
//! fixed-size byte arena, for targets where no operating-system allocator
//! exists (embedded, freestanding, or WebAssembly images that link C code
//! against a tiny libc).
//!
//! ## Overview
//!
//! Blocks are carved one after another from the front of the arena. Each
//! carries a small header and is linked to the next one in carve order:
//!
//! ```text
//!   Arena<N>:
//!
//!   ┌──────────────────────────────────────────────────────────────────────┐
//!   │ ┌────┬──────┬────┬──────────┬────┬──────┬───────────────────────────┐│
//!   │ │ H1 │  P1  │ H2 │    P2    │ H3 │  P3  │      virgin bytes         ││
//!   │ └────┴──────┴────┴──────────┴────┴──────┴───────────────────────────┘│
//!   │   │          ▲ │              ▲                 ▲                 ▲  │
//!   │   └──next────┘ └─────next─────┘                 │                 │  │
//!   │                                             Frontier              N  │
//!   └──────────────────────────────────────────────────────────────────────┘
//!
//!   Allocation: first free block with size >= request, else carve at the frontier.
//!   Release:    flip the block's free flag. Nothing moves, nothing merges.
//! ```
//!
//! ## Crate Structure
//!
//! ```text
//!   freearena
//!   ├── align      - align! macro (round up to ALIGNMENT)
//!   ├── arena      - Arena: the allocator itself
//!   ├── block      - BlockHeader encoding (internal)
//!   ├── config     - compile-time constants
//!   ├── error      - AllocError
//!   ├── ffi        - malloc/calloc/free/memset/memcpy/memcmp over a global heap
//!   ├── handle     - Handle: payload offset
//!   ├── list       - FreeList: first-fit search and carving over raw bytes (internal)
//!   ├── locked     - LockedArena: shared arena, one lock over the block list
//!   └── mem        - fill/copy/compare
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use freearena::Arena;
//!
//! let mut arena = Arena::<1024>::new();
//!
//! let first = arena.allocate(10).unwrap();
//! assert_eq!(first.offset(), 24);
//! assert_eq!(arena.frontier(), 40);
//!
//! arena.payload_mut(first).unwrap()[..5].copy_from_slice(b"hello");
//! arena.release(first).unwrap();
//!
//! // First fit hands the same block back, bytes and all.
//! let again = arena.allocate(16).unwrap();
//! assert_eq!(again, first);
//! assert_eq!(&arena.payload(again).unwrap()[..5], b"hello");
//! ```
//!
//! ## How It Works
//!
//! Every block is a 24-byte header followed by its payload:
//!
//! ```text
//!   Single Allocation:
//!   ┌───────────────────────┬────────────────────────────────┐
//!   │    Block Header       │         Payload                │
//!   │  ┌─────────────────┐  │                                │
//!   │  │ size: N         │  │  ┌──────────────────────────┐  │
//!   │  │ next: off/none  │  │  │                          │  │
//!   │  │ flags: tag|free │  │  │  N bytes, N % 8 == 0     │  │
//!   │  └─────────────────┘  │  │                          │  │
//!   │      24 bytes         │  └──────────────────────────┘  │
//!   └───────────────────────┴────────────────────────────────┘
//!                           ▲
//!                           └── Handle::offset()
//! ```
//!
//! Handles are arena offsets. Mapping one back to its header walks the
//! block list, so foreign handles and double frees are reported as errors
//! rather than corrupting the arena.
//!
//! ## Limitations
//!
//! - **No splitting**: a large free block serves a small request whole
//! - **No coalescing**: adjacent free blocks never merge
//! - **Monotonic frontier**: memory is never handed back to the arena
//! - **Fixed alignment**: payloads are 8-byte aligned, nothing more
//! - **`Arena` is single-threaded**: use [`LockedArena`] to share one

pub mod align;
pub mod arena;
mod block;
pub mod config;
pub mod error;
pub mod ffi;
pub mod handle;
mod list;
pub mod locked;
pub mod mem;

pub use arena::Arena;
pub use block::HEADER_SIZE;
pub use error::{AllocError, Result};
pub use handle::Handle;
pub use list::{BlockInfo, Blocks};
pub use locked::{ArenaStats, LockedArena};
