//! Compile-time configuration of the allocator.

/// Size of one heap page in bytes.
pub const PAGE_SIZE: usize = 65536;

/// Number of pages backing the process-wide heap used by the C ABI.
pub const HEAP_PAGES: usize = 32;

/// Capacity of the process-wide heap in bytes.
pub const HEAP_CAPACITY: usize = PAGE_SIZE * HEAP_PAGES;

/// Every payload size is rounded up to a multiple of this. Must be a power of two.
pub const ALIGNMENT: usize = 8;

const _: () = assert!(ALIGNMENT.is_power_of_two());
