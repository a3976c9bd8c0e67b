use core::{marker::PhantomData, ptr};

use tracing::{debug, trace, warn};

use crate::{
  align::checked_align,
  block::{BlockHeader, HEADER_SIZE},
  config::ALIGNMENT,
  error::{AllocError, Result},
  handle::Handle,
};

/// Raw view of an arena's bytes.
///
/// Every header read and write goes through the base pointer, so pointers
/// previously handed out into payloads stay valid.
#[derive(Clone, Copy)]
pub(crate) struct Region {
  base: *mut u8,
  len: usize,
}

impl Region {
  /// # Safety
  /// `base` must be valid for reads and writes of `len` bytes for as long
  /// as the region is used.
  pub(crate) const unsafe fn new(
    base: *mut u8,
    len: usize,
  ) -> Self {
    Self { base, len }
  }

  pub(crate) fn base(self) -> *mut u8 {
    self.base
  }

  pub(crate) fn len(self) -> usize {
    self.len
  }

  fn read_header(
    self,
    offset: usize,
  ) -> Result<BlockHeader> {
    let corrupt = AllocError::CorruptHeader { offset };
    if offset.checked_add(HEADER_SIZE).is_none_or(|end| end > self.len) {
      return Err(corrupt);
    }

    let bytes = unsafe { ptr::read(self.base.add(offset).cast::<[u8; HEADER_SIZE]>()) };
    BlockHeader::decode(&bytes).ok_or(corrupt)
  }

  fn write_header(
    self,
    offset: usize,
    header: &BlockHeader,
  ) {
    debug_assert!(offset + HEADER_SIZE <= self.len);
    unsafe { ptr::write(self.base.add(offset).cast::<[u8; HEADER_SIZE]>(), header.encode()) };
  }

  fn zero(
    self,
    offset: usize,
    count: usize,
  ) {
    debug_assert!(offset + count <= self.len);
    unsafe { ptr::write_bytes(self.base.add(offset), 0, count) };
  }
}

enum Search {
  Found { offset: usize, header: BlockHeader },
  Exhausted { last: Option<usize> },
}

/// The carve-ordered block list and frontier of one arena.
///
/// Holds no bytes itself; every operation is handed the [`Region`] it
/// manages.
#[derive(Debug, Default)]
pub(crate) struct FreeList {
  frontier: usize,
  head: Option<usize>,
}

impl FreeList {
  pub(crate) const fn new() -> Self {
    Self {
      frontier: 0,
      head: None,
    }
  }

  pub(crate) const fn frontier(&self) -> usize {
    self.frontier
  }

  pub(crate) fn allocate(
    &mut self,
    region: Region,
    size: usize,
  ) -> Result<Handle> {
    if size == 0 {
      debug!("rejected zero-sized allocation");
      return Err(AllocError::InvalidSize);
    }

    let Some(size) = checked_align(size, ALIGNMENT) else {
      return Err(self.out_of_memory(region, size));
    };

    match self.find_free_block(region, size)? {
      Search::Found { offset, mut header } => {
        header.is_free = false;
        region.write_header(offset, &header);

        trace!(offset, size = header.size, rounded = size, "reused free block");
        Ok(Handle::new(offset + HEADER_SIZE))
      }
      Search::Exhausted { last } => self.carve(region, last, size),
    }
  }

  pub(crate) fn allocate_zeroed(
    &mut self,
    region: Region,
    count: usize,
    elem_size: usize,
  ) -> Result<Handle> {
    let total = count
      .checked_mul(elem_size)
      .ok_or(AllocError::SizeOverflow { count, elem_size })?;

    let handle = self.allocate(region, total)?;
    region.zero(handle.offset(), total);

    Ok(handle)
  }

  pub(crate) fn release(
    &mut self,
    region: Region,
    handle: Handle,
  ) -> Result<()> {
    let offset = self.find_block(region, handle)?;
    let mut header = region.read_header(offset)?;

    if header.is_free {
      warn!(offset = handle.offset(), "double free");
      return Err(AllocError::DoubleFree {
        offset: handle.offset(),
      });
    }

    header.is_free = true;
    region.write_header(offset, &header);

    debug!(offset = handle.offset(), size = header.size, "released block");
    Ok(())
  }

  /// Payload size of a block that is currently allocated.
  pub(crate) fn live_size(
    &self,
    region: Region,
    handle: Handle,
  ) -> Result<usize> {
    let header = region.read_header(self.find_block(region, handle)?)?;
    if header.is_free {
      return Err(AllocError::UseAfterFree {
        offset: handle.offset(),
      });
    }
    Ok(header.size)
  }

  pub(crate) fn blocks(
    &self,
    region: Region,
  ) -> Blocks<'_> {
    Blocks {
      region,
      next: self.head,
      _list: PhantomData,
    }
  }

  fn find_free_block(
    &self,
    region: Region,
    size: usize,
  ) -> Result<Search> {
    let mut last = None;
    let mut current = self.head;

    while let Some(offset) = current {
      let header = region.read_header(offset)?;
      if header.is_free && header.size >= size {
        return Ok(Search::Found { offset, header });
      }
      last = Some(offset);
      current = header.next;
    }

    Ok(Search::Exhausted { last })
  }

  fn carve(
    &mut self,
    region: Region,
    last: Option<usize>,
    size: usize,
  ) -> Result<Handle> {
    let offset = self.frontier;
    let end = offset
      .checked_add(HEADER_SIZE)
      .and_then(|payload| payload.checked_add(size))
      .filter(|&end| end <= region.len());
    let Some(end) = end else {
      return Err(self.out_of_memory(region, size));
    };

    // Read the tail before writing anything so a bad header commits nothing.
    let tail = last
      .map(|last| region.read_header(last).map(|header| (last, header)))
      .transpose()?;

    region.write_header(offset, &BlockHeader::new(size, false, None));
    match tail {
      Some((last, mut header)) => {
        header.next = Some(offset);
        region.write_header(last, &header);
      }
      None => self.head = Some(offset),
    }
    self.frontier = end;

    trace!(offset, size, frontier = end, "carved new block");
    Ok(Handle::new(offset + HEADER_SIZE))
  }

  /// Maps a payload handle back to the offset of its header.
  fn find_block(
    &self,
    region: Region,
    handle: Handle,
  ) -> Result<usize> {
    let invalid = AllocError::InvalidHandle {
      offset: handle.offset(),
    };

    let Some(target) = handle.offset().checked_sub(HEADER_SIZE) else {
      warn!(offset = handle.offset(), "handle below first header");
      return Err(invalid);
    };
    if handle.offset() > self.frontier {
      warn!(offset = handle.offset(), frontier = self.frontier, "handle past frontier");
      return Err(invalid);
    }

    // Headers are linked in ascending offset order.
    let mut current = self.head;
    while let Some(offset) = current {
      if offset == target {
        return Ok(offset);
      }
      if offset > target {
        break;
      }
      current = region.read_header(offset)?.next;
    }

    warn!(offset = handle.offset(), "handle does not name a block");
    Err(invalid)
  }

  fn out_of_memory(
    &self,
    region: Region,
    requested: usize,
  ) -> AllocError {
    let remaining = region.len() - self.frontier;
    warn!(requested, remaining, "arena exhausted");
    AllocError::OutOfMemory {
      requested,
      remaining,
    }
  }
}

/// A block as seen by [`Arena::blocks`](crate::Arena::blocks).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockInfo {
  /// Arena offset of the block header.
  pub header: usize,
  pub payload: Handle,
  pub size: usize,
  pub free: bool,
}

/// Iterator over the blocks of an arena, in carve order.
///
/// Stops early, with a warning, at a header that does not decode.
pub struct Blocks<'a> {
  region: Region,
  next: Option<usize>,
  _list: PhantomData<&'a FreeList>,
}

impl Iterator for Blocks<'_> {
  type Item = BlockInfo;

  fn next(&mut self) -> Option<Self::Item> {
    let offset = self.next?;
    let header = match self.region.read_header(offset) {
      Ok(header) => header,
      Err(err) => {
        warn!(%err, "block list truncated at corrupt block header");
        self.next = None;
        return None;
      }
    };
    self.next = header.next;

    Some(BlockInfo {
      header: offset,
      payload: Handle::new(offset + HEADER_SIZE),
      size: header.size,
      free: header.is_free,
    })
  }
}
