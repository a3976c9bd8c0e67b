use freearena::{AllocError, Arena, HEADER_SIZE, mem};
use tracing::Level;

/// Prints every block in carve order plus the frontier.
fn print_blocks<const N: usize>(
  label: &str,
  arena: &Arena<N>,
) {
  println!("[{}] frontier = {} / {}", label, arena.frontier(), arena.capacity());
  for block in arena.blocks() {
    println!(
      "    header @{:<4} payload @{:<4} size {:<4} {}",
      block.header,
      block.payload.offset(),
      block.size,
      if block.free { "free" } else { "used" }
    );
  }
}

fn main() -> Result<(), AllocError> {
  tracing_subscriber::fmt().with_max_level(Level::TRACE).init();

  let mut arena = Arena::<1024>::new();
  println!("header size = {HEADER_SIZE} bytes");

  // --------------------------------------------------------------------
  // 1) A 10-byte request rounds up to 16 and carves the first block.
  // --------------------------------------------------------------------
  let first = arena.allocate(10)?;
  mem::fill(arena.payload_mut(first)?, 0xAB);
  print_blocks("1", &arena);

  // --------------------------------------------------------------------
  // 2) No free block yet, so the second request carves behind the first.
  // --------------------------------------------------------------------
  let second = arena.allocate(16)?;
  print_blocks("2", &arena);

  // --------------------------------------------------------------------
  // 3) Release the first block and ask for 10 bytes again.
  //    First fit hands it back untouched; the frontier does not move.
  // --------------------------------------------------------------------
  arena.release(first)?;
  let third = arena.allocate(10)?;
  println!(
    "[3] third == first? {} (first byte = {:#x})",
    third == first,
    arena.payload(third)?[0]
  );
  print_blocks("3", &arena);

  // --------------------------------------------------------------------
  // 4) Misuse is reported instead of corrupting the list.
  // --------------------------------------------------------------------
  arena.release(second)?;
  match arena.release(second) {
    Err(err) => println!("[4] second release: {err}"),
    Ok(()) => println!("[4] second release was accepted"),
  }

  // --------------------------------------------------------------------
  // 5) Fill the arena until it refuses.
  // --------------------------------------------------------------------
  let mut carved = 0;
  let err = loop {
    match arena.allocate(64) {
      Ok(_) => carved += 1,
      Err(err) => break err,
    }
  };
  println!("[5] carved {carved} more blocks, then: {err}");
  print_blocks("5", &arena);

  Ok(())
}
