//! Heap engine: the public façade. Orchestrates [`crate::region`],
//! [`crate::block`], and [`crate::index`] under a single heap-wide lock to
//! implement `init`, `allocate`, `release`, and `resize`.
//!
//! ```text
//!   Heap
//!   +------------------------------------------------+
//!   |  Mutex<HeapInner>                               |
//!   |    region: Region        (mmap-backed cursor)    |
//!   |    lists:  FreeLists     (20 segregated buckets) |
//!   |    start:  *mut u8       (prologue sentinel)     |
//!   +------------------------------------------------+
//! ```
//!
//! A single process-wide [`Heap`] is exposed as a `static` in [`crate`]; the
//! free functions there just forward to it. Tests construct their own
//! [`Heap`] values so they never interfere with one another.

use std::ptr;
use std::sync::Mutex;

use crate::block;
use crate::index::FreeLists;
use crate::region::Region;

/// Default extension granularity when the heap must grow to satisfy a
/// request, or to seed the very first free block on `init`.
pub const CHUNK: usize = 4096;

/// Heap-wide mutable state, touched only while [`Heap`]'s mutex is held.
struct HeapInner {
  region: Region,
  lists: FreeLists,
  /// Payload address of the prologue sentinel, retained for diagnostics;
  /// not required by any allocation path.
  start: *mut u8,
}

// `HeapInner` is only ever reached through `Heap`'s mutex.
unsafe impl Send for HeapInner {}

impl HeapInner {
  const fn empty() -> Self {
    Self { region: Region::empty(), lists: FreeLists::new(), start: ptr::null_mut() }
  }

  /// Computes the adjusted block size for a user request of `size` bytes:
  /// header + footer overhead, rounded up to a double-word, with a 32-byte
  /// floor.
  fn adjusted_size(size: usize) -> usize {
    if size <= 16 { 32 } else { crate::align_to!(size + block::DWORD, block::DWORD) }
  }

  fn init_locked(&mut self) -> Result<(), ()> {
    self.region.reset()?;
    self.lists = FreeLists::new();

    // Prologue + epilogue: one alignment pad word, a 16-byte allocated
    // prologue block (header+footer, no payload), and an epilogue header.
    let base = self.region.grow(4 * block::WORD as isize).ok_or(())?;
    unsafe {
      // Alignment pad.
      *base.cast::<usize>() = 0;
    }
    let start = unsafe { base.add(2 * block::WORD) };
    unsafe {
      block::write_tags(start, 2 * block::WORD, true);
      // Epilogue header: a zero-size allocated block, right after the
      // prologue's footer.
      block::write_tag_at(start.add(block::WORD), 0, true);
    }
    self.start = start;

    self.extend_locked(CHUNK / block::WORD).ok_or(())?;
    Ok(())
  }

  /// Extends the heap by (at least) `n_words` words, rounded up to an even
  /// word count to preserve double-word alignment. Returns the resulting
  /// free block (possibly merged with a trailing free neighbor), already
  /// inserted into the free-list index.
  fn extend_locked(&mut self, n_words: usize) -> Option<*mut u8> {
    let n_words = if n_words % 2 != 0 { n_words + 1 } else { n_words };
    let size = n_words * block::WORD;

    // `grow` returns the address right after the old epilogue header (the
    // epilogue is always the last thing written), so that address doubles
    // as this block's payload pointer: its header, at `new_block - WORD`,
    // lands exactly on the old epilogue header and overwrites it.
    let new_block = self.region.grow(size as isize)?;
    unsafe {
      block::write_tags(new_block, size, false);
      // Fresh epilogue header at the new top of heap.
      block::write_tag_at(new_block.add(size - block::WORD), 0, true);
    }

    Some(self.coalesce_locked(new_block))
  }

  /// Removes `block` from its free list and either splits it (writing a
  /// fresh free remainder back into the index) or absorbs it whole,
  /// marking the front `asize` bytes allocated either way.
  fn place_locked(&mut self, block: *mut u8, asize: usize) {
    unsafe {
      let csize = block::size_at(block);
      self.lists.remove(block, csize);

      if csize - asize >= block::MIN_BLOCK {
        block::write_tags(block, asize, true);

        let remainder = block.add(asize);
        let rsize = csize - asize;
        block::write_tags(remainder, rsize, false);
        self.lists.insert(remainder, rsize);
      } else {
        block::write_tags(block, csize, true);
      }
    }
  }

  /// Merges `block` with whichever physically adjacent neighbors are free
  /// (the prologue/epilogue sentinels are always allocated, so this never
  /// reaches past either end of the heap), and inserts the result into the
  /// free-list index under its final size.
  fn coalesce_locked(&mut self, block: *mut u8) -> *mut u8 {
    unsafe {
      let size = block::size_at(block);
      let prev_alloc = block::prev_alloc(block);

      let next = block::next_physical(block);
      let next_alloc = block::alloc_at(next);
      let next_size = block::size_at(next);

      let merged = match (prev_alloc, next_alloc) {
        (true, true) => block,
        (true, false) => {
          self.lists.remove(next, next_size);
          let new_size = size + next_size;
          block::write_tags(block, new_size, false);
          block
        }
        (false, true) => {
          let prev = block::prev_physical(block);
          let prev_size = block::size_at(prev);
          self.lists.remove(prev, prev_size);
          let new_size = size + prev_size;
          block::write_tags(prev, new_size, false);
          prev
        }
        (false, false) => {
          let prev = block::prev_physical(block);
          let prev_size = block::size_at(prev);
          self.lists.remove(prev, prev_size);
          self.lists.remove(next, next_size);
          let new_size = size + prev_size + next_size;
          block::write_tags(prev, new_size, false);
          prev
        }
      };

      let final_size = block::size_at(merged);
      self.lists.insert(merged, final_size);
      merged
    }
  }

  fn allocate_locked(&mut self, asize: usize) -> *mut u8 {
    unsafe {
      if let Some(block) = self.lists.find_fit(asize) {
        self.place_locked(block, asize);
        return block;
      }

      let Some(block) = self.extend_locked((asize.max(CHUNK)) / block::WORD) else {
        return ptr::null_mut();
      };
      self.place_locked(block, asize);
      block
    }
  }
}

/// A dynamic memory heap: a constructible value wrapping the heap-wide
/// lock, so tests (and any caller that wants an isolated heap) can run
/// independently of the process-wide singleton in [`crate`].
pub struct Heap {
  inner: Mutex<HeapInner>,
}

impl Default for Heap {
  fn default() -> Self {
    Self::new()
  }
}

impl Heap {
  /// Constructs an unmapped heap. No OS memory is reserved until
  /// [`Heap::init`] is called.
  pub const fn new() -> Self {
    Self { inner: Mutex::new(HeapInner::empty()) }
  }

  /// Resets (or lazily creates) the backing region, re-seeds the
  /// prologue/epilogue sentinels and the first free chunk. Invalidates all
  /// pointers previously returned by this heap. Returns `0` on success,
  /// `-1` if the backing region could not be obtained or extended.
  pub fn init(&self) -> i32 {
    let mut inner = self.inner.lock().unwrap();
    match inner.init_locked() {
      Ok(()) => 0,
      Err(()) => -1,
    }
  }

  /// Allocates at least `size` bytes, returning a 16-byte aligned pointer,
  /// or null on failure. `size == 0` always returns null without touching
  /// the lock.
  pub fn allocate(&self, size: usize) -> *mut u8 {
    if size == 0 {
      return ptr::null_mut();
    }
    let asize = HeapInner::adjusted_size(size);

    let mut inner = self.inner.lock().unwrap();
    inner.allocate_locked(asize)
  }

  /// Returns a previously allocated (or resized) pointer to the heap. Null
  /// is a no-op. Double-freeing, or releasing a pointer not vended by this
  /// heap, is undefined behavior (not detected).
  pub fn release(&self, ptr: *mut u8) {
    if ptr.is_null() {
      return;
    }
    let mut inner = self.inner.lock().unwrap();
    unsafe {
      let size = block::size_at(ptr);
      block::write_tags(ptr, size, false);
      inner.coalesce_locked(ptr);
    }
  }

  /// Resizes the allocation at `ptr` to `new_size` bytes, preserving the
  /// first `min(new_size, old_payload)` bytes of content. `ptr == null` is
  /// equivalent to `allocate(new_size)`; `new_size == 0` releases `ptr` and
  /// returns null. Always copies — never attempts to extend in place.
  pub fn resize(&self, ptr: *mut u8, new_size: usize) -> *mut u8 {
    if ptr.is_null() {
      return self.allocate(new_size);
    }
    if new_size == 0 {
      self.release(ptr);
      return ptr::null_mut();
    }

    let new_ptr = self.allocate(new_size);
    if new_ptr.is_null() {
      return ptr::null_mut();
    }

    // Only the metadata read takes the heap lock; the copy below touches
    // two pointers exclusively owned by this call (the new one, not yet
    // published, and the old one, still owned by the caller), so it is
    // race-free outside the lock.
    let old_size = {
      let _inner = self.inner.lock().unwrap();
      unsafe { block::size_at(ptr) }
    };
    let old_payload = old_size.saturating_sub(block::DWORD);
    let copy_len = new_size.min(old_payload);

    unsafe {
      ptr::copy_nonoverlapping(ptr, new_ptr, copy_len);
    }

    self.release(ptr);
    new_ptr
  }

  /// Prints the current per-bucket free counts. Never called from any
  /// allocation path; only useful while chasing down a failing test.
  #[cfg(test)]
  pub(crate) fn debug_snapshot(&self, label: &str) {
    let inner = self.inner.lock().unwrap();
    println!("[{label}] free bucket counts = {:?}", inner.lists.bucket_counts());
  }
}
