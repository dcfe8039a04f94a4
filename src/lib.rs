//! # rallocator - A Custom Memory Allocator Library
//!
//! This crate provides a general-purpose dynamic memory allocator operating
//! over a single contiguous region of address space obtained from the host
//! operating system with `mmap`. Callers request payloads of arbitrary byte
//! length, receive 16-byte aligned pointers into the region, and later
//! return them for reuse. It is safe to call concurrently from many
//! threads.
//!
//! ## Overview
//!
//! The allocator is a classic segregated-fit heap: every block carries a
//! boundary tag (a header mirrored by a footer) so that coalescing with a
//! physical neighbor is an O(1) lookup, and free blocks are kept on 20
//! size-class buckets rather than one long list.
//!
//! ```text
//!   Heap layout (after init, before any user allocation):
//!
//!   +------+--------+--------+----------------------------+--------+
//!   | pad  | prologue hdr/ftr|        first free chunk     | epilog |
//!   | 8 B  |      16 B       |         CHUNK bytes         |  8 B   |
//!   +------+--------+--------+----------------------------+--------+
//! ```
//!
//! Each block is:
//!
//! ```text
//!   +--------+------------------------------------------+--------+
//!   | header |           payload / free-list links      | footer |
//!   | size|a |                                           | size|a |
//!   +--------+------------------------------------------+--------+
//!            ^
//!            payload pointer (always 16-byte aligned)
//! ```
//!
//! ## Crate Structure
//!
//! ```text
//!   rallocator
//!   ├── align    - alignment macros (align!, align_to!)
//!   ├── block    - boundary-tag block layout (internal raw pointer arithmetic)
//!   ├── region   - mmap-backed, monotonically growing backing memory
//!   ├── index    - 20-bucket segregated free-list
//!   └── engine   - the public façade: Heap, init/allocate/release/resize
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use rallocator::Heap;
//!
//! let heap = Heap::new();
//! assert_eq!(heap.init(), 0);
//!
//! let ptr = heap.allocate(64) as *mut u64;
//! assert!(!ptr.is_null());
//!
//! unsafe {
//!     *ptr = 42;
//!     assert_eq!(*ptr, 42);
//! }
//!
//! heap.release(ptr as *mut u8);
//! ```
//!
//! Or, through the process-wide singleton:
//!
//! ```rust,no_run
//! rallocator::init();
//! let ptr = rallocator::allocate(64);
//! rallocator::release(ptr);
//! ```
//!
//! ## Thread Safety
//!
//! All four operations serialize through a single heap-wide `Mutex`. There
//! are no per-thread caches and no lock-free fast path; concurrent callers
//! simply queue on the lock, which matches the original design this crate
//! implements.
//!
//! ## Safety
//!
//! This crate is inherently unsafe as it deals with raw memory management.
//! Double-freeing a pointer, releasing a pointer this allocator never
//! vended, or touching a pointer after it has been released, is undefined
//! behavior — the allocator does not and cannot detect caller misuse of
//! this kind, the same way `malloc`/`free` do not.

pub mod align;
mod block;
pub mod engine;
mod index;
mod region;

pub use engine::{CHUNK, Heap};

use std::sync::OnceLock;

static HEAP: OnceLock<Heap> = OnceLock::new();

fn heap() -> &'static Heap {
  HEAP.get_or_init(Heap::new)
}

/// Resets the process-wide heap. Returns `0` on success, `-1` on failure.
/// Re-initializing invalidates every pointer previously returned by this
/// singleton — callers must not hold allocations across an `init` call.
pub fn init() -> i32 {
  heap().init()
}

/// Allocates at least `size` bytes from the process-wide heap, returning a
/// 16-byte aligned pointer, or null on failure. `size == 0` always returns
/// null.
pub fn allocate(size: usize) -> *mut u8 {
  heap().allocate(size)
}

/// Returns a pointer previously obtained from [`allocate`] or [`resize`] to
/// the process-wide heap. Null is a no-op.
pub fn release(ptr: *mut u8) {
  heap().release(ptr)
}

/// Resizes a pointer previously obtained from the process-wide heap,
/// preserving the first `min(new_size, old_payload)` bytes of content.
/// `ptr == null` behaves like [`allocate`]; `new_size == 0` releases `ptr`
/// and returns null.
pub fn resize(ptr: *mut u8, new_size: usize) -> *mut u8 {
  heap().resize(ptr, new_size)
}
