//! Block layout: the in-band boundary-tag encoding shared by every block in
//! the heap, and the raw pointer arithmetic needed to read and write it.
//!
//! This module has no runtime state of its own — it is a set of free
//! functions that interpret bytes already living in the backing region.
//! Every other module treats a block as an opaque `*mut u8` payload pointer
//! and only ever touches its metadata through these accessors.
//!
//! ```text
//!   Offset from payload pointer `p`:
//!
//!   p-8        p              p+size-16    p+size
//!    |---------|-------...-----|-----------|
//!    | header  |    payload    |  footer   |
//!    | size|a  |  (or fwd/back |  size|a   |
//!    |         |   free links) |           |
//!
//!   `size` always includes header + payload + footer.
//!   `a` (bit 0) is 1 when allocated, 0 when free.
//! ```
//!
//! When a block is free, the first two words of its payload hold the
//! doubly-linked free-list pointers:
//!
//! ```text
//!   payload+0  -> next free block's payload, or null
//!   payload+8  -> previous free block's payload, or null
//! ```

use std::mem;

/// One machine word, in bytes.
pub const WORD: usize = mem::size_of::<usize>();
/// One double-word: the minimum granularity of a block size.
pub const DWORD: usize = 2 * WORD;
/// Smallest legal block size: header + two free-list links + footer.
pub const MIN_BLOCK: usize = 2 * DWORD;

const ALLOC_BIT: usize = 1;
const SIZE_MASK: usize = !ALLOC_BIT;

/// Packs a block size and allocation flag into a single header/footer word.
#[inline]
fn pack(size: usize, alloc: bool) -> usize {
  debug_assert_eq!(size & ALLOC_BIT, 0, "block size must be a multiple of 16");
  size | (alloc as usize)
}

/// Address of the header word for the block whose payload starts at `p`.
#[inline]
unsafe fn header_ptr(p: *mut u8) -> *mut usize {
  unsafe { p.cast::<usize>().sub(1) }
}

/// Address of the footer word for a block at payload `p` with total `size`.
#[inline]
unsafe fn footer_ptr(p: *mut u8, size: usize) -> *mut usize {
  unsafe { p.add(size - DWORD).cast::<usize>() }
}

/// Reads the total block size (header + payload + footer) from `p`'s header.
#[inline]
pub unsafe fn size_at(p: *mut u8) -> usize {
  unsafe { *header_ptr(p) & SIZE_MASK }
}

/// Reads the allocation flag from `p`'s header.
#[inline]
pub unsafe fn alloc_at(p: *mut u8) -> bool {
  unsafe { *header_ptr(p) & ALLOC_BIT == ALLOC_BIT }
}

/// Writes `(size, alloc)` into the header preceding payload `p`.
#[inline]
pub unsafe fn write_header(p: *mut u8, size: usize, alloc: bool) {
  unsafe { *header_ptr(p) = pack(size, alloc) };
}

/// Writes `(size, alloc)` into the footer that ends a block of `size` bytes
/// starting at payload `p`.
#[inline]
pub unsafe fn write_footer(p: *mut u8, size: usize, alloc: bool) {
  unsafe { *footer_ptr(p, size) = pack(size, alloc) };
}

/// Writes matching header and footer tags for a block of `size` bytes
/// starting at payload `p`. The common case of marking a whole block's
/// boundary tags in one call.
#[inline]
pub unsafe fn write_tags(p: *mut u8, size: usize, alloc: bool) {
  unsafe {
    write_header(p, size, alloc);
    write_footer(p, size, alloc);
  }
}

/// Writes a single `(size, alloc)` tag word directly at `addr`, with no
/// notion of a payload pointer. Used only for the prologue/epilogue
/// sentinels, which have no payload of their own to anchor the usual
/// header/footer arithmetic.
#[inline]
pub unsafe fn write_tag_at(addr: *mut u8, size: usize, alloc: bool) {
  unsafe { *addr.cast::<usize>() = pack(size, alloc) };
}

/// Payload pointer of the block physically following the one at `p`.
#[inline]
pub unsafe fn next_physical(p: *mut u8) -> *mut u8 {
  unsafe { p.add(size_at(p)) }
}

/// Payload pointer of the block physically preceding the one at `p`, read
/// via the footer word immediately before `p`'s own header.
#[inline]
pub unsafe fn prev_physical(p: *mut u8) -> *mut u8 {
  unsafe {
    let prev_footer = p.cast::<usize>().sub(2);
    let prev_size = *prev_footer & SIZE_MASK;
    p.sub(prev_size)
  }
}

/// Reads the allocation flag of the block physically preceding `p`, without
/// needing its payload address — useful during coalescing, which only needs
/// to branch on the flag before deciding whether to look the neighbor up.
#[inline]
pub unsafe fn prev_alloc(p: *mut u8) -> bool {
  unsafe {
    let prev_footer = p.cast::<usize>().sub(2);
    *prev_footer & ALLOC_BIT == ALLOC_BIT
  }
}

/// Reads the next free-list pointer stored in a free block's payload.
#[inline]
pub unsafe fn read_next(p: *mut u8) -> *mut u8 {
  unsafe { *p.cast::<*mut u8>() }
}

/// Reads the previous free-list pointer stored in a free block's payload.
#[inline]
pub unsafe fn read_prev(p: *mut u8) -> *mut u8 {
  unsafe { *p.add(WORD).cast::<*mut u8>() }
}

/// Writes the next free-list pointer into a free block's payload.
#[inline]
pub unsafe fn write_next(p: *mut u8, next: *mut u8) {
  unsafe { *p.cast::<*mut u8>() = next };
}

/// Writes the previous free-list pointer into a free block's payload.
#[inline]
pub unsafe fn write_prev(p: *mut u8, prev: *mut u8) {
  unsafe { *p.add(WORD).cast::<*mut u8>() = prev };
}
